//! Camera fade: blends the camera color toward a solid color
//!
//! Each active frame the pass draws the camera color into its offscreen
//! target through the fade program, then copies the result back.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use veil_render::features::{Feature, FeatureContext, ProgramSlot};
use veil_render::gate::{self, GateInputs};
use veil_render::gpu::ShaderLibrary;
use veil_render::graph::ResourceHandle;
use veil_render::params::clamp_progress;
use veil_render::{
    Activation, BlitOp, EffectPass, FrameContext, OffscreenTarget, ProgramHandle, ProgramPass, Result,
    ViewKinds, VolumeComponent,
};

/// Name the fade program is registered under
pub const PROGRAM_NAME: &str = "veil/camera_fade";

/// Fragment stages of the fade program
pub const SHADER_SOURCE: &str = include_str!("../shaders/camera_fade.wgsl");

/// Compile the fade program into `library`
pub fn register_program(library: &mut ShaderLibrary) -> Result<ProgramHandle> {
    library.register(PROGRAM_NAME, SHADER_SOURCE, &["fs_fade"])
}

/// Fade parameters for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeSettings {
    color: Vec4,
    progress: f32,
}

impl FadeSettings {
    /// Opaque black at zero progress
    pub fn new() -> Self {
        Self {
            color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            progress: 0.0,
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Set progress (clamped to 0.0-1.0)
    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = clamp_progress(progress);
        self
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = clamp_progress(progress);
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeComponent for FadeSettings {
    fn display_name(&self) -> &str {
        "Camera Fade"
    }

    fn progress(&self) -> f32 {
        self.progress
    }
}

/// Fade uniform block - must match WGSL FadeParams (32 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FadeUniform {
    pub color: [f32; 4],
    pub progress: f32,
    pub _pad: [f32; 3],
}

impl FadeUniform {
    pub fn from_settings(settings: &FadeSettings) -> Self {
        Self {
            color: settings.color.to_array(),
            progress: settings.progress,
            _pad: [0.0; 3],
        }
    }
}

/// Camera color -> offscreen through the fade program, then back
pub struct FadePass {
    target: OffscreenTarget,
    program: ProgramSlot,
}

impl FadePass {
    pub fn new() -> Self {
        Self {
            target: OffscreenTarget::new("_CameraFadeTarget"),
            program: ProgramSlot::new(PROGRAM_NAME),
        }
    }

    pub fn program(&self) -> &ProgramSlot {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut ProgramSlot {
        &mut self.program
    }
}

impl Default for FadePass {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectPass for FadePass {
    fn name(&self) -> &str {
        "Camera Fade"
    }

    fn offscreen(&self) -> &OffscreenTarget {
        &self.target
    }

    fn offscreen_mut(&mut self) -> &mut OffscreenTarget {
        &mut self.target
    }

    fn plan(&self, frame: &FrameContext, source: ResourceHandle, scratch: ResourceHandle) -> Vec<BlitOp> {
        let (Some(program), Some(settings)) = (self.program.handle(), frame.params.get::<FadeSettings>()) else {
            return Vec::new();
        };

        let uniform = FadeUniform::from_settings(settings);
        vec![
            BlitOp::shaded(
                "Camera Fade Pass",
                source,
                scratch,
                ProgramPass::new(program, 0),
                &uniform,
            ),
            BlitOp::copy("Camera Fade Copy Back", scratch, source),
        ]
    }
}

/// Plugs [`FadePass`] into a post-process stack
pub struct FadeFeature {
    enabled: bool,
    excluded_views: ViewKinds,
    pass: FadePass,
}

impl FadeFeature {
    pub fn new() -> Self {
        Self {
            enabled: true,
            excluded_views: ViewKinds::OFFSCREEN_CAPTURES,
            pass: FadePass::new(),
        }
    }

    /// Views that never receive the fade (default: previews and reflections)
    pub fn with_excluded_views(mut self, views: ViewKinds) -> Self {
        self.excluded_views = views;
        self
    }

    pub fn pass(&self) -> &FadePass {
        &self.pass
    }
}

impl Default for FadeFeature {
    fn default() -> Self {
        Self::new()
    }
}

impl Feature for FadeFeature {
    fn name(&self) -> &str {
        "camera_fade"
    }

    fn create(&mut self, ctx: &FeatureContext) -> Result<()> {
        if self.pass.program.refresh(ctx.shaders).is_none() {
            log::debug!("Program '{}' not loaded yet, camera fade stays off", PROGRAM_NAME);
        }
        Ok(())
    }

    fn evaluate(&mut self, frame: &FrameContext) -> Activation {
        gate::evaluate(&GateInputs {
            feature_enabled: self.enabled,
            post_processing: frame.post_processing,
            progress: frame.params.get::<FadeSettings>().map(|s| s.progress()),
            view_kind: frame.view.kind,
            excluded_views: self.excluded_views,
            resources_ready: self.pass.program.validate(frame.shaders).is_some(),
        })
    }

    fn pass_mut(&mut self) -> Option<&mut dyn EffectPass> {
        Some(&mut self.pass)
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
