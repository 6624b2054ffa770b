//! Full-screen separable Gaussian blur
//!
//! The kernel grows with progress: at zero progress the radius is 2 texels,
//! at full progress it reaches the configured maximum. Two passes run per
//! frame, horizontal into the offscreen target and vertical back into the
//! camera color, sharing one uniform block.

use bytemuck::{Pod, Zeroable};
use veil_render::features::{Feature, FeatureContext, ProgramSlot};
use veil_render::gate::{self, GateInputs};
use veil_render::gpu::ShaderLibrary;
use veil_render::graph::ResourceHandle;
use veil_render::params::clamp_progress;
use veil_render::{
    Activation, BlitOp, EffectPass, FrameContext, OffscreenTarget, ProgramHandle, ProgramPass, Result,
    ViewKinds, VolumeComponent,
};

/// Name the blur program is registered under
pub const PROGRAM_NAME: &str = "veil/full_screen_blur";

/// Fragment stages of the blur program: horizontal, then vertical
pub const SHADER_SOURCE: &str = include_str!("../shaders/gaussian_blur.wgsl");

/// Smallest kernel radius, used at zero progress
pub const MIN_RADIUS: i32 = 2;

/// Largest configurable maximum radius
pub const MAX_RADIUS: i32 = 32;

/// Compile the blur program into `library`
pub fn register_program(library: &mut ShaderLibrary) -> Result<ProgramHandle> {
    library.register(PROGRAM_NAME, SHADER_SOURCE, &["fs_horizontal", "fs_vertical"])
}

/// Blur parameters for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurSettings {
    progress: f32,
    max_radius: i32,
}

impl BlurSettings {
    /// Zero progress, maximum radius 8
    pub fn new() -> Self {
        Self {
            progress: 0.0,
            max_radius: 8,
        }
    }

    /// Set progress (clamped to 0.0-1.0)
    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = clamp_progress(progress);
        self
    }

    /// Set the radius reached at full progress (clamped to 2-32)
    pub fn with_max_radius(mut self, radius: i32) -> Self {
        self.max_radius = radius.clamp(MIN_RADIUS, MAX_RADIUS);
        self
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = clamp_progress(progress);
    }

    pub fn set_max_radius(&mut self, radius: i32) {
        self.max_radius = radius.clamp(MIN_RADIUS, MAX_RADIUS);
    }

    pub fn max_radius(&self) -> i32 {
        self.max_radius
    }
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeComponent for BlurSettings {
    fn display_name(&self) -> &str {
        "FullScreenBlur"
    }

    fn progress(&self) -> f32 {
        self.progress
    }
}

/// Kernel actually used for a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurKernel {
    pub radius: i32,
    pub sigma: f32,
}

impl BlurKernel {
    /// Radius interpolated from 2 to `max_radius` and rounded to the
    /// nearest texel; sigma is half the radius.
    pub fn derive(progress: f32, max_radius: i32) -> Self {
        let max_radius = max_radius.clamp(MIN_RADIUS, MAX_RADIUS);
        let progress = clamp_progress(progress);

        let lerped = MIN_RADIUS as f32 + (max_radius - MIN_RADIUS) as f32 * progress;
        let radius = (lerped.round() as i32).clamp(MIN_RADIUS, max_radius);

        Self {
            radius,
            sigma: radius as f32 * 0.5,
        }
    }

    pub fn from_settings(settings: &BlurSettings) -> Self {
        Self::derive(settings.progress, settings.max_radius)
    }
}

/// Blur uniform block - must match WGSL BlurParams
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BlurUniform {
    pub kernel_radius: i32,
    pub sigma: f32,
    pub _pad: [f32; 2],
}

impl From<BlurKernel> for BlurUniform {
    fn from(kernel: BlurKernel) -> Self {
        Self {
            kernel_radius: kernel.radius,
            sigma: kernel.sigma,
            _pad: [0.0; 2],
        }
    }
}

/// Horizontal pass into the offscreen target, vertical pass back
pub struct BlurPass {
    target: OffscreenTarget,
    program: ProgramSlot,
}

impl BlurPass {
    pub fn new() -> Self {
        Self {
            target: OffscreenTarget::new("_FullScreenBlurTarget"),
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

impl Default for BlurPass {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectPass for BlurPass {
    fn name(&self) -> &str {
        "Full Screen Blur"
    }

    fn offscreen(&self) -> &OffscreenTarget {
        &self.target
    }

    fn offscreen_mut(&mut self) -> &mut OffscreenTarget {
        &mut self.target
    }

    fn plan(&self, frame: &FrameContext, source: ResourceHandle, scratch: ResourceHandle) -> Vec<BlitOp> {
        let (Some(program), Some(settings)) = (self.program.handle(), frame.params.get::<BlurSettings>()) else {
            return Vec::new();
        };

        let kernel = BlurKernel::from_settings(settings);
        log::trace!("Blur kernel radius {} sigma {}", kernel.radius, kernel.sigma);

        let uniform = BlurUniform::from(kernel);
        vec![
            BlitOp::shaded(
                "FullScreen Horizontal Blur Pass",
                source,
                scratch,
                ProgramPass::new(program, 0),
                &uniform,
            ),
            BlitOp::shaded(
                "FullScreen Vertical Blur Pass",
                scratch,
                source,
                ProgramPass::new(program, 1),
                &uniform,
            ),
        ]
    }
}

/// Plugs [`BlurPass`] into a post-process stack
pub struct BlurFeature {
    enabled: bool,
    excluded_views: ViewKinds,
    pass: BlurPass,
}

impl BlurFeature {
    pub fn new() -> Self {
        Self {
            enabled: true,
            excluded_views: ViewKinds::OFFSCREEN_CAPTURES,
            pass: BlurPass::new(),
        }
    }

    /// Views that never receive the blur (default: previews and reflections)
    pub fn with_excluded_views(mut self, views: ViewKinds) -> Self {
        self.excluded_views = views;
        self
    }

    pub fn pass(&self) -> &BlurPass {
        &self.pass
    }
}

impl Default for BlurFeature {
    fn default() -> Self {
        Self::new()
    }
}

impl Feature for BlurFeature {
    fn name(&self) -> &str {
        "full_screen_blur"
    }

    fn create(&mut self, ctx: &FeatureContext) -> Result<()> {
        if self.pass.program.refresh(ctx.shaders).is_none() {
            log::debug!("Program '{}' not loaded yet, blur stays off", PROGRAM_NAME);
        }
        Ok(())
    }

    fn evaluate(&mut self, frame: &FrameContext) -> Activation {
        gate::evaluate(&GateInputs {
            feature_enabled: self.enabled,
            post_processing: frame.post_processing,
            progress: frame.params.get::<BlurSettings>().map(|s| s.progress()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use veil_render::testing::StaticShaders;
    use veil_render::{ParameterStack, ViewDescriptor};

    #[test]
    fn kernel_at_known_points() {
        assert_eq!(BlurKernel::derive(0.5, 32), BlurKernel { radius: 17, sigma: 8.5 });
        assert_eq!(BlurKernel::derive(1.0, 8), BlurKernel { radius: 8, sigma: 4.0 });
        assert_eq!(BlurKernel::derive(0.0, 8), BlurKernel { radius: 2, sigma: 1.0 });
    }

    #[test]
    fn radius_is_monotonic_and_bounded() {
        for max_radius in MIN_RADIUS..=MAX_RADIUS {
            let mut previous = MIN_RADIUS;
            for step in 0..=100 {
                let kernel = BlurKernel::derive(step as f32 / 100.0, max_radius);
                assert!(kernel.radius >= previous, "max {} step {}", max_radius, step);
                assert!((MIN_RADIUS..=max_radius).contains(&kernel.radius));
                assert_eq!(kernel.sigma, kernel.radius as f32 * 0.5);
                previous = kernel.radius;
            }
            assert_eq!(previous, max_radius);
        }
    }

    #[test]
    fn derive_is_deterministic() {
        for progress in [0.0, 0.13, 0.5, 0.77, 1.0] {
            assert_eq!(BlurKernel::derive(progress, 19), BlurKernel::derive(progress, 19));
        }
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        assert_eq!(BlurKernel::derive(3.0, 8).radius, 8);
        assert_eq!(BlurKernel::derive(-1.0, 8).radius, 2);
        assert_eq!(BlurKernel::derive(f32::NAN, 8).radius, 2);
        assert_eq!(BlurKernel::derive(1.0, 100).radius, MAX_RADIUS);
        assert_eq!(BlurKernel::derive(1.0, 0).radius, MIN_RADIUS);
    }

    #[test]
    fn settings_clamp_their_inputs() {
        let settings = BlurSettings::new().with_max_radius(64).with_progress(1.5);
        assert_eq!(settings.max_radius(), 32);
        assert_eq!(settings.progress(), 1.0);
        assert_eq!(BlurSettings::default().max_radius(), 8);
        assert!(!BlurSettings::default().is_active());
    }

    #[test]
    fn uniform_layout() {
        assert_eq!(std::mem::size_of::<BlurUniform>(), 16);
    }

    #[test]
    fn vertical_pass_reads_what_horizontal_wrote() {
        let mut shaders = StaticShaders::new();
        let program = shaders.insert(PROGRAM_NAME);
        let mut pass = BlurPass::new();
        pass.program_mut().refresh(&shaders);

        let params = ParameterStack::new().with(BlurSettings::new().with_progress(0.5).with_max_radius(32));
        let view = ViewDescriptor::new(256, 256, wgpu::TextureFormat::Rgba16Float);
        let frame = FrameContext {
            frame: 3,
            params: &params,
            view: &view,
            shaders: &shaders,
            post_processing: true,
        };

        let scratch = pass.offscreen().handle();
        let ops = pass.plan(&frame, ResourceHandle::CAMERA_COLOR, scratch);
        assert_eq!(ops.len(), 2);

        let (horizontal, vertical) = (&ops[0], &ops[1]);
        assert_eq!(horizontal.source, ResourceHandle::CAMERA_COLOR);
        assert_eq!(horizontal.target, scratch);
        assert_eq!(vertical.source, horizontal.target);
        assert_eq!(vertical.target, ResourceHandle::CAMERA_COLOR);
        assert_eq!(horizontal.program, Some(ProgramPass::new(program, 0)));
        assert_eq!(vertical.program, Some(ProgramPass::new(program, 1)));

        let uniform: BlurUniform = horizontal.uniforms_as().unwrap();
        assert_eq!(uniform.kernel_radius, 17);
        assert_eq!(uniform.sigma, 8.5);
        assert_eq!(horizontal.uniforms, vertical.uniforms);
    }
}
