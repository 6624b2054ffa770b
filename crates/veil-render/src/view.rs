//! Description of the view being rendered this frame

use crate::resources::TextureDesc;
use bitflags::bitflags;

/// What kind of camera produced the frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Regular in-game camera
    #[default]
    Game,
    /// Editor scene view
    SceneView,
    /// Asset/material preview thumbnails
    Preview,
    /// Reflection probe capture
    Reflection,
    /// Stereo headset rendering
    Vr,
}

bitflags! {
    /// Set of view kinds, used by features to exclude cameras
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ViewKinds: u32 {
        const GAME = 1 << 0;
        const SCENE_VIEW = 1 << 1;
        const PREVIEW = 1 << 2;
        const REFLECTION = 1 << 3;
        const VR = 1 << 4;
        /// Views that never receive screen-space effects by default
        const OFFSCREEN_CAPTURES = Self::PREVIEW.bits() | Self::REFLECTION.bits();
    }
}

impl ViewKind {
    pub fn flag(self) -> ViewKinds {
        match self {
            ViewKind::Game => ViewKinds::GAME,
            ViewKind::SceneView => ViewKinds::SCENE_VIEW,
            ViewKind::Preview => ViewKinds::PREVIEW,
            ViewKind::Reflection => ViewKinds::REFLECTION,
            ViewKind::Vr => ViewKinds::VR,
        }
    }
}

/// Current frame's color target and camera information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewDescriptor {
    pub width: u32,
    pub height: u32,
    /// Format of the camera color target
    pub format: wgpu::TextureFormat,
    pub kind: ViewKind,
    /// Per-camera post-processing toggle
    pub post_processing: bool,
}

impl ViewDescriptor {
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            format,
            kind: ViewKind::Game,
            post_processing: true,
        }
    }

    pub fn with_kind(mut self, kind: ViewKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_post_processing(mut self, enabled: bool) -> Self {
        self.post_processing = enabled;
        self
    }

    /// Descriptor for a color-only texture matching this view
    pub fn color_target(&self) -> TextureDesc {
        TextureDesc {
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}
