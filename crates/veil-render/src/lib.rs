//! Veil Render - frame orchestration for screen-space post-processing
//!
//! Effects plug into a frame as passes that read the camera color target,
//! work through an offscreen texture, and write the result back:
//!
//! - Effect parameters live in an explicit [`ParameterStack`] snapshot
//! - An activation gate decides, every frame, whether a feature runs
//! - Passes describe their work once as a list of blits and are executed
//!   either immediately or through the [`graph::RenderGraph`]
//! - The GPU side is reached through the [`FrameBackend`] trait; the
//!   [`gpu`] module provides the wgpu implementation

pub mod backend;
pub mod effect;
pub mod features;
pub mod gate;
pub mod gpu;
pub mod graph;
pub mod params;
pub mod resources;
pub mod view;

mod stack;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{BlitOp, FrameBackend, ProgramHandle, ProgramPass, ShaderProvider};
pub use effect::{EffectPass, FrameContext, PassEvent};
pub use gate::{Activation, SkipReason};
pub use params::{ParameterStack, VolumeComponent};
pub use resources::{OffscreenTarget, TextureDesc};
pub use stack::{FrameReport, PostProcessConfig, PostProcessStack, ScheduleMode};
pub use view::{ViewDescriptor, ViewKind, ViewKinds};

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during rendering
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Feature error: {0}")]
    Feature(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Shader error: {0}")]
    Shader(String),

    #[error("WGPU error: {0}")]
    Wgpu(String),
}

impl From<wgpu::Error> for Error {
    fn from(err: wgpu::Error) -> Self {
        Error::Wgpu(err.to_string())
    }
}
