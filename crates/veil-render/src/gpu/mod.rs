//! wgpu backend
//!
//! [`ShaderLibrary`] compiles the WGSL programs passes refer to by name, and
//! [`WgpuBackend`] turns blits into full-screen render passes.

mod frame;
mod pipeline;
mod pool;
mod shader;

pub use frame::{WgpuBackend, WgpuFrame};
pub use pipeline::{PipelineCache, PipelineKey};
pub use pool::{TextureKey, TexturePool, COLOR_TARGET_USAGE};
pub use shader::{Program, ShaderLibrary, BLIT_PROGRAM, FULLSCREEN_PRELUDE};
