//! Seams between pass orchestration and the GPU
//!
//! Passes never touch wgpu directly. They produce [`BlitOp`]s and hand them
//! to a [`FrameBackend`], and they look up shading programs through a
//! [`ShaderProvider`].

use crate::graph::ResourceHandle;
use crate::resources::TextureDesc;
use crate::Result;

/// Loaded shading program
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct ProgramHandle(pub u32);

/// One pass (fragment entry point) of a shading program
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct ProgramPass {
    pub program: ProgramHandle,
    pub index: u32,
}

impl ProgramPass {
    pub fn new(program: ProgramHandle, index: u32) -> Self {
        Self { program, index }
    }
}

/// Full-screen draw that samples `source` and writes every pixel of `target`
#[derive(Debug, Clone, PartialEq)]
pub struct BlitOp {
    pub label: &'static str,
    pub source: ResourceHandle,
    pub target: ResourceHandle,
    /// `None` is a plain copy
    pub program: Option<ProgramPass>,
    /// Uniform block bytes for the program, empty for plain copies
    pub uniforms: Vec<u8>,
}

impl BlitOp {
    /// Plain texture copy
    pub fn copy(label: &'static str, source: ResourceHandle, target: ResourceHandle) -> Self {
        Self {
            label,
            source,
            target,
            program: None,
            uniforms: Vec::new(),
        }
    }

    /// Draw through a program pass with the given uniform block
    pub fn shaded<U: bytemuck::Pod>(
        label: &'static str,
        source: ResourceHandle,
        target: ResourceHandle,
        pass: ProgramPass,
        uniforms: &U,
    ) -> Self {
        Self {
            label,
            source,
            target,
            program: Some(pass),
            uniforms: bytemuck::bytes_of(uniforms).to_vec(),
        }
    }

    /// Reinterpret the uniform bytes as `U`
    pub fn uniforms_as<U: bytemuck::Pod>(&self) -> Option<U> {
        bytemuck::try_pod_read_unaligned(&self.uniforms).ok()
    }
}

/// Source of loaded shading programs
pub trait ShaderProvider {
    /// Look up a program by name; `None` if it is missing or failed to load
    fn program(&self, name: &str) -> Option<ProgramHandle>;
}

/// Texture allocation and draw submission for one frame
///
/// `ResourceHandle::CAMERA_COLOR` always refers to the frame's color target
/// and is never created or released through this trait.
pub trait FrameBackend {
    /// Allocate a color texture under `handle`
    fn create_texture(&mut self, handle: ResourceHandle, label: &str, desc: &TextureDesc) -> Result<()>;

    /// Free the texture under `handle`. Unknown handles are ignored.
    fn release_texture(&mut self, handle: ResourceHandle);

    /// Record a full-screen draw
    fn blit(&mut self, op: &BlitOp) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    struct Tint {
        rgba: [f32; 4],
    }

    #[test]
    fn shaded_blit_carries_uniform_bytes() {
        let tint = Tint { rgba: [0.1, 0.2, 0.3, 1.0] };
        let op = BlitOp::shaded(
            "tint",
            ResourceHandle::CAMERA_COLOR,
            ResourceHandle(42),
            ProgramPass::new(ProgramHandle(3), 0),
            &tint,
        );
        assert_eq!(op.uniforms.len(), 16);
        assert_eq!(op.uniforms_as::<Tint>(), Some(tint));
    }

    #[test]
    fn copy_has_no_program() {
        let op = BlitOp::copy("copy", ResourceHandle(42), ResourceHandle::CAMERA_COLOR);
        assert!(op.program.is_none());
        assert!(op.uniforms.is_empty());
        assert_eq!(op.uniforms_as::<Tint>(), None);
    }
}
