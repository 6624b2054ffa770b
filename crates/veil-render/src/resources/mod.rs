//! Offscreen color targets owned by passes

use crate::backend::FrameBackend;
use crate::graph::ResourceHandle;
use crate::Result;

/// Size and format of a color-only texture (no depth)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

/// Persistent intermediate texture a pass renders through
///
/// Allocated lazily on the first frame the pass runs and reallocated only
/// when the view's size or format changes. A second handle is reserved for
/// the graph path, where the texture is transient and owned by the graph.
#[derive(Debug)]
pub struct OffscreenTarget {
    label: &'static str,
    handle: ResourceHandle,
    transient: ResourceHandle,
    desc: Option<TextureDesc>,
}

impl OffscreenTarget {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            handle: ResourceHandle::new(),
            transient: ResourceHandle::new(),
            desc: None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Handle of the persistent texture
    pub fn handle(&self) -> ResourceHandle {
        self.handle
    }

    /// Handle used when the texture is declared as a graph transient
    pub fn transient_handle(&self) -> ResourceHandle {
        self.transient
    }

    pub fn desc(&self) -> Option<TextureDesc> {
        self.desc
    }

    pub fn is_allocated(&self) -> bool {
        self.desc.is_some()
    }

    /// Make sure the persistent texture matches `desc`
    ///
    /// Returns `true` when a (re)allocation happened.
    pub fn reallocate_if_needed(
        &mut self,
        desc: TextureDesc,
        backend: &mut dyn FrameBackend,
    ) -> Result<bool> {
        if self.desc == Some(desc) {
            return Ok(false);
        }

        if let Some(old) = self.desc.take() {
            log::debug!(
                "Reallocating '{}' {}x{} -> {}x{} ({:?})",
                self.label,
                old.width,
                old.height,
                desc.width,
                desc.height,
                desc.format
            );
            backend.release_texture(self.handle);
        } else {
            log::debug!(
                "Allocating '{}' {}x{} ({:?})",
                self.label,
                desc.width,
                desc.height,
                desc.format
            );
        }

        backend.create_texture(self.handle, self.label, &desc)?;
        self.desc = Some(desc);
        Ok(true)
    }

    /// Release the persistent texture, if any
    pub fn release(&mut self, backend: &mut dyn FrameBackend) {
        if self.desc.take().is_some() {
            log::debug!("Releasing '{}'", self.label);
            backend.release_texture(self.handle);
        }
    }
}
