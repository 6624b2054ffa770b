//! Test doubles for running passes without a GPU

use crate::backend::{BlitOp, FrameBackend, ProgramHandle, ShaderProvider};
use crate::graph::ResourceHandle;
use crate::resources::TextureDesc;
use crate::{Error, Result};
use std::collections::HashMap;

/// Everything a [`RecordingBackend`] was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Create {
        handle: ResourceHandle,
        label: String,
        desc: TextureDesc,
    },
    Release(ResourceHandle),
    Blit(BlitOp),
}

/// Backend that validates handles and records calls instead of drawing
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub events: Vec<BackendEvent>,
    live: HashMap<ResourceHandle, TextureDesc>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blits(&self) -> Vec<&BlitOp> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Blit(op) => Some(op),
                _ => None,
            })
            .collect()
    }

    pub fn creations(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BackendEvent::Create { .. }))
            .count()
    }

    pub fn releases(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BackendEvent::Release(_)))
            .count()
    }

    /// Number of textures currently allocated
    pub fn live_textures(&self) -> usize {
        self.live.len()
    }

    pub fn live_desc(&self, handle: ResourceHandle) -> Option<TextureDesc> {
        self.live.get(&handle).copied()
    }

    /// Forget recorded events, keeping allocations
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn check(&self, handle: ResourceHandle, label: &str) -> Result<()> {
        if handle == ResourceHandle::CAMERA_COLOR || self.live.contains_key(&handle) {
            Ok(())
        } else {
            Err(Error::Resource(format!("'{}' uses unallocated {:?}", label, handle)))
        }
    }
}

impl FrameBackend for RecordingBackend {
    fn create_texture(&mut self, handle: ResourceHandle, label: &str, desc: &TextureDesc) -> Result<()> {
        if handle == ResourceHandle::CAMERA_COLOR || self.live.contains_key(&handle) {
            return Err(Error::Resource(format!("{:?} is already allocated", handle)));
        }
        self.live.insert(handle, *desc);
        self.events.push(BackendEvent::Create {
            handle,
            label: label.to_string(),
            desc: *desc,
        });
        Ok(())
    }

    fn release_texture(&mut self, handle: ResourceHandle) {
        if self.live.remove(&handle).is_some() {
            self.events.push(BackendEvent::Release(handle));
        }
    }

    fn blit(&mut self, op: &BlitOp) -> Result<()> {
        self.check(op.source, op.label)?;
        self.check(op.target, op.label)?;
        if op.source == op.target {
            return Err(Error::Resource(format!("'{}' reads and writes {:?}", op.label, op.source)));
        }
        self.events.push(BackendEvent::Blit(op.clone()));
        Ok(())
    }
}

/// Shader provider backed by a fixed name table
#[derive(Debug, Default, Clone)]
pub struct StaticShaders {
    programs: HashMap<String, ProgramHandle>,
    next: u32,
}

impl StaticShaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, name: &str) -> Self {
        self.insert(name);
        self
    }

    /// Make `name` available, returning its handle
    pub fn insert(&mut self, name: &str) -> ProgramHandle {
        if let Some(&handle) = self.programs.get(name) {
            return handle;
        }
        let handle = ProgramHandle(self.next);
        self.next += 1;
        self.programs.insert(name.to_string(), handle);
        handle
    }

    pub fn remove(&mut self, name: &str) {
        self.programs.remove(name);
    }
}

impl ShaderProvider for StaticShaders {
    fn program(&self, name: &str) -> Option<ProgramHandle> {
        self.programs.get(name).copied()
    }
}
