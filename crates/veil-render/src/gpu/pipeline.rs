//! Blit pipeline cache keyed by program pass and target format

use crate::backend::ProgramPass;
use crate::{Error, Result};
use std::collections::HashMap;

/// Key for pipeline cache lookup
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct PipelineKey {
    pub pass: ProgramPass,
    pub format: wgpu::TextureFormat,
}

struct Cached<P> {
    generation: u32,
    pipeline: P,
}

/// Pipelines built from a program, rebuilt when the program is re-registered
///
/// Each entry remembers the program generation it was built from. A lookup
/// with a newer generation drops the stale pipeline and builds a new one.
pub struct PipelineCache<P> {
    cache: HashMap<PipelineKey, Cached<P>>,
}

impl<P> PipelineCache<P> {
    pub fn new() -> Self {
        Self { cache: HashMap::new() }
    }

    /// Get the pipeline for `key` at `generation`, building it if missing or stale
    pub fn get_or_build(
        &mut self,
        key: PipelineKey,
        generation: u32,
        build: impl FnOnce() -> Result<P>,
    ) -> Result<&P> {
        let fresh = self
            .cache
            .get(&key)
            .is_some_and(|cached| cached.generation == generation);

        if !fresh {
            if self.cache.contains_key(&key) {
                log::debug!("Program behind {:?} was re-registered, rebuilding", key);
            }
            let pipeline = build()?;
            self.cache.insert(key, Cached { generation, pipeline });
        }

        self.cache
            .get(&key)
            .map(|cached| &cached.pipeline)
            .ok_or_else(|| Error::Wgpu(format!("Pipeline {:?} missing from cache", key)))
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&P> {
        self.cache.get(key).map(|cached| &cached.pipeline)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<P> Default for PipelineCache<P> {
    fn default() -> Self {
        Self::new()
    }
}
