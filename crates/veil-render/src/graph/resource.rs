//! Resource management for graph

/// Pass identifier
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct PassId(pub usize);

/// Resource handle for graph resources
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ResourceHandle(pub u64);

impl ResourceHandle {
    /// The frame's camera color target
    pub const CAMERA_COLOR: ResourceHandle = ResourceHandle(0);

    /// Create a new unique resource handle
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        // 0 is reserved for the camera color target
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ResourceHandle {
    fn default() -> Self {
        Self::new()
    }
}
