//! Render pass trait and execution context

use super::PassResourceBuilder;
use crate::backend::FrameBackend;
use crate::Result;

/// Render pass trait - implemented by all graph nodes
pub trait RenderPass: Send + Sync {
    /// Name for this pass, used in logs
    fn name(&self) -> &str;

    /// Declare resource dependencies
    ///
    /// Called when the pass is added to the graph. Passes declare which
    /// resources they read, write, or create.
    fn declare_resources(&self, _builder: &mut PassResourceBuilder) {
        // Default: no resource dependencies
    }

    /// Execute the pass
    fn execute(&mut self, ctx: &mut PassContext) -> Result<()>;
}

/// Context for pass execution
pub struct PassContext<'a> {
    /// Backend receiving draws for this frame
    pub backend: &'a mut dyn FrameBackend,
    pub frame: u64,
}
