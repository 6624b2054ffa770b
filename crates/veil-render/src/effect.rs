//! Effect passes and the two ways of running them
//!
//! An [`EffectPass`] describes its frame once, in [`EffectPass::plan`], as an
//! ordered list of blits from a source to an intermediate texture and back.
//! [`execute_immediate`] runs that plan straight against a backend using the
//! pass's persistent offscreen target; [`record_graph`] turns the same plan
//! into render graph nodes with a transient intermediate texture.

use crate::backend::{BlitOp, FrameBackend, ShaderProvider};
use crate::graph::{PassContext, PassResourceBuilder, RenderGraph, RenderPass, ResourceHandle};
use crate::params::ParameterStack;
use crate::resources::OffscreenTarget;
use crate::view::ViewDescriptor;
use crate::{Error, Result};
use std::collections::HashSet;

/// Point in the frame where a pass is injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PassEvent {
    BeforePostProcessing,
    AfterPostProcessing,
    AfterRendering,
}

/// Everything a pass may read for the current frame
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    pub frame: u64,
    pub params: &'a ParameterStack,
    pub view: &'a ViewDescriptor,
    pub shaders: &'a dyn ShaderProvider,
    /// Global and per-camera post-processing toggles combined
    pub post_processing: bool,
}

/// A screen-space effect working through one offscreen target
pub trait EffectPass: Send + Sync {
    fn name(&self) -> &str;

    fn event(&self) -> PassEvent {
        PassEvent::AfterPostProcessing
    }

    fn offscreen(&self) -> &OffscreenTarget;

    fn offscreen_mut(&mut self) -> &mut OffscreenTarget;

    /// The frame's work as ordered blits between `source` and `scratch`
    fn plan(&self, frame: &FrameContext, source: ResourceHandle, scratch: ResourceHandle) -> Vec<BlitOp>;

    /// Bring the persistent offscreen target in line with the view
    fn setup(&mut self, view: &ViewDescriptor, backend: &mut dyn FrameBackend) -> Result<()> {
        self.offscreen_mut()
            .reallocate_if_needed(view.color_target(), backend)
            .map(|_| ())
    }

    /// Free GPU resources owned by the pass
    fn release(&mut self, backend: &mut dyn FrameBackend) {
        self.offscreen_mut().release(backend);
    }
}

/// Run a pass directly against the backend
///
/// Returns the number of blits issued. A blit whose source has not been
/// written earlier in the same plan is refused.
pub fn execute_immediate(
    pass: &mut dyn EffectPass,
    frame: &FrameContext,
    backend: &mut dyn FrameBackend,
) -> Result<usize> {
    pass.setup(frame.view, backend)?;

    let scratch = pass.offscreen().handle();
    let ops = pass.plan(frame, ResourceHandle::CAMERA_COLOR, scratch);

    let mut ready: HashSet<ResourceHandle> = HashSet::from([ResourceHandle::CAMERA_COLOR]);
    for op in &ops {
        if !ready.contains(&op.source) {
            return Err(Error::Resource(format!(
                "'{}' reads {:?} before it was written this frame",
                op.label, op.source
            )));
        }
        log::trace!("  {} ({:?} -> {:?})", op.label, op.source, op.target);
        backend.blit(op)?;
        ready.insert(op.target);
    }

    Ok(ops.len())
}

/// Record a pass into the render graph
///
/// The intermediate texture is declared transient so the graph allocates it
/// for exactly the span of nodes that use it. Returns the number of nodes.
pub fn record_graph(pass: &dyn EffectPass, frame: &FrameContext, graph: &mut RenderGraph) -> usize {
    let target = pass.offscreen();
    let scratch = target.transient_handle();
    graph.declare_transient(scratch, target.label(), frame.view.color_target());

    let ops = pass.plan(frame, ResourceHandle::CAMERA_COLOR, scratch);
    let count = ops.len();
    for op in ops {
        graph.add_pass(BlitNode::new(op));
    }
    count
}

/// Graph node wrapping a single blit
pub struct BlitNode {
    op: BlitOp,
}

impl BlitNode {
    pub fn new(op: BlitOp) -> Self {
        Self { op }
    }

    pub fn op(&self) -> &BlitOp {
        &self.op
    }
}

impl RenderPass for BlitNode {
    fn name(&self) -> &str {
        self.op.label
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.read(self.op.source).write(self.op.target);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        ctx.backend.blit(&self.op)
    }
}
