//! Render graph with automatic dependency resolution
//!
//! The graph is re-recorded every frame. Passes declare which resources they
//! read and write; build orders them so every reader runs after the writer
//! that preceded it in recording order, and every writer runs after the
//! readers of the previous contents. Transient textures are allocated right
//! before their first use and released right after their last.

mod pass;
mod resource;

pub use pass::{PassContext, RenderPass};
pub use resource::{PassId, ResourceHandle};

use crate::backend::FrameBackend;
use crate::resources::TextureDesc;
use crate::{Error, Result};
use std::collections::{HashMap, VecDeque};

/// Render graph for automatic pass ordering and resource management
pub struct RenderGraph {
    passes: Vec<PassNode>,
    execution_order: Vec<usize>,
    transient_resources: HashMap<ResourceHandle, TransientResource>,
}

struct PassNode {
    pass: Box<dyn RenderPass>,
    reads: Vec<ResourceHandle>,
    writes: Vec<ResourceHandle>,
    creates: Vec<ResourceHandle>,
}

struct TransientResource {
    label: &'static str,
    desc: TextureDesc,
    first_use: usize, // First pass (execution index) that uses this resource
    last_use: usize,  // Last pass (execution index) that uses this resource
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            execution_order: Vec::new(),
            transient_resources: HashMap::new(),
        }
    }

    /// Drop every pass and transient declaration, ready for the next frame
    pub fn clear(&mut self) {
        self.passes.clear();
        self.execution_order.clear();
        self.transient_resources.clear();
    }

    /// Add a pass to the graph
    pub fn add_pass(&mut self, pass: impl RenderPass + 'static) -> PassId {
        let id = PassId(self.passes.len());

        // Get resource declarations from the pass
        let mut builder = PassResourceBuilder::new();
        pass.declare_resources(&mut builder);

        let node = PassNode {
            pass: Box::new(pass),
            reads: builder.reads,
            writes: builder.writes,
            creates: builder.creates,
        };

        self.passes.push(node);
        id
    }

    /// Declare a transient texture the graph allocates on demand
    pub fn declare_transient(&mut self, handle: ResourceHandle, label: &'static str, desc: TextureDesc) {
        self.transient_resources.insert(
            handle,
            TransientResource {
                label,
                desc,
                first_use: usize::MAX,
                last_use: 0,
            },
        );
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Pass names in execution order (valid after `build`)
    pub fn execution_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.execution_order
            .iter()
            .map(move |&i| self.passes[i].pass.name())
    }

    /// Build the graph - resolve dependencies and determine execution order
    pub fn build(&mut self) -> Result<()> {
        log::trace!("Building render graph with {} passes", self.passes.len());

        let n = self.passes.len();
        let mut in_degree = vec![0usize; n];
        let mut adj_list: Vec<Vec<usize>> = vec![Vec::new(); n];

        // Walk passes in recording order tracking the current version of
        // each resource: who last wrote it and who has read it since.
        let mut last_writer: HashMap<ResourceHandle, usize> = HashMap::new();
        let mut readers_since_write: HashMap<ResourceHandle, Vec<usize>> = HashMap::new();

        for (i, pass) in self.passes.iter().enumerate() {
            for &resource in &pass.reads {
                if let Some(&writer) = last_writer.get(&resource) {
                    add_edge(&mut adj_list, &mut in_degree, writer, i);
                }
                readers_since_write.entry(resource).or_default().push(i);
            }

            for &resource in pass.writes.iter().chain(&pass.creates) {
                if let Some(&writer) = last_writer.get(&resource) {
                    add_edge(&mut adj_list, &mut in_degree, writer, i);
                }
                if let Some(readers) = readers_since_write.remove(&resource) {
                    for reader in readers {
                        add_edge(&mut adj_list, &mut in_degree, reader, i);
                    }
                }
                last_writer.insert(resource, i);
            }
        }

        // Topological sort (Kahn's algorithm, FIFO to preserve insertion order)
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop_front() {
            order.push(node);

            for &neighbor in &adj_list[node] {
                in_degree[neighbor] -= 1;
                if in_degree[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        if order.len() != n {
            return Err(Error::Graph(
                "Cyclic dependency detected in render graph".to_string(),
            ));
        }

        self.execution_order = order;

        for (i, &pass_idx) in self.execution_order.iter().enumerate() {
            log::trace!("  Pass {}: {}", i, self.passes[pass_idx].pass.name());
        }

        self.compute_resource_lifetimes();
        Ok(())
    }

    /// Compute lifetimes for transient resources
    fn compute_resource_lifetimes(&mut self) {
        for resource in self.transient_resources.values_mut() {
            resource.first_use = usize::MAX;
            resource.last_use = 0;
        }

        for (exec_idx, &pass_idx) in self.execution_order.iter().enumerate() {
            let pass = &self.passes[pass_idx];

            for res in pass.reads.iter().chain(&pass.writes).chain(&pass.creates) {
                if let Some(resource) = self.transient_resources.get_mut(res) {
                    resource.first_use = resource.first_use.min(exec_idx);
                    resource.last_use = resource.last_use.max(exec_idx);
                }
            }
        }
    }

    /// Execute the render graph
    pub fn execute(&mut self, ctx: &mut GraphContext) -> Result<()> {
        log::trace!("Executing render graph (frame {})", ctx.frame);

        let mut live: Vec<ResourceHandle> = Vec::new();

        for exec_idx in 0..self.execution_order.len() {
            let pass_idx = self.execution_order[exec_idx];

            let result = self
                .allocate_transient_resources(exec_idx, ctx.backend, &mut live)
                .and_then(|_| {
                    log::trace!("  Executing pass: {}", self.passes[pass_idx].pass.name());
                    let mut pass_ctx = PassContext {
                        backend: &mut *ctx.backend,
                        frame: ctx.frame,
                    };
                    self.passes[pass_idx].pass.execute(&mut pass_ctx)
                });

            if let Err(err) = result {
                for handle in live.drain(..) {
                    ctx.backend.release_texture(handle);
                }
                return Err(err);
            }

            self.release_transient_resources(exec_idx, ctx.backend, &mut live);
        }

        Ok(())
    }

    fn allocate_transient_resources(
        &self,
        exec_idx: usize,
        backend: &mut dyn FrameBackend,
        live: &mut Vec<ResourceHandle>,
    ) -> Result<()> {
        for (&handle, resource) in &self.transient_resources {
            if resource.first_use == exec_idx {
                log::trace!("    Allocating transient resource '{}'", resource.label);
                backend.create_texture(handle, resource.label, &resource.desc)?;
                live.push(handle);
            }
        }
        Ok(())
    }

    fn release_transient_resources(
        &self,
        exec_idx: usize,
        backend: &mut dyn FrameBackend,
        live: &mut Vec<ResourceHandle>,
    ) {
        for (&handle, resource) in &self.transient_resources {
            if resource.last_use == exec_idx && resource.first_use != usize::MAX {
                log::trace!("    Releasing transient resource '{}'", resource.label);
                backend.release_texture(handle);
                live.retain(|&h| h != handle);
            }
        }
    }
}

fn add_edge(adj_list: &mut [Vec<usize>], in_degree: &mut [usize], from: usize, to: usize) {
    if from != to && !adj_list[from].contains(&to) {
        adj_list[from].push(to);
        in_degree[to] += 1;
    }
}

/// Context for graph execution
pub struct GraphContext<'a> {
    pub backend: &'a mut dyn FrameBackend,
    pub frame: u64,
}

/// Builder for declaring pass resource dependencies
pub struct PassResourceBuilder {
    reads: Vec<ResourceHandle>,
    writes: Vec<ResourceHandle>,
    creates: Vec<ResourceHandle>,
}

impl PassResourceBuilder {
    fn new() -> Self {
        Self {
            reads: Vec::new(),
            writes: Vec::new(),
            creates: Vec::new(),
        }
    }

    /// Declare that this pass reads a resource
    pub fn read(&mut self, resource: ResourceHandle) -> &mut Self {
        self.reads.push(resource);
        self
    }

    /// Declare that this pass writes to a resource
    pub fn write(&mut self, resource: ResourceHandle) -> &mut Self {
        self.writes.push(resource);
        self
    }

    /// Declare that this pass creates a transient resource
    pub fn create(&mut self, resource: ResourceHandle) -> &mut Self {
        self.creates.push(resource);
        self
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BackendEvent, RecordingBackend};
    use std::sync::{Arc, Mutex};

    /// Logs its name on execution and declares fixed reads/writes
    struct Probe {
        name: &'static str,
        reads: Vec<ResourceHandle>,
        writes: Vec<ResourceHandle>,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Probe {
        fn new(
            name: &'static str,
            reads: &[ResourceHandle],
            writes: &[ResourceHandle],
            log: &Arc<Mutex<Vec<&'static str>>>,
        ) -> Self {
            Self {
                name,
                reads: reads.to_vec(),
                writes: writes.to_vec(),
                log: log.clone(),
                fail: false,
            }
        }
    }

    impl RenderPass for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn declare_resources(&self, builder: &mut PassResourceBuilder) {
            for &r in &self.reads {
                builder.read(r);
            }
            for &w in &self.writes {
                builder.write(w);
            }
        }

        fn execute(&mut self, _ctx: &mut PassContext) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(Error::Resource(format!("{} failed", self.name)));
            }
            Ok(())
        }
    }

    fn scratch_desc() -> TextureDesc {
        TextureDesc {
            width: 320,
            height: 180,
            format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    #[test]
    fn read_modify_write_of_camera_color_keeps_recording_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let color = ResourceHandle::CAMERA_COLOR;
        let scratch = ResourceHandle::new();

        let mut graph = RenderGraph::new();
        graph.add_pass(Probe::new("horizontal", &[color], &[scratch], &log));
        graph.add_pass(Probe::new("vertical", &[scratch], &[color], &log));
        graph.build().unwrap();

        let order: Vec<&str> = graph.execution_order().collect();
        assert_eq!(order, ["horizontal", "vertical"]);
    }

    #[test]
    fn consumer_recorded_first_still_runs_after_its_producer() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = ResourceHandle::new();
        let b = ResourceHandle::new();

        let mut graph = RenderGraph::new();
        // Independent pass first, then a producer/consumer chain
        graph.add_pass(Probe::new("independent", &[], &[b], &log));
        graph.add_pass(Probe::new("producer", &[], &[a], &log));
        graph.add_pass(Probe::new("consumer", &[a], &[], &log));
        graph.build().unwrap();

        let order: Vec<&str> = graph.execution_order().collect();
        let producer = order.iter().position(|&n| n == "producer").unwrap();
        let consumer = order.iter().position(|&n| n == "consumer").unwrap();
        assert!(producer < consumer);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn writer_waits_for_readers_of_previous_contents() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let color = ResourceHandle::CAMERA_COLOR;
        let a = ResourceHandle::new();
        let b = ResourceHandle::new();

        let mut graph = RenderGraph::new();
        graph.add_pass(Probe::new("sample_a", &[color], &[a], &log));
        graph.add_pass(Probe::new("sample_b", &[color], &[b], &log));
        graph.add_pass(Probe::new("overwrite", &[a, b], &[color], &log));
        graph.build().unwrap();

        let order: Vec<&str> = graph.execution_order().collect();
        assert_eq!(order.last(), Some(&"overwrite"));
    }

    #[test]
    fn execute_runs_passes_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let color = ResourceHandle::CAMERA_COLOR;
        let scratch = ResourceHandle::new();

        let mut graph = RenderGraph::new();
        graph.add_pass(Probe::new("first", &[color], &[scratch], &log));
        graph.add_pass(Probe::new("second", &[scratch], &[color], &log));
        graph.build().unwrap();

        let mut backend = RecordingBackend::new();
        graph
            .execute(&mut GraphContext { backend: &mut backend, frame: 7 })
            .unwrap();

        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
    }

    #[test]
    fn transients_live_from_first_to_last_use() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let color = ResourceHandle::CAMERA_COLOR;
        let scratch = ResourceHandle::new();

        let mut graph = RenderGraph::new();
        graph.declare_transient(scratch, "_Scratch", scratch_desc());
        graph.add_pass(Probe::new("before", &[color], &[color], &log));
        graph.add_pass(Probe::new("into", &[color], &[scratch], &log));
        graph.add_pass(Probe::new("out", &[scratch], &[color], &log));
        graph.add_pass(Probe::new("after", &[color], &[color], &log));
        graph.build().unwrap();

        let mut backend = RecordingBackend::new();
        graph
            .execute(&mut GraphContext { backend: &mut backend, frame: 0 })
            .unwrap();

        assert_eq!(
            backend.events,
            [
                BackendEvent::Create {
                    handle: scratch,
                    label: "_Scratch".to_string(),
                    desc: scratch_desc(),
                },
                BackendEvent::Release(scratch),
            ]
        );
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn unused_transients_are_never_allocated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = RenderGraph::new();
        graph.declare_transient(ResourceHandle::new(), "_Unused", scratch_desc());
        graph.add_pass(Probe::new("only", &[], &[ResourceHandle::CAMERA_COLOR], &log));
        graph.build().unwrap();

        let mut backend = RecordingBackend::new();
        graph
            .execute(&mut GraphContext { backend: &mut backend, frame: 0 })
            .unwrap();
        assert!(backend.events.is_empty());
    }

    #[test]
    fn failing_pass_releases_live_transients() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let color = ResourceHandle::CAMERA_COLOR;
        let scratch = ResourceHandle::new();

        let mut graph = RenderGraph::new();
        graph.declare_transient(scratch, "_Scratch", scratch_desc());
        let mut failing = Probe::new("into", &[color], &[scratch], &log);
        failing.fail = true;
        graph.add_pass(failing);
        graph.add_pass(Probe::new("out", &[scratch], &[color], &log));
        graph.build().unwrap();

        let mut backend = RecordingBackend::new();
        let result = graph.execute(&mut GraphContext { backend: &mut backend, frame: 0 });

        assert!(result.is_err());
        assert_eq!(*log.lock().unwrap(), ["into"]);
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn clear_resets_the_graph() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = RenderGraph::new();
        graph.add_pass(Probe::new("only", &[], &[], &log));
        graph.build().unwrap();
        graph.clear();

        assert_eq!(graph.pass_count(), 0);
        assert_eq!(graph.execution_order().count(), 0);
    }
}
