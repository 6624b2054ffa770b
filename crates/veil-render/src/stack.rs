//! Post-processing stack: per-frame gating and scheduling of features

use crate::backend::{FrameBackend, ShaderProvider};
use crate::effect::{self, FrameContext, PassEvent};
use crate::features::{Feature, FeatureContext, FeatureRegistry};
use crate::gate::{Activation, SkipReason};
use crate::graph::{GraphContext, RenderGraph};
use crate::params::ParameterStack;
use crate::view::ViewDescriptor;
use crate::Result;

/// How active passes are handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleMode {
    /// Run every pass straight away through its persistent offscreen target
    Immediate,
    /// Record every pass into the render graph with transient targets
    #[default]
    Graph,
}

/// Stack configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcessConfig {
    pub mode: ScheduleMode,
    /// Global post-processing toggle, combined with the per-view one
    pub post_processing: bool,
}

impl PostProcessConfig {
    pub fn with_mode(mut self, mode: ScheduleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_post_processing(mut self, enabled: bool) -> Self {
        self.post_processing = enabled;
        self
    }
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::Graph,
            post_processing: true,
        }
    }
}

/// What happened to each feature during one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    /// Features whose passes ran, in execution order
    pub executed: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    /// Features whose passes errored, with the error message
    pub failed: Vec<(String, String)>,
    /// Blits submitted to the backend
    pub blits: usize,
}

impl FrameReport {
    pub fn ran(&self, name: &str) -> bool {
        self.executed.iter().any(|n| n == name)
    }

    pub fn skip_reason(&self, name: &str) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, reason)| *reason)
    }
}

/// Owns the registered features and drives them every frame
pub struct PostProcessStack {
    config: PostProcessConfig,
    features: FeatureRegistry,
    graph: RenderGraph,
    frame: u64,
}

impl PostProcessStack {
    /// Create the stack and resolve every feature's programs
    pub fn new(
        config: PostProcessConfig,
        mut features: FeatureRegistry,
        shaders: &dyn ShaderProvider,
    ) -> Result<Self> {
        log::info!("Creating post-process stack ({:?} mode)", config.mode);
        features.create_all(&FeatureContext::new(shaders))?;
        log::info!("  {} feature(s) registered", features.len());

        Ok(Self {
            config,
            features,
            graph: RenderGraph::new(),
            frame: 0,
        })
    }

    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    pub fn set_mode(&mut self, mode: ScheduleMode) {
        if self.config.mode != mode {
            log::debug!("Switching schedule mode to {:?}", mode);
            self.config.mode = mode;
        }
    }

    pub fn set_post_processing(&mut self, enabled: bool) {
        self.config.post_processing = enabled;
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut FeatureRegistry {
        &mut self.features
    }

    /// Gate every feature and run the active ones against `backend`
    ///
    /// Errors from individual passes are logged and reported; they never
    /// abort the frame.
    pub fn render_frame(
        &mut self,
        params: &ParameterStack,
        view: &ViewDescriptor,
        shaders: &dyn ShaderProvider,
        backend: &mut dyn FrameBackend,
    ) -> FrameReport {
        let frame = FrameContext {
            frame: self.frame,
            params,
            view,
            shaders,
            post_processing: self.config.post_processing && view.post_processing,
        };
        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };
        self.frame += 1;

        // The graph owns the intermediate textures in this mode, including
        // for features gated off this frame
        if self.config.mode == ScheduleMode::Graph {
            for feature in self.features.iter_mut() {
                if let Some(pass) = feature.pass_mut() {
                    if pass.offscreen().is_allocated() {
                        pass.release(backend);
                    }
                }
            }
        }

        let mut active: Vec<(PassEvent, &mut Box<dyn Feature>)> = Vec::new();
        for feature in self.features.iter_mut() {
            match feature.evaluate(&frame) {
                Activation::Active => match feature.pass_mut().map(|pass| pass.event()) {
                    Some(event) => active.push((event, feature)),
                    None => report
                        .skipped
                        .push((feature.name().to_string(), SkipReason::ResourceUnavailable)),
                },
                Activation::Inactive(reason) => {
                    log::trace!("Skipping '{}': {}", feature.name(), reason);
                    report.skipped.push((feature.name().to_string(), reason));
                }
            }
        }

        // Stable: registration order is kept within one injection point
        active.sort_by_key(|(event, _)| *event);

        match self.config.mode {
            ScheduleMode::Immediate => {
                for (_, feature) in active {
                    let name = feature.name().to_string();
                    let Some(pass) = feature.pass_mut() else { continue };
                    match effect::execute_immediate(pass, &frame, backend) {
                        Ok(blits) => {
                            report.blits += blits;
                            report.executed.push(name);
                        }
                        Err(e) => {
                            log::warn!("Pass '{}' failed: {}", name, e);
                            report.failed.push((name, e.to_string()));
                        }
                    }
                }
            }
            ScheduleMode::Graph => {
                self.graph.clear();
                let mut recorded = Vec::new();
                let mut blits = 0;
                for (_, feature) in active {
                    let name = feature.name().to_string();
                    let Some(pass) = feature.pass_mut() else { continue };
                    blits += effect::record_graph(pass, &frame, &mut self.graph);
                    recorded.push(name);
                }

                if !recorded.is_empty() {
                    let result = self.graph.build().and_then(|()| {
                        self.graph.execute(&mut GraphContext {
                            backend: &mut *backend,
                            frame: report.frame,
                        })
                    });
                    match result {
                        Ok(()) => {
                            report.blits += blits;
                            report.executed = recorded;
                        }
                        Err(e) => {
                            log::warn!("Post-process graph failed: {}", e);
                            report.failed = recorded
                                .into_iter()
                                .map(|name| (name, e.to_string()))
                                .collect();
                        }
                    }
                }
            }
        }

        report
    }

    /// Release every GPU resource held by the features
    pub fn dispose(&mut self, backend: &mut dyn FrameBackend) {
        log::debug!("Disposing post-process stack");
        self.graph.clear();
        self.features.dispose_all(backend);
    }
}
