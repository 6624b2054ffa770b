//! Activation gate shared by every effect
//!
//! Evaluated from scratch each frame. There is no hysteresis: a single
//! frame with non-zero progress activates the effect for exactly that frame.

use crate::view::{ViewKind, ViewKinds};
use std::fmt;

/// Why a feature's passes were not scheduled this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The feature was switched off
    FeatureDisabled,
    /// Post-processing is off globally or for this camera
    PostProcessingDisabled,
    /// No parameter component for the effect in the snapshot
    NoParameters,
    /// Progress is zero
    ZeroProgress,
    /// Preview/reflection style views are excluded
    InvalidViewKind(ViewKind),
    /// The shading program has not loaded
    ResourceUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FeatureDisabled => write!(f, "feature disabled"),
            SkipReason::PostProcessingDisabled => write!(f, "post-processing disabled"),
            SkipReason::NoParameters => write!(f, "no parameters in stack"),
            SkipReason::ZeroProgress => write!(f, "progress is zero"),
            SkipReason::InvalidViewKind(kind) => write!(f, "excluded view kind {:?}", kind),
            SkipReason::ResourceUnavailable => write!(f, "shading program unavailable"),
        }
    }
}

/// Outcome of the gate for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Active,
    Inactive(SkipReason),
}

impl Activation {
    pub fn is_active(&self) -> bool {
        matches!(self, Activation::Active)
    }
}

/// Everything the gate looks at
#[derive(Debug, Clone, Copy)]
pub struct GateInputs {
    pub feature_enabled: bool,
    pub post_processing: bool,
    /// `None` when the parameter stack has no component for the effect
    pub progress: Option<f32>,
    pub view_kind: ViewKind,
    pub excluded_views: ViewKinds,
    pub resources_ready: bool,
}

/// Decide whether the effect runs this frame
pub fn evaluate(inputs: &GateInputs) -> Activation {
    if !inputs.feature_enabled {
        return Activation::Inactive(SkipReason::FeatureDisabled);
    }
    if !inputs.post_processing {
        return Activation::Inactive(SkipReason::PostProcessingDisabled);
    }
    match inputs.progress {
        None => return Activation::Inactive(SkipReason::NoParameters),
        Some(p) if !(p > 0.0) => return Activation::Inactive(SkipReason::ZeroProgress),
        Some(_) => {}
    }
    if inputs.excluded_views.contains(inputs.view_kind.flag()) {
        return Activation::Inactive(SkipReason::InvalidViewKind(inputs.view_kind));
    }
    if !inputs.resources_ready {
        return Activation::Inactive(SkipReason::ResourceUnavailable);
    }
    Activation::Active
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> GateInputs {
        GateInputs {
            feature_enabled: true,
            post_processing: true,
            progress: Some(0.5),
            view_kind: ViewKind::Game,
            excluded_views: ViewKinds::OFFSCREEN_CAPTURES,
            resources_ready: true,
        }
    }

    #[test]
    fn active_when_everything_passes() {
        assert_eq!(evaluate(&inputs()), Activation::Active);
    }

    #[test]
    fn zero_progress_is_inactive_regardless_of_view() {
        for kind in [ViewKind::Game, ViewKind::SceneView, ViewKind::Vr, ViewKind::Preview] {
            let gate = evaluate(&GateInputs { progress: Some(0.0), view_kind: kind, ..inputs() });
            assert_eq!(gate, Activation::Inactive(SkipReason::ZeroProgress));
        }
    }

    #[test]
    fn nan_progress_is_inactive() {
        let gate = evaluate(&GateInputs { progress: Some(f32::NAN), ..inputs() });
        assert!(!gate.is_active());
    }

    #[test]
    fn preview_and_reflection_are_excluded_at_any_progress() {
        for progress in [0.01, 0.5, 1.0] {
            for kind in [ViewKind::Preview, ViewKind::Reflection] {
                let gate = evaluate(&GateInputs { progress: Some(progress), view_kind: kind, ..inputs() });
                assert_eq!(gate, Activation::Inactive(SkipReason::InvalidViewKind(kind)));
            }
        }
    }

    #[test]
    fn excluded_views_are_configurable() {
        let gate = evaluate(&GateInputs {
            view_kind: ViewKind::SceneView,
            excluded_views: ViewKinds::SCENE_VIEW,
            ..inputs()
        });
        assert!(!gate.is_active());

        let gate = evaluate(&GateInputs {
            view_kind: ViewKind::Reflection,
            excluded_views: ViewKinds::empty(),
            ..inputs()
        });
        assert!(gate.is_active());
    }

    #[test]
    fn missing_resources_fail_closed() {
        let gate = evaluate(&GateInputs { resources_ready: false, ..inputs() });
        assert_eq!(gate, Activation::Inactive(SkipReason::ResourceUnavailable));
    }

    #[test]
    fn disabled_feature_and_post_processing() {
        let gate = evaluate(&GateInputs { feature_enabled: false, ..inputs() });
        assert_eq!(gate, Activation::Inactive(SkipReason::FeatureDisabled));

        let gate = evaluate(&GateInputs { post_processing: false, ..inputs() });
        assert_eq!(gate, Activation::Inactive(SkipReason::PostProcessingDisabled));
    }

    #[test]
    fn missing_parameters() {
        let gate = evaluate(&GateInputs { progress: None, ..inputs() });
        assert_eq!(gate, Activation::Inactive(SkipReason::NoParameters));
    }
}
