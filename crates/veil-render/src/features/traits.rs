//! Feature trait definition
//!
//! This is the interface every screen-space effect implements to plug into
//! a [`PostProcessStack`](crate::PostProcessStack).

use super::FeatureContext;
use crate::backend::FrameBackend;
use crate::effect::{EffectPass, FrameContext};
use crate::gate::Activation;
use crate::Result;

/// Feature trait - implemented by all screen-space effects
///
/// **Lifecycle:**
/// 1. `create()` - Called once when the stack is built; resolves programs
/// 2. `evaluate()` - Called every frame; runs the activation gate
/// 3. `pass_mut()` - Called every frame the gate is open
/// 4. `dispose()` - Called when the stack is torn down
pub trait Feature: Send + Sync + AsAny {
    /// Unique name for this feature (lowercase snake_case)
    fn name(&self) -> &str;

    /// Resolve shading programs and build passes
    ///
    /// A missing program is not an error: the feature stays inactive and
    /// retries every frame until the program shows up.
    fn create(&mut self, ctx: &FeatureContext) -> Result<()>;

    /// Decide whether the feature's pass runs this frame
    fn evaluate(&mut self, frame: &FrameContext) -> Activation;

    /// The pass to schedule once `evaluate` returned active
    fn pass_mut(&mut self) -> Option<&mut dyn EffectPass>;

    /// Release GPU resources held by the feature's passes
    fn dispose(&mut self, backend: &mut dyn FrameBackend) {
        if let Some(pass) = self.pass_mut() {
            pass.release(backend);
        }
    }

    /// Check if feature is currently enabled
    fn is_enabled(&self) -> bool {
        true
    }

    /// Enable or disable this feature
    fn set_enabled(&mut self, enabled: bool) {
        let _ = enabled;
    }
}

/// Helper trait for downcasting feature trait objects
pub trait AsAny {
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

impl<T: Feature + 'static> AsAny for T {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
