//! Feature system
//!
//! Features are the plug-in unit of the post-processing stack. Each one:
//!
//! 1. Resolves the shading program it needs when the stack is created
//! 2. Runs the activation gate every frame
//! 3. Hands its pass to the stack when the gate is open

mod context;
mod registry;
mod traits;

pub use context::{FeatureContext, ProgramSlot};
pub use registry::{FeatureRegistry, FeatureRegistryBuilder};
pub use traits::{AsAny, Feature};
