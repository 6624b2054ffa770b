//! Context types for features

use crate::backend::{ProgramHandle, ShaderProvider};

/// Context provided to features when the stack is created
pub struct FeatureContext<'a> {
    pub shaders: &'a dyn ShaderProvider,
}

impl<'a> FeatureContext<'a> {
    pub fn new(shaders: &'a dyn ShaderProvider) -> Self {
        Self { shaders }
    }
}

/// A named program a feature depends on, resolved lazily
#[derive(Debug, Clone)]
pub struct ProgramSlot {
    name: &'static str,
    handle: Option<ProgramHandle>,
}

impl ProgramSlot {
    pub fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }

    /// Forget any cached handle and look the program up again
    pub fn refresh(&mut self, shaders: &dyn ShaderProvider) -> Option<ProgramHandle> {
        self.handle = shaders.program(self.name);
        self.handle
    }

    /// Cached handle, or a fresh lookup if the program was missing so far
    pub fn validate(&mut self, shaders: &dyn ShaderProvider) -> Option<ProgramHandle> {
        if self.handle.is_none() {
            self.handle = shaders.program(self.name);
        }
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticShaders;

    #[test]
    fn validate_retries_until_the_program_loads() {
        let mut shaders = StaticShaders::new();
        let mut slot = ProgramSlot::new("veil/test");

        assert_eq!(slot.refresh(&shaders), None);
        assert_eq!(slot.validate(&shaders), None);

        let handle = shaders.insert("veil/test");
        assert_eq!(slot.validate(&shaders), Some(handle));
        assert_eq!(slot.handle(), Some(handle));
    }

    #[test]
    fn validate_keeps_cached_handle() {
        let mut shaders = StaticShaders::new().with_program("veil/test");
        let mut slot = ProgramSlot::new("veil/test");
        let handle = slot.refresh(&shaders);

        shaders.remove("veil/test");
        assert_eq!(slot.validate(&shaders), handle);
        assert_eq!(slot.refresh(&shaders), None);
    }
}
