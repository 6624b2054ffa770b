//! Feature registry for managing features

use super::{Feature, FeatureContext};
use crate::backend::FrameBackend;
use crate::{Error, Result};

/// Registry for managing features
///
/// Features keep their registration order, which is also the order their
/// passes run in when several share an injection point.
pub struct FeatureRegistry {
    features: Vec<Box<dyn Feature>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Create a builder for fluent API
    pub fn builder() -> FeatureRegistryBuilder {
        FeatureRegistryBuilder::new()
    }

    /// Register a feature; only one feature per name is allowed
    pub fn register(&mut self, feature: Box<dyn Feature>) -> Result<()> {
        if self.contains(feature.name()) {
            return Err(Error::Feature(format!(
                "Feature '{}' is already registered",
                feature.name()
            )));
        }
        self.features.push(feature);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.name() == name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Enable a feature
    pub fn enable(&mut self, name: &str) -> Result<()> {
        self.find_mut(name)?.set_enabled(true);
        Ok(())
    }

    /// Disable a feature
    pub fn disable(&mut self, name: &str) -> Result<()> {
        self.find_mut(name)?.set_enabled(false);
        Ok(())
    }

    /// Initialize all features by calling `create()` on each
    pub fn create_all(&mut self, ctx: &FeatureContext) -> Result<()> {
        for feature in &mut self.features {
            log::info!("Creating feature '{}'", feature.name());
            feature.create(ctx)?;
        }
        Ok(())
    }

    /// Release every feature's GPU resources
    pub fn dispose_all(&mut self, backend: &mut dyn FrameBackend) {
        for feature in &mut self.features {
            feature.dispose(backend);
        }
    }

    /// Get a feature by name
    pub fn get(&self, name: &str) -> Option<&dyn Feature> {
        self.features
            .iter()
            .find(|f| f.name() == name)
            .map(|f| &**f)
    }

    /// Get a reference to a specific feature by type
    pub fn get_typed<T: Feature + 'static>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(|f| f.as_any().downcast_ref::<T>())
    }

    /// Get a mutable reference to a specific feature by type
    pub fn get_typed_mut<T: Feature + 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.features
            .iter_mut()
            .find(|f| f.name() == name)
            .and_then(|f| f.as_any_mut().downcast_mut::<T>())
    }

    /// Iterate over all features mutably, in registration order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Feature>> {
        self.features.iter_mut()
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut Box<dyn Feature>> {
        self.features
            .iter_mut()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::Feature(format!("Feature '{}' not found", name)))
    }
}

/// Builder for FeatureRegistry
pub struct FeatureRegistryBuilder {
    features: Vec<Box<dyn Feature>>,
}

impl FeatureRegistryBuilder {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Add a feature to the registry
    pub fn with_feature(mut self, feature: impl Feature + 'static) -> Self {
        self.features.push(Box::new(feature));
        self
    }

    /// Build the registry, rejecting duplicate names
    pub fn build(self) -> Result<FeatureRegistry> {
        let mut registry = FeatureRegistry::new();

        for feature in self.features {
            registry.register(feature)?;
        }

        Ok(registry)
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for FeatureRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
