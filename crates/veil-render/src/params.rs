//! Per-frame effect parameters
//!
//! The application (or whatever blends volumes upstream) writes one
//! component per effect into a [`ParameterStack`]. Passes only ever read
//! from the snapshot they are handed for the current frame.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Parameter block for a single effect
pub trait VolumeComponent: Any + Send + Sync {
    /// Human readable name, used in logs
    fn display_name(&self) -> &str;

    /// Normalized effect progress in `[0, 1]`
    fn progress(&self) -> f32;

    /// An effect with zero progress has no visible contribution
    fn is_active(&self) -> bool {
        self.progress() > 0.0
    }
}

/// Clamp a progress value into `[0, 1]`. NaN maps to zero.
pub fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Snapshot of every effect's parameters for one frame
#[derive(Default)]
pub struct ParameterStack {
    components: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ParameterStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with<T: VolumeComponent>(mut self, component: T) -> Self {
        self.set(component);
        self
    }

    /// Insert or replace the component of type `T`
    pub fn set<T: VolumeComponent>(&mut self, component: T) {
        self.components.insert(TypeId::of::<T>(), Box::new(component));
    }

    pub fn get<T: VolumeComponent>(&self) -> Option<&T> {
        self.components
            .get(&TypeId::of::<T>())
            .and_then(|c| c.downcast_ref::<T>())
    }

    pub fn get_mut<T: VolumeComponent>(&mut self) -> Option<&mut T> {
        self.components
            .get_mut(&TypeId::of::<T>())
            .and_then(|c| c.downcast_mut::<T>())
    }

    pub fn remove<T: VolumeComponent>(&mut self) -> Option<T> {
        self.components
            .remove(&TypeId::of::<T>())
            .and_then(|c| c.downcast::<T>().ok())
            .map(|c| *c)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Dim(f32);

    impl VolumeComponent for Dim {
        fn display_name(&self) -> &str {
            "Dim"
        }

        fn progress(&self) -> f32 {
            self.0
        }
    }

    #[derive(Debug, PartialEq)]
    struct Shake(f32);

    impl VolumeComponent for Shake {
        fn display_name(&self) -> &str {
            "Shake"
        }

        fn progress(&self) -> f32 {
            self.0
        }
    }

    #[test]
    fn components_are_keyed_by_type() {
        let stack = ParameterStack::new().with(Dim(0.25)).with(Shake(1.0));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.get::<Dim>(), Some(&Dim(0.25)));
        assert_eq!(stack.get::<Shake>(), Some(&Shake(1.0)));
    }

    #[test]
    fn set_replaces_existing_component() {
        let mut stack = ParameterStack::new().with(Dim(0.25));
        stack.set(Dim(0.75));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.get::<Dim>().map(|d| d.0), Some(0.75));
    }

    #[test]
    fn get_mut_and_remove() {
        let mut stack = ParameterStack::new().with(Dim(0.1));
        stack.get_mut::<Dim>().unwrap().0 = 0.9;
        assert_eq!(stack.remove::<Dim>(), Some(Dim(0.9)));
        assert!(stack.is_empty());
        assert!(stack.get::<Dim>().is_none());
    }

    #[test]
    fn zero_progress_is_inactive() {
        assert!(!Dim(0.0).is_active());
        assert!(Dim(0.01).is_active());
    }

    #[test]
    fn clamp_progress_bounds() {
        assert_eq!(clamp_progress(-1.0), 0.0);
        assert_eq!(clamp_progress(0.4), 0.4);
        assert_eq!(clamp_progress(3.0), 1.0);
        assert_eq!(clamp_progress(f32::NAN), 0.0);
    }
}
