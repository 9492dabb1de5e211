use std::sync::Arc;

use crate::container::bean::{BeanDefinition, Qualifier, TypeKey};

/// A single place that requires an object: required type, required
/// qualifiers, and the owning bean when the point sits inside another
/// bean's construction (none for root lookups).
#[derive(Debug, Clone)]
pub struct InjectionPoint {
    pub required_type: TypeKey,
    pub qualifiers: Vec<Qualifier>,
    pub owner: Option<Arc<BeanDefinition>>,
    /// Statically injected dependents are not attached to the owner chain
    pub static_injection: bool,
}

impl InjectionPoint {
    /// Create an injection point for a required type
    pub fn new(required_type: TypeKey) -> Self {
        Self {
            required_type,
            qualifiers: Vec::new(),
            owner: None,
            static_injection: false,
        }
    }

    /// Create an injection point for a required type `T`
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    /// Add a required qualifier
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    /// Set the owning bean
    pub fn with_owner(mut self, owner: Arc<BeanDefinition>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Mark the point as statically injected
    pub fn statically_injected(mut self) -> Self {
        self.static_injection = true;
        self
    }
}
