use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::container::bean::{BeanDefinition, BeanKind};
use crate::container::interceptor::{DecoratorDefinition, InterceptorDefinition};
use crate::errors::DiError;

/// Registry for the deployment's bean, interceptor and decorator sets.
///
/// The bean set is append-only: additions happen during a bootstrap phase
/// while readers may already be iterating, so reads take a snapshot
/// instead of holding a lock across iteration. Passivation-id
/// registration is an atomic check-and-insert.
#[derive(Debug)]
pub struct BeanRegistry {
    beans: RwLock<Vec<Arc<BeanDefinition>>>,
    passivation: RwLock<HashMap<String, Arc<BeanDefinition>>>,
    interceptors: RwLock<Vec<Arc<InterceptorDefinition>>>,
    decorators: RwLock<Vec<Arc<DecoratorDefinition>>>,
}

impl BeanRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            beans: RwLock::new(Vec::new()),
            passivation: RwLock::new(HashMap::new()),
            interceptors: RwLock::new(Vec::new()),
            decorators: RwLock::new(Vec::new()),
        }
    }

    /// Add a bean to the deployment set.
    ///
    /// Fails with `DuplicatePassivationId` if the bean declares a
    /// passivation id that is already present; the id index is updated
    /// atomically so concurrent registration cannot slip two beans in
    /// under the same id.
    pub fn register(&self, bean: Arc<BeanDefinition>) -> Result<(), DiError> {
        if let Some(id) = &bean.passivation_id {
            let mut passivation = self
                .passivation
                .write()
                .map_err(|_| DiError::lock("passivation_index"))?;

            if passivation.contains_key(id) {
                return Err(DiError::DuplicatePassivationId {
                    id: id.clone(),
                    bean: bean.label(),
                });
            }
            passivation.insert(id.clone(), bean.clone());
        }

        let mut beans = self
            .beans
            .write()
            .map_err(|_| DiError::lock("bean_registry"))?;
        tracing::debug!("Registered bean {} ({:?})", bean.label(), bean.kind);
        beans.push(bean);
        Ok(())
    }

    /// Get a snapshot of the full deployment set
    pub fn all_beans(&self) -> Vec<Arc<BeanDefinition>> {
        self.beans
            .read()
            .map(|beans| beans.clone())
            .unwrap_or_default()
    }

    /// O(1) lookup of a bean by its passivation id, used to rehydrate
    /// bean identity after deserialization
    pub fn by_passivation_id(&self, id: &str) -> Option<Arc<BeanDefinition>> {
        self.passivation.read().ok()?.get(id).cloned()
    }

    /// Get the number of registered beans
    pub fn bean_count(&self) -> usize {
        self.beans.read().map(|beans| beans.len()).unwrap_or(0)
    }

    /// Register an interceptor
    pub fn add_interceptor(&self, interceptor: Arc<InterceptorDefinition>) -> Result<(), DiError> {
        let mut interceptors = self
            .interceptors
            .write()
            .map_err(|_| DiError::lock("interceptor_registry"))?;
        interceptors.push(interceptor);
        Ok(())
    }

    /// Get a snapshot of the registered interceptors, in registration order
    pub fn interceptors(&self) -> Vec<Arc<InterceptorDefinition>> {
        self.interceptors
            .read()
            .map(|i| i.clone())
            .unwrap_or_default()
    }

    /// Register a decorator
    pub fn add_decorator(&self, decorator: Arc<DecoratorDefinition>) -> Result<(), DiError> {
        let mut decorators = self
            .decorators
            .write()
            .map_err(|_| DiError::lock("decorator_registry"))?;
        decorators.push(decorator);
        Ok(())
    }

    /// Get a snapshot of the registered decorators, in registration order
    pub fn decorators(&self) -> Vec<Arc<DecoratorDefinition>> {
        self.decorators
            .read()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Count beans of a given kind, for diagnostics
    pub fn count_kind(&self, kind: BeanKind) -> usize {
        self.all_beans().iter().filter(|b| b.kind == kind).count()
    }
}

impl Default for BeanRegistry {
    fn default() -> Self {
        Self::new()
    }
}
