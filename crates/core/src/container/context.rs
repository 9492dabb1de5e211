use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::container::bean::{BeanDefinition, BeanId, Instance};
use crate::container::creational::CreationalContextHandle;
use crate::container::manager::BeanManager;
use crate::container::scope::Scope;
use crate::errors::DiError;

/// A per-scope instance store.
///
/// Activation and deactivation are driven by the environment; the engine
/// only ever consults the single active context for a scope.
pub trait Context: Send + Sync + std::fmt::Debug {
    /// The scope this context caches instances for
    fn scope(&self) -> &Scope;

    /// Whether the context is currently active
    fn is_active(&self) -> bool;

    /// Activate or deactivate the context
    fn set_active(&self, active: bool);

    /// Look up a cached instance without creating one
    fn get(&self, bean: &Arc<BeanDefinition>) -> Option<Instance>;

    /// Get the cached instance or create one with the supplied creational
    /// context. The cache has no eviction other than full-context
    /// destruction; at most one instance per bean is handed out.
    fn get_or_create(
        &self,
        bean: &Arc<BeanDefinition>,
        creational: &CreationalContextHandle,
        manager: &BeanManager,
    ) -> Result<Instance, DiError>;

    /// The creational context originally associated with a cached instance
    fn creational_of(&self, bean: &Arc<BeanDefinition>) -> Option<CreationalContextHandle>;

    /// Release all cached instances, invoking each bean's dependent chain
    /// and destroy hook. Best-effort: hook failures are collected and the
    /// aggregate surfaced after every instance has been attempted.
    fn destroy(&self) -> Result<(), DiError>;
}

struct StoredInstance {
    bean: Arc<BeanDefinition>,
    instance: Instance,
    creational: CreationalContextHandle,
}

/// Standard caching context for a (normal) scope.
pub struct ScopeContext {
    id: uuid::Uuid,
    scope: Scope,
    active: AtomicBool,
    instances: RwLock<HashMap<BeanId, StoredInstance>>,
}

impl std::fmt::Debug for ScopeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeContext")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("active", &self.is_active())
            .finish()
    }
}

impl ScopeContext {
    /// Create an inactive context for a scope
    pub fn new(scope: Scope) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            scope,
            active: AtomicBool::new(false),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Create an already-active context for a scope
    pub fn active(scope: Scope) -> Self {
        let context = Self::new(scope);
        context.set_active(true);
        context
    }

    /// Get this context instance's id
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Number of cached instances
    pub fn instance_count(&self) -> usize {
        self.instances.read().map(|m| m.len()).unwrap_or(0)
    }
}

impl Context for ScopeContext {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    fn get(&self, bean: &Arc<BeanDefinition>) -> Option<Instance> {
        let instances = self.instances.read().ok()?;
        instances.get(&bean.id).map(|s| s.instance.clone())
    }

    fn get_or_create(
        &self,
        bean: &Arc<BeanDefinition>,
        creational: &CreationalContextHandle,
        manager: &BeanManager,
    ) -> Result<Instance, DiError> {
        if let Some(instance) = self.get(bean) {
            return Ok(instance);
        }

        // The factory may re-enter this context for other beans, so the
        // lock cannot be held across creation; recheck before insert and
        // release the losing instance if another caller got there first.
        let instance = bean.create_instance(manager, creational)?;

        let mut instances = self
            .instances
            .write()
            .map_err(|_| DiError::lock("scope_context"))?;

        if let Some(existing) = instances.get(&bean.id) {
            let cached = existing.instance.clone();
            drop(instances);
            // the losing attempt's chain carries any dependents its
            // factory created; they go down with the instance
            if let Err(e) = creational.release() {
                tracing::warn!(
                    "Failed to release losing creational chain for {}: {}",
                    bean.label(),
                    e
                );
            }
            if let Err(e) = bean.destroy_instance(&instance) {
                tracing::warn!(
                    "Failed to release duplicate instance of {}: {}",
                    bean.label(),
                    e
                );
            }
            return Ok(cached);
        }

        tracing::debug!(
            "Cached instance of bean {} in {} context {}",
            bean.label(),
            self.scope,
            self.id
        );
        instances.insert(
            bean.id,
            StoredInstance {
                bean: bean.clone(),
                instance: instance.clone(),
                creational: creational.clone(),
            },
        );
        Ok(instance)
    }

    fn creational_of(&self, bean: &Arc<BeanDefinition>) -> Option<CreationalContextHandle> {
        let instances = self.instances.read().ok()?;
        instances.get(&bean.id).map(|s| s.creational.clone())
    }

    fn destroy(&self) -> Result<(), DiError> {
        self.set_active(false);

        let drained: Vec<StoredInstance> = {
            let mut instances = self
                .instances
                .write()
                .map_err(|_| DiError::lock("scope_context"))?;
            instances.drain().map(|(_, stored)| stored).collect()
        };

        let mut errors = Vec::new();
        for stored in drained {
            // dependents go before the instance itself
            match stored.creational.release() {
                Ok(()) => {}
                Err(DiError::Teardown { errors: nested }) => errors.extend(nested),
                Err(e) => errors.push(e),
            }
            if let Err(e) = stored.bean.destroy_instance(&stored.instance) {
                tracing::warn!(
                    "Destroy hook for bean {} failed during context teardown: {}",
                    stored.bean.label(),
                    e
                );
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DiError::Teardown { errors })
        }
    }
}

/// Context for the dependent pseudo-scope: never caches, creates a fresh
/// instance for every lookup. Always active.
#[derive(Debug)]
pub struct DependentContext {
    scope: Scope,
}

impl DependentContext {
    /// Create the dependent pseudo-scope context
    pub fn new() -> Self {
        Self {
            scope: Scope::dependent(),
        }
    }
}

impl Default for DependentContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Context for DependentContext {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn is_active(&self) -> bool {
        true
    }

    fn set_active(&self, _active: bool) {}

    fn get(&self, _bean: &Arc<BeanDefinition>) -> Option<Instance> {
        None
    }

    fn get_or_create(
        &self,
        bean: &Arc<BeanDefinition>,
        creational: &CreationalContextHandle,
        manager: &BeanManager,
    ) -> Result<Instance, DiError> {
        bean.create_instance(manager, creational)
    }

    fn creational_of(&self, _bean: &Arc<BeanDefinition>) -> Option<CreationalContextHandle> {
        None
    }

    fn destroy(&self) -> Result<(), DiError> {
        Ok(())
    }
}

/// Process-wide registry of context instances, keyed by scope.
///
/// Multiple context instances may coexist for one scope (e.g. one per
/// logical conversation); at most one may be active at a time. This is an
/// explicit object passed to the components that need it, never ambient
/// static state.
#[derive(Default)]
pub struct ContextStore {
    contexts: RwLock<HashMap<Scope, Vec<Arc<dyn Context>>>>,
}

impl std::fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.contexts.read().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("ContextStore").field("scopes", &count).finish()
    }
}

impl ContextStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional context instance for its scope
    pub fn add_context(&self, context: Arc<dyn Context>) -> Result<(), DiError> {
        let mut contexts = self
            .contexts
            .write()
            .map_err(|_| DiError::lock("context_store"))?;
        let scope = context.scope().clone();
        tracing::debug!("Added context for scope '{}'", scope);
        contexts.entry(scope).or_default().push(context);
        Ok(())
    }

    /// Return the single active context for a scope.
    ///
    /// Zero active contexts and more than one active context are both
    /// programmer errors, surfaced distinctly and never repaired here.
    pub fn get_context(&self, scope: &Scope) -> Result<Arc<dyn Context>, DiError> {
        let contexts = self
            .contexts
            .read()
            .map_err(|_| DiError::lock("context_store"))?;

        let mut active: Vec<_> = contexts
            .get(scope)
            .map(|list| list.iter().filter(|c| c.is_active()).cloned().collect())
            .unwrap_or_default();

        if active.len() > 1 {
            return Err(DiError::MultipleActiveContexts {
                scope: scope.name().to_string(),
            });
        }
        active.pop().ok_or_else(|| DiError::ContextNotActive {
            scope: scope.name().to_string(),
        })
    }

    /// Destroy every registered context and clear the store. Teardown is
    /// best-effort; the aggregate error is surfaced after all contexts
    /// have been attempted.
    pub fn shutdown(&self) -> Result<(), DiError> {
        let drained: Vec<Arc<dyn Context>> = {
            let mut contexts = self
                .contexts
                .write()
                .map_err(|_| DiError::lock("context_store"))?;
            contexts.drain().flat_map(|(_, list)| list).collect()
        };

        let mut errors = Vec::new();
        for context in drained {
            match context.destroy() {
                Ok(()) => {}
                Err(DiError::Teardown { errors: nested }) => errors.extend(nested),
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DiError::Teardown { errors })
        }
    }
}
