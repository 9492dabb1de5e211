use std::sync::{Arc, Mutex, Weak};

use crate::container::bean::{BeanDefinition, BeanId, Instance};
use crate::errors::DiError;

/// Shared handle to a creational context chain
pub type CreationalContextHandle = Arc<CreationalContext>;

/// A dependent object created transitively while building an instance.
///
/// Pseudo-scoped objects have no context cache of their own; recording
/// them here is what ties their destruction to their owner's.
struct Dependent {
    bean: Arc<BeanDefinition>,
    instance: Instance,
    creational: CreationalContextHandle,
}

struct CreationalState {
    dependents: Vec<Dependent>,
    /// Instances pushed by factories after construction but before
    /// injection; consulted to resolve reentrant (circular) creation.
    in_construction: Vec<Instance>,
    /// Representative proxy handed out for this chain, so repeated
    /// lookups within one call return the same proxy object.
    proxy_instance: Option<Instance>,
    owner: Option<Weak<CreationalContext>>,
    closed: bool,
}

/// Dependency-chain tracker for one root resolution call.
///
/// Tracks dependents created transitively during the call so they can be
/// destroyed together (in reverse registration order) when the root is
/// destroyed, and an optional owner chain so nested resolutions cascade
/// to the correct root.
pub struct CreationalContext {
    id: uuid::Uuid,
    bean: Option<Arc<BeanDefinition>>,
    state: Mutex<CreationalState>,
}

impl std::fmt::Debug for CreationalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreationalContext")
            .field("id", &self.id)
            .field("bean", &self.bean.as_ref().map(|b| b.label()))
            .finish()
    }
}

impl CreationalContext {
    /// Open a new chain for a bean (or none, for root lookups)
    pub fn new(bean: Option<Arc<BeanDefinition>>) -> CreationalContextHandle {
        Arc::new(Self {
            id: uuid::Uuid::new_v4(),
            bean,
            state: Mutex::new(CreationalState {
                dependents: Vec::new(),
                in_construction: Vec::new(),
                proxy_instance: None,
                owner: None,
                closed: false,
            }),
        })
    }

    /// Get the chain id
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Get the bean this chain was opened for
    pub fn bean(&self) -> Option<&Arc<BeanDefinition>> {
        self.bean.as_ref()
    }

    /// Check whether this chain was opened for the given bean
    pub fn is_for(&self, bean: &Arc<BeanDefinition>) -> bool {
        self.bean.as_ref().map(|b| b.id) == Some(bean.id)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, CreationalState>, DiError> {
        self.state
            .lock()
            .map_err(|_| DiError::lock("creational_context"))
    }

    fn lock_open(&self) -> Result<std::sync::MutexGuard<'_, CreationalState>, DiError> {
        let state = self.lock()?;
        if state.closed {
            return Err(DiError::ClosedCreationalContext);
        }
        Ok(state)
    }

    /// Record a partially constructed instance so reentrant creation of
    /// the same bean resolves to it instead of recursing. Factories call
    /// this after allocation and before resolving injection points.
    pub fn push(&self, instance: Instance) -> Result<(), DiError> {
        let mut state = self.lock_open()?;
        state.in_construction.push(instance);
        Ok(())
    }

    /// Record a dependent object created while building this instance;
    /// it is destroyed in lock-step with the owner
    pub fn add_dependent(
        &self,
        bean: Arc<BeanDefinition>,
        instance: Instance,
        creational: CreationalContextHandle,
    ) -> Result<(), DiError> {
        let mut state = self.lock_open()?;
        tracing::trace!(
            "Registering dependent {} on creational context {}",
            bean.label(),
            self.id
        );
        state.dependents.push(Dependent {
            bean,
            instance,
            creational,
        });
        Ok(())
    }

    /// Set the owner chain this resolution was triggered from
    pub fn set_owner(&self, owner: &CreationalContextHandle) -> Result<(), DiError> {
        let mut state = self.lock_open()?;
        state.owner = Some(Arc::downgrade(owner));
        Ok(())
    }

    /// Get the owner chain, if still alive
    pub fn owner(&self) -> Option<CreationalContextHandle> {
        let state = self.state.lock().ok()?;
        state.owner.as_ref().and_then(Weak::upgrade)
    }

    /// Store the representative proxy for this chain
    pub fn set_proxy_instance(&self, proxy: Instance) -> Result<(), DiError> {
        let mut state = self.lock_open()?;
        state.proxy_instance = Some(proxy);
        Ok(())
    }

    /// Get the representative proxy for this chain, if one was stored
    pub fn proxy_instance(&self) -> Option<Instance> {
        let state = self.state.lock().ok()?;
        state.proxy_instance.clone()
    }

    /// Search this chain and its owners for an instance of the given bean
    /// that is currently under construction
    pub fn find_in_chain(&self, bean_id: &BeanId) -> Option<Instance> {
        {
            let state = self.state.lock().ok()?;
            if self.bean.as_ref().map(|b| b.id) == Some(*bean_id) {
                if let Some(instance) = state.in_construction.last() {
                    return Some(instance.clone());
                }
            }
        }
        self.owner()?.find_in_chain(bean_id)
    }

    /// Check whether the chain has been released
    pub fn is_closed(&self) -> bool {
        self.state.lock().map(|s| s.closed).unwrap_or(true)
    }

    /// Destroy every pushed dependent in reverse registration order, then
    /// close the chain. Each dependent's own chain is released before its
    /// destroy hook runs, so inner objects go before outer ones. Errors
    /// are collected; teardown is best-effort.
    pub fn release(&self) -> Result<(), DiError> {
        let dependents = {
            let mut state = self.lock()?;
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.in_construction.clear();
            state.proxy_instance = None;
            std::mem::take(&mut state.dependents)
        };

        let mut errors = Vec::new();
        for dependent in dependents.into_iter().rev() {
            if let Err(e) = dependent.creational.release() {
                errors.push(e);
            }
            if let Err(e) = dependent.bean.destroy_instance(&dependent.instance) {
                tracing::warn!(
                    "Destroy hook for dependent {} failed: {}",
                    dependent.bean.label(),
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
