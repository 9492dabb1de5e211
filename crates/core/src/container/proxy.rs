use std::sync::Arc;

use crate::container::bean::{BeanDefinition, Instance, TypeKey};
use crate::container::creational::{CreationalContext, CreationalContextHandle};
use crate::container::manager::BeanManager;
use crate::errors::DiError;

/// Builds the indirection handed out for bean references.
///
/// Normal-scoped beans are never exposed directly: callers receive a
/// stable proxy that routes every access through the scope's currently
/// active context. Pseudo-scoped beans only get wrapped when an
/// interception chain applies to them.
pub trait ProxyFactory: Send + Sync {
    /// Build a proxy for a normal-scoped bean. The proxy must stay valid
    /// across context resets for its scope.
    fn create_normal_scoped_proxy(
        &self,
        manager: &BeanManager,
        bean: &Arc<BeanDefinition>,
        creational: &CreationalContextHandle,
    ) -> Result<Instance, DiError>;

    /// Wrap an already-created pseudo-scoped instance
    fn create_dependent_scoped_proxy(
        &self,
        bean: &Arc<BeanDefinition>,
        instance: Instance,
        creational: &CreationalContextHandle,
    ) -> Result<Instance, DiError>;
}

/// Hook for instantiating beans whose lifecycle lives outside the engine,
/// such as environment-provided singletons.
///
/// Returning `Ok(None)` declines the bean and lets the engine fall back
/// to the bean's own factory.
pub trait ManagedBeanPlugin: Send + Sync {
    fn try_get_managed_instance(
        &self,
        bean: &Arc<BeanDefinition>,
        requested: Option<&TypeKey>,
        creational: &CreationalContextHandle,
    ) -> Result<Option<Instance>, DiError>;
}

/// Client proxy for a normal-scoped bean.
///
/// Holds no instance of its own; `get` consults the single active
/// context for the bean's scope on every call, so two proxies for the
/// same bean always converge on the same contextual instance while the
/// same context is active.
pub struct ClientProxy {
    manager: BeanManager,
    bean: Arc<BeanDefinition>,
    creational: CreationalContextHandle,
}

impl std::fmt::Debug for ClientProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientProxy")
            .field("bean", &self.bean.label())
            .field("scope", &self.bean.scope)
            .finish()
    }
}

impl ClientProxy {
    /// Create a proxy routing through the bean's scope
    pub fn new(
        manager: BeanManager,
        bean: Arc<BeanDefinition>,
        creational: CreationalContextHandle,
    ) -> Self {
        Self {
            manager,
            bean,
            creational,
        }
    }

    /// The bean this proxy stands in for
    pub fn bean(&self) -> &Arc<BeanDefinition> {
        &self.bean
    }

    /// Resolve the current contextual instance, creating it in the active
    /// context if it does not exist yet.
    ///
    /// The chain the proxy was built with is released when its context is
    /// destroyed; recreation in a later context opens a fresh chain so
    /// the new instance's dependents have somewhere live to attach.
    pub fn get(&self) -> Result<Instance, DiError> {
        let context = self.manager.context(&self.bean.scope)?;
        if let Some(instance) = context.get(&self.bean) {
            return Ok(instance);
        }
        let creational = if self.creational.is_closed() {
            CreationalContext::new(Some(self.bean.clone()))
        } else {
            self.creational.clone()
        };
        context.get_or_create(&self.bean, &creational, &self.manager)
    }

    /// Downcast the current contextual instance
    pub fn get_as<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, DiError> {
        let instance = self.get()?;
        instance.downcast::<T>().map_err(|_| {
            DiError::IllegalBeanType {
                requested: std::any::type_name::<T>().to_string(),
                bean: self.bean.label(),
            }
        })
    }
}

/// Wrapper around a pseudo-scoped instance, keeping its creational
/// context reachable for interception and teardown.
pub struct DependentProxy {
    bean: Arc<BeanDefinition>,
    instance: Instance,
    creational: CreationalContextHandle,
}

impl std::fmt::Debug for DependentProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependentProxy")
            .field("bean", &self.bean.label())
            .finish()
    }
}

impl DependentProxy {
    /// Wrap an instance
    pub fn new(
        bean: Arc<BeanDefinition>,
        instance: Instance,
        creational: CreationalContextHandle,
    ) -> Self {
        Self {
            bean,
            instance,
            creational,
        }
    }

    /// The bean the wrapped instance belongs to
    pub fn bean(&self) -> &Arc<BeanDefinition> {
        &self.bean
    }

    /// The wrapped instance
    pub fn get(&self) -> Instance {
        self.instance.clone()
    }

    /// The creational context the instance was created under
    pub fn creational(&self) -> &CreationalContextHandle {
        &self.creational
    }
}

/// Default proxy factory: plain indirection objects, no bytecode or
/// codegen involved.
#[derive(Debug, Default)]
pub struct IndirectionProxyFactory;

impl ProxyFactory for IndirectionProxyFactory {
    fn create_normal_scoped_proxy(
        &self,
        manager: &BeanManager,
        bean: &Arc<BeanDefinition>,
        creational: &CreationalContextHandle,
    ) -> Result<Instance, DiError> {
        tracing::trace!("Creating client proxy for {}", bean.label());
        let proxy = ClientProxy::new(manager.clone(), bean.clone(), creational.clone());
        Ok(Arc::new(proxy) as Instance)
    }

    fn create_dependent_scoped_proxy(
        &self,
        bean: &Arc<BeanDefinition>,
        instance: Instance,
        creational: &CreationalContextHandle,
    ) -> Result<Instance, DiError> {
        let proxy = DependentProxy::new(bean.clone(), instance, creational.clone());
        Ok(Arc::new(proxy) as Instance)
    }
}
