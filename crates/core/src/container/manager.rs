use std::sync::{Arc, RwLock};

use crate::config::DeploymentConfig;
use crate::container::bean::{BeanDefinition, BeanKind, Instance, Qualifier, TypeKey};
use crate::container::context::{Context, ContextStore, DependentContext};
use crate::container::creational::{CreationalContext, CreationalContextHandle};
use crate::container::injection::InjectionPoint;
use crate::container::interceptor::{
    resolve_decorators, resolve_interceptors, DecoratorDefinition, InterceptionType,
    InterceptorDefinition,
};
use crate::container::proxy::{IndirectionProxyFactory, ManagedBeanPlugin, ProxyFactory};
use crate::container::registry::BeanRegistry;
use crate::container::resolver::InjectionResolver;
use crate::container::scope::Scope;
use crate::errors::DiError;

struct ManagerState {
    registry: Arc<BeanRegistry>,
    resolver: InjectionResolver,
    contexts: ContextStore,
    config: RwLock<DeploymentConfig>,
    proxy_factory: RwLock<Arc<dyn ProxyFactory>>,
    plugin: RwLock<Option<Arc<dyn ManagedBeanPlugin>>>,
}

/// The engine facade: bean registration, typesafe resolution, reference
/// creation and context access behind one cheaply cloneable handle.
///
/// All state lives behind an `Arc`, so clones observe the same
/// deployment; the handle itself is what factories receive to resolve
/// their own injection points.
#[derive(Clone)]
pub struct BeanManager {
    state: Arc<ManagerState>,
}

impl std::fmt::Debug for BeanManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanManager")
            .field("beans", &self.state.registry.bean_count())
            .finish()
    }
}

impl BeanManager {
    /// Create a manager with an empty deployment. The dependent
    /// pseudo-scope context is pre-registered; every other scope needs a
    /// context added before references into it can be resolved.
    pub fn new() -> Self {
        let registry = Arc::new(BeanRegistry::new());
        let resolver = InjectionResolver::new(registry.clone());
        let contexts = ContextStore::new();
        // infallible on a store nothing else can be holding yet
        let _ = contexts.add_context(Arc::new(DependentContext::new()));

        Self {
            state: Arc::new(ManagerState {
                registry,
                resolver,
                contexts,
                config: RwLock::new(DeploymentConfig::new()),
                proxy_factory: RwLock::new(Arc::new(IndirectionProxyFactory)),
                plugin: RwLock::new(None),
            }),
        }
    }

    /// The underlying registry
    pub fn registry(&self) -> &Arc<BeanRegistry> {
        &self.state.registry
    }

    /// Add a bean to the deployment
    pub fn register_bean(&self, bean: Arc<BeanDefinition>) -> Result<(), DiError> {
        self.state.registry.register(bean)
    }

    /// Register a context instance for its scope
    pub fn add_context(&self, context: Arc<dyn Context>) -> Result<(), DiError> {
        self.state.contexts.add_context(context)
    }

    /// Register an interceptor
    pub fn add_interceptor(&self, interceptor: Arc<InterceptorDefinition>) -> Result<(), DiError> {
        self.state.registry.add_interceptor(interceptor)
    }

    /// Register a decorator
    pub fn add_decorator(&self, decorator: Arc<DecoratorDefinition>) -> Result<(), DiError> {
        self.state.registry.add_decorator(decorator)
    }

    /// Replace the proxy factory
    pub fn set_proxy_factory(&self, factory: Arc<dyn ProxyFactory>) -> Result<(), DiError> {
        let mut current = self
            .state
            .proxy_factory
            .write()
            .map_err(|_| DiError::lock("proxy_factory"))?;
        *current = factory;
        Ok(())
    }

    /// Install the plugin serving environment-provided beans
    pub fn set_managed_plugin(&self, plugin: Arc<dyn ManagedBeanPlugin>) -> Result<(), DiError> {
        let mut current = self
            .state
            .plugin
            .write()
            .map_err(|_| DiError::lock("managed_plugin"))?;
        *current = Some(plugin);
        Ok(())
    }

    /// Replace the deployment configuration
    pub fn set_config(&self, config: DeploymentConfig) -> Result<(), DiError> {
        let mut current = self
            .state
            .config
            .write()
            .map_err(|_| DiError::lock("deployment_config"))?;
        *current = config;
        Ok(())
    }

    fn config(&self) -> Result<DeploymentConfig, DiError> {
        self.state
            .config
            .read()
            .map(|c| c.clone())
            .map_err(|_| DiError::lock("deployment_config"))
    }

    fn proxy_factory(&self) -> Result<Arc<dyn ProxyFactory>, DiError> {
        self.state
            .proxy_factory
            .read()
            .map(|f| f.clone())
            .map_err(|_| DiError::lock("proxy_factory"))
    }

    /// The single active context for a scope
    pub fn context(&self, scope: &Scope) -> Result<Arc<dyn Context>, DiError> {
        self.state.contexts.get_context(scope)
    }

    /// Open a creational context chain for a bean (or none, for root lookups)
    pub fn create_creational_context(
        &self,
        bean: Option<Arc<BeanDefinition>>,
    ) -> CreationalContextHandle {
        CreationalContext::new(bean)
    }

    /// Typesafe resolution to a single bean; applies the full
    /// alternative/specialization tie-break chain
    pub fn resolve(
        &self,
        ty: &TypeKey,
        qualifiers: &[Qualifier],
    ) -> Result<Arc<BeanDefinition>, DiError> {
        let candidates = self.state.resolver.resolve_by_type(ty, qualifiers);
        self.state
            .resolver
            .resolve(candidates, &self.config()?, ty.type_name())
    }

    /// Typesafe resolution for a concrete Rust type
    pub fn resolve_type<T: 'static + ?Sized>(
        &self,
        qualifiers: &[Qualifier],
    ) -> Result<Arc<BeanDefinition>, DiError> {
        self.resolve(&TypeKey::of::<T>(), qualifiers)
    }

    /// Every bean matching a type and qualifier set, without tie-breaking
    pub fn resolve_all(&self, ty: &TypeKey, qualifiers: &[Qualifier]) -> Vec<Arc<BeanDefinition>> {
        self.state.resolver.resolve_by_type(ty, qualifiers)
    }

    /// Resolve a single bean by name
    pub fn resolve_by_name(&self, name: &str) -> Result<Arc<BeanDefinition>, DiError> {
        self.state.resolver.single_by_name(name)
    }

    /// Look up a bean by its passivation id
    pub fn get_passivation_capable_bean(&self, id: &str) -> Option<Arc<BeanDefinition>> {
        self.state.registry.by_passivation_id(id)
    }

    /// Obtain a reference to a bean.
    ///
    /// Normal-scoped beans yield a client proxy, cached per creational
    /// chain so repeated lookups within one call return the same proxy
    /// object. Pseudo-scoped beans yield the instance itself, wrapped
    /// only when an interception chain applies to the bean.
    pub fn get_reference(
        &self,
        bean: &Arc<BeanDefinition>,
        requested: Option<&TypeKey>,
        creational: &CreationalContextHandle,
    ) -> Result<Instance, DiError> {
        if let Some(ty) = requested {
            if !bean.has_type(ty) {
                return Err(DiError::IllegalBeanType {
                    requested: ty.type_name().to_string(),
                    bean: bean.label(),
                });
            }
        }

        // A chain opened for another bean cannot track this bean's
        // partials; open a child chain owned by the caller's.
        let owner = creational;
        let creational = if owner.is_for(bean) {
            owner.clone()
        } else {
            let child = CreationalContext::new(Some(bean.clone()));
            child.set_owner(owner)?;
            child
        };

        // The scope must have an active context even when the plugin or a
        // cached proxy would short-circuit actual creation.
        let context = self.context(&bean.scope)?;

        if bean.kind == BeanKind::Environment {
            let plugin = self
                .state
                .plugin
                .read()
                .map_err(|_| DiError::lock("managed_plugin"))?
                .clone();
            let plugin = plugin.ok_or_else(|| DiError::MissingManagedPlugin {
                bean: bean.label(),
            })?;
            if let Some(instance) =
                plugin.try_get_managed_instance(bean, requested, &creational)?
            {
                return Ok(instance);
            }
            // plugin declined, fall through to standard handling
        }

        if bean.scope.is_normal() {
            if let Some(proxy) = creational.proxy_instance() {
                return Ok(proxy);
            }
            let proxy =
                self.proxy_factory()?
                    .create_normal_scoped_proxy(self, bean, &creational)?;
            creational.set_proxy_instance(proxy.clone())?;
            return Ok(proxy);
        }

        let instance = context.get_or_create(bean, &creational, self)?;
        // A pseudo-scoped instance built on a normalized child chain must
        // still be destroyed when the caller releases their chain, so the
        // child registers as a dependent of the supplied one.
        if !Arc::ptr_eq(&creational, owner) {
            owner.add_dependent(bean.clone(), instance.clone(), creational.clone())?;
        }
        if self.applies_interception(bean)? {
            return self
                .proxy_factory()?
                .create_dependent_scoped_proxy(bean, instance, &creational);
        }
        Ok(instance)
    }

    /// Resolve and obtain the reference for one injection point of an
    /// instance under construction.
    ///
    /// Pseudo-scoped results are recorded as dependents of the owner
    /// chain (unless the injection point is static) so their destruction
    /// follows the owner's. A normal-scoped target already under
    /// construction in the owner chain resolves to its partial instance,
    /// which is what breaks circular references.
    pub fn get_injectable_reference(
        &self,
        injection_point: &InjectionPoint,
        owner: &CreationalContextHandle,
    ) -> Result<Instance, DiError> {
        let bean = self
            .state
            .resolver
            .injection_point_bean(injection_point, &self.config()?)?;

        if bean.scope.is_normal() {
            if let Some(partial) = owner.find_in_chain(&bean.id) {
                tracing::trace!(
                    "Resolved {} to its in-construction partial instance",
                    bean.label()
                );
                return Ok(partial);
            }
        }

        let creational = CreationalContext::new(Some(bean.clone()));
        creational.set_owner(owner)?;

        let reference =
            self.get_reference(&bean, Some(&injection_point.required_type), &creational)?;

        if bean.scope.is_pseudo() && !injection_point.static_injection {
            owner.add_dependent(bean, reference.clone(), creational)?;
        }
        Ok(reference)
    }

    /// Resolve the around-invoke interceptor chain for a bean's methods
    pub fn interceptor_chain(
        &self,
        bean: &Arc<BeanDefinition>,
    ) -> Vec<Arc<InterceptorDefinition>> {
        let bindings: Vec<String> = bean.interceptor_bindings.iter().cloned().collect();
        resolve_interceptors(
            &self.state.registry.interceptors(),
            InterceptionType::AroundInvoke,
            &bindings,
        )
    }

    /// Resolve the decorators applying to a bean
    pub fn decorator_chain(&self, bean: &Arc<BeanDefinition>) -> Vec<Arc<DecoratorDefinition>> {
        let qualifiers: Vec<Qualifier> = bean.qualifiers.iter().cloned().collect();
        resolve_decorators(&self.state.registry.decorators(), &bean.types, &qualifiers)
    }

    fn applies_interception(&self, bean: &Arc<BeanDefinition>) -> Result<bool, DiError> {
        Ok(!self.interceptor_chain(bean).is_empty() || !self.decorator_chain(bean).is_empty())
    }

    /// Destroy every registered context and their cached instances.
    /// Best-effort; the aggregate error surfaces after all contexts have
    /// been attempted.
    pub fn shutdown(&self) -> Result<(), DiError> {
        tracing::debug!("Shutting down bean manager");
        self.state.contexts.shutdown()
    }
}

impl Default for BeanManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::context::ScopeContext;

    #[test]
    fn test_reference_requires_declared_type() {
        let manager = BeanManager::new();
        let bean = BeanDefinition::builder()
            .constructor(|_, _| Ok("hello".to_string()))
            .build()
            .unwrap();
        manager.register_bean(bean.clone()).unwrap();

        let creational = manager.create_creational_context(Some(bean.clone()));
        let err = manager
            .get_reference(&bean, Some(&TypeKey::of::<u32>()), &creational)
            .unwrap_err();
        assert!(matches!(err, DiError::IllegalBeanType { .. }));
    }

    #[test]
    fn test_reference_requires_active_context() {
        let manager = BeanManager::new();
        let bean = BeanDefinition::builder()
            .constructor(|_, _| Ok(7u32))
            .scope(Scope::request())
            .build()
            .unwrap();
        manager.register_bean(bean.clone()).unwrap();

        let creational = manager.create_creational_context(Some(bean.clone()));
        let err = manager.get_reference(&bean, None, &creational).unwrap_err();
        assert!(matches!(err, DiError::ContextNotActive { .. }));
    }

    #[test]
    fn test_environment_bean_requires_plugin() {
        let manager = BeanManager::new();
        let bean = BeanDefinition::builder()
            .constructor(|_, _| Ok(0u8))
            .kind(BeanKind::Environment)
            .build()
            .unwrap();
        manager.register_bean(bean.clone()).unwrap();

        let creational = manager.create_creational_context(Some(bean.clone()));
        let err = manager.get_reference(&bean, None, &creational).unwrap_err();
        assert!(matches!(err, DiError::MissingManagedPlugin { .. }));
    }

    #[test]
    fn test_proxy_cached_per_creational_chain() {
        let manager = BeanManager::new();
        manager
            .add_context(Arc::new(ScopeContext::active(Scope::application())))
            .unwrap();

        let bean = BeanDefinition::builder()
            .constructor(|_, _| Ok(1u64))
            .scope(Scope::application())
            .build()
            .unwrap();
        manager.register_bean(bean.clone()).unwrap();

        let creational = manager.create_creational_context(Some(bean.clone()));
        let first = manager.get_reference(&bean, None, &creational).unwrap();
        let second = manager.get_reference(&bean, None, &creational).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
