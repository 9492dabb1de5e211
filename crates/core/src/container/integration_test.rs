//! End-to-end tests wiring the registry, resolver, contexts, creational
//! chains, proxies and interceptors together.

#[cfg(test)]
mod tests {
    use crate::config::DeploymentConfig;
    use crate::container::bean::{BeanDefinition, Instance, Qualifier, TypeKey};
    use crate::container::context::{Context, ScopeContext};
    use crate::container::injection::InjectionPoint;
    use crate::container::interceptor::{InterceptorDefinition, InterceptorHandler, MethodFn};
    use crate::container::manager::BeanManager;
    use crate::container::proxy::ClientProxy;
    use crate::container::scope::Scope;
    use crate::errors::DiError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Repository {
        tag: &'static str,
    }

    struct Service {
        repository: Arc<Repository>,
    }

    struct Endpoint {
        service: Arc<Service>,
    }

    fn destroy_logger(
        tag: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> impl Fn(&Instance) -> Result<(), DiError> + Send + Sync + 'static {
        let log = log.clone();
        move |_| {
            log.lock().unwrap().push(tag);
            Ok(())
        }
    }

    /// endpoint (request scoped) -> service (dependent) -> repository
    /// (dependent); destroying the request context must tear down the
    /// innermost dependent first and the cached instance last
    #[test]
    fn test_dependent_chain_destroyed_inner_first() {
        let manager = BeanManager::new();
        manager
            .add_context(Arc::new(ScopeContext::active(Scope::request())))
            .unwrap();
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let repository = BeanDefinition::builder()
            .constructor(|_, _| Ok(Repository { tag: "repo" }))
            .destructor(destroy_logger("repository", &log))
            .build()
            .unwrap();
        manager.register_bean(repository).unwrap();

        let service = BeanDefinition::builder()
            .constructor(|manager: &BeanManager, creational| {
                let repository = manager
                    .get_injectable_reference(&InjectionPoint::of::<Repository>(), creational)?
                    .downcast::<Repository>()
                    .map_err(|_| DiError::definition("expected a Repository"))?;
                Ok(Service { repository })
            })
            .destructor(destroy_logger("service", &log))
            .build()
            .unwrap();
        manager.register_bean(service).unwrap();

        let endpoint = BeanDefinition::builder()
            .constructor(|manager: &BeanManager, creational| {
                let service = manager
                    .get_injectable_reference(&InjectionPoint::of::<Service>(), creational)?
                    .downcast::<Service>()
                    .map_err(|_| DiError::definition("expected a Service"))?;
                Ok(Endpoint { service })
            })
            .destructor(destroy_logger("endpoint", &log))
            .scope(Scope::request())
            .build()
            .unwrap();
        manager.register_bean(endpoint.clone()).unwrap();

        let creational = manager.create_creational_context(Some(endpoint.clone()));
        let reference = manager.get_reference(&endpoint, None, &creational).unwrap();
        let proxy = reference.downcast::<ClientProxy>().unwrap();
        let instance = proxy.get_as::<Endpoint>().unwrap();
        assert_eq!(instance.service.repository.tag, "repo");

        manager
            .context(&Scope::request())
            .unwrap()
            .destroy()
            .unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["repository", "service", "endpoint"]
        );
    }

    /// A client proxy must keep working after its scope's context is
    /// destroyed and a fresh one is activated, including recreating beans
    /// whose factories register dependents on the creational chain
    #[test]
    fn test_proxy_stays_valid_across_context_reset() {
        let manager = BeanManager::new();
        let first = Arc::new(ScopeContext::active(Scope::request()));
        manager.add_context(first.clone()).unwrap();

        let repository = BeanDefinition::builder()
            .constructor(|_, _| Ok(Repository { tag: "repo" }))
            .build()
            .unwrap();
        manager.register_bean(repository).unwrap();

        let service = BeanDefinition::builder()
            .constructor(|manager: &BeanManager, creational| {
                let repository = manager
                    .get_injectable_reference(&InjectionPoint::of::<Repository>(), creational)?
                    .downcast::<Repository>()
                    .map_err(|_| DiError::definition("expected a Repository"))?;
                Ok(Service { repository })
            })
            .scope(Scope::request())
            .build()
            .unwrap();
        manager.register_bean(service.clone()).unwrap();

        let creational = manager.create_creational_context(Some(service.clone()));
        let proxy = manager
            .get_reference(&service, None, &creational)
            .unwrap()
            .downcast::<ClientProxy>()
            .unwrap();
        let before = proxy.get_as::<Service>().unwrap();

        // end of the logical request; a new one begins
        first.destroy().unwrap();
        manager
            .add_context(Arc::new(ScopeContext::active(Scope::request())))
            .unwrap();

        let after = proxy.get_as::<Service>().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.repository.tag, "repo");
    }

    /// Releasing the chain a reference was requested under must cascade
    /// through the chains opened internally for other beans
    #[test]
    fn test_root_release_cascades_through_normalized_chains() {
        let manager = BeanManager::new();
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let repository = BeanDefinition::builder()
            .constructor(|_, _| Ok(Repository { tag: "repo" }))
            .destructor(destroy_logger("repository", &log))
            .build()
            .unwrap();
        manager.register_bean(repository).unwrap();

        let service = BeanDefinition::builder()
            .constructor(|manager: &BeanManager, creational| {
                let repository = manager
                    .get_injectable_reference(&InjectionPoint::of::<Repository>(), creational)?
                    .downcast::<Repository>()
                    .map_err(|_| DiError::definition("expected a Repository"))?;
                Ok(Service { repository })
            })
            .destructor(destroy_logger("service", &log))
            .build()
            .unwrap();
        manager.register_bean(service.clone()).unwrap();

        // the root chain was not opened for the service bean, so the
        // manager normalizes to a child chain internally
        let root = manager.create_creational_context(None);
        let reference = manager.get_reference(&service, None, &root).unwrap();
        drop(reference);

        root.release().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["repository", "service"]);
    }

    /// Two separately obtained proxies for one normal-scoped bean must
    /// route to the same contextual instance while its context is active
    #[test]
    fn test_proxies_converge_on_one_contextual_instance() {
        let manager = BeanManager::new();
        manager
            .add_context(Arc::new(ScopeContext::active(Scope::application())))
            .unwrap();

        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let bean = BeanDefinition::builder()
            .constructor(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("shared".to_string())
            })
            .scope(Scope::application())
            .build()
            .unwrap();
        manager.register_bean(bean.clone()).unwrap();

        let first = manager
            .get_reference(&bean, None, &manager.create_creational_context(None))
            .unwrap()
            .downcast::<ClientProxy>()
            .unwrap();
        let second = manager
            .get_reference(&bean, None, &manager.create_creational_context(None))
            .unwrap()
            .downcast::<ClientProxy>()
            .unwrap();

        // distinct proxies from distinct chains
        assert!(!Arc::ptr_eq(&first, &second));

        let a = first.get().unwrap();
        let b = second.get().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    struct Left {
        right: Mutex<Option<Instance>>,
    }

    struct Right {
        left: Instance,
    }

    /// left (normal scoped) and right (dependent) reference each other;
    /// right must receive left's partially constructed instance instead
    /// of recursing forever
    #[test]
    fn test_circular_reference_resolves_to_partial_instance() {
        let manager = BeanManager::new();
        manager
            .add_context(Arc::new(ScopeContext::active(Scope::application())))
            .unwrap();

        let left = BeanDefinition::builder()
            .provides::<Left>()
            // the factory publishes its partial instance before resolving
            // its own injection points, and must return that same instance
            .create(Box::new(|manager, creational| {
                let partial = Arc::new(Left {
                    right: Mutex::new(None),
                });
                creational.push(partial.clone() as Instance)?;
                let right =
                    manager.get_injectable_reference(&InjectionPoint::of::<Right>(), creational)?;
                *partial.right.lock().unwrap() = Some(right);
                Ok(partial as Instance)
            }))
            .scope(Scope::application())
            .build()
            .unwrap();
        manager.register_bean(left.clone()).unwrap();

        let right = BeanDefinition::builder()
            .constructor(|manager: &BeanManager, creational| {
                let left =
                    manager.get_injectable_reference(&InjectionPoint::of::<Left>(), creational)?;
                Ok(Right { left })
            })
            .build()
            .unwrap();
        manager.register_bean(right).unwrap();

        let creational = manager.create_creational_context(Some(left.clone()));
        let proxy = manager
            .get_reference(&left, None, &creational)
            .unwrap()
            .downcast::<ClientProxy>()
            .unwrap();
        let instance = proxy.get_as::<Left>().unwrap();

        let right_ref = instance.right.lock().unwrap().clone().unwrap();
        let right_ref = right_ref.downcast::<Right>().unwrap();
        // the partial handed to `right` is the very instance that ended up
        // in the context
        let left_again = right_ref.left.clone().downcast::<Left>().unwrap();
        assert!(Arc::ptr_eq(&instance, &left_again));
    }

    /// Contextual interceptor handler re-resolves its target from the
    /// active context and runs the chain in priority order
    #[test]
    fn test_interception_through_contextual_handler() {
        let manager = BeanManager::new();
        manager
            .add_context(Arc::new(ScopeContext::active(Scope::session())))
            .unwrap();
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        for (name, priority) in [("outer", 1), ("inner", 2)] {
            let trace = log.clone();
            manager
                .add_interceptor(InterceptorDefinition::around_invoke(
                    name,
                    priority,
                    ["audited".to_string()],
                    move |ctx| {
                        trace.lock().unwrap().push(name);
                        ctx.proceed()
                    },
                ))
                .unwrap();
        }

        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let bean = BeanDefinition::builder()
            .constructor(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(21u64)
            })
            .scope(Scope::session())
            .interceptor_binding("audited")
            .build()
            .unwrap();
        manager.register_bean(bean.clone()).unwrap();

        let creational = manager.create_creational_context(Some(bean.clone()));
        let mut handler = InterceptorHandler::contextual(manager.clone(), bean.clone(), creational);

        let method: MethodFn = Arc::new(|target, _args| {
            let value = target
                .clone()
                .downcast::<u64>()
                .map_err(|_| DiError::definition("expected u64 target"))?;
            Ok(Arc::new(*value * 2) as Instance)
        });
        let index = handler.add_method(method, manager.interceptor_chain(&bean));

        let result = handler.invoke(index, Vec::new()).unwrap();
        assert_eq!(*result.downcast::<u64>().unwrap(), 42);
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);

        // a second call reuses the cached contextual instance
        handler.invoke(index, Vec::new()).unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    /// Alternatives enabled through a deployment document win resolution
    #[test]
    fn test_alternative_enabled_from_yaml_config() {
        let manager = BeanManager::new();

        let real = BeanDefinition::builder()
            .constructor(|_, _| Ok("real".to_string()))
            .build()
            .unwrap();
        let mock = BeanDefinition::builder()
            .constructor(|_, _| Ok("mock".to_string()))
            .named("mock-service")
            .alternative()
            .build()
            .unwrap();
        manager.register_bean(real.clone()).unwrap();
        manager.register_bean(mock.clone()).unwrap();

        // without the alternative enabled the request is ambiguous
        let err = manager
            .resolve_type::<String>(&[])
            .unwrap_err();
        assert!(err.is_resolution());

        let config =
            DeploymentConfig::from_yaml("enabled_alternatives:\n  - mock-service\n").unwrap();
        manager.set_config(config).unwrap();

        let resolved = manager.resolve_type::<String>(&[]).unwrap();
        assert_eq!(resolved.id, mock.id);
    }

    /// Qualified resolution end to end, including dependent instantiation
    #[test]
    fn test_qualified_dependent_resolution() {
        let manager = BeanManager::new();

        let primary = BeanDefinition::builder()
            .constructor(|_, _| Ok(1i64))
            .build()
            .unwrap();
        let backup = BeanDefinition::builder()
            .constructor(|_, _| Ok(2i64))
            .qualifier(Qualifier::new("backup"))
            .build()
            .unwrap();
        manager.register_bean(primary).unwrap();
        manager.register_bean(backup).unwrap();

        let bean = manager
            .resolve(&TypeKey::of::<i64>(), &[Qualifier::new("backup")])
            .unwrap();
        let creational = manager.create_creational_context(Some(bean.clone()));
        let instance = manager.get_reference(&bean, None, &creational).unwrap();
        assert_eq!(*instance.downcast::<i64>().unwrap(), 2);
    }

    /// Shutdown destroys cached instances across every registered context
    #[test]
    fn test_shutdown_tears_down_all_contexts() {
        let manager = BeanManager::new();
        manager
            .add_context(Arc::new(ScopeContext::active(Scope::application())))
            .unwrap();
        manager
            .add_context(Arc::new(ScopeContext::active(Scope::session())))
            .unwrap();
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        for (tag, scope) in [("app", Scope::application()), ("session", Scope::session())] {
            let bean = BeanDefinition::builder()
                .constructor(move |_, _| Ok(tag.to_string()))
                .destructor(destroy_logger(tag, &log))
                .scope(scope)
                .build()
                .unwrap();
            manager.register_bean(bean.clone()).unwrap();

            let creational = manager.create_creational_context(Some(bean.clone()));
            let proxy = manager
                .get_reference(&bean, None, &creational)
                .unwrap()
                .downcast::<ClientProxy>()
                .unwrap();
            proxy.get().unwrap();
        }

        manager.shutdown().unwrap();

        let mut destroyed = log.lock().unwrap().clone();
        destroyed.sort();
        assert_eq!(destroyed, vec!["app", "session"]);

        let err = manager.context(&Scope::application()).unwrap_err();
        assert!(matches!(err, DiError::ContextNotActive { .. }));
    }
}
