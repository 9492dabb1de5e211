pub mod bean;
pub mod context;
pub mod creational;
pub mod injection;
pub mod integration_test;
pub mod interceptor;
pub mod manager;
pub mod proxy;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use bean::{
    BeanDefinition, BeanDefinitionBuilder, BeanId, BeanKind, DestroyFn, FactoryFn, Instance,
    Qualifier, TypeKey,
};
pub use context::{Context, ContextStore, DependentContext, ScopeContext};
pub use creational::{CreationalContext, CreationalContextHandle};
pub use injection::InjectionPoint;
pub use interceptor::{
    resolve_decorators, resolve_interceptors, AroundInvokeFn, DecoratorDefinition,
    InterceptionType, InterceptorDefinition, InterceptorHandler, InterceptorInvocationContext,
    MethodFn,
};
pub use manager::BeanManager;
pub use proxy::{
    ClientProxy, DependentProxy, IndirectionProxyFactory, ManagedBeanPlugin, ProxyFactory,
};
pub use registry::BeanRegistry;
pub use resolver::InjectionResolver;
pub use scope::Scope;
