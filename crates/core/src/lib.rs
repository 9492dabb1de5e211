pub mod config;
pub mod container;
pub mod errors;

// Re-export key types for convenience
pub use config::DeploymentConfig;
pub use container::{
    BeanDefinition, BeanDefinitionBuilder, BeanKind, BeanManager, BeanRegistry, ClientProxy,
    Context, ContextStore, CreationalContext, CreationalContextHandle, DependentContext,
    InjectionPoint, InjectionResolver, Instance, InterceptorDefinition, InterceptorHandler,
    Qualifier, Scope, ScopeContext, TypeKey,
};
pub use errors::DiError;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
