use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::sync::Arc;

use crate::container::creational::CreationalContextHandle;
use crate::container::manager::BeanManager;
use crate::container::scope::Scope;
use crate::errors::DiError;

/// A contextual instance as stored and handed out by the engine
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Unique bean identity within a deployment
pub type BeanId = uuid::Uuid;

/// Structural type identity a bean can be requested by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl TypeKey {
    /// Create a type key for a type
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// A discriminating marker narrowing which bean satisfies a typed request.
///
/// A request with no qualifiers implies the default qualifier; a bean
/// declared without qualifiers carries the default qualifier implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qualifier(String);

impl Qualifier {
    /// Create a new qualifier
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The default qualifier, implied by the absence of any other
    pub fn default_qualifier() -> Self {
        Self("default".to_string())
    }

    /// Get the qualifier name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Qualifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Closed set of bean flavors, dispatched by tag rather than inheritance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeanKind {
    /// Bean fully managed by this engine
    Managed,
    /// Foreign bean implementation wrapped at registration time
    ThirdParty,
    /// Container-managed resource served through the managed plugin boundary
    Environment,
    /// Cross-cutting interceptor bean
    Interceptor,
    /// Decorator bean
    Decorator,
}

/// Factory invoked to create a contextual instance.
///
/// The factory receives the manager so it can resolve its own injection
/// points, and the creational context chain of the instance under
/// construction so dependents and partial instances attach to it.
pub type FactoryFn =
    Box<dyn Fn(&BeanManager, &CreationalContextHandle) -> Result<Instance, DiError> + Send + Sync>;

/// Destroy hook invoked when a contextual instance is released
pub type DestroyFn = Box<dyn Fn(&Instance) -> Result<(), DiError> + Send + Sync>;

/// A registered factory plus metadata for a typed, qualified injectable object.
///
/// Immutable after registration; identity is the generated [`BeanId`].
pub struct BeanDefinition {
    pub id: BeanId,
    pub kind: BeanKind,
    pub types: HashSet<TypeKey>,
    pub qualifiers: HashSet<Qualifier>,
    pub scope: Scope,
    pub name: Option<String>,
    pub passivation_id: Option<String>,
    pub alternative: bool,
    pub specializes: Option<BeanId>,
    pub interceptor_bindings: HashSet<String>,
    create: FactoryFn,
    destroy: Option<DestroyFn>,
}

impl std::fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("types", &self.types)
            .field("qualifiers", &self.qualifiers)
            .field("scope", &self.scope)
            .field("name", &self.name)
            .field("passivation_id", &self.passivation_id)
            .field("alternative", &self.alternative)
            .field("specializes", &self.specializes)
            .finish()
    }
}

impl BeanDefinition {
    /// Start building a bean definition
    pub fn builder() -> BeanDefinitionBuilder {
        BeanDefinitionBuilder::new()
    }

    /// Check whether the bean's declared type set contains the given type
    pub fn has_type(&self, ty: &TypeKey) -> bool {
        self.types.contains(ty)
    }

    /// Check whether the bean's qualifier set is a superset of the requested qualifiers
    pub fn has_qualifiers(&self, requested: &[Qualifier]) -> bool {
        requested.iter().all(|q| self.qualifiers.contains(q))
    }

    /// A short human-readable label for diagnostics
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return format!("'{}'", name);
        }
        self.types
            .iter()
            .next()
            .map(|t| t.type_name.to_string())
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Invoke the bean's factory
    pub fn create_instance(
        &self,
        manager: &BeanManager,
        creational: &CreationalContextHandle,
    ) -> Result<Instance, DiError> {
        tracing::trace!("Creating instance of bean {}", self.label());
        (self.create)(manager, creational)
    }

    /// Invoke the bean's destroy hook, if one was declared
    pub fn destroy_instance(&self, instance: &Instance) -> Result<(), DiError> {
        if let Some(destroy) = &self.destroy {
            tracing::trace!("Destroying instance of bean {}", self.label());
            destroy(instance)?;
        }
        Ok(())
    }
}

/// Builder for bean definitions
pub struct BeanDefinitionBuilder {
    kind: BeanKind,
    types: HashSet<TypeKey>,
    qualifiers: HashSet<Qualifier>,
    scope: Scope,
    name: Option<String>,
    passivation_id: Option<String>,
    alternative: bool,
    specializes: Option<BeanId>,
    interceptor_bindings: HashSet<String>,
    create: Option<FactoryFn>,
    destroy: Option<DestroyFn>,
}

impl BeanDefinitionBuilder {
    /// Create a new builder with dependent scope and managed kind defaults
    pub fn new() -> Self {
        Self {
            kind: BeanKind::Managed,
            types: HashSet::new(),
            qualifiers: HashSet::new(),
            scope: Scope::dependent(),
            name: None,
            passivation_id: None,
            alternative: false,
            specializes: None,
            interceptor_bindings: HashSet::new(),
            create: None,
            destroy: None,
        }
    }

    /// Add a type the bean can be requested by
    pub fn provides<T: 'static + ?Sized>(mut self) -> Self {
        self.types.insert(TypeKey::of::<T>());
        self
    }

    /// Set the bean kind
    pub fn kind(mut self, kind: BeanKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add a qualifier
    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }

    /// Set the bean scope
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the bean name for name-indexed lookup
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the passivation id; must be unique across the deployment
    pub fn passivation_id(mut self, id: impl Into<String>) -> Self {
        self.passivation_id = Some(id.into());
        self
    }

    /// Mark the bean as an alternative; it only wins resolution when enabled
    /// in the deployment configuration
    pub fn alternative(mut self) -> Self {
        self.alternative = true;
        self
    }

    /// Declare that this bean specializes (and eliminates) another bean
    pub fn specializes(mut self, other: &Arc<BeanDefinition>) -> Self {
        self.specializes = Some(other.id);
        self
    }

    /// Add an interceptor binding the bean's methods participate in
    pub fn interceptor_binding(mut self, binding: impl Into<String>) -> Self {
        self.interceptor_bindings.insert(binding.into());
        self
    }

    /// Set the raw factory function
    pub fn create(mut self, factory: FactoryFn) -> Self {
        self.create = Some(factory);
        self
    }

    /// Set a typed constructor; the produced value is wrapped as an
    /// [`Instance`] and `T` is added to the declared type set
    pub fn constructor<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&BeanManager, &CreationalContextHandle) -> Result<T, DiError> + Send + Sync + 'static,
    {
        self.types.insert(TypeKey::of::<T>());
        self.create = Some(Box::new(move |manager, creational| {
            let value = factory(manager, creational)?;
            Ok(Arc::new(value) as Instance)
        }));
        self
    }

    /// Set the destroy hook
    pub fn destructor<F>(mut self, destroy: F) -> Self
    where
        F: Fn(&Instance) -> Result<(), DiError> + Send + Sync + 'static,
    {
        self.destroy = Some(Box::new(destroy));
        self
    }

    /// Build the bean definition
    pub fn build(self) -> Result<Arc<BeanDefinition>, DiError> {
        let create = self
            .create
            .ok_or_else(|| DiError::definition("Bean requires a factory function"))?;

        if self.types.is_empty() {
            return Err(DiError::definition(
                "Bean must declare at least one type it provides",
            ));
        }

        let mut qualifiers = self.qualifiers;
        if qualifiers.is_empty() {
            qualifiers.insert(Qualifier::default_qualifier());
        }

        Ok(Arc::new(BeanDefinition {
            id: uuid::Uuid::new_v4(),
            kind: self.kind,
            types: self.types,
            qualifiers,
            scope: self.scope,
            name: self.name,
            passivation_id: self.passivation_id,
            alternative: self.alternative,
            specializes: self.specializes,
            interceptor_bindings: self.interceptor_bindings,
            create,
            destroy: self.destroy,
        }))
    }
}

impl Default for BeanDefinitionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
