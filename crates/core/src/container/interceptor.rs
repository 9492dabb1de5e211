use std::collections::HashSet;
use std::sync::Arc;

use crate::container::bean::{BeanDefinition, Instance, Qualifier, TypeKey};
use crate::container::creational::{CreationalContext, CreationalContextHandle};
use crate::container::manager::BeanManager;
use crate::errors::DiError;

/// The interception phases an interceptor may participate in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptionType {
    AroundInvoke,
    PostConstruct,
    PreDestroy,
}

/// A business method on a target instance, dispatched by index
pub type MethodFn = Arc<dyn Fn(&Instance, &[Instance]) -> Result<Instance, DiError> + Send + Sync>;

/// An interceptor's around-invoke body; it receives the invocation
/// context and continues the chain by calling `proceed`
pub type AroundInvokeFn =
    Box<dyn Fn(&mut InterceptorInvocationContext) -> Result<Instance, DiError> + Send + Sync>;

/// A registered cross-cutting interceptor
pub struct InterceptorDefinition {
    pub id: uuid::Uuid,
    pub name: String,
    pub bindings: HashSet<String>,
    pub interception_types: HashSet<InterceptionType>,
    /// Ordering priority; ties keep registration order
    pub priority: i32,
    around_invoke: AroundInvokeFn,
}

impl std::fmt::Debug for InterceptorDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorDefinition")
            .field("name", &self.name)
            .field("bindings", &self.bindings)
            .field("priority", &self.priority)
            .finish()
    }
}

impl InterceptorDefinition {
    /// Create an around-invoke interceptor
    pub fn around_invoke<F>(
        name: impl Into<String>,
        priority: i32,
        bindings: impl IntoIterator<Item = String>,
        body: F,
    ) -> Arc<Self>
    where
        F: Fn(&mut InterceptorInvocationContext) -> Result<Instance, DiError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            bindings: bindings.into_iter().collect(),
            interception_types: [InterceptionType::AroundInvoke].into_iter().collect(),
            priority,
            around_invoke: Box::new(body),
        })
    }

    /// Check whether the interceptor participates in an interception type
    pub fn intercepts(&self, ty: InterceptionType) -> bool {
        self.interception_types.contains(&ty)
    }
}

/// A registered decorator: matched by delegate type assignability and
/// qualifiers, ordered by its own comparator
#[derive(Debug)]
pub struct DecoratorDefinition {
    pub id: uuid::Uuid,
    pub name: String,
    pub delegate_type: TypeKey,
    pub delegate_qualifiers: HashSet<Qualifier>,
    pub order: i32,
}

impl DecoratorDefinition {
    /// Create a decorator definition
    pub fn new(
        name: impl Into<String>,
        delegate_type: TypeKey,
        delegate_qualifiers: impl IntoIterator<Item = Qualifier>,
        order: i32,
    ) -> Arc<Self> {
        let mut qualifiers: HashSet<Qualifier> = delegate_qualifiers.into_iter().collect();
        if qualifiers.is_empty() {
            qualifiers.insert(Qualifier::default_qualifier());
        }
        Arc::new(Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            delegate_type,
            delegate_qualifiers: qualifiers,
            order,
        })
    }
}

/// Filter registered interceptors to those declaring the interception
/// type and at least one matching binding, sorted by priority (stable on
/// registration order). An empty binding set matches nothing.
pub fn resolve_interceptors(
    registered: &[Arc<InterceptorDefinition>],
    ty: InterceptionType,
    bindings: &[String],
) -> Vec<Arc<InterceptorDefinition>> {
    if bindings.is_empty() {
        return Vec::new();
    }

    let mut matched: Vec<_> = registered
        .iter()
        .filter(|i| i.intercepts(ty) && bindings.iter().any(|b| i.bindings.contains(b)))
        .cloned()
        .collect();
    matched.sort_by_key(|i| i.priority);
    matched
}

/// Filter registered decorators by delegate type assignability and
/// qualifier match, sorted by the decorator comparator
pub fn resolve_decorators(
    registered: &[Arc<DecoratorDefinition>],
    types: &HashSet<TypeKey>,
    qualifiers: &[Qualifier],
) -> Vec<Arc<DecoratorDefinition>> {
    let effective: Vec<Qualifier> = if qualifiers.is_empty() {
        vec![Qualifier::default_qualifier()]
    } else {
        qualifiers.to_vec()
    };

    let mut matched: Vec<_> = registered
        .iter()
        .filter(|d| {
            types.contains(&d.delegate_type)
                && effective.iter().all(|q| d.delegate_qualifiers.contains(q))
        })
        .cloned()
        .collect();
    matched.sort_by_key(|d| d.order);
    matched
}

/// One method invocation travelling through its interceptor chain.
///
/// `proceed` pops the next interceptor and invokes it, passing the
/// context back so the interceptor can continue the chain itself; when
/// the chain is exhausted it invokes the actual target method. Errors
/// propagate unchanged in both directions.
pub struct InterceptorInvocationContext {
    target: Instance,
    method: MethodFn,
    args: Vec<Instance>,
    chain: Vec<Arc<InterceptorDefinition>>,
    position: usize,
}

impl InterceptorInvocationContext {
    /// Seed a new invocation context
    pub fn new(
        target: Instance,
        method: MethodFn,
        chain: Vec<Arc<InterceptorDefinition>>,
        args: Vec<Instance>,
    ) -> Self {
        Self {
            target,
            method,
            args,
            chain,
            position: 0,
        }
    }

    /// The target instance the chain terminates at
    pub fn target(&self) -> &Instance {
        &self.target
    }

    /// The invocation arguments
    pub fn args(&self) -> &[Instance] {
        &self.args
    }

    /// Replace the invocation arguments before proceeding
    pub fn set_args(&mut self, args: Vec<Instance>) {
        self.args = args;
    }

    /// Continue the chain: next interceptor, or the target method once
    /// the chain is exhausted. Each interceptor runs exactly once.
    pub fn proceed(&mut self) -> Result<Instance, DiError> {
        if self.position < self.chain.len() {
            let interceptor = self.chain[self.position].clone();
            self.position += 1;
            tracing::trace!("Proceeding through interceptor '{}'", interceptor.name);
            (interceptor.around_invoke)(self)
        } else {
            (self.method)(&self.target, &self.args)
        }
    }
}

/// How an [`InterceptorHandler`] obtains its target instance per call
pub enum HandlerTarget {
    /// A fixed instance, used for pseudo-scoped beans
    Direct(Instance),
    /// Re-resolve the contextual instance from the bean's active context
    /// on every call, so the handler stays valid across scope resets
    Contextual {
        manager: BeanManager,
        bean: Arc<BeanDefinition>,
        creational: CreationalContextHandle,
    },
}

/// Dispatches indexed business methods through their interceptor chains
pub struct InterceptorHandler {
    target: HandlerTarget,
    methods: Vec<MethodFn>,
    chains: Vec<Vec<Arc<InterceptorDefinition>>>,
}

impl InterceptorHandler {
    /// Create a handler around a fixed target instance
    pub fn direct(target: Instance) -> Self {
        Self {
            target: HandlerTarget::Direct(target),
            methods: Vec::new(),
            chains: Vec::new(),
        }
    }

    /// Create a handler that resolves its target from the bean's active
    /// context on every invocation
    pub fn contextual(
        manager: BeanManager,
        bean: Arc<BeanDefinition>,
        creational: CreationalContextHandle,
    ) -> Self {
        Self {
            target: HandlerTarget::Contextual {
                manager,
                bean,
                creational,
            },
            methods: Vec::new(),
            chains: Vec::new(),
        }
    }

    /// Register a method with its resolved interceptor chain; returns the
    /// method index used for dispatch
    pub fn add_method(
        &mut self,
        method: MethodFn,
        chain: Vec<Arc<InterceptorDefinition>>,
    ) -> usize {
        self.methods.push(method);
        self.chains.push(chain);
        self.methods.len() - 1
    }

    fn resolve_target(&self) -> Result<Instance, DiError> {
        match &self.target {
            HandlerTarget::Direct(instance) => Ok(instance.clone()),
            HandlerTarget::Contextual {
                manager,
                bean,
                creational,
            } => {
                let context = manager.context(&bean.scope)?;
                if let Some(instance) = context.get(bean) {
                    return Ok(instance);
                }
                // the held chain dies with the context that released it
                let creational = if creational.is_closed() {
                    CreationalContext::new(Some(bean.clone()))
                } else {
                    creational.clone()
                };
                context.get_or_create(bean, &creational, manager)
            }
        }
    }

    /// Invoke a method by index through its interceptor chain
    pub fn invoke(&self, index: usize, args: Vec<Instance>) -> Result<Instance, DiError> {
        let method = self
            .methods
            .get(index)
            .ok_or_else(|| DiError::definition(format!("No method registered at index {index}")))?
            .clone();
        let chain = self.chains[index].clone();
        let target = self.resolve_target()?;

        let mut context = InterceptorInvocationContext::new(target, method, chain, args);
        context.proceed()
    }
}
