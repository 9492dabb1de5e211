use thiserror::Error;

/// Core error type for the bean resolution and lifecycle engine.
///
/// Every failure is reported synchronously to the caller as a distinct,
/// catchable condition. Nothing is retried internally and nothing is
/// silently swallowed; destruction-phase failures are collected into
/// [`DiError::Teardown`] after all destroy hooks have been attempted.
#[derive(Debug, Error)]
pub enum DiError {
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No bean satisfies the request: {requested}")]
    UnsatisfiedResolution { requested: String },

    #[error("Ambiguous resolution for {requested}: candidates [{candidates}]")]
    AmbiguousResolution {
        requested: String,
        candidates: String,
    },

    #[error("No active context for scope '{scope}'")]
    ContextNotActive { scope: String },

    #[error("More than one active context for scope '{scope}'")]
    MultipleActiveContexts { scope: String },

    #[error("Passivation id is not unique: '{id}' (bean: {bean})")]
    DuplicatePassivationId { id: String, bean: String },

    #[error("Creational context is already released")]
    ClosedCreationalContext,

    #[error("Requested type {requested} is not assignable from bean {bean}")]
    IllegalBeanType { requested: String, bean: String },

    #[error("Environment-managed bean '{bean}' requested but no managed plugin is registered")]
    MissingManagedPlugin { bean: String },

    #[error("Bean definition error: {message}")]
    Definition { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },

    #[error("Destroy hook failed for bean '{bean}': {message}")]
    Destroy { bean: String, message: String },

    #[error("Teardown finished with {} failure(s); first: {}", .errors.len(), .errors.first().map(|e| e.to_string()).unwrap_or_default())]
    Teardown { errors: Vec<DiError> },
}

impl DiError {
    /// Create a new unsatisfied resolution error
    pub fn unsatisfied(requested: impl Into<String>) -> Self {
        Self::UnsatisfiedResolution {
            requested: requested.into(),
        }
    }

    /// Create a new ambiguous resolution error
    pub fn ambiguous(requested: impl Into<String>, candidates: impl Into<String>) -> Self {
        Self::AmbiguousResolution {
            requested: requested.into(),
            candidates: candidates.into(),
        }
    }

    /// Create a new bean definition error
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new lock error
    pub fn lock(resource: impl Into<String>) -> Self {
        Self::LockError {
            resource: resource.into(),
        }
    }

    /// Create a new destroy hook error
    pub fn destroy(bean: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Destroy {
            bean: bean.into(),
            message: message.into(),
        }
    }

    /// Check if the error is a resolution failure (unsatisfied or ambiguous)
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::UnsatisfiedResolution { .. } | Self::AmbiguousResolution { .. }
        )
    }

    /// Check if the error is a context lookup failure
    pub fn is_context(&self) -> bool {
        matches!(
            self,
            Self::ContextNotActive { .. } | Self::MultipleActiveContexts { .. }
        )
    }

    /// Check if the error arose during teardown
    pub fn is_teardown(&self) -> bool {
        matches!(self, Self::Teardown { .. } | Self::Destroy { .. })
    }
}
