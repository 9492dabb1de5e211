/// Lifecycle scope of a bean.
///
/// A scope is a tag with two facets: *normal* scopes share one proxied
/// instance per active context, while pseudo scopes (`dependent`) hand a
/// fresh instance to every injection point. *Passivating* scopes may
/// serialize their instances out and reconstruct them later, which is why
/// beans in such scopes carry a passivation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    name: String,
    normal: bool,
    passivating: bool,
}

impl Scope {
    /// Create a custom scope
    pub fn custom(name: impl Into<String>, normal: bool, passivating: bool) -> Self {
        Self {
            name: name.into(),
            normal,
            passivating,
        }
    }

    /// Application scope: one shared instance for the whole deployment
    pub fn application() -> Self {
        Self::custom("application", true, false)
    }

    /// Request scope: one instance per logical request
    pub fn request() -> Self {
        Self::custom("request", true, false)
    }

    /// Session scope: one passivation-capable instance per logical session
    pub fn session() -> Self {
        Self::custom("session", true, true)
    }

    /// Conversation scope: passivation-capable, multiple logical contexts may coexist
    pub fn conversation() -> Self {
        Self::custom("conversation", true, true)
    }

    /// Dependent pseudo-scope: a fresh instance per injection point, never cached
    pub fn dependent() -> Self {
        Self::custom("dependent", false, false)
    }

    /// Get the scope name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if instances of this scope are proxied and shared
    pub fn is_normal(&self) -> bool {
        self.normal
    }

    /// Check if this is a pseudo-scope (not proxied, per-injection-point instances)
    pub fn is_pseudo(&self) -> bool {
        !self.normal
    }

    /// Check if instances may be passivated
    pub fn is_passivating(&self) -> bool {
        self.passivating
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::dependent()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
