use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::container::bean::BeanDefinition;
use crate::errors::DiError;

/// Deployment-level configuration for the engine.
///
/// Alternatives are declared on beans but only win resolution when
/// enabled here, the way a deployment descriptor enables them. A bean is
/// matched by its name or by any of its declared type names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub enabled_alternatives: HashSet<String>,
}

impl DeploymentConfig {
    /// Create an empty configuration (no alternatives enabled)
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable an alternative by bean name or type name
    pub fn enable_alternative(&mut self, key: impl Into<String>) -> &mut Self {
        self.enabled_alternatives.insert(key.into());
        self
    }

    /// Check whether the given alternative bean is enabled
    pub fn alternative_enabled(&self, bean: &BeanDefinition) -> bool {
        if let Some(name) = &bean.name {
            if self.enabled_alternatives.contains(name) {
                return true;
            }
        }
        bean.types
            .iter()
            .any(|t| self.enabled_alternatives.contains(t.type_name))
    }

    /// Parse a configuration from a YAML document
    pub fn from_yaml(source: &str) -> Result<Self, DiError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Parse a configuration from a JSON document
    pub fn from_json(source: &str) -> Result<Self, DiError> {
        Ok(serde_json::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::bean::{BeanDefinition, Instance};
    use std::sync::Arc;

    fn alternative_bean(name: &str) -> Arc<BeanDefinition> {
        BeanDefinition::builder()
            .create(Box::new(|_, _| Ok(Arc::new(()) as Instance)))
            .provides::<u64>()
            .named(name)
            .alternative()
            .build()
            .unwrap()
    }

    #[test]
    fn test_alternative_enabled_by_name() {
        let mut config = DeploymentConfig::new();
        config.enable_alternative("mock-mailer");

        assert!(config.alternative_enabled(&alternative_bean("mock-mailer")));
        assert!(!config.alternative_enabled(&alternative_bean("real-mailer")));
    }

    #[test]
    fn test_alternative_enabled_by_type_name() {
        let mut config = DeploymentConfig::new();
        config.enable_alternative("u64");

        assert!(config.alternative_enabled(&alternative_bean("whatever")));
    }

    #[test]
    fn test_from_yaml() {
        let config =
            DeploymentConfig::from_yaml("enabled_alternatives:\n  - mock-mailer\n").unwrap();
        assert!(config.enabled_alternatives.contains("mock-mailer"));

        let config = DeploymentConfig::from_yaml("{}").unwrap();
        assert!(config.enabled_alternatives.is_empty());
    }

    #[test]
    fn test_from_json() {
        let config =
            DeploymentConfig::from_json(r#"{"enabled_alternatives": ["a", "b"]}"#).unwrap();
        assert_eq!(config.enabled_alternatives.len(), 2);

        assert!(DeploymentConfig::from_json("not json").is_err());
    }
}
