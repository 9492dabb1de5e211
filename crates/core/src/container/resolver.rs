use std::collections::HashSet;
use std::sync::Arc;

use crate::config::DeploymentConfig;
use crate::container::bean::{BeanDefinition, BeanId, BeanKind, Qualifier, TypeKey};
use crate::container::injection::InjectionPoint;
use crate::container::registry::BeanRegistry;
use crate::errors::DiError;

/// Pure query engine over the bean registry: type/qualifier matching,
/// name lookup, and alternative/specialization tie-breaking.
#[derive(Debug)]
pub struct InjectionResolver {
    registry: Arc<BeanRegistry>,
}

impl InjectionResolver {
    /// Create a resolver over a registry
    pub fn new(registry: Arc<BeanRegistry>) -> Self {
        Self { registry }
    }

    /// Return every bean whose declared type set contains `ty` and whose
    /// qualifier set is a superset of the requested qualifiers. An empty
    /// request implies the default qualifier. Interceptor and decorator
    /// beans never take part in typesafe resolution.
    pub fn resolve_by_type(
        &self,
        ty: &TypeKey,
        qualifiers: &[Qualifier],
    ) -> Vec<Arc<BeanDefinition>> {
        let effective: Vec<Qualifier> = if qualifiers.is_empty() {
            vec![Qualifier::default_qualifier()]
        } else {
            qualifiers.to_vec()
        };

        let candidates: Vec<_> = self
            .registry
            .all_beans()
            .into_iter()
            .filter(|bean| {
                !matches!(bean.kind, BeanKind::Interceptor | BeanKind::Decorator)
                    && bean.has_type(ty)
                    && bean.has_qualifiers(&effective)
            })
            .collect();

        tracing::trace!(
            "resolve_by_type {} matched {} candidate(s)",
            ty.type_name(),
            candidates.len()
        );
        candidates
    }

    /// Name-indexed lookup
    pub fn resolve_by_name(&self, name: &str) -> Vec<Arc<BeanDefinition>> {
        self.registry
            .all_beans()
            .into_iter()
            .filter(|bean| bean.name.as_deref() == Some(name))
            .collect()
    }

    /// Pick exactly one bean from a candidate set.
    ///
    /// The order is significant and must not change:
    /// 1. a single candidate wins outright;
    /// 2. enabled alternatives, if any exist among the candidates, narrow
    ///    the set;
    /// 3. specialization elimination runs to a fixpoint;
    /// 4. anything still plural is ambiguous; an empty result is
    ///    unsatisfied.
    pub fn resolve(
        &self,
        candidates: Vec<Arc<BeanDefinition>>,
        config: &DeploymentConfig,
        requested: &str,
    ) -> Result<Arc<BeanDefinition>, DiError> {
        if candidates.is_empty() {
            return Err(DiError::unsatisfied(requested));
        }
        if let [bean] = candidates.as_slice() {
            return Ok(bean.clone());
        }

        let alternatives: Vec<_> = candidates
            .iter()
            .filter(|bean| bean.alternative && config.alternative_enabled(bean))
            .cloned()
            .collect();

        let mut set = if alternatives.is_empty() {
            candidates
        } else {
            alternatives
        };

        if set.len() > 1 {
            set = Self::eliminate_specialized(set);
        }

        if set.len() > 1 {
            let labels = set
                .iter()
                .map(|b| b.label())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DiError::ambiguous(requested, labels));
        }
        // an empty set means specialization removed every remaining candidate
        set.pop().ok_or_else(|| DiError::unsatisfied(requested))
    }

    /// A specializer eliminates the bean it specializes from the set;
    /// repeat until no further eliminations occur
    fn eliminate_specialized(mut set: Vec<Arc<BeanDefinition>>) -> Vec<Arc<BeanDefinition>> {
        loop {
            let ids: HashSet<BeanId> = set.iter().map(|b| b.id).collect();
            let eliminated = set.iter().find_map(|bean| {
                bean.specializes
                    .filter(|target| *target != bean.id && ids.contains(target))
            });

            match eliminated {
                Some(target) => set.retain(|b| b.id != target),
                None => return set,
            }
        }
    }

    /// Resolve the single bean for an injection point
    pub fn injection_point_bean(
        &self,
        injection_point: &InjectionPoint,
        config: &DeploymentConfig,
    ) -> Result<Arc<BeanDefinition>, DiError> {
        let candidates =
            self.resolve_by_type(&injection_point.required_type, &injection_point.qualifiers);
        self.resolve(
            candidates,
            config,
            injection_point.required_type.type_name(),
        )
    }

    /// Resolve a single bean by name; more than one named match is ambiguous
    pub fn single_by_name(&self, name: &str) -> Result<Arc<BeanDefinition>, DiError> {
        let mut set = self.resolve_by_name(name);
        match set.len() {
            0 => Err(DiError::unsatisfied(format!("name '{name}'"))),
            1 => Ok(set.remove(0)),
            _ => {
                let labels = set
                    .iter()
                    .map(|b| b.label())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(DiError::ambiguous(format!("name '{name}'"), labels))
            }
        }
    }
}
