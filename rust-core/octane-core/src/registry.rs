//! # Rule Registry
//!
//! Maps rule names used in rule specs to rule implementations.
//!
//! The registry is filled once while the application is built and is
//! read-only afterwards, so it can be shared between workers without locks.

use crate::error::{Error, Result};
use crate::rules::{
    ConfirmRule, EmailRule, HasNumberRule, MaxRule, MinRule, NumericRule, RequiredRule, Rule,
    SpecialCharacterRule, UppercaseRule,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name → rule lookup table
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Create a registry with no rules
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in rule set
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("required", RequiredRule);
        registry.register("email", EmailRule);
        registry.register("max", MaxRule);
        registry.register("min", MinRule);
        registry.register("have_numbers", HasNumberRule);
        registry.register("numeric", NumericRule);
        registry.register("confirm", ConfirmRule);
        registry.register("special", SpecialCharacterRule);
        registry.register("uppercase", UppercaseRule);
        registry
    }

    /// Add or replace the rule stored under `name`
    pub fn register<R: Rule + 'static>(&mut self, name: impl Into<String>, rule: R) -> &mut Self {
        self.rules.insert(name.into(), Arc::new(rule));
        self
    }

    /// Resolve a rule name
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownRule` if no rule is registered under `name`
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Rule>> {
        self.rules
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownRule {
                name: name.to_string(),
            })
    }

    /// Whether a rule is registered under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Registered rule names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}
