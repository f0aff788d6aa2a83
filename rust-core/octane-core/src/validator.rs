//! # Validator
//!
//! Evaluates field rule lists against submitted data.
//!
//! Rule specs use the compact form `name[:arg1,arg2,...]` and are parsed once
//! when a [`Rules`] map is built. Every spec is resolved against the
//! [`RuleRegistry`] before any value is inspected, so a misspelled rule name
//! fails the whole call regardless of the data.

use crate::error::Result;
use crate::registry::RuleRegistry;
use crate::rules::Rule;
use crate::validation::{FieldError, ValidationErrors};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One parsed rule spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    /// Registry key of the rule
    pub name: String,
    /// Positional arguments
    pub args: Vec<String>,
}

impl RuleSpec {
    /// Build a spec from already separated parts
    ///
    /// Use this when an argument may itself contain `,` or `:`.
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse `name[:arg1,arg2,...]`
    ///
    /// Splits on the first `:`; the remainder is split on `,`.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        match spec.split_once(':') {
            Some((name, rest)) => Self {
                name: name.to_string(),
                args: rest.split(',').map(str::to_string).collect(),
            },
            None => Self {
                name: spec.to_string(),
                args: Vec::new(),
            },
        }
    }
}

impl From<&str> for RuleSpec {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}

impl From<String> for RuleSpec {
    fn from(spec: String) -> Self {
        Self::parse(&spec)
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            write!(f, ":{}", self.args.join(","))?;
        }
        Ok(())
    }
}

/// Ordered field → rule spec list mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules {
    fields: Vec<(String, Vec<RuleSpec>)>,
}

impl Rules {
    /// Create an empty rule map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach specs to `field`
    ///
    /// Repeating a field replaces its specs but keeps its original position.
    #[must_use]
    pub fn field<I, S>(mut self, field: impl Into<String>, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RuleSpec>,
    {
        let field = field.into();
        let specs: Vec<RuleSpec> = specs.into_iter().map(Into::into).collect();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = specs,
            None => self.fields.push((field, specs)),
        }
        self
    }

    /// Iterate `(field, specs)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RuleSpec])> {
        self.fields
            .iter()
            .map(|(field, specs)| (field.as_str(), specs.as_slice()))
    }

    /// Number of fields with rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field has rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Which failing rule's message a field keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first failing rule of a field
    #[default]
    FirstFailure,
    /// Evaluate every rule; the last failure overwrites earlier ones
    LastFailure,
}

/// Rule evaluator bound to a registry
#[derive(Debug, Clone)]
pub struct Validator {
    registry: Arc<RuleRegistry>,
    policy: ErrorPolicy,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(RuleRegistry::with_defaults())
    }
}

impl Validator {
    /// Create a validator over `registry`
    #[must_use]
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            policy: ErrorPolicy::default(),
        }
    }

    /// Select the per-field error policy
    #[must_use]
    pub const fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active error policy
    #[must_use]
    pub const fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Registry this validator resolves names against
    #[must_use]
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Validate `data` against `rules`
    ///
    /// Missing fields are validated as `null`. The returned collection is
    /// empty when every field passes.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownRule` if any spec names an unregistered rule
    pub fn validate(&self, rules: &Rules, data: &Map<String, Value>) -> Result<ValidationErrors> {
        let mut resolved: Vec<(&str, Vec<(Arc<dyn Rule>, &RuleSpec)>)> =
            Vec::with_capacity(rules.len());
        for (field, specs) in rules.iter() {
            let mut checks = Vec::with_capacity(specs.len());
            for spec in specs {
                checks.push((self.registry.resolve(&spec.name)?, spec));
            }
            resolved.push((field, checks));
        }

        let mut errors = ValidationErrors::new();
        for (field, checks) in resolved {
            let value = data.get(field).unwrap_or(&Value::Null);
            for (rule, spec) in checks {
                if rule.validate(field, value, &spec.args) {
                    continue;
                }
                debug!(field = %field, rule = %spec, "validation rule failed");
                errors.set(FieldError::new(
                    field,
                    rule.message(field, &spec.args),
                    rule.code(),
                ));
                if self.policy == ErrorPolicy::FirstFailure {
                    break;
                }
            }
        }
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::validation::ValidationCode;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test data must be an object"),
        }
    }

    #[test]
    fn test_parse_rule_spec() {
        assert_eq!(RuleSpec::parse("required"), RuleSpec::new("required", Vec::<String>::new()));
        assert_eq!(RuleSpec::parse("min:5"), RuleSpec::new("min", ["5"]));
        assert_eq!(RuleSpec::parse("between:1,10"), RuleSpec::new("between", ["1", "10"]));
        assert_eq!(RuleSpec::parse("confirm:a:b"), RuleSpec::new("confirm", ["a:b"]));
        assert_eq!(RuleSpec::parse("confirm:"), RuleSpec::new("confirm", [""]));
        assert_eq!(RuleSpec::parse("min:5").to_string(), "min:5");
    }

    #[test]
    fn test_name_too_short() {
        let rules = Rules::new().field("name", ["required", "min:5", "max:10"]);
        let errors = Validator::default()
            .validate(&rules, &data(json!({"name": "ab"})))
            .unwrap();

        assert_eq!(
            errors.message("name"),
            Some("The field 'name' must be at least 5 characters long.")
        );
        assert_eq!(errors.get("name").map(|e| e.code), Some(ValidationCode::TooShort));
    }

    #[test]
    fn test_valid_password_has_no_entry() {
        let rules = Rules::new().field(
            "password",
            [
                "required",
                "have_numbers",
                "uppercase",
                "min:8",
                "special",
                "confirm:Secret1!",
            ],
        );
        let errors = Validator::default()
            .validate(&rules, &data(json!({"password": "Secret1!"})))
            .unwrap();

        assert!(!errors.has("password"));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_missing_field_is_null() {
        let rules = Rules::new().field("email", ["required", "email"]);
        let errors = Validator::default()
            .validate(&rules, &data(json!({})))
            .unwrap();
        assert_eq!(errors.message("email"), Some("The field 'email' is required."));
    }

    #[test]
    fn test_first_failure_wins_by_default() {
        let rules = Rules::new().field("password", ["have_numbers", "uppercase", "min:8"]);
        let errors = Validator::default()
            .validate(&rules, &data(json!({"password": "abc"})))
            .unwrap();
        assert_eq!(
            errors.message("password"),
            Some("The password must contain at least one number.")
        );
    }

    #[test]
    fn test_last_failure_policy_overwrites() {
        let rules = Rules::new().field("password", ["have_numbers", "uppercase", "min:8"]);
        let validator = Validator::default().with_policy(ErrorPolicy::LastFailure);
        let errors = validator
            .validate(&rules, &data(json!({"password": "abc"})))
            .unwrap();
        assert_eq!(
            errors.message("password"),
            Some("The field 'password' must be at least 8 characters long.")
        );
    }

    #[test]
    fn test_unknown_rule_fails_whole_call() {
        let rules = Rules::new()
            .field("name", ["required"])
            .field("email", ["required", "is_email"]);
        let err = Validator::default()
            .validate(&rules, &data(json!({"name": "", "email": ""})))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRule { ref name } if name == "is_email"));
    }

    #[test]
    fn test_unknown_rule_after_failure_still_reported() {
        let rules = Rules::new().field("name", ["required", "bogus"]);
        let result = Validator::default().validate(&rules, &data(json!({})));
        assert!(result.is_err());
    }

    #[test]
    fn test_multiple_fields_keep_rule_order() {
        let rules = Rules::new()
            .field("name", ["required", "min:5", "max:10"])
            .field("email", ["required", "email"])
            .field("age", ["numeric"]);
        let errors = Validator::default()
            .validate(
                &rules,
                &data(json!({"name": "Alexander", "email": "nope", "age": "x"})),
            )
            .unwrap();

        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "age"]);
        assert_eq!(errors.message("age"), Some("The field 'age' must be numeric."));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let rules = Rules::new()
            .field("name", ["required", "min:5"])
            .field("email", ["email"]);
        let input = data(json!({"name": "ab", "email": "not-an-email"}));
        let validator = Validator::default();

        let first = validator.validate(&rules, &input).unwrap();
        let second = validator.validate(&rules, &input).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_typed_spec_with_comma_argument() {
        let rules = Rules::new().field("password", [RuleSpec::new("confirm", ["a,b"])]);
        let errors = Validator::default()
            .validate(&rules, &data(json!({"password": "a,b"})))
            .unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_repeated_field_replaces_specs_in_place() {
        let rules = Rules::new()
            .field("a", ["required"])
            .field("b", ["required"])
            .field("a", ["numeric"]);
        let fields: Vec<_> = rules.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(rules.iter().next().unwrap().1, &[RuleSpec::parse("numeric")]);
    }
}
