//! # Validation Rules
//!
//! The atomic validators referenced by rule specs such as `"min:5"`.
//!
//! Every rule is stateless: it receives the field name, the submitted value
//! and the arguments parsed from the spec, and answers pass/fail. Failure
//! messages are fixed templates and are part of the public contract.

use crate::validation::ValidationCode;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// A single validation rule
pub trait Rule: Send + Sync {
    /// Whether `value` satisfies the rule
    fn validate(&self, field: &str, value: &Value, args: &[String]) -> bool;

    /// Failure message for `field`
    fn message(&self, field: &str, args: &[String]) -> String;

    /// Machine-readable category of the failure
    fn code(&self) -> ValidationCode {
        ValidationCode::Custom
    }
}

/// Loose emptiness: null, `false`, zero, `""`, `"0"` and empty collections.
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Numeric values and numeric strings (leading/trailing whitespace allowed).
pub(crate) fn is_numeric_value(value: &Value) -> bool {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    match value {
        Value::Number(_) => true,
        Value::String(s) => NUMERIC
            .get_or_init(|| {
                Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$")
                    .expect("numeric pattern is valid")
            })
            .is_match(s),
        _ => false,
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$",
        )
        .expect("email pattern is valid")
    })
}

/// First argument rendered for messages; empty when absent.
fn first_arg(args: &[String]) -> &str {
    args.first().map_or("", String::as_str)
}

/// Length bound from the first argument.
///
/// A missing argument yields `default`; an argument that is not a
/// non-negative integer yields `None` and the rule fails.
fn length_bound(args: &[String], default: usize) -> Option<usize> {
    match args.first() {
        None => Some(default),
        Some(raw) => raw.trim().parse().ok(),
    }
}

/// `required`: value is not loosely empty
#[derive(Debug, Default, Clone, Copy)]
pub struct RequiredRule;

impl Rule for RequiredRule {
    fn validate(&self, _field: &str, value: &Value, _args: &[String]) -> bool {
        !is_empty_value(value)
    }

    fn message(&self, field: &str, _args: &[String]) -> String {
        format!("The field '{field}' is required.")
    }

    fn code(&self) -> ValidationCode {
        ValidationCode::Required
    }
}

/// `email`: value is a string in address form
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailRule;

impl Rule for EmailRule {
    fn validate(&self, _field: &str, value: &Value, _args: &[String]) -> bool {
        value
            .as_str()
            .is_some_and(|s| s.len() <= 320 && email_pattern().is_match(s))
    }

    fn message(&self, field: &str, _args: &[String]) -> String {
        format!("The field '{field}' must be a valid email address.")
    }

    fn code(&self) -> ValidationCode {
        ValidationCode::InvalidFormat
    }
}

/// `min:n`: string of at least `n` bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct MinRule;

impl Rule for MinRule {
    fn validate(&self, _field: &str, value: &Value, args: &[String]) -> bool {
        match (value.as_str(), length_bound(args, 0)) {
            (Some(s), Some(min)) => s.len() >= min,
            _ => false,
        }
    }

    fn message(&self, field: &str, args: &[String]) -> String {
        format!(
            "The field '{field}' must be at least {} characters long.",
            first_arg(args)
        )
    }

    fn code(&self) -> ValidationCode {
        ValidationCode::TooShort
    }
}

/// `max:n`: string of at most `n` bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxRule;

impl Rule for MaxRule {
    fn validate(&self, _field: &str, value: &Value, args: &[String]) -> bool {
        match (value.as_str(), length_bound(args, usize::MAX)) {
            (Some(s), Some(max)) => s.len() <= max,
            _ => false,
        }
    }

    fn message(&self, field: &str, args: &[String]) -> String {
        format!(
            "The field '{field}' must not exceed {} characters.",
            first_arg(args)
        )
    }

    fn code(&self) -> ValidationCode {
        ValidationCode::TooLong
    }
}

/// `have_numbers`: string containing a decimal digit
#[derive(Debug, Default, Clone, Copy)]
pub struct HasNumberRule;

impl Rule for HasNumberRule {
    fn validate(&self, _field: &str, value: &Value, _args: &[String]) -> bool {
        value
            .as_str()
            .is_some_and(|s| s.bytes().any(|b| b.is_ascii_digit()))
    }

    fn message(&self, field: &str, _args: &[String]) -> String {
        format!("The {field} must contain at least one number.")
    }
}

/// `numeric`: number or numeric string
#[derive(Debug, Default, Clone, Copy)]
pub struct NumericRule;

impl Rule for NumericRule {
    fn validate(&self, _field: &str, value: &Value, _args: &[String]) -> bool {
        is_numeric_value(value)
    }

    fn message(&self, field: &str, _args: &[String]) -> String {
        format!("The field '{field}' must be numeric.")
    }

    fn code(&self) -> ValidationCode {
        ValidationCode::InvalidType
    }
}

/// `special`: string containing a character outside `[A-Za-z0-9_]`
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecialCharacterRule;

impl Rule for SpecialCharacterRule {
    fn validate(&self, _field: &str, value: &Value, _args: &[String]) -> bool {
        value
            .as_str()
            .is_some_and(|s| s.chars().any(|c| !c.is_ascii_alphanumeric() && c != '_'))
    }

    fn message(&self, field: &str, _args: &[String]) -> String {
        format!("The {field} must contain at least one special character (e.g., @, #, $, etc.).")
    }
}

/// `uppercase`: string containing an ASCII capital
#[derive(Debug, Default, Clone, Copy)]
pub struct UppercaseRule;

impl Rule for UppercaseRule {
    fn validate(&self, _field: &str, value: &Value, _args: &[String]) -> bool {
        value
            .as_str()
            .is_some_and(|s| s.bytes().any(|b| b.is_ascii_uppercase()))
    }

    fn message(&self, field: &str, _args: &[String]) -> String {
        format!("The {field} must contain at least one uppercase letter.")
    }
}

/// `confirm:other`: value is exactly the string `other`
///
/// Without an argument only a missing value confirms.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfirmRule;

impl Rule for ConfirmRule {
    fn validate(&self, _field: &str, value: &Value, args: &[String]) -> bool {
        match (value, args.first()) {
            (Value::String(s), Some(expected)) => s == expected,
            (Value::Null, None) => true,
            _ => false,
        }
    }

    fn message(&self, field: &str, _args: &[String]) -> String {
        format!("The {field} does not match the confirmation.")
    }

    fn code(&self) -> ValidationCode {
        ValidationCode::Mismatch
    }
}
