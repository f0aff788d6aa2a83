//! # Application Context
//!
//! Everything a handler may need, built once at startup and passed by
//! reference into every dispatch.

use crate::config::AppConfig;
use crate::state::Container;
use crate::validator::Validator;

/// Shared, read-mostly application context
#[derive(Debug, Clone, Default)]
pub struct AppContext {
    config: AppConfig,
    validator: Validator,
    services: Container,
}

impl AppContext {
    /// Create a context with the built-in rule set
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            validator: Validator::default(),
            services: Container::new(),
        }
    }

    /// Replace the validator (custom registry or error policy)
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Application configuration
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Field validator
    #[must_use]
    pub const fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Named services
    #[must_use]
    pub const fn services(&self) -> &Container {
        &self.services
    }
}
