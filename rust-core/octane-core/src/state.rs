//! # Service Container
//!
//! Thread-safe, name-keyed storage for application services.
//!
//! The container lives inside [`AppContext`](crate::context::AppContext) and
//! is passed explicitly to handlers; there is no process-wide instance.

use crate::error::{Error, Result};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Service = Arc<dyn Any + Send + Sync>;

/// Name-keyed service store
///
/// # Example
///
/// ```ignore
/// let services = Container::new();
/// services.set("database", pool);
/// let pool = services.get::<DatabasePool>("database")?;
/// ```
#[derive(Clone, Default)]
pub struct Container {
    services: Arc<RwLock<HashMap<String, Service>>>,
}

impl Container {
    /// Create a new empty container
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a service under `name`
    ///
    /// Overwrites any existing service with the same name.
    pub fn set<T: Send + Sync + 'static>(&self, name: impl Into<String>, service: T) {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        services.insert(name.into(), Arc::new(service));
    }

    /// Fetch a shared handle to the service stored under `name`
    ///
    /// # Errors
    ///
    /// Returns `Error::ServiceNotFound` if nothing is stored under `name`
    /// or the stored service is not a `T`
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        services
            .get(name)
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
            .ok_or_else(|| Error::ServiceNotFound {
                name: name.to_string(),
            })
    }

    /// Check if a service exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        services.contains_key(name)
    }

    /// Remove a service by name
    pub fn remove(&self, name: &str) -> bool {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        services.remove(name).is_some()
    }

    /// Get the number of stored services
    #[must_use]
    pub fn len(&self) -> usize {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        services.len()
    }

    /// Check if the container is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = services.keys().collect();
        names.sort();
        f.debug_struct("Container").field("services", &names).finish()
    }
}
