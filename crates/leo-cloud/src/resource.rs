//! Resource reconciliation contract
//!
//! Every provider object a task owns (networks, security policy, identity,
//! credentials, the compute set itself) implements [`Resource`]. Resources
//! follow the lifecycle `absent → create → present → update* → delete →
//! absent`; `read` refreshes a present resource and may also be used to find
//! one created by an earlier process, since names are derived
//! deterministically from the task identifier.

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Create/Read/Update/Delete over one provider object
#[async_trait]
pub trait Resource: Send + Sync {
    /// Provider-facing name, stable for the resource's lifetime
    fn identifier(&self) -> &str;

    /// Create the provider object and read it back. Callers only invoke
    /// this for resources that do not exist yet.
    async fn create(&mut self) -> Result<()>;

    /// Refresh attributes from the provider; fails with
    /// [`CloudError::NotFound`] when the object is absent
    async fn read(&mut self) -> Result<()>;

    /// Re-read, then push mutable attributes to the provider
    async fn update(&mut self) -> Result<()>;

    /// Delete the provider object; absent objects are not an error
    async fn delete(&mut self) -> Result<()>;
}

/// Non-owning reference to a sibling resource
pub type Shared<T> = Arc<RwLock<T>>;

pub fn shared<T>(resource: T) -> Shared<T> {
    Arc::new(RwLock::new(resource))
}

/// Return the live handle of a dependency, or fail with
/// [`CloudError::DependencyNotReady`] naming it
pub fn ready<'a, T>(handle: &'a Option<T>, identifier: &str) -> Result<&'a T> {
    handle
        .as_ref()
        .ok_or_else(|| CloudError::DependencyNotReady(identifier.to_string()))
}

/// Treat "already gone" as success
pub fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(CloudError::NotFound(identifier)) => {
            tracing::debug!("{} is already absent", identifier);
            Ok(())
        }
        other => other,
    }
}
