//! Hosted backend access: the task table and the identity provider.

pub mod memory;
pub mod rest;

use crate::auth::Session;
use crate::error::Result;
use crate::listing::TaskQuery;
use crate::record::{TaskId, TaskPayload, TaskRecord};

pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// Reads and writes task rows on behalf of a signed-in session.
pub trait TaskGateway: Send + Sync {
    /// Rows newest deployment first, limited by `query.since` when set.
    fn list(&self, session: &Session, query: &TaskQuery) -> Result<Vec<TaskRecord>>;

    fn create(&self, session: &Session, payload: &TaskPayload) -> Result<TaskRecord>;

    fn update(&self, session: &Session, id: &TaskId, payload: &TaskPayload) -> Result<TaskRecord>;

    fn delete(&self, session: &Session, id: &TaskId) -> Result<()>;
}

/// A backend that is both the task table and the identity provider.
pub trait Backend: TaskGateway + crate::auth::IdentityProvider {
    fn gateway(&self) -> &dyn TaskGateway;

    fn identity(&self) -> &dyn crate::auth::IdentityProvider;
}

impl<T: TaskGateway + crate::auth::IdentityProvider> Backend for T {
    fn gateway(&self) -> &dyn TaskGateway {
        self
    }

    fn identity(&self) -> &dyn crate::auth::IdentityProvider {
        self
    }
}
