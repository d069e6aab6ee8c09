//! crates/reading_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{Book, BookPatch, CatalogEntry, NewBookRecord, User, UserCredentials};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Timed out waiting for {0}")]
    Timeout(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Book storage. Every operation is scoped to `owner`; a row owned by someone
/// else behaves exactly like a missing row.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// All of the owner's books, most recently created first.
    async fn list_by_owner(&self, owner: Uuid) -> PortResult<Vec<Book>>;

    async fn get_by_id(&self, id: Uuid, owner: Uuid) -> PortResult<Book>;

    /// Stores a new book and returns it with its assigned id and creation time.
    async fn insert(&self, owner: Uuid, record: NewBookRecord) -> PortResult<Book>;

    async fn update_by_id(&self, id: Uuid, owner: Uuid, patch: BookPatch) -> PortResult<Book>;

    /// Fails with `NotFound` when nothing was deleted.
    async fn delete_by_id(&self, id: Uuid, owner: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    // --- User Management ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        name: Option<&str>,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live session to its user; expired sessions are `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait CatalogSearchService: Send + Sync {
    /// Free-text search against the external catalog.
    ///
    /// A failed or malformed response yields an empty list; only a timeout is an error.
    async fn search(&self, query: &str) -> PortResult<Vec<CatalogEntry>>;
}
