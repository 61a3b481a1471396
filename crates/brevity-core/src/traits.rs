//! Core traits for brevity abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, so the same call sites run against PostgreSQL or the
//! in-memory doubles used in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Owner-scoped note storage.
///
/// Every method takes the owner explicitly and implementations must apply
/// `owner_id = owner` inside the store itself. A row owned by someone else is
/// reported exactly like a missing row: [`crate::Error::NotFound`].
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// All notes of `owner`, most recently updated first.
    async fn list(&self, owner: Uuid, req: ListNotesRequest) -> Result<Vec<Note>>;

    /// Fetch a single note by id and owner.
    async fn fetch(&self, owner: Uuid, id: Uuid) -> Result<Note>;

    /// Insert a note; the store assigns the id and both timestamps.
    async fn insert(&self, owner: Uuid, req: CreateNoteRequest) -> Result<Note>;

    /// Apply the provided fields and advance `updated_at_utc` strictly forward.
    async fn update(&self, owner: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note>;

    /// Permanently remove a note.
    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()>;
}

// =============================================================================
// IDENTITY PROVIDER TRAITS
// =============================================================================

/// Authentication capability used by the data-access layer.
///
/// Collapses every identity backend behind one shape so nothing above this
/// trait depends on a specific provider's types.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a session token to its caller.
    ///
    /// Unknown or expired tokens fail with [`crate::Error::Unauthenticated`].
    async fn current_caller(&self, token: &str) -> Result<Caller>;

    /// Sign in with email and password and open a session.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session>;

    /// Register a new account and open a session.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Session>;

    /// End a session. Unknown tokens are ignored.
    async fn sign_out(&self, token: &str) -> Result<()>;

    /// Open a session for an email verified by a third-party provider,
    /// creating the account on first sight.
    async fn sign_in_external(&self, provider: &str, email: &str) -> Result<Session>;

    /// Drop every session whose expiry has passed. Returns the number removed.
    async fn purge_expired_sessions(&self) -> Result<u64>;
}
