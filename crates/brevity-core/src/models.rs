//! Data models for notes and callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A single note owned by exactly one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub summary: Option<String>,
    /// Set at creation, never changes.
    pub owner_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
    /// Refreshed on every mutation.
    pub updated_at_utc: DateTime<Utc>,
}

/// Request for creating a new note.
#[derive(Debug, Clone, Default)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
}

/// Partial update of a note.
///
/// `None` leaves a field untouched. For `summary`, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<Option<String>>,
}

impl UpdateNoteRequest {
    /// True when no field is provided.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.summary.is_none()
    }
}

/// Request for listing notes.
#[derive(Debug, Clone, Default)]
pub struct ListNotesRequest {
    /// Case-insensitive substring matched against title, content, or summary.
    pub query: Option<String>,
}

impl ListNotesRequest {
    /// The query with surrounding whitespace removed, if it is non-blank.
    pub fn normalized_query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

impl Note {
    /// Whether this note matches a lowercase search term.
    pub fn matches(&self, needle_lower: &str) -> bool {
        let hit = |s: &str| s.to_lowercase().contains(needle_lower);
        self.title.as_deref().is_some_and(hit)
            || hit(&self.content)
            || self.summary.as_deref().is_some_and(hit)
    }
}

// =============================================================================
// IDENTITY TYPES
// =============================================================================

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: Uuid,
    pub email: String,
}

/// Email and password pair. Never persisted in plain form.
#[derive(Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Email lowercased and trimmed, as stored by identity providers.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// An issued session.
///
/// `token` is only ever returned to the client; providers store a digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub caller: Caller,
    pub expires_at_utc: DateTime<Utc>,
}
