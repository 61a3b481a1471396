//! # brevity-core
//!
//! Core types, traits, and abstractions for the brevity notes service.
//!
//! This crate provides the note and identity models, the input validation
//! schemas, the error taxonomy shared by every layer, and the trait seams
//! (`NoteRepository`, `IdentityProvider`) that storage backends implement.

pub mod error;
pub mod events;
pub mod models;
pub mod traits;
pub mod uuid_utils;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{
    Error, ErrorKind, Result, STREAM_INTERRUPTED_USER_MESSAGE, UPSTREAM_USER_MESSAGE,
};
pub use events::{EventEnvelope, NoteEvent, NoteEventBus};
pub use models::*;
pub use traits::*;
pub use uuid_utils::{new_v7, parse_id};
pub use validation::{
    is_valid_email, validate_login, validate_registration, FieldError, ValidationErrors,
    MAX_TITLE_CHARS, MIN_PASSWORD_CHARS, PASSWORD_RULE_MESSAGE,
};
