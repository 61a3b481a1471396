//! Service layer for business logic.

pub mod auth_service;
pub mod note_service;
pub mod oauth;

pub use auth_service::AuthService;
pub use note_service::NoteService;
pub use oauth::{GoogleOAuth, GoogleOAuthConfig};
