//! HTTP handlers for brevity-api.

pub mod auth;
pub mod events;
pub mod health;
pub mod notes;
pub mod summary;
