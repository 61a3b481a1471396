//! Input validation schemas for credentials and note fields.
//!
//! Every validator is synchronous, side-effect free, and reports failures as
//! a [`ValidationErrors`] value rather than panicking. Issues are collected in
//! field order so call sites can render the first failing field's message.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{CreateNoteRequest, Credentials, UpdateNoteRequest};

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

/// Minimum password length for registration, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Shared message for the lowercase, uppercase, and digit password rules.
///
/// All three rules report this same text, so the message alone does not say
/// which rule failed.
pub const PASSWORD_RULE_MESSAGE: &str =
    "Password must contain at least one lowercase letter, an uppercase letter, and a number";

const PASSWORD_LENGTH_MESSAGE: &str = "Password must be at least 8 characters long";
const EMAIL_MESSAGE: &str = "Invalid email address";
const TITLE_REQUIRED_MESSAGE: &str = "Title is required";
const TITLE_TOO_LONG_MESSAGE: &str = "Title must be at most 255 characters";
const CONTENT_REQUIRED_MESSAGE: &str = "Content is required";
const EMPTY_PATCH_MESSAGE: &str = "At least one field must be provided";

/// Local part and dotted domain with a 2+ letter TLD.
///
/// Leading dots and consecutive dots are rejected separately in
/// [`is_valid_email`].
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$")
        .expect("email regex is valid")
});

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Ordered list of failed rules. Never empty once constructed by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    issues: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[FieldError] {
        &self.issues
    }

    /// The first failing issue, if any.
    pub fn first(&self) -> Option<&FieldError> {
        self.issues.first()
    }

    pub fn first_message(&self) -> &str {
        self.first().map(|e| e.message.as_str()).unwrap_or("Invalid input")
    }

    /// `Ok(())` when nothing failed, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message())
    }
}

impl std::error::Error for ValidationErrors {}

/// Syntactic email check.
pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_RE.is_match(email)
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if !is_valid_email(email.trim()) {
        errors.push("email", EMAIL_MESSAGE);
    }
}

/// Validate sign-in credentials: a syntactically valid email and any password.
pub fn validate_login(credentials: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, &credentials.email);
    errors.into_result()
}

/// Validate registration credentials.
///
/// On top of the login rules the password needs 8+ characters and at least
/// one lowercase letter, one uppercase letter, and one digit. Each of the last
/// three rules is reported independently with [`PASSWORD_RULE_MESSAGE`].
pub fn validate_registration(credentials: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, &credentials.email);

    let password = credentials.password.as_str();
    if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.push("password", PASSWORD_LENGTH_MESSAGE);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("password", PASSWORD_RULE_MESSAGE);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("password", PASSWORD_RULE_MESSAGE);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("password", PASSWORD_RULE_MESSAGE);
    }
    errors.into_result()
}

fn check_title(errors: &mut ValidationErrors, title: &str) {
    let len = title.chars().count();
    if len == 0 {
        errors.push("title", TITLE_REQUIRED_MESSAGE);
    } else if len > MAX_TITLE_CHARS {
        errors.push("title", TITLE_TOO_LONG_MESSAGE);
    }
}

fn check_content(errors: &mut ValidationErrors, content: &str) {
    if content.trim().is_empty() {
        errors.push("content", CONTENT_REQUIRED_MESSAGE);
    }
}

impl CreateNoteRequest {
    /// Title 1–255 characters, non-empty content. Content has no upper bound.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_title(&mut errors, &self.title);
        check_content(&mut errors, &self.content);
        errors.into_result()
    }
}

impl UpdateNoteRequest {
    /// Provided fields follow the creation rules; an empty patch is rejected.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.is_empty() {
            errors.push("note", EMPTY_PATCH_MESSAGE);
            return errors.into_result();
        }
        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        if let Some(content) = &self.content {
            check_content(&mut errors, content);
        }
        errors.into_result()
    }
}
