//! Note HTTP handlers.
//!
//! All routes are scoped to the caller behind the bearer token. A note that
//! belongs to someone else, or an id that is not a UUID, is a plain 404.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer};

use brevity_core::{CreateNoteRequest, ListNotesRequest, Note, UpdateNoteRequest};

use crate::extract::BearerToken;
use crate::{ApiError, AppState};

/// Query parameters for listing notes.
#[derive(Debug, Default, Deserialize)]
pub struct ListNotesQuery {
    /// Case-insensitive substring of title, content or summary
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
}

impl From<CreateNoteBody> for CreateNoteRequest {
    fn from(body: CreateNoteBody) -> Self {
        CreateNoteRequest {
            title: body.title.unwrap_or_default(),
            content: body.content.unwrap_or_default(),
            summary: body.summary,
        }
    }
}

/// Partial update. An absent `summary` is left alone; `null` clears it.
#[derive(Debug, Deserialize)]
pub struct UpdateNoteBody {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub summary: Option<Option<String>>,
}

impl From<UpdateNoteBody> for UpdateNoteRequest {
    fn from(body: UpdateNoteBody) -> Self {
        UpdateNoteRequest {
            title: body.title,
            content: body.content,
            summary: body.summary,
        }
    }
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// List the caller's notes, most recently updated first.
///
/// # Query Parameters
/// - `q`: substring filter (optional)
///
/// # Returns
/// - 200 OK with an array of notes
/// - 401 Unauthorized without a live session
pub async fn list_notes(
    State(state): State<AppState>,
    token: BearerToken,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state
        .notes
        .list(token.as_deref(), ListNotesRequest { query: query.q })
        .await?;
    Ok(Json(notes))
}

/// Get one note.
///
/// # Returns
/// - 200 OK with the note
/// - 401 Unauthorized without a live session
/// - 404 Not Found if the note does not exist for this caller
pub async fn get_note(
    State(state): State<AppState>,
    token: BearerToken,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let note = state.notes.get(token.as_deref(), &id).await?;
    Ok(Json(note))
}

/// Create a note.
///
/// # Returns
/// - 201 Created with the stored note
/// - 401 Unauthorized without a live session
/// - 422 Unprocessable Entity with `{ error, field }` on invalid input
pub async fn create_note(
    State(state): State<AppState>,
    token: BearerToken,
    body: Result<Json<CreateNoteBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let Json(body) = body?;
    let note = state.notes.create(token.as_deref(), body.into()).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// Apply a partial update.
///
/// # Returns
/// - 200 OK with the updated note
/// - 401 Unauthorized without a live session
/// - 404 Not Found if the note does not exist for this caller
/// - 422 Unprocessable Entity on invalid input or an empty patch
pub async fn update_note(
    State(state): State<AppState>,
    token: BearerToken,
    Path(id): Path<String>,
    body: Result<Json<UpdateNoteBody>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Json(body) = body?;
    let note = state
        .notes
        .update(token.as_deref(), &id, body.into())
        .await?;
    Ok(Json(note))
}

/// Delete a note permanently.
///
/// # Returns
/// - 204 No Content
/// - 401 Unauthorized without a live session
/// - 404 Not Found if the note does not exist for this caller, including a
///   second delete of the same id
pub async fn delete_note(
    State(state): State<AppState>,
    token: BearerToken,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.notes.delete(token.as_deref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
