//! Owner-scoped note operations.
//!
//! Every operation resolves the session token to a caller first, so a missing
//! or stale session fails uniformly before any input is looked at. Input is
//! validated next, then the repository runs the owner-scoped statement and a
//! change event is emitted for the caller's subscribers.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use brevity_core::{
    parse_id, Caller, CreateNoteRequest, Error, IdentityProvider, ListNotesRequest, Note,
    NoteEvent, NoteEventBus, NoteRepository, Result, UpdateNoteRequest,
};

/// Data-access operations for notes.
#[derive(Clone)]
pub struct NoteService {
    identity: Arc<dyn IdentityProvider>,
    repo: Arc<dyn NoteRepository>,
    events: Arc<NoteEventBus>,
}

impl NoteService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        repo: Arc<dyn NoteRepository>,
        events: Arc<NoteEventBus>,
    ) -> Self {
        Self {
            identity,
            repo,
            events,
        }
    }

    async fn authenticate(&self, token: Option<&str>) -> Result<Caller> {
        match token {
            Some(token) => self.identity.current_caller(token).await,
            None => Err(Error::not_authenticated()),
        }
    }

    pub async fn list(&self, token: Option<&str>, req: ListNotesRequest) -> Result<Vec<Note>> {
        let caller = self.authenticate(token).await?;
        let start = Instant::now();
        let notes = self.repo.list(caller.id, req).await?;
        debug!(
            subsystem = "api",
            component = "notes",
            op = "list",
            owner_id = %caller.id,
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed notes"
        );
        Ok(notes)
    }

    /// Fetch one note. A malformed id is reported exactly like a missing one.
    pub async fn get(&self, token: Option<&str>, raw_id: &str) -> Result<Note> {
        let caller = self.authenticate(token).await?;
        let id = parse_id(raw_id).ok_or_else(Error::note_not_found)?;
        self.repo.fetch(caller.id, id).await
    }

    pub async fn create(&self, token: Option<&str>, req: CreateNoteRequest) -> Result<Note> {
        let caller = self.authenticate(token).await?;
        req.validate()?;

        let note = self.repo.insert(caller.id, req).await?;
        info!(
            subsystem = "api",
            component = "notes",
            op = "insert",
            owner_id = %caller.id,
            note_id = %note.id,
            "Note created"
        );
        self.events
            .emit(caller.id, NoteEvent::NoteCreated { note_id: note.id });
        Ok(note)
    }

    pub async fn update(
        &self,
        token: Option<&str>,
        raw_id: &str,
        req: UpdateNoteRequest,
    ) -> Result<Note> {
        let caller = self.authenticate(token).await?;
        req.validate()?;
        let id = parse_id(raw_id).ok_or_else(Error::note_not_found)?;

        let note = self.repo.update(caller.id, id, req).await?;
        info!(
            subsystem = "api",
            component = "notes",
            op = "update",
            owner_id = %caller.id,
            note_id = %note.id,
            "Note updated"
        );
        self.events
            .emit(caller.id, NoteEvent::NoteUpdated { note_id: note.id });
        Ok(note)
    }

    pub async fn delete(&self, token: Option<&str>, raw_id: &str) -> Result<()> {
        let caller = self.authenticate(token).await?;
        let id = parse_id(raw_id).ok_or_else(Error::note_not_found)?;

        self.repo.delete(caller.id, id).await?;
        info!(
            subsystem = "api",
            component = "notes",
            op = "delete",
            owner_id = %caller.id,
            note_id = %id,
            "Note deleted"
        );
        self.events
            .emit(caller.id, NoteEvent::NoteDeleted { note_id: id });
        Ok(())
    }
}
