//! In-memory implementations of the storage and identity traits.
//!
//! Used by tests and local development. State lives in the instance, never
//! in a process-wide static, and every access goes through a mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use brevity_core::{
    new_v7, normalize_email, Caller, CreateNoteRequest, Credentials, Error, IdentityProvider,
    ListNotesRequest, Note, NoteRepository, Result, Session, UpdateNoteRequest,
};

use crate::identity::DEFAULT_SESSION_TTL_HOURS;
use crate::secrets::{
    generate_session_token, DecoyHash, hash_password_blocking, hash_session_token, verify_password_blocking,
    PasswordParams,
};

fn lock_poisoned() -> Error {
    Error::Internal("in-memory store lock poisoned".to_string())
}

// =============================================================================
// NOTES
// =============================================================================

/// Note storage backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryNoteRepository {
    notes: Mutex<HashMap<Uuid, Note>>,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total notes across all owners.
    pub fn len(&self) -> usize {
        self.notes.lock().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn list(&self, owner: Uuid, req: ListNotesRequest) -> Result<Vec<Note>> {
        let needle = req.normalized_query().map(str::to_lowercase);
        let notes = self.notes.lock().map_err(|_| lock_poisoned())?;

        let mut result: Vec<Note> = notes
            .values()
            .filter(|n| n.owner_id == owner)
            .filter(|n| needle.as_deref().map_or(true, |q| n.matches(q)))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            b.updated_at_utc
                .cmp(&a.updated_at_utc)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(result)
    }

    async fn fetch(&self, owner: Uuid, id: Uuid) -> Result<Note> {
        let notes = self.notes.lock().map_err(|_| lock_poisoned())?;
        notes
            .get(&id)
            .filter(|n| n.owner_id == owner)
            .cloned()
            .ok_or_else(Error::note_not_found)
    }

    async fn insert(&self, owner: Uuid, req: CreateNoteRequest) -> Result<Note> {
        let now = Utc::now();
        let note = Note {
            id: new_v7(),
            title: Some(req.title),
            content: req.content,
            summary: req.summary,
            owner_id: owner,
            created_at_utc: now,
            updated_at_utc: now,
        };
        let mut notes = self.notes.lock().map_err(|_| lock_poisoned())?;
        notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update(&self, owner: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        let mut notes = self.notes.lock().map_err(|_| lock_poisoned())?;
        let note = notes
            .get_mut(&id)
            .filter(|n| n.owner_id == owner)
            .ok_or_else(Error::note_not_found)?;

        if let Some(title) = req.title {
            note.title = Some(title);
        }
        if let Some(content) = req.content {
            note.content = content;
        }
        if let Some(summary) = req.summary {
            note.summary = summary;
        }
        note.updated_at_utc = std::cmp::max(
            Utc::now(),
            note.updated_at_utc + Duration::microseconds(1),
        );
        Ok(note.clone())
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()> {
        let mut notes = self.notes.lock().map_err(|_| lock_poisoned())?;
        match notes.get(&id) {
            Some(n) if n.owner_id == owner => {
                notes.remove(&id);
                Ok(())
            }
            _ => Err(Error::note_not_found()),
        }
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

struct StoredUser {
    caller: Caller,
    password_hash: Option<String>,
}

struct StoredSession {
    user_id: Uuid,
    expires_at_utc: DateTime<Utc>,
}

#[derive(Default)]
struct IdentityState {
    /// Keyed by normalized email.
    users: HashMap<String, StoredUser>,
    /// Keyed by token digest.
    sessions: HashMap<String, StoredSession>,
}

/// Identity provider that keeps accounts and sessions in memory.
///
/// Uses low-cost Argon2 parameters so sign-up in tests stays fast.
pub struct InMemoryIdentityProvider {
    state: Mutex<IdentityState>,
    session_ttl: Duration,
    password_params: PasswordParams,
    decoy: DecoyHash,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        let password_params = PasswordParams::low_cost();
        Self {
            state: Mutex::new(IdentityState::default()),
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            password_params,
            decoy: DecoyHash::new(password_params),
        }
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    fn open_session(&self, caller: Caller) -> Result<Session> {
        let token = generate_session_token();
        let now = Utc::now();
        let expires_at_utc = now + self.session_ttl;
        let mut state = self.state.lock().map_err(|_| lock_poisoned())?;
        state.sessions.retain(|_, s| s.expires_at_utc > now);
        state.sessions.insert(
            hash_session_token(&token),
            StoredSession {
                user_id: caller.id,
                expires_at_utc,
            },
        );
        Ok(Session {
            token,
            caller,
            expires_at_utc,
        })
    }

    /// Number of stored sessions, expired ones included until they are swept.
    pub fn session_count(&self) -> usize {
        self.state.lock().map(|s| s.sessions.len()).unwrap_or(0)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn current_caller(&self, token: &str) -> Result<Caller> {
        let digest = hash_session_token(token);
        let mut state = self.state.lock().map_err(|_| lock_poisoned())?;
        let session = state
            .sessions
            .get(&digest)
            .ok_or_else(Error::not_authenticated)?;
        if session.expires_at_utc <= Utc::now() {
            state.sessions.remove(&digest);
            return Err(Error::not_authenticated());
        }
        let user_id = session.user_id;
        state
            .users
            .values()
            .find(|u| u.caller.id == user_id)
            .map(|u| u.caller.clone())
            .ok_or_else(Error::not_authenticated)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let account = {
            let state = self.state.lock().map_err(|_| lock_poisoned())?;
            state
                .users
                .get(&credentials.normalized_email())
                .and_then(|u| Some((u.caller.clone(), u.password_hash.clone()?)))
        };
        let Some((caller, hash)) = account else {
            self.decoy.verify(credentials.password.clone()).await?;
            return Err(Error::invalid_credentials());
        };
        if !verify_password_blocking(credentials.password.clone(), hash).await? {
            return Err(Error::invalid_credentials());
        }
        self.open_session(caller)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Session> {
        let email = credentials.normalized_email();
        let hash =
            hash_password_blocking(credentials.password.clone(), self.password_params).await?;

        let caller = {
            let mut state = self.state.lock().map_err(|_| lock_poisoned())?;
            if state.users.contains_key(&email) {
                return Err(Error::duplicate_email());
            }
            let caller = Caller {
                id: new_v7(),
                email: email.clone(),
            };
            state.users.insert(
                email,
                StoredUser {
                    caller: caller.clone(),
                    password_hash: Some(hash),
                },
            );
            caller
        };
        self.open_session(caller)
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| lock_poisoned())?;
        state.sessions.remove(&hash_session_token(token));
        Ok(())
    }

    async fn sign_in_external(&self, _provider: &str, email: &str) -> Result<Session> {
        let email = normalize_email(email);
        let caller = {
            let mut state = self.state.lock().map_err(|_| lock_poisoned())?;
            state
                .users
                .entry(email.clone())
                .or_insert_with(|| StoredUser {
                    caller: Caller {
                        id: new_v7(),
                        email,
                    },
                    password_hash: None,
                })
                .caller
                .clone()
        };
        self.open_session(caller)
    }

    async fn purge_expired_sessions(&self) -> Result<u64> {
        let now = Utc::now();
        let mut state = self.state.lock().map_err(|_| lock_poisoned())?;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.expires_at_utc > now);
        Ok((before - state.sessions.len()) as u64)
    }
}
