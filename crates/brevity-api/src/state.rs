//! Shared application state handed to every handler.

use std::sync::Arc;

use brevity_core::{IdentityProvider, NoteEventBus, NoteRepository};
use brevity_db::Database;
use brevity_inference::{StreamingCompletion, SummaryBridge};

use crate::config::ServerConfig;
use crate::services::{AuthService, GoogleOAuth, NoteService};

/// Buffer of the change-event broadcast channel.
const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<NoteService>,
    pub auth: Arc<AuthService>,
    pub summary: SummaryBridge,
    pub events: Arc<NoteEventBus>,
    /// `None` when Google sign-in is not configured.
    pub oauth: Option<Arc<GoogleOAuth>>,
    pub config: Arc<ServerConfig>,
    /// Present when running against PostgreSQL; used by the health check.
    pub db: Option<Database>,
}

impl AppState {
    /// Wire the services over the given collaborators.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        repo: Arc<dyn NoteRepository>,
        completion: Arc<dyn StreamingCompletion>,
    ) -> Self {
        let events = Arc::new(NoteEventBus::new(EVENT_BUS_CAPACITY));
        Self {
            notes: Arc::new(NoteService::new(
                identity.clone(),
                repo,
                events.clone(),
            )),
            auth: Arc::new(AuthService::new(identity)),
            summary: SummaryBridge::new(completion),
            events,
            oauth: None,
            config: Arc::new(ServerConfig::default()),
            db: None,
        }
    }

    /// State backed by PostgreSQL for both notes and identities.
    pub fn from_database(db: Database, completion: Arc<dyn StreamingCompletion>) -> Self {
        let state = Self::new(
            Arc::new(db.identity.clone()),
            Arc::new(db.notes.clone()),
            completion,
        );
        state.with_database(db)
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_google_oauth(mut self, oauth: GoogleOAuth) -> Self {
        self.oauth = Some(Arc::new(oauth));
        self
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}
