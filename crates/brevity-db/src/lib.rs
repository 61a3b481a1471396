//! # brevity-db
//!
//! PostgreSQL storage and identity layer for brevity.
//!
//! This crate provides:
//! - Connection pool setup and occupancy stats
//! - `PgNoteRepository`, owner-scoped by row-level security and an explicit predicate
//! - `PgIdentityProvider`, with Argon2id passwords and hashed session tokens
//! - In-memory doubles of both, used by tests and local development
//!
//! ## Example
//!
//! ```rust,ignore
//! use brevity_db::{Database, NoteRepository, CreateNoteRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/brevity").await?;
//!
//!     let note = db.notes.insert(owner_id, CreateNoteRequest {
//!         title: "Groceries".to_string(),
//!         content: "Milk, eggs".to_string(),
//!         summary: None,
//!     }).await?;
//!
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```
pub mod identity;
pub mod memory;
pub mod notes;
pub mod pool;
pub mod secrets;

// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use brevity_core::*;

pub use identity::{PgIdentityProvider, DEFAULT_SESSION_TTL_HOURS};
pub use memory::{InMemoryIdentityProvider, InMemoryNoteRepository};
pub use notes::PgNoteRepository;
pub use pool::{connect_pool, PoolConfig, PoolStats};
pub use secrets::PasswordParams;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database handle with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note repository for CRUD operations.
    pub notes: PgNoteRepository,
    /// Accounts and sessions.
    pub identity: PgIdentityProvider,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            identity: PgIdentityProvider::new(pool.clone()),
            pool,
        }
    }

    /// Replace the session lifetime used by the identity provider.
    pub fn with_session_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.identity = self.identity.with_session_ttl(ttl);
        self
    }

    /// Connect with the default pool settings.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, PoolConfig::default()).await
    }

    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = connect_pool(url, &config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Round-trip a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Current pool occupancy.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats::of(&self.pool)
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
