//! Note repository implementation.
//!
//! Every statement runs inside a transaction that first pins
//! `brevity.owner_id` for the row-level security policy on `note`, and every
//! statement also filters on `owner_id` itself. Either guard alone keeps other
//! owners' rows invisible.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use brevity_core::{
    new_v7, CreateNoteRequest, Error, ListNotesRequest, Note, NoteRepository, Result,
    UpdateNoteRequest,
};

use crate::escape_like;

const NOTE_COLUMNS: &str =
    "id, title, content, summary, owner_id, created_at_utc, updated_at_utc";

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a transaction scoped to `owner` for row-level security.
    async fn begin_scoped(&self, owner: Uuid) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query("SELECT set_config('brevity.owner_id', $1, true)")
            .bind(owner.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        Ok(tx)
    }

    fn map_row(row: &PgRow) -> Note {
        Note {
            id: row.get("id"),
            title: row.get("title"),
            content: row.get("content"),
            summary: row.get("summary"),
            owner_id: row.get("owner_id"),
            created_at_utc: row.get("created_at_utc"),
            updated_at_utc: row.get("updated_at_utc"),
        }
    }

    /// List notes within an existing owner-scoped transaction.
    pub async fn list_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: Uuid,
        req: &ListNotesRequest,
    ) -> Result<Vec<Note>> {
        let rows = match req.normalized_query() {
            Some(q) => {
                let pattern = format!("%{}%", escape_like(q));
                let sql = format!(
                    "SELECT {NOTE_COLUMNS} FROM note
                     WHERE owner_id = $1
                       AND (title ILIKE $2 ESCAPE '\\'
                            OR content ILIKE $2 ESCAPE '\\'
                            OR summary ILIKE $2 ESCAPE '\\')
                     ORDER BY updated_at_utc DESC, id DESC"
                );
                sqlx::query(&sql)
                    .bind(owner)
                    .bind(pattern)
                    .fetch_all(&mut **tx)
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT {NOTE_COLUMNS} FROM note
                     WHERE owner_id = $1
                     ORDER BY updated_at_utc DESC, id DESC"
                );
                sqlx::query(&sql).bind(owner).fetch_all(&mut **tx).await
            }
        }
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::map_row).collect())
    }

    /// Fetch a note within an existing owner-scoped transaction.
    pub async fn fetch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: Uuid,
        id: Uuid,
    ) -> Result<Note> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM note WHERE id = $1 AND owner_id = $2");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .ok_or_else(Error::note_not_found)?;
        Ok(Self::map_row(&row))
    }

    /// Insert a note within an existing owner-scoped transaction.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: Uuid,
        req: CreateNoteRequest,
    ) -> Result<Note> {
        let sql = format!(
            "INSERT INTO note (id, title, content, summary, owner_id, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, now(), now())
             RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(new_v7())
            .bind(req.title)
            .bind(req.content)
            .bind(req.summary)
            .bind(owner)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(Self::map_row(&row))
    }

    /// Apply a partial update within an existing owner-scoped transaction.
    ///
    /// `updated_at_utc` moves to `now()` or one microsecond past its previous
    /// value, whichever is later, so it strictly increases on every update.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: Uuid,
        id: Uuid,
        req: UpdateNoteRequest,
    ) -> Result<Note> {
        let set_summary = req.summary.is_some();
        let summary = req.summary.flatten();

        let sql = format!(
            "UPDATE note SET
                 title = COALESCE($3, title),
                 content = COALESCE($4, content),
                 summary = CASE WHEN $5 THEN $6 ELSE summary END,
                 updated_at_utc = GREATEST(now(), updated_at_utc + interval '1 microsecond')
             WHERE id = $1 AND owner_id = $2
             RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .bind(req.title)
            .bind(req.content)
            .bind(set_summary)
            .bind(summary)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .ok_or_else(Error::note_not_found)?;
        Ok(Self::map_row(&row))
    }

    /// Delete a note within an existing owner-scoped transaction.
    pub async fn delete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: Uuid,
        id: Uuid,
    ) -> Result<()> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::note_not_found());
        }
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list(&self, owner: Uuid, req: ListNotesRequest) -> Result<Vec<Note>> {
        let mut tx = self.begin_scoped(owner).await?;
        let notes = self.list_tx(&mut tx, owner, &req).await?;
        tx.commit().await.map_err(Error::Database)?;
        debug!(
            subsystem = "database",
            component = "notes",
            op = "list",
            owner_id = %owner,
            result_count = notes.len(),
            "Listed notes"
        );
        Ok(notes)
    }

    async fn fetch(&self, owner: Uuid, id: Uuid) -> Result<Note> {
        let mut tx = self.begin_scoped(owner).await?;
        let note = self.fetch_tx(&mut tx, owner, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(note)
    }

    async fn insert(&self, owner: Uuid, req: CreateNoteRequest) -> Result<Note> {
        let mut tx = self.begin_scoped(owner).await?;
        let note = self.insert_tx(&mut tx, owner, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        debug!(
            subsystem = "database",
            component = "notes",
            op = "insert",
            note_id = %note.id,
            "Inserted note"
        );
        Ok(note)
    }

    async fn update(&self, owner: Uuid, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        let mut tx = self.begin_scoped(owner).await?;
        let note = self.update_tx(&mut tx, owner, id, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(note)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.begin_scoped(owner).await?;
        self.delete_tx(&mut tx, owner, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
