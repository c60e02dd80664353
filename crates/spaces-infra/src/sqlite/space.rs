//! SQLite space repository implementation.
//!
//! Implements `SpaceRepository` from `spaces-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, reads on the reader
//! pool and writes on the writer pool.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (UTC, microseconds)
//! so lexical order matches chronological order. Turns sharing a timestamp
//! fall back to their time-ordered v7 ids.

use chrono::{DateTime, SecondsFormat, Utc};
use spaces_core::space::repository::{SpaceFilter, SpaceOrder, SpaceRepository};
use spaces_types::error::RepositoryError;
use spaces_types::space::{Space, Turn, TurnRole};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SpaceRepository`.
pub struct SqliteSpaceRepository {
    pool: DatabasePool,
}

impl SqliteSpaceRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SpaceRow {
    id: String,
    owner_id: String,
    title: String,
    initial_prompt: String,
    saved: i64,
    created_at: String,
    updated_at: String,
}

impl SpaceRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            initial_prompt: row.try_get("initial_prompt")?,
            saved: row.try_get("saved")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_space(self) -> Result<Space, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid space id: {e}")))?;

        Ok(Space {
            id,
            owner_id: self.owner_id,
            title: self.title,
            initial_prompt: self.initial_prompt,
            saved: self.saved != 0,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct TurnRow {
    id: String,
    space_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            space_id: row.try_get("space_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid turn id: {e}")))?;
        let space_id = Uuid::parse_str(&self.space_id)
            .map_err(|e| RepositoryError::Query(format!("invalid space_id: {e}")))?;
        let role: TurnRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Turn {
            id,
            space_id,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn rows_to_turns(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Turn>, RepositoryError> {
    rows.iter()
        .map(|row| TurnRow::from_row(row).map_err(query_error)?.into_turn())
        .collect()
}

// ---------------------------------------------------------------------------
// SpaceRepository implementation
// ---------------------------------------------------------------------------

impl SpaceRepository for SqliteSpaceRepository {
    async fn create_space(&self, space: &Space) -> Result<Space, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO spaces (id, owner_id, title, initial_prompt, saved, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(space.id.to_string())
        .bind(&space.owner_id)
        .bind(&space.title)
        .bind(&space.initial_prompt)
        .bind(space.saved as i64)
        .bind(format_datetime(&space.created_at))
        .bind(format_datetime(&space.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("space {} already exists", space.id))
            }
            other => query_error(other),
        })?;

        Ok(space.clone())
    }

    async fn get_space(&self, space_id: &Uuid) -> Result<Option<Space>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM spaces WHERE id = ?")
            .bind(space_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(SpaceRow::from_row(&row).map_err(query_error)?.into_space()?)),
            None => Ok(None),
        }
    }

    async fn update_space(&self, space: &Space) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE spaces SET title = ?, saved = ?, updated_at = ? WHERE id = ?")
            .bind(&space.title)
            .bind(space.saved as i64)
            .bind(format_datetime(&space.updated_at))
            .bind(space.id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_spaces(
        &self,
        owner_id: &str,
        filter: &SpaceFilter,
    ) -> Result<Vec<Space>, RepositoryError> {
        let mut sql = String::from("SELECT * FROM spaces WHERE owner_id = ?");
        if filter.saved_only {
            sql.push_str(" AND saved = 1");
        }
        sql.push_str(match filter.order {
            SpaceOrder::CreatedDesc => " ORDER BY created_at DESC, id DESC",
            SpaceOrder::UpdatedDesc => " ORDER BY updated_at DESC, id DESC",
        });
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit.max(0)));
        }

        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut spaces = Vec::with_capacity(rows.len());
        for row in &rows {
            spaces.push(SpaceRow::from_row(row).map_err(query_error)?.into_space()?);
        }

        Ok(spaces)
    }

    async fn append_turn(&self, turn: &Turn) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let bumped = sqlx::query("UPDATE spaces SET updated_at = ? WHERE id = ?")
            .bind(format_datetime(&turn.created_at))
            .bind(turn.space_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;
        if bumped.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r#"INSERT INTO messages (id, space_id, role, content, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(turn.id.to_string())
        .bind(turn.space_id.to_string())
        .bind(turn.role.to_string())
        .bind(&turn.content)
        .bind(format_datetime(&turn.created_at))
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;
        Ok(())
    }

    async fn list_turns(&self, space_id: &Uuid) -> Result<Vec<Turn>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM messages WHERE space_id = ? ORDER BY created_at ASC, id ASC")
            .bind(space_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows_to_turns(&rows)
    }

    async fn last_turn(&self, space_id: &Uuid) -> Result<Option<Turn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE space_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(space_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        Ok(rows_to_turns(&rows)?.pop())
    }

    async fn count_turns(&self, space_id: &Uuid) -> Result<u32, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM messages WHERE space_id = ?")
            .bind(space_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let count: i64 = row.try_get("cnt").map_err(query_error)?;
        Ok(count as u32)
    }
}
