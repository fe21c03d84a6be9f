use chrono::NaiveDateTime;
use serde_json::{Value, json};
use sqlx::mysql::MySqlPool;

use crate::db::fmt_ts;
use crate::error::{AppError, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: i64,
    title: String,
    body: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl NoteRow {
    fn into_json(self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "body": self.body,
            "created_at": fmt_ts(self.created_at),
            "updated_at": fmt_ts(self.updated_at),
        })
    }
}

fn boolean_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|t| format!("+{}*", t))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone)]
pub struct NoteRepository {
    pool: MySqlPool,
}

impl NoteRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create a new note; returns its id.
    pub async fn create(&self, title: &str, body: &str) -> AppResult<i64> {
        let result = sqlx::query("INSERT INTO notes (title, body) VALUES (?, ?)")
            .bind(title)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.last_insert_id() as i64)
    }

    /// Returns true if the note was found and updated.
    pub async fn update(&self, note_id: i64, title: &str, body: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE notes SET title = ?, body = ? WHERE id = ?")
            .bind(title)
            .bind(body)
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, note_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, note_id: i64) -> AppResult<Option<Value>> {
        let row: Option<NoteRow> = sqlx::query_as("SELECT * FROM notes WHERE id = ?")
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(NoteRow::into_json))
    }

    /// All notes, optionally narrowed by a full-text query.
    pub async fn list(&self, query: &str, sort_by: &str, ascending: bool) -> AppResult<Vec<Value>> {
        let allowed_sort = ["created_at", "updated_at", "title"];
        let sort_by = if allowed_sort.contains(&sort_by) {
            sort_by
        } else {
            "updated_at"
        };
        let direction = if ascending { "ASC" } else { "DESC" };

        let rows: Vec<NoteRow> = if query.is_empty() {
            sqlx::query_as(&format!(
                "SELECT * FROM notes ORDER BY {} {}",
                sort_by, direction
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?
        } else {
            sqlx::query_as(&format!(
                "SELECT * FROM notes WHERE MATCH(title, body) AGAINST(? IN BOOLEAN MODE) \
                 ORDER BY {} {}",
                sort_by, direction
            ))
            .bind(boolean_query(query))
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?
        };

        Ok(rows.into_iter().map(NoteRow::into_json).collect())
    }
}
