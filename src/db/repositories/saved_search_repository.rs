use chrono::NaiveDateTime;
use serde_json::{Value, json};
use sqlx::mysql::MySqlPool;

use crate::db::fmt_ts;
use crate::error::{AppError, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct SavedSearchRow {
    id: i64,
    name: String,
    /// The client's opaque search configuration, stored as a JSON column and
    /// handed back as-is.
    params: Value,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl SavedSearchRow {
    fn into_json(self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "params": self.params,
            "created_at": fmt_ts(self.created_at),
            "updated_at": fmt_ts(self.updated_at),
        })
    }
}

/// CRUD over a named-search table. The same shape backs both
/// `saved_searches` and `saved_board_searches`.
#[derive(Clone)]
pub struct SavedSearchRepository {
    pool: MySqlPool,
    table: &'static str,
}

impl SavedSearchRepository {
    pub fn searches(pool: MySqlPool) -> Self {
        Self {
            pool,
            table: "saved_searches",
        }
    }

    pub fn board_searches(pool: MySqlPool) -> Self {
        Self {
            pool,
            table: "saved_board_searches",
        }
    }

    pub async fn create(&self, name: &str, params: &Value) -> AppResult<i64> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (name, params) VALUES (?, ?)",
            self.table
        ))
        .bind(name)
        .bind(params)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.last_insert_id() as i64)
    }

    pub async fn list(&self) -> AppResult<Vec<Value>> {
        let rows: Vec<SavedSearchRow> = sqlx::query_as(&format!(
            "SELECT * FROM {} ORDER BY updated_at DESC",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(SavedSearchRow::into_json).collect())
    }

    pub async fn get(&self, search_id: i64) -> AppResult<Option<Value>> {
        let row: Option<SavedSearchRow> =
            sqlx::query_as(&format!("SELECT * FROM {} WHERE id = ?", self.table))
                .bind(search_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::from)?;
        Ok(row.map(SavedSearchRow::into_json))
    }

    pub async fn update(&self, search_id: i64, name: &str, params: &Value) -> AppResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET name = ?, params = ? WHERE id = ?",
            self.table
        ))
        .bind(name)
        .bind(params)
        .bind(search_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, search_id: i64) -> AppResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.table))
            .bind(search_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
