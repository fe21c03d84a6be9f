use chrono::NaiveDateTime;
use serde_json::{Value, json};
use sqlx::mysql::MySqlPool;

use crate::db::fmt_ts;
use crate::error::{AppError, AppResult};

/// A candidate profile + target model. The analysis pipeline needs the typed
/// row, so unlike the other repositories this one exposes it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromptRow {
    pub id: i64,
    pub title: String,
    pub model: String,
    pub cv: String,
    pub about_me: String,
    pub preferences: String,
    pub extra_context: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PromptRow {
    pub fn into_json(self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "model": self.model,
            "cv": self.cv,
            "about_me": self.about_me,
            "preferences": self.preferences,
            "extra_context": self.extra_context,
            "is_active": self.is_active,
            "created_at": fmt_ts(self.created_at),
            "updated_at": fmt_ts(self.updated_at),
        })
    }
}

#[derive(Clone)]
pub struct AiPromptRepository {
    pool: MySqlPool,
}

impl AiPromptRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create a prompt configuration; making it active clears every other
    /// active flag in the same transaction.
    pub async fn create(
        &self,
        title: &str,
        model: &str,
        cv: &str,
        about_me: &str,
        preferences: &str,
        extra_context: &str,
        is_active: bool,
    ) -> AppResult<i64> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;
        if is_active {
            sqlx::query("UPDATE ai_prompts SET is_active = 0")
                .execute(&mut *tx)
                .await
                .map_err(AppError::from)?;
        }
        let result = sqlx::query(
            "INSERT INTO ai_prompts
                (title, model, cv, about_me, preferences, extra_context, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(title)
        .bind(model)
        .bind(cv)
        .bind(about_me)
        .bind(preferences)
        .bind(extra_context)
        .bind(is_active)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(result.last_insert_id() as i64)
    }

    /// All prompt configurations, active first then newest.
    pub async fn list(&self) -> AppResult<Vec<Value>> {
        let rows: Vec<PromptRow> = sqlx::query_as(
            "SELECT * FROM ai_prompts ORDER BY is_active DESC, updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(PromptRow::into_json).collect())
    }

    pub async fn get(&self, prompt_id: i64) -> AppResult<Option<PromptRow>> {
        let row: Option<PromptRow> = sqlx::query_as("SELECT * FROM ai_prompts WHERE id = ?")
            .bind(prompt_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row)
    }

    pub async fn get_active(&self) -> AppResult<Option<PromptRow>> {
        let row: Option<PromptRow> =
            sqlx::query_as("SELECT * FROM ai_prompts WHERE is_active = 1 LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::from)?;
        Ok(row)
    }

    pub async fn update(
        &self,
        prompt_id: i64,
        title: &str,
        model: &str,
        cv: &str,
        about_me: &str,
        preferences: &str,
        extra_context: &str,
        is_active: bool,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;
        if is_active {
            sqlx::query("UPDATE ai_prompts SET is_active = 0 WHERE id != ?")
                .bind(prompt_id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::from)?;
        }
        let result = sqlx::query(
            "UPDATE ai_prompts
             SET title = ?, model = ?, cv = ?, about_me = ?, preferences = ?,
                 extra_context = ?, is_active = ?
             WHERE id = ?",
        )
        .bind(title)
        .bind(model)
        .bind(cv)
        .bind(about_me)
        .bind(preferences)
        .bind(extra_context)
        .bind(is_active)
        .bind(prompt_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark one prompt active and clear all others. At most one row ever has
    /// is_active = 1.
    pub async fn set_active(&self, prompt_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;
        sqlx::query("UPDATE ai_prompts SET is_active = 0")
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        let result = sqlx::query("UPDATE ai_prompts SET is_active = 1 WHERE id = ?")
            .bind(prompt_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, prompt_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM ai_prompts WHERE id = ?")
            .bind(prompt_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_active_leaves_exactly_one_active_prompt() {
        // Database-backed test; only runs when one is available.
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = sqlx::mysql::MySqlPoolOptions::new()
            .connect(&url)
            .await
            .unwrap();
        let repo = AiPromptRepository::new(pool.clone());

        let first = repo
            .create("First", "gpt-4o", "", "", "", "", true)
            .await
            .unwrap();
        let second = repo
            .create("Second", "gpt-4o", "", "", "", "", false)
            .await
            .unwrap();

        assert!(repo.set_active(second).await.unwrap());

        let active_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ai_prompts WHERE is_active = 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(active_count, 1);
        assert_eq!(repo.get_active().await.unwrap().unwrap().id, second);

        for id in [first, second] {
            repo.delete(id).await.unwrap();
        }
    }
}
