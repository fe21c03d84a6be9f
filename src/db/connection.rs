use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

use crate::config::settings::DatabaseConfig;
use crate::error::AppError;

const POOL_SIZE: u32 = 5;

/// Creates the MySQL connection pool. Retries a few times on startup so the
/// server can come up while the database container is still booting.
pub async fn create_pool(config: &DatabaseConfig) -> Result<MySqlPool, AppError> {
    let database_url = config.url();
    let max_retries = 3;
    let mut last_error = None;

    for attempt in 1..=max_retries {
        log::info!("Database connection attempt {} of {}", attempt, max_retries);

        match MySqlPoolOptions::new()
            .max_connections(POOL_SIZE)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .connect(&database_url)
            .await
        {
            Ok(pool) => {
                log::info!(
                    "Connected to database '{}' at {}:{} (pool size {})",
                    config.name,
                    config.host,
                    config.port,
                    POOL_SIZE
                );
                return Ok(pool);
            }
            Err(e) => {
                log::warn!("Database connection attempt {} failed: {}", attempt, e);
                if e.to_string().contains("Access denied") {
                    return Err(AppError::DatabaseUnavailable(e.to_string()));
                }
                last_error = Some(e);
                if attempt < max_retries {
                    let delay = Duration::from_secs(2 * attempt as u64);
                    log::info!("Retrying in {} seconds...", delay.as_secs());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    let error = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown database connection error".to_string());
    log::error!("All database connection attempts failed: {}", error);
    Err(AppError::DatabaseUnavailable(error))
}

/// Verifies the database connection by executing a simple query.
pub async fn verify_connection(pool: &MySqlPool) -> Result<(), AppError> {
    sqlx::query_as::<_, (i32,)>("SELECT 1 as result")
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            log::error!("Database connection verification failed: {}", e);
            AppError::DatabaseUnavailable(e.to_string())
        })?;

    log::debug!("Database connection verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verify_connection_against_configured_database() {
        // Only runs when a database is available in the environment.
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = MySqlPoolOptions::new().connect(&url).await.unwrap();
        verify_connection(&pool).await.unwrap();
    }
}
