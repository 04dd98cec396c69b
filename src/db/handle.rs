//! Database handle: one pool per owner, statement execution with retry.
//!
//! Every writer (and the consumer engine for its synchronous inventory
//! writes) owns a separate handle; the pool is capped at one connection so a
//! handle maps to exactly one server connection while keeping the driver's
//! reconnect path.

use crate::appconfig::PostgresConfig;
use crate::error::{AppError, AppResult};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::PgPool;
use std::time::Duration;
use tracing::{error, warn};

const BACKOFF_BASE_MS: u64 = 200;
const BACKOFF_CAP_MS: u64 = 5000;

#[derive(Debug)]
pub struct DbHandle {
    pool: PgPool,
}

impl DbHandle {
    pub async fn connect(cfg: &PostgresConfig) -> AppResult<Self> {
        let (host, port) = cfg.host_port()?;

        let ssl_mode = if !cfg.ssl_enable {
            PgSslMode::Disable
        } else {
            match cfg.ssl_mode.as_str() {
                "disable" => PgSslMode::Disable,
                "allow" => PgSslMode::Allow,
                "prefer" => PgSslMode::Prefer,
                "require" => PgSslMode::Require,
                "verify-ca" => PgSslMode::VerifyCa,
                "verify-full" => PgSslMode::VerifyFull,
                other => {
                    return Err(AppError::InvalidConfig(format!(
                        "postgres.ssl_mode: unknown mode '{other}'"
                    )));
                }
            }
        };

        let opts = PgConnectOptions::new()
            .host(&host)
            .port(port)
            .database(&cfg.db_name)
            .username(&cfg.username)
            .password(&cfg.password)
            .ssl_mode(ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(opts)
            .await?;

        Ok(Self { pool })
    }

    pub async fn disconnect(&self) {
        self.pool.close().await;
    }

    /// Execute one statement, retrying transient failures with exponential
    /// backoff. On final failure the error is logged and returned; bulk-path
    /// callers drop the batch (redelivery plus upsert keeps the DB correct).
    pub async fn update(&self, sql: &str, retries: u32) -> AppResult<()> {
        let mut attempt: u32 = 0;
        loop {
            match sqlx::query(sql).execute(&self.pool).await {
                Ok(_) => return Ok(()),
                Err(e) if attempt < retries && is_transient(&e) => {
                    attempt += 1;
                    let backoff = backoff_millis(attempt);
                    warn!(
                        attempt,
                        backoff_ms = backoff,
                        error = %e,
                        "transient database error, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    error!(error = %e, "statement failed, giving up");
                    return Err(AppError::Sqlx(e));
                }
            }
        }
    }

    pub async fn select(&self, sql: &str) -> AppResult<Vec<PgRow>> {
        sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Sqlx)
    }
}

/// Connection resets, pool exhaustion, deadlocks and serialization failures
/// are worth a retry; everything else (syntax, constraint) is permanent.
fn is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some("40001") // serialization_failure
                | Some("40P01") // deadlock_detected
                | Some("08003") // connection_does_not_exist
                | Some("08006") // connection_failure
                | Some("57P01") // admin_shutdown
        ),
        _ => false,
    }
}

fn backoff_millis(attempt: u32) -> u64 {
    BACKOFF_BASE_MS
        .saturating_mul(1u64 << (attempt - 1).min(16))
        .min(BACKOFF_CAP_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_millis(1), 200);
        assert_eq!(backoff_millis(2), 400);
        assert_eq!(backoff_millis(3), 800);
        assert_eq!(backoff_millis(10), 5000);
    }

    #[test]
    fn io_errors_are_transient() {
        let e = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(is_transient(&e));
    }

    #[test]
    fn row_not_found_is_permanent() {
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }
}
