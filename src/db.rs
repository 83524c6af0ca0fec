use std::fmt::Display;
use std::time::Duration;

use anyhow::Result;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use tracing::warn;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// How long SQLite itself waits on a locked database before giving up
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Attempts made by `with_retry` before a lock error is returned
const MAX_RETRIES: u32 = 5;

/// Per-connection setup run whenever the pool opens a connection
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Builds the connection pool for the given SQLite database URL
///
/// Every connection handed out by the pool enforces foreign keys and waits
/// on locks for up to five seconds.
pub fn init_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout_ms: BUSY_TIMEOUT_MS,
        }))
        .build(manager)?;
    Ok(pool)
}

fn is_lock_error(err: &impl Display) -> bool {
    let message = err.to_string();
    message.contains("database is locked") || message.contains("database table is locked")
}

/// Runs a write, retrying with backoff while SQLite reports a lock
///
/// `op` must be safe to re-run: either a single statement or a whole
/// transaction, which SQLite rolls back when it fails.
pub async fn with_retry<T, E, F>(mut op: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match op() {
            Err(err) if attempt < MAX_RETRIES && is_lock_error(&err) => {
                attempt += 1;
                warn!("Database locked, retrying (attempt {}/{})", attempt, MAX_RETRIES);
                drop(err);
                tokio::time::sleep(Duration::from_millis(25 * u64::from(attempt))).await;
            }
            result => return result,
        }
    }
}
