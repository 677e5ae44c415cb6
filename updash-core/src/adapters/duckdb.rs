//! DuckDB credential store implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use duckdb::{params, Connection, OptionalExt};

use crate::domain::result::{Error, Result as DomainResult};
use crate::domain::StoredCredential;
use crate::ports::CredentialStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB-backed store for per-user encrypted tokens
pub struct DuckDbCredentialStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbCredentialStore {
    /// Open (or create) the database file and apply pending migrations
    ///
    /// Opening retries with exponential backoff on file locking errors, which
    /// happen when a second `updash` process holds the database.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    let store = Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    };
                    store.run_migrations()?;
                    return Ok(store);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[updash] Database busy, retrying in {}ms (attempt {}/{})",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// In-memory store, migrated and empty
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn load(&self, user_id: &str) -> Result<Option<StoredCredential>> {
        let conn = self.lock()?;
        let credential = conn
            .query_row(
                "SELECT encrypted_token, token_iv, token_auth_tag FROM sys_users WHERE user_id = ?",
                params![user_id],
                |row| {
                    Ok(StoredCredential {
                        encrypted_token: row.get(0)?,
                        iv: row.get(1)?,
                        auth_tag: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(credential)
    }

    fn store(&self, user_id: &str, credential: &StoredCredential) -> Result<()> {
        let conn = self.lock()?;
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();

        conn.execute(
            "INSERT INTO sys_users (user_id, encrypted_token, token_iv, token_auth_tag, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (user_id) DO UPDATE SET
                encrypted_token = EXCLUDED.encrypted_token,
                token_iv = EXCLUDED.token_iv,
                token_auth_tag = EXCLUDED.token_auth_tag,
                updated_at = EXCLUDED.updated_at",
            params![
                user_id,
                credential.encrypted_token,
                credential.iv,
                credential.auth_tag,
                now,
                now
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for DuckDbCredentialStore {
    async fn find_by_id(&self, user_id: &str) -> DomainResult<Option<StoredCredential>> {
        self.load(user_id)
            .map_err(|e| Error::database(format!("Failed to load credential: {}", e)))
    }

    async fn update(&self, user_id: &str, credential: &StoredCredential) -> DomainResult<()> {
        self.store(user_id, credential)
            .map_err(|e| Error::database(format!("Failed to store credential: {}", e)))
    }
}
