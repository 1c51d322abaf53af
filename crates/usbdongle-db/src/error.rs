//! Profile store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("No home directory to place the profile database in")]
    NoDataDir,

    #[error("Profile database is at schema version {found}, this build only knows up to {supported}")]
    SchemaTooNew { found: u32, supported: u32 },
}

pub type DbResult<T> = Result<T, DbError>;
