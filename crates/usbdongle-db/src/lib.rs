//! USB Dongle Database - saved profiles in SQLite.
//!
//! [`Database`] implements [`usbdongle_core::ProfileStore`]; see [`queries`].

pub mod error;
pub mod migrations;
pub mod queries;
pub mod schema;

pub use error::{DbError, DbResult};

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use rusqlite::Connection;
use tracing::{debug, info};

const DATABASE_FILE: &str = "profiles.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open the profile database under the user's data directory.
    ///
    /// # Errors
    /// See [`Database::open_at`]; also [`DbError::NoDataDir`].
    pub fn open() -> DbResult<Self> {
        Self::open_at(&Self::default_path()?)
    }

    /// Open or create the profile database at `path`, creating missing
    /// parent directories.
    ///
    /// # Errors
    /// Fails if the file cannot be opened or its schema cannot be upgraded.
    pub fn open_at(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let journal: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let db = Self::initialize(conn, Some(path.to_path_buf()))?;
        info!(path = %path.display(), journal = %journal, "Profile database ready");
        Ok(db)
    }

    /// A throwaway database, used by tests.
    ///
    /// # Errors
    /// Fails only if SQLite itself cannot allocate the database.
    pub fn open_in_memory() -> DbResult<Self> {
        debug!("Opening in-memory profile database");
        Self::initialize(Connection::open_in_memory()?, None)
    }

    /// `<data dir>/profiles.db`, e.g. `~/.local/share/usbdonglecontrol/profiles.db`.
    ///
    /// # Errors
    /// [`DbError::NoDataDir`] when no home directory is known.
    pub fn default_path() -> DbResult<PathBuf> {
        ProjectDirs::from("com", "usbdongle", "UsbDongleControl")
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
            .ok_or(DbError::NoDataDir)
    }

    fn initialize(mut conn: Connection, path: Option<PathBuf>) -> DbResult<Self> {
        migrations::run(&mut conn)?;
        Ok(Self { conn, path })
    }

    /// Backing file, `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
