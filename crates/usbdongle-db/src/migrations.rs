//! Schema upgrades, tracked with `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::schema::SCHEMA_V1;

/// Upgrade steps, in order. Entry `n` moves the schema to version `n + 1`.
static MIGRATIONS: &[&str] = &[SCHEMA_V1];

#[allow(clippy::cast_possible_truncation)]
pub(crate) const LATEST_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`LATEST_VERSION`].
///
/// All pending steps share one transaction.
///
/// # Errors
/// [`DbError::SchemaTooNew`] if the file was written by a newer build, or the
/// SQLite error of the failing step.
pub fn run(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    if found > LATEST_VERSION {
        return Err(DbError::SchemaTooNew { found, supported: LATEST_VERSION });
    }
    if found == LATEST_VERSION {
        debug!(version = found, "Schema up to date");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in (1..).zip(MIGRATIONS).skip(found as usize) {
        debug!(version, "Upgrading schema");
        tx.execute_batch(sql)?;
    }
    tx.pragma_update(None, "user_version", LATEST_VERSION)?;
    tx.commit()?;

    info!(from = found, to = LATEST_VERSION, "Schema upgraded");
    Ok(())
}

pub(crate) fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
