use rusqlite::{Connection, Result};
use tracing::debug;

/// SQLite schema version, kept in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

/// Create the `fs` and `code` relations on a freshly wiped database
pub fn create_schema(conn: &Connection) -> Result<()> {
    debug!("Creating schema v{}", SCHEMA_VERSION);

    // One row per enumerated source file. file_id is the join key.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS fs (
            project TEXT NOT NULL,
            path TEXT NOT NULL,
            file_id INTEGER NOT NULL
        )",
        [],
    )?;

    // One row per successful extraction. NULL start/end marks unparsable offsets.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS code (
            file_id INTEGER NOT NULL,
            func_id INTEGER NOT NULL,
            start INTEGER,
            \"end\" INTEGER,
            src TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_code_file
         ON code(file_id, func_id)",
        [],
    )?;

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    Ok(())
}
