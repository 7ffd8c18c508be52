use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::schema::create_schema;
use super::{FileRow, FunctionRow, LineSpan};
use crate::error::{Result, SweepError};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Files SQLite may leave next to the main database file
const SIDE_FILE_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Write-once store for one sweep run
///
/// Every insert runs as its own autocommit statement, so an interrupted run
/// leaves a valid prefix of the full result set on disk.
#[derive(Clone)]
pub struct ResultStore {
    pool: ConnectionPool,
    db_path: PathBuf,
}

impl ResultStore {
    /// Destroy any existing store at `db_path` and create an empty one
    pub fn initialize(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let init_err = |reason: String| SweepError::StoreInit {
            path: db_path.clone(),
            reason,
        };

        info!("Creating store at: {}", db_path.display());

        remove_existing(&db_path).map_err(|e| init_err(format!("cannot remove old store: {}", e)))?;

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                init_err(format!("cannot create directory {}: {}", parent.display(), e))
            })?;
        }

        let manager = SqliteConnectionManager::file(&db_path);

        let pool = Pool::builder()
            .max_size(2)
            .build(manager)
            .map_err(|e| init_err(format!("cannot open database: {}", e)))?;

        {
            let conn = pool.get().map_err(|e| init_err(e.to_string()))?;
            create_schema(&conn).map_err(|e| init_err(format!("cannot create schema: {}", e)))?;
        }

        Ok(Self { pool, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Append one `fs` row
    pub fn record_file(&self, project: &str, path: &str, file_id: u32) -> Result<()> {
        let conn = self.get_conn()?;

        debug!("Recording file {} as {}", path, file_id);

        conn.execute(
            "INSERT INTO fs (project, path, file_id) VALUES (?1, ?2, ?3)",
            params![project, path, file_id],
        )?;

        Ok(())
    }

    /// Append one `code` row; a `None` span is stored as NULL offsets
    pub fn record_function(
        &self,
        file_id: u32,
        func_id: u32,
        span: Option<LineSpan>,
        src: &str,
    ) -> Result<()> {
        let conn = self.get_conn()?;

        debug!("Recording function {}:{}", file_id, func_id);

        conn.execute(
            "INSERT INTO code (file_id, func_id, start, \"end\", src)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                file_id,
                func_id,
                span.map(|s| s.start),
                span.map(|s| s.end),
                src,
            ],
        )?;

        Ok(())
    }

    /// All `fs` rows in file_id order
    pub fn files(&self) -> Result<Vec<FileRow>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare("SELECT project, path, file_id FROM fs ORDER BY file_id")?;

        let files = stmt
            .query_map([], row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// `code` rows of one file in func_id order
    pub fn functions_for_file(&self, file_id: u32) -> Result<Vec<FunctionRow>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT file_id, func_id, start, \"end\", src
             FROM code WHERE file_id = ?1 ORDER BY func_id",
        )?;

        let functions = stmt
            .query_map([file_id], row_to_function)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(functions)
    }

    /// Get store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.get_conn()?;

        let total_files: i64 = conn.query_row("SELECT COUNT(*) FROM fs", [], |row| row.get(0))?;

        let total_functions: i64 =
            conn.query_row("SELECT COUNT(*) FROM code", [], |row| row.get(0))?;

        let unknown_spans: i64 = conn.query_row(
            "SELECT COUNT(*) FROM code WHERE start IS NULL OR \"end\" IS NULL",
            [],
            |row| row.get(0),
        )?;

        let files_with_functions: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT file_id) FROM code",
            [],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            total_files: total_files as usize,
            total_functions: total_functions as usize,
            unknown_spans: unknown_spans as usize,
            files_with_functions: files_with_functions as usize,
        })
    }
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_files: usize,
    pub total_functions: usize,
    pub unknown_spans: usize,
    pub files_with_functions: usize,
}

fn remove_existing(db_path: &Path) -> io::Result<()> {
    remove_if_present(db_path)?;

    for suffix in SIDE_FILE_SUFFIXES {
        let mut side = db_path.as_os_str().to_owned();
        side.push(suffix);
        remove_if_present(Path::new(&side))?;
    }

    Ok(())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Convert database row to FileRow
fn row_to_file(row: &Row) -> rusqlite::Result<FileRow> {
    Ok(FileRow {
        project: row.get(0)?,
        path: row.get(1)?,
        file_id: row.get(2)?,
    })
}

/// Convert database row to FunctionRow
fn row_to_function(row: &Row) -> rusqlite::Result<FunctionRow> {
    let start: Option<u32> = row.get(2)?;
    let end: Option<u32> = row.get(3)?;

    Ok(FunctionRow {
        file_id: row.get(0)?,
        func_id: row.get(1)?,
        span: start.zip(end).map(|(start, end)| LineSpan { start, end }),
        src: row.get(4)?,
    })
}
