//! SQLite PRAGMA configuration, applied to every connection immediately
//! after opening.

use rusqlite::Connection;

use cortex_core::errors::{CortexResult, StorageError};

/// WAL mode, `synchronous=NORMAL`, foreign keys on, a fixed busy timeout,
/// and a bounded mmap for faster scans. Shared by writer and reader
/// connections.
pub fn configure_connection(conn: &Connection, busy_timeout_ms: u32, mmap_size_bytes: u64) -> CortexResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {busy_timeout_ms};
         PRAGMA cache_size = -8000;
         PRAGMA mmap_size = {mmap_size_bytes};
         PRAGMA temp_store = MEMORY;"
    ))
    .map_err(|e| StorageError::Sqlite(e.to_string()))?;
    Ok(())
}

/// Same as [`configure_connection`] plus `query_only = ON`, so a
/// programming error can never route a write through a reader.
pub fn configure_readonly_connection(
    conn: &Connection,
    busy_timeout_ms: u32,
    mmap_size_bytes: u64,
) -> CortexResult<()> {
    configure_connection(conn, busy_timeout_ms, mmap_size_bytes)?;
    conn.execute_batch("PRAGMA query_only = ON;")
        .map_err(|e| StorageError::Sqlite(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_busy_timeout() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn, 5000, 1024).unwrap();
        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000);
    }

    #[test]
    fn sets_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn, 5000, 1024).unwrap();
        let fk: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn readonly_sets_query_only() {
        let conn = Connection::open_in_memory().unwrap();
        configure_readonly_connection(&conn, 5000, 1024).unwrap();
        let qo: i64 = conn
            .pragma_query_value(None, "query_only", |row| row.get(0))
            .unwrap();
        assert_eq!(qo, 1);
    }
}
