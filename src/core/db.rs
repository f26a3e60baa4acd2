use std::path::Path;

use anyhow::Result;
use tokio_rusqlite::Connection;

pub const DB_FILE_NAME: &str = "threads.sqlite3";

/// Open the database in `db_dir`, creating the directory if needed.
pub async fn async_db(db_dir: &Path) -> Result<Connection> {
    tokio::fs::create_dir_all(db_dir).await?;
    let db = Connection::open(db_dir.join(DB_FILE_NAME)).await?;
    Ok(db)
}

/// Create the schema. Safe to run repeatedly.
pub fn initialize_db(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         CREATE TABLE IF NOT EXISTS thread_state (
             key TEXT PRIMARY KEY NOT NULL,
             status TEXT NOT NULL,
             data TEXT NOT NULL,
             updated_at TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS thread_state_status ON thread_state (status);",
    )
}
