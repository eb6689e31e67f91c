use eyre::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS block_cache (
  utc_day      TEXT NOT NULL PRIMARY KEY, -- YYYY-MM-DD
  block_number TEXT NOT NULL,
  timestamp    INTEGER NOT NULL,          -- UTC midnight, unix seconds
  cached_at    TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// First block of a UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBlock {
    pub block_number: String,
    pub timestamp: i64,
    pub utc_day: String,
}

/// Connect to SQLite (with WAL mode for performance)
pub fn connect(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

/// In-memory database, already migrated.
pub fn connect_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Run schema migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(INIT_SQL)?;
    Ok(())
}

/// Insert or replace the block for a day
pub fn store_block(conn: &Connection, block: &DailyBlock) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO block_cache (utc_day, block_number, timestamp, cached_at)
        VALUES (?1, ?2, ?3, datetime('now'))
        ON CONFLICT(utc_day) DO UPDATE SET
            block_number = excluded.block_number,
            timestamp    = excluded.timestamp,
            cached_at    = excluded.cached_at
        "#,
        params![block.utc_day, block.block_number, block.timestamp],
    )?;
    Ok(())
}

pub fn block_for_day(conn: &Connection, utc_day: &str) -> Result<Option<DailyBlock>> {
    let row = conn
        .query_row(
            "SELECT block_number, timestamp, utc_day FROM block_cache WHERE utc_day = ?1",
            [utc_day],
            read_block,
        )
        .optional()?;
    Ok(row)
}

/// Most recent cached day, whatever its date.
pub fn latest_block(conn: &Connection) -> Result<Option<DailyBlock>> {
    let row = conn
        .query_row(
            "SELECT block_number, timestamp, utc_day FROM block_cache ORDER BY utc_day DESC LIMIT 1",
            [],
            read_block,
        )
        .optional()?;
    Ok(row)
}

/// Drop rows for days other than `keep_day`.
pub fn clear_expired(conn: &Connection, keep_day: &str) -> Result<usize> {
    let n = conn.execute("DELETE FROM block_cache WHERE utc_day <> ?1", [keep_day])?;
    Ok(n)
}

fn read_block(r: &rusqlite::Row<'_>) -> rusqlite::Result<DailyBlock> {
    Ok(DailyBlock {
        block_number: r.get(0)?,
        timestamp: r.get(1)?,
        utc_day: r.get(2)?,
    })
}
