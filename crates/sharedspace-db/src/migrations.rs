use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            owner       INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS locations (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            location        TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            owner           TEXT NOT NULL,
            services        TEXT NOT NULL DEFAULT '{}',
            image           TEXT,
            small           TEXT,
            backup          TEXT,
            backup_small    TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_locations_owner
            ON locations(owner);

        CREATE INDEX IF NOT EXISTS idx_locations_created
            ON locations(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
