use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Idempotent schema setup, run at open.
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS habits (
            id             TEXT PRIMARY KEY,
            owner_id       TEXT NOT NULL,
            place          TEXT NOT NULL,
            time           TEXT NOT NULL,
            action         TEXT NOT NULL,
            is_pleasant    INTEGER NOT NULL DEFAULT 0,
            -- weak self-reference: deleting the referenced habit nulls
            -- this field, it never cascades
            related_habit  TEXT REFERENCES habits(id) ON DELETE SET NULL,
            periodicity    INTEGER NOT NULL DEFAULT 1,
            reward         TEXT,
            duration       INTEGER NOT NULL,
            is_public      INTEGER NOT NULL DEFAULT 0,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_habits_time
            ON habits(time);

        CREATE INDEX IF NOT EXISTS idx_habits_owner
            ON habits(owner_id, created_at);

        CREATE TABLE IF NOT EXISTS bindings (
            user_id     TEXT PRIMARY KEY,
            chat_id     TEXT NOT NULL UNIQUE,
            handle      TEXT,
            created_at  TEXT NOT NULL
        );
        ",
    )?;

    info!("Database schema ready");
    Ok(())
}
