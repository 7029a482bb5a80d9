//! Database schema migrations for patchday.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("Failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: sites, hormones, pills, and the kv table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS sites (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            sort_order  INTEGER NOT NULL,
            image_id    TEXT
        );

        CREATE TABLE IF NOT EXISTS hormones (
            id               TEXT PRIMARY KEY,
            date             TEXT,
            site_id          TEXT REFERENCES sites(id) ON DELETE SET NULL,
            site_name_backup TEXT,
            delivery_method  TEXT NOT NULL DEFAULT 'patches'
        );

        CREATE TABLE IF NOT EXISTS pills (
            id                TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            times             TEXT NOT NULL DEFAULT '09:00',
            notify            INTEGER NOT NULL DEFAULT 1,
            times_taken_today INTEGER NOT NULL DEFAULT 0,
            last_taken        TEXT
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_hormones_site_id ON hormones(site_id);
        CREATE INDEX IF NOT EXISTS idx_sites_sort_order ON sites(sort_order);",
    )?;
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: persisted notification queue.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            kind        TEXT NOT NULL,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL DEFAULT '',
            fire_at     TEXT NOT NULL,
            subject_id  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_fire_at ON notifications(fire_at);",
    )?;
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (2)", [])?;
    tx.commit()?;
    Ok(())
}

/// Migration v3: pill expiration intervals.
///
/// Existing pills become every-day pills.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    let has_column = tx
        .prepare("SELECT expiration_interval FROM pills LIMIT 0")
        .is_ok();
    if !has_column {
        tx.execute_batch(
            "ALTER TABLE pills ADD COLUMN expiration_interval TEXT NOT NULL DEFAULT 'every_day';",
        )?;
    }
    set_schema_version(&tx, 3)?;
    tx.commit()?;
    Ok(())
}
