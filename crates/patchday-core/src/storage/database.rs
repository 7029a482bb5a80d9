//! SQLite storage for hormones, pills, sites, and queued notifications.
//!
//! Provides persistent storage for:
//! - Hormone slots and where they were placed
//! - Pills and their dose counters
//! - Body sites in rotation order
//! - Planned notification requests
//! - Key-value store for application state (the site rotation cursor)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::migrations;
use crate::dates;
use crate::error::{DatabaseError, Result};
use crate::hormone::{Hormone, SiteRef};
use crate::notifications::{NotificationKind, NotificationRequest};
use crate::pill::{Pill, PillExpirationInterval};
use crate::settings::DeliveryMethod;
use crate::site::Site;

// === Helper Functions ===

/// Parse delivery method from database string
fn parse_delivery_method(s: &str) -> DeliveryMethod {
    s.parse().unwrap_or_default()
}

/// Parse pill interval from database string
fn parse_pill_interval(s: &str) -> PillExpirationInterval {
    s.parse().unwrap_or_else(|_| {
        tracing::warn!("Unknown pill interval '{s}', using every day");
        PillExpirationInterval::EveryDay
    })
}

/// Parse notification kind from database string
fn parse_notification_kind(s: &str) -> NotificationKind {
    match s {
        "hormone_overnight" => NotificationKind::HormoneOvernight,
        "pill_due" => NotificationKind::PillDue,
        _ => NotificationKind::HormoneExpired,
    }
}

/// Format notification kind for database storage
fn format_notification_kind(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::HormoneExpired => "hormone_expired",
        NotificationKind::HormoneOvernight => "hormone_overnight",
        NotificationKind::PillDue => "pill_due",
    }
}

fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    let s = s?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| tracing::warn!("Ignoring unparseable date '{s}': {e}"))
        .ok()
}

fn format_datetime(dt: Option<&DateTime<Utc>>) -> Option<String> {
    dt.map(|d| d.to_rfc3339())
}

fn parse_uuid(s: &str) -> Option<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| tracing::warn!("Skipping row with invalid id '{s}': {e}"))
        .ok()
}

fn uuid_column(row: &rusqlite::Row, idx: usize) -> Result<Option<Uuid>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    Ok(parse_uuid(&raw))
}

fn site_columns(site: &SiteRef) -> (Option<String>, Option<&str>) {
    match site {
        SiteRef::Unplaced => (None, None),
        SiteRef::Site(id) => (Some(id.to_string()), None),
        SiteRef::Backup(name) => (None, Some(name.as_str())),
    }
}

/// SQLite database for PatchDay records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open (or create) the database file at `path`.
    ///
    /// Creates the schema if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // === Hormones ===

    pub fn list_hormones(&self) -> Result<Vec<Hormone>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, site_id, site_name_backup, delivery_method
             FROM hormones ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            let Some(id) = uuid_column(row, 0)? else {
                return Ok(None);
            };
            let site_id: Option<String> = row.get(2)?;
            let backup: Option<String> = row.get(3)?;
            let site = match (site_id.as_deref().and_then(parse_uuid), backup) {
                (Some(site_id), _) => SiteRef::Site(site_id),
                (None, Some(name)) if !name.is_empty() => SiteRef::Backup(name),
                _ => SiteRef::Unplaced,
            };
            let method: String = row.get(4)?;
            Ok(Some(Hormone {
                id,
                date: parse_datetime(row.get(1)?),
                site,
                delivery_method: parse_delivery_method(&method),
            }))
        })?;
        let mut hormones = Vec::new();
        for row in rows {
            if let Some(hormone) = row? {
                hormones.push(hormone);
            }
        }
        Ok(hormones)
    }

    pub fn insert_hormone(&self, hormone: &Hormone) -> Result<(), rusqlite::Error> {
        let (site_id, backup) = site_columns(&hormone.site);
        self.conn.execute(
            "INSERT INTO hormones (id, date, site_id, site_name_backup, delivery_method)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                hormone.id.to_string(),
                format_datetime(hormone.date.as_ref()),
                site_id,
                backup,
                hormone.delivery_method.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Returns false when no row has the hormone's id.
    pub fn update_hormone(&self, hormone: &Hormone) -> Result<bool, rusqlite::Error> {
        let (site_id, backup) = site_columns(&hormone.site);
        let changed = self.conn.execute(
            "UPDATE hormones SET date = ?2, site_id = ?3, site_name_backup = ?4, delivery_method = ?5
             WHERE id = ?1",
            params![
                hormone.id.to_string(),
                format_datetime(hormone.date.as_ref()),
                site_id,
                backup,
                hormone.delivery_method.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_hormone(&self, id: Uuid) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM hormones WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    pub fn delete_all_hormones(&self) -> Result<usize, rusqlite::Error> {
        self.conn.execute("DELETE FROM hormones", [])
    }

    // === Pills ===

    pub fn list_pills(&self) -> Result<Vec<Pill>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, times, notify, times_taken_today, last_taken, expiration_interval
             FROM pills ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            let Some(id) = uuid_column(row, 0)? else {
                return Ok(None);
            };
            let times: String = row.get(2)?;
            let interval: String = row.get(6)?;
            Ok(Some(Pill::from_parts(
                id,
                row.get(1)?,
                dates::parse_times(&times),
                row.get(3)?,
                row.get(4)?,
                parse_datetime(row.get(5)?),
                parse_pill_interval(&interval),
            )))
        })?;
        let mut pills = Vec::new();
        for row in rows {
            if let Some(pill) = row? {
                pills.push(pill);
            }
        }
        Ok(pills)
    }

    pub fn insert_pill(&self, pill: &Pill) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO pills (id, name, times, notify, times_taken_today, last_taken, expiration_interval)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                pill.id.to_string(),
                pill.name,
                dates::format_times(pill.times()),
                pill.notify,
                pill.times_taken_today,
                format_datetime(pill.last_taken.as_ref()),
                pill.expiration_interval.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn update_pill(&self, pill: &Pill) -> Result<bool, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE pills SET name = ?2, times = ?3, notify = ?4, times_taken_today = ?5,
                              last_taken = ?6, expiration_interval = ?7
             WHERE id = ?1",
            params![
                pill.id.to_string(),
                pill.name,
                dates::format_times(pill.times()),
                pill.notify,
                pill.times_taken_today,
                format_datetime(pill.last_taken.as_ref()),
                pill.expiration_interval.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_pill(&self, id: Uuid) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM pills WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    pub fn delete_all_pills(&self) -> Result<usize, rusqlite::Error> {
        self.conn.execute("DELETE FROM pills", [])
    }

    // === Sites ===

    /// All site rows ordered by rotation order, including unusable ones.
    pub fn list_sites(&self) -> Result<Vec<Site>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, sort_order, image_id FROM sites ORDER BY sort_order, rowid")?;
        let rows = stmt.query_map([], |row| {
            let Some(id) = uuid_column(row, 0)? else {
                return Ok(None);
            };
            Ok(Some(Site {
                id,
                name: row.get(1)?,
                order: row.get(2)?,
                image_id: row.get(3)?,
            }))
        })?;
        let mut sites = Vec::new();
        for row in rows {
            if let Some(site) = row? {
                sites.push(site);
            }
        }
        Ok(sites)
    }

    pub fn insert_site(&self, site: &Site) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO sites (id, name, sort_order, image_id) VALUES (?1, ?2, ?3, ?4)",
            params![site.id.to_string(), site.name, site.order, site.image_id],
        )?;
        Ok(())
    }

    pub fn update_site(&self, site: &Site) -> Result<bool, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE sites SET name = ?2, sort_order = ?3, image_id = ?4 WHERE id = ?1",
            params![site.id.to_string(), site.name, site.order, site.image_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a site in a single transaction.
    ///
    /// Hormones placed on it keep the site's name as a backup and lose the
    /// relationship; every later site moves up one place. Returns how many
    /// hormones were backed up.
    pub fn delete_site_with_backup(&self, site_id: Uuid) -> Result<usize, rusqlite::Error> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        let result: Result<usize, rusqlite::Error> = (|| {
            let id = site_id.to_string();
            let (name, order): (String, i64) = self.conn.query_row(
                "SELECT name, sort_order FROM sites WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let backed_up = self.conn.execute(
                "UPDATE hormones SET site_name_backup = ?2, site_id = NULL WHERE site_id = ?1",
                params![id, name],
            )?;
            self.conn
                .execute("DELETE FROM sites WHERE id = ?1", params![id])?;
            self.conn.execute(
                "UPDATE sites SET sort_order = sort_order - 1 WHERE sort_order > ?1",
                params![order],
            )?;
            Ok(backed_up)
        })();
        match result {
            Ok(backed_up) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(backed_up)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }

    /// Delete every site, moving names onto placed hormones as backups first.
    pub fn delete_all_sites(&self) -> Result<usize, rusqlite::Error> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE hormones
             SET site_name_backup = (SELECT name FROM sites WHERE sites.id = hormones.site_id),
                 site_id = NULL
             WHERE site_id IS NOT NULL",
            [],
        )?;
        let deleted = tx.execute("DELETE FROM sites", [])?;
        tx.commit()?;
        Ok(deleted)
    }

    // === Notifications ===

    pub fn list_notifications(&self) -> Result<Vec<NotificationRequest>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, title, body, fire_at, subject_id
             FROM notifications ORDER BY fire_at",
        )?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(1)?;
            let subject: String = row.get(5)?;
            let Some(fire_at) = parse_datetime(Some(row.get(4)?)) else {
                return Ok(None);
            };
            let Some(subject_id) = parse_uuid(&subject) else {
                return Ok(None);
            };
            Ok(Some(NotificationRequest {
                id: row.get(0)?,
                kind: parse_notification_kind(&kind),
                title: row.get(2)?,
                body: row.get(3)?,
                fire_at,
                subject_id,
            }))
        })?;
        let mut requests = Vec::new();
        for row in rows {
            if let Some(request) = row? {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    /// Insert or replace a request with the same id.
    pub fn upsert_notification(&self, request: &NotificationRequest) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO notifications (id, kind, title, body, fire_at, subject_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                request.id,
                format_notification_kind(request.kind),
                request.title,
                request.body,
                request.fire_at.to_rfc3339(),
                request.subject_id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_notification(&self, id: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn delete_all_notifications(&self) -> Result<usize, rusqlite::Error> {
        self.conn.execute("DELETE FROM notifications", [])
    }

    // === Key-value ===

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
