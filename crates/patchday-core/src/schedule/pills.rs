use chrono::{DateTime, TimeZone};
use uuid::Uuid;

use crate::error::{CoreError, Entity, Result, ValidationError};
use crate::pill::{Pill, PillAttributes, NEW_PILL_NAME};
use crate::storage::Database;

/// Pills created on first launch.
pub const DEFAULT_PILL_NAMES: [&str; 2] = ["T-Blocker", "Progesterone"];

const PILLS_INITIALIZED_KEY: &str = "pills_initialized";

/// The user's pills, in creation order.
#[derive(Debug, Clone, Default)]
pub struct PillSchedule {
    pills: Vec<Pill>,
}

impl PillSchedule {
    /// Loads stored pills. The very first load seeds the default pills;
    /// later loads respect a list the user emptied on purpose.
    pub fn load(db: &Database) -> Self {
        let pills = match db.list_pills() {
            Ok(pills) if !pills.is_empty() => pills,
            Ok(_) => {
                let initialized = db
                    .kv_get(PILLS_INITIALIZED_KEY)
                    .map_err(|e| tracing::warn!("Failed to read pill state: {e}"))
                    .ok()
                    .flatten()
                    .is_some();
                if initialized {
                    Vec::new()
                } else {
                    tracing::info!("First launch, creating default pills");
                    let pills = Self::create_defaults(Some(db));
                    if let Err(e) = db.kv_set(PILLS_INITIALIZED_KEY, "true") {
                        tracing::error!("Failed to record pill initialization: {e}");
                    }
                    pills
                }
            }
            Err(e) => {
                tracing::error!("Failed to load pills, using defaults: {e}");
                Self::create_defaults(None)
            }
        };
        Self { pills }
    }

    fn create_defaults(db: Option<&Database>) -> Vec<Pill> {
        DEFAULT_PILL_NAMES
            .iter()
            .map(|name| {
                let pill = Pill::new(*name);
                if let Some(db) = db {
                    if let Err(e) = db.insert_pill(&pill) {
                        tracing::error!("Failed to create pill {name}: {e}");
                    }
                }
                pill
            })
            .collect()
    }

    pub fn all(&self) -> &[Pill] {
        &self.pills
    }

    pub fn count(&self) -> usize {
        self.pills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pills.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<&Pill> {
        self.pills.get(index)
    }

    pub fn get(&self, id: Uuid) -> Option<&Pill> {
        self.pills.iter().find(|p| p.id == id)
    }

    fn index_of(&self, id: Uuid) -> Result<usize> {
        self.pills
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CoreError::NotFound {
                entity: Entity::Pill,
                id: id.to_string(),
            })
    }

    pub fn id_at(&self, index: usize) -> Result<Uuid> {
        self.pills.get(index).map(|p| p.id).ok_or_else(|| {
            ValidationError::OutOfBounds {
                collection: "pills".into(),
                index,
                len: self.count(),
            }
            .into()
        })
    }

    /// Adds a once-a-day pill. Returns `None` when the store rejects it.
    pub fn insert_new(&mut self, db: &Database, name: Option<&str>) -> Option<&Pill> {
        self.insert(db, Pill::new(name.unwrap_or(NEW_PILL_NAME)))
    }

    /// Stores an already built pill. Returns `None` when the store rejects it.
    pub fn insert(&mut self, db: &Database, pill: Pill) -> Option<&Pill> {
        if let Err(e) = db.insert_pill(&pill) {
            tracing::error!("Failed to create pill: {e}");
            return None;
        }
        tracing::info!("Created pill {} ({})", pill.name, pill.id);
        self.pills.push(pill);
        self.pills.last()
    }

    fn push(&self, db: &Database, index: usize) {
        let Some(pill) = self.pills.get(index) else {
            return;
        };
        let result = db.update_pill(pill).and_then(|updated| {
            if updated {
                Ok(())
            } else {
                tracing::warn!("Pill {} was not stored yet, inserting", pill.id);
                db.insert_pill(pill)
            }
        });
        match result {
            Ok(()) => tracing::info!("Saved pill {}", pill.id),
            Err(e) => tracing::error!("Failed to save pill {}: {e}", pill.id),
        }
    }

    pub fn set(&mut self, db: &Database, id: Uuid, attributes: PillAttributes) -> Result<()> {
        let index = self.index_of(id)?;
        self.pills[index].set(attributes)?;
        self.push(db, index);
        Ok(())
    }

    /// Records a dose. Returns false when today's doses were already taken.
    pub fn swallow<Tz: TimeZone>(&mut self, db: &Database, id: Uuid, now: &DateTime<Tz>) -> Result<bool> {
        let index = self.index_of(id)?;
        let swallowed = self.pills[index].swallow(now);
        if swallowed {
            self.push(db, index);
        } else {
            tracing::warn!("Pill {id} already taken {} times today", self.pills[index].times_taken_today);
        }
        Ok(swallowed)
    }

    /// Resets yesterday's counters. Returns how many pills changed.
    pub fn awaken<Tz: TimeZone>(&mut self, db: &Database, now: &DateTime<Tz>) -> usize {
        let mut changed = Vec::new();
        for (index, pill) in self.pills.iter_mut().enumerate() {
            if pill.awaken(now) {
                changed.push(index);
            }
        }
        for index in &changed {
            self.push(db, *index);
        }
        changed.len()
    }

    pub fn delete(&mut self, db: &Database, id: Uuid) -> Result<Pill> {
        let index = self.index_of(id)?;
        let pill = self.pills.remove(index);
        if let Err(e) = db.delete_pill(id) {
            tracing::error!("Failed to delete pill {id}: {e}");
        }
        Ok(pill)
    }

    pub fn delete_at(&mut self, db: &Database, index: usize) -> Result<Pill> {
        let id = self.id_at(index)?;
        self.delete(db, id)
    }

    /// The pill whose next dose comes first.
    pub fn next_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<&Pill> {
        self.pills
            .iter()
            .filter_map(|p| p.due(now).map(|due| (due, p)))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, p)| p)
    }

    pub fn total_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> usize {
        self.pills.iter().filter(|p| p.is_due(now)).count()
    }

    /// Replaces every pill with the defaults.
    pub fn reset(&mut self, db: &Database) -> usize {
        if let Err(e) = db.delete_all_pills() {
            tracing::error!("Failed to delete pills: {e}");
        }
        self.pills = Self::create_defaults(Some(db));
        self.pills.len()
    }
}
