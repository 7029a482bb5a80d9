use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::dates::ExpirationInterval;
use crate::error::{CoreError, Entity, Result, ValidationError};
use crate::hormone::{Hormone, SiteRef};
use crate::settings::{DeliveryMethod, MAX_QUANTITY};
use crate::storage::Database;

/// The hormone slots, kept sorted earliest-applied first.
#[derive(Debug, Clone)]
pub struct HormoneSchedule {
    hormones: Vec<Hormone>,
    delivery_method: DeliveryMethod,
}

impl HormoneSchedule {
    /// Loads stored hormones, creating `quantity` empty slots when there are none.
    pub fn load(db: &Database, delivery_method: DeliveryMethod, quantity: u32) -> Self {
        let hormones = match db.list_hormones() {
            Ok(hormones) if !hormones.is_empty() => hormones,
            Ok(_) => {
                tracing::info!("No hormones stored, creating {quantity} {delivery_method}");
                Self::create_defaults(Some(db), delivery_method, quantity)
            }
            Err(e) => {
                tracing::error!("Failed to load hormones, using defaults: {e}");
                Self::create_defaults(None, delivery_method, quantity)
            }
        };
        let mut schedule = Self {
            hormones,
            delivery_method,
        };
        schedule.sort();
        schedule
    }

    fn create_defaults(db: Option<&Database>, method: DeliveryMethod, quantity: u32) -> Vec<Hormone> {
        (0..quantity.clamp(1, MAX_QUANTITY))
            .map(|_| {
                let hormone = Hormone::new(method);
                if let Some(db) = db {
                    if let Err(e) = db.insert_hormone(&hormone) {
                        tracing::error!("Failed to create hormone {}: {e}", hormone.id);
                    }
                }
                hormone
            })
            .collect()
    }

    pub fn all(&self) -> &[Hormone] {
        &self.hormones
    }

    pub fn count(&self) -> usize {
        self.hormones.len()
    }

    pub fn delivery_method(&self) -> DeliveryMethod {
        self.delivery_method
    }

    pub fn at(&self, index: usize) -> Option<&Hormone> {
        self.hormones.get(index)
    }

    pub fn get(&self, id: Uuid) -> Option<&Hormone> {
        self.hormones.iter().find(|h| h.id == id)
    }

    fn index_of(&self, id: Uuid) -> Result<usize> {
        self.hormones
            .iter()
            .position(|h| h.id == id)
            .ok_or_else(|| CoreError::NotFound {
                entity: Entity::Hormone,
                id: id.to_string(),
            })
    }

    /// The hormone applied longest ago, which expires first.
    pub fn next(&self) -> Option<&Hormone> {
        self.hormones.first()
    }

    pub fn total_expired<Tz: TimeZone>(&self, interval: ExpirationInterval, now: &DateTime<Tz>) -> usize {
        self.hormones
            .iter()
            .filter(|h| h.is_expired(interval, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.hormones.iter().all(Hormone::is_empty)
    }

    /// Whether every slot at or after `index` is unused.
    pub fn is_empty_from(&self, index: usize) -> bool {
        self.hormones.iter().skip(index).all(Hormone::is_empty)
    }

    /// Adds an empty slot. Returns `None` when full or the store rejects it.
    pub fn insert_new(&mut self, db: &Database) -> Option<&Hormone> {
        if self.count() >= MAX_QUANTITY as usize {
            tracing::warn!("Already holding {MAX_QUANTITY} hormones, not adding another");
            return None;
        }
        let hormone = Hormone::new(self.delivery_method);
        if let Err(e) = db.insert_hormone(&hormone) {
            tracing::error!("Failed to create hormone: {e}");
            return None;
        }
        tracing::info!("Created hormone {}", hormone.id);
        self.hormones.push(hormone);
        self.sort();
        self.hormones.last()
    }

    /// Appends empty slots until there are `quantity`. Returns how many were added.
    pub fn fill_to(&mut self, db: &Database, quantity: u32) -> usize {
        let mut added = 0;
        while self.count() < quantity as usize {
            if self.insert_new(db).is_none() {
                break;
            }
            added += 1;
        }
        added
    }

    /// Discards every slot past the first `count`. Returns how many went.
    pub fn delete_after(&mut self, db: &Database, count: usize) -> usize {
        if self.count() <= count {
            return 0;
        }
        let removed: Vec<Hormone> = self.hormones.drain(count..).collect();
        for hormone in &removed {
            if !hormone.is_empty() {
                tracing::warn!("Discarding hormone {} that still has data", hormone.id);
            }
            if let Err(e) = db.delete_hormone(hormone.id) {
                tracing::error!("Failed to delete hormone {}: {e}", hormone.id);
            }
        }
        removed.len()
    }

    pub fn delete_all(&mut self, db: &Database) {
        if let Err(e) = db.delete_all_hormones() {
            tracing::error!("Failed to delete hormones: {e}");
        }
        self.hormones.clear();
    }

    /// Starts over with the method's default number of empty slots.
    pub fn reset(&mut self, db: &Database, method: DeliveryMethod) -> usize {
        self.delete_all(db);
        self.delivery_method = method;
        self.fill_to(db, method.default_quantity())
    }

    fn push(&self, db: &Database, index: usize) {
        let Some(hormone) = self.hormones.get(index) else {
            return;
        };
        let result = db.update_hormone(hormone).and_then(|updated| {
            if updated {
                Ok(())
            } else {
                tracing::warn!("Hormone {} was not stored yet, inserting", hormone.id);
                db.insert_hormone(hormone)
            }
        });
        match result {
            Ok(()) => tracing::info!("Saved hormone {}", hormone.id),
            Err(e) => tracing::error!("Failed to save hormone {}: {e}", hormone.id),
        }
    }

    fn mutate(&mut self, db: &Database, id: Uuid, f: impl FnOnce(&mut Hormone)) -> Result<()> {
        let index = self.index_of(id)?;
        f(&mut self.hormones[index]);
        self.push(db, index);
        self.sort();
        Ok(())
    }

    /// Records an application: the date and, when given, the site.
    pub fn set(&mut self, db: &Database, id: Uuid, date: DateTime<Utc>, site_id: Option<Uuid>) -> Result<()> {
        self.mutate(db, id, |h| {
            h.date = Some(date);
            if let Some(site_id) = site_id {
                h.set_site(site_id);
            }
        })
    }

    pub fn set_at(
        &mut self,
        db: &Database,
        index: usize,
        date: DateTime<Utc>,
        site_id: Option<Uuid>,
    ) -> Result<()> {
        let id = self.id_at(index)?;
        self.set(db, id, date, site_id)
    }

    pub fn set_date(&mut self, db: &Database, id: Uuid, date: DateTime<Utc>) -> Result<()> {
        self.mutate(db, id, |h| h.date = Some(date))
    }

    pub fn set_site(&mut self, db: &Database, id: Uuid, site_id: Uuid) -> Result<()> {
        self.mutate(db, id, |h| h.set_site(site_id))
    }

    pub fn set_site_backup(&mut self, db: &Database, id: Uuid, name: &str) -> Result<()> {
        self.mutate(db, id, |h| h.set_site_backup(name))
    }

    /// Mirrors a site deletion the store already applied: hormones on the
    /// site keep its name as a backup. Returns how many changed.
    pub fn clear_site(&mut self, site_id: Uuid, backup_name: &str) -> usize {
        let mut changed = 0;
        for hormone in &mut self.hormones {
            if hormone.site == SiteRef::Site(site_id) {
                hormone.set_site_backup(backup_name);
                changed += 1;
            }
        }
        changed
    }

    pub fn id_at(&self, index: usize) -> Result<Uuid> {
        self.hormones.get(index).map(|h| h.id).ok_or_else(|| {
            ValidationError::OutOfBounds {
                collection: "hormones".into(),
                index,
                len: self.count(),
            }
            .into()
        })
    }

    pub fn sort(&mut self) {
        self.hormones.sort_by(Hormone::cmp_by_date);
    }

    /// Sites that currently have a hormone on them.
    pub fn site_ids(&self) -> Vec<Uuid> {
        self.hormones.iter().filter_map(|h| h.site.site_id()).collect()
    }

    pub fn count_on_site(&self, site_id: Uuid) -> usize {
        self.hormones
            .iter()
            .filter(|h| h.site.site_id() == Some(site_id))
            .count()
    }

    /// Slots that have been applied at least once.
    pub fn date_placed_count(&self) -> usize {
        self.hormones.iter().filter(|h| h.applied().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::Site;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, d, h, 0, 0).unwrap()
    }

    fn fresh(quantity: u32) -> (Database, HormoneSchedule) {
        let db = Database::open_memory().unwrap();
        let schedule = HormoneSchedule::load(&db, DeliveryMethod::Patches, quantity);
        (db, schedule)
    }

    #[test]
    fn load_creates_and_persists_defaults() {
        let (db, schedule) = fresh(3);
        assert_eq!(schedule.count(), 3);
        assert!(schedule.is_empty());
        assert_eq!(db.list_hormones().unwrap().len(), 3);

        let reloaded = HormoneSchedule::load(&db, DeliveryMethod::Patches, 1);
        assert_eq!(reloaded.count(), 3);
    }

    #[test]
    fn load_caps_default_slots() {
        let (db, schedule) = fresh(40);
        assert_eq!(schedule.count(), MAX_QUANTITY as usize);
        assert_eq!(db.list_hormones().unwrap().len(), MAX_QUANTITY as usize);
    }

    #[test]
    fn load_falls_back_when_store_is_broken() {
        let db = Database::open_memory().unwrap();
        db.conn().execute("DROP TABLE hormones", []).unwrap();
        let schedule = HormoneSchedule::load(&db, DeliveryMethod::Injections, 1);
        assert_eq!(schedule.count(), 1);
        assert_eq!(schedule.delivery_method(), DeliveryMethod::Injections);
    }

    #[test]
    fn insert_failure_leaves_count_unchanged() {
        let (db, mut schedule) = fresh(2);
        db.conn().execute("DROP TABLE hormones", []).unwrap();
        assert!(schedule.insert_new(&db).is_none());
        assert_eq!(schedule.count(), 2);
    }

    #[test]
    fn insert_stops_at_max_quantity() {
        let (db, mut schedule) = fresh(4);
        assert!(schedule.insert_new(&db).is_none());
    }

    #[test]
    fn set_sorts_earliest_first() {
        let (db, mut schedule) = fresh(3);
        let ids: Vec<Uuid> = schedule.all().iter().map(|h| h.id).collect();
        schedule.set_date(&db, ids[0], at(5, 0)).unwrap();
        schedule.set_date(&db, ids[1], at(2, 0)).unwrap();

        assert_eq!(schedule.at(0).unwrap().id, ids[1]);
        assert_eq!(schedule.at(1).unwrap().id, ids[0]);
        assert_eq!(schedule.at(2).unwrap().id, ids[2]);
        assert_eq!(schedule.next().unwrap().id, ids[1]);
        assert_eq!(schedule.date_placed_count(), 2);

        let reloaded = HormoneSchedule::load(&db, DeliveryMethod::Patches, 3);
        assert_eq!(reloaded.at(0).unwrap().date, Some(at(2, 0)));
    }

    #[test]
    fn set_unknown_id_is_not_found() {
        let (db, mut schedule) = fresh(1);
        let err = schedule.set_date(&db, Uuid::new_v4(), at(1, 0)).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: Entity::Hormone, .. }));
    }

    #[test]
    fn set_at_out_of_bounds() {
        let (db, mut schedule) = fresh(1);
        assert!(schedule.set_at(&db, 3, at(1, 0), None).is_err());
    }

    #[test]
    fn fill_to_keeps_existing_order() {
        let (db, mut schedule) = fresh(2);
        let first = schedule.at(0).unwrap().id;
        schedule.set_date(&db, first, at(1, 0)).unwrap();

        assert_eq!(schedule.fill_to(&db, 4), 2);
        assert_eq!(schedule.count(), 4);
        assert_eq!(schedule.at(0).unwrap().id, first);
        assert!(schedule.is_empty_from(1));
    }

    #[test]
    fn delete_after_discards_tail() {
        let (db, mut schedule) = fresh(4);
        let first = schedule.at(0).unwrap().id;
        schedule.set_date(&db, first, at(1, 0)).unwrap();

        assert_eq!(schedule.delete_after(&db, 1), 3);
        assert_eq!(schedule.count(), 1);
        assert_eq!(schedule.at(0).unwrap().id, first);
        assert_eq!(db.list_hormones().unwrap().len(), 1);
    }

    #[test]
    fn reset_recreates_default_quantity() {
        let (db, mut schedule) = fresh(4);
        assert_eq!(schedule.reset(&db, DeliveryMethod::Injections), 1);
        assert_eq!(schedule.count(), 1);
        assert_eq!(schedule.at(0).unwrap().delivery_method, DeliveryMethod::Injections);
    }

    #[test]
    fn total_expired_counts_only_expired() {
        let (db, mut schedule) = fresh(3);
        let ids: Vec<Uuid> = schedule.all().iter().map(|h| h.id).collect();
        schedule.set_date(&db, ids[0], at(1, 0)).unwrap();
        schedule.set_date(&db, ids[1], at(9, 0)).unwrap();
        assert_eq!(schedule.total_expired(ExpirationInterval::TwiceWeekly, &at(10, 0)), 1);
    }

    #[test]
    fn site_counts_and_clear_site() {
        let (db, mut schedule) = fresh(2);
        let site = Site::new("Right Glute", 0);
        db.insert_site(&site).unwrap();
        let id = schedule.at(0).unwrap().id;
        schedule.set(&db, id, at(1, 0), Some(site.id)).unwrap();

        assert_eq!(schedule.count_on_site(site.id), 1);
        assert_eq!(schedule.site_ids(), vec![site.id]);

        assert_eq!(schedule.clear_site(site.id, "Right Glute"), 1);
        assert_eq!(schedule.count_on_site(site.id), 0);
        assert_eq!(schedule.get(id).unwrap().site.backup_name(), Some("Right Glute"));
    }
}
