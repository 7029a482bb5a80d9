//! The `PatchData` facade.
//!
//! Owns the store, the configuration, the three schedules, and the
//! notification queue, and keeps them consistent across user actions.
//! Mutations only touch records and settings; call [`PatchData::refresh`]
//! afterwards to re-plan reminders and re-share the today summary.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::dates::ExpirationInterval;
use crate::error::{ConfigError, CoreError, Entity, Result, ValidationError};
use crate::hormone::{Hormone, SiteRef};
use crate::notifications::{self, MemoryNotificationCenter, NotificationCenter, NotificationRequest};
use crate::pill::{Pill, PillAttributes};
use crate::schedule::{HormoneSchedule, PillSchedule, SiteSchedule};
use crate::settings::{DeliveryMethod, MAX_QUANTITY};
use crate::shared::{NextHormone, NextPill, TodayData};
use crate::site::Site;
use crate::storage::{data_dir, Config, Database, HormonesConfig};

const DB_FILE_NAME: &str = "patchday.db";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Outcome of a settings change that may discard recorded data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettingsMutation {
    Applied,
    Unchanged,
    /// Nothing changed; repeat with `force` to accept the data loss.
    RequiresConfirmation { reason: String },
}

pub struct PatchData {
    db: Database,
    config: Config,
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    hormones: HormoneSchedule,
    pills: PillSchedule,
    sites: SiteSchedule,
    notifications: Box<dyn NotificationCenter>,
}

impl PatchData {
    /// Opens everything under the default data directory.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?)
    }

    /// Opens (creating if needed) the database, config, and shared file in `dir`.
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let config_path = dir.join(CONFIG_FILE_NAME);
        let config = Config::load_from(&config_path)?;
        let db_path = dir.join(DB_FILE_NAME);
        let db = Database::open_at(&db_path)?;
        let queue = Database::open_at(&db_path)?;
        tracing::debug!("Opened patchday data in {}", dir.display());
        Ok(Self::assemble(
            db,
            config,
            Some(config_path),
            Some(dir.to_path_buf()),
            Box::new(queue),
        ))
    }

    /// Everything in memory; nothing touches the filesystem.
    pub fn open_in_memory(config: Config) -> Result<Self> {
        config.validate()?;
        let db = Database::open_memory()?;
        Ok(Self::assemble(
            db,
            config,
            None,
            None,
            Box::new(MemoryNotificationCenter::new()),
        ))
    }

    fn assemble(
        db: Database,
        config: Config,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
        notifications: Box<dyn NotificationCenter>,
    ) -> Self {
        let method = config.hormones.delivery_method;
        let quantity = config.hormones.quantity;
        let mut hormones = HormoneSchedule::load(&db, method, quantity);
        if hormones.count() < quantity as usize {
            hormones.fill_to(&db, quantity);
        }
        let pills = PillSchedule::load(&db);
        let sites = SiteSchedule::load(&db, method);
        Self {
            db,
            config,
            config_path,
            data_dir,
            hormones,
            pills,
            sites,
            notifications,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hormones(&self) -> &HormoneSchedule {
        &self.hormones
    }

    pub fn pills(&self) -> &PillSchedule {
        &self.pills
    }

    pub fn sites(&self) -> &SiteSchedule {
        &self.sites
    }

    pub fn notification_center(&self) -> &dyn NotificationCenter {
        self.notifications.as_ref()
    }

    pub fn delivery_method(&self) -> DeliveryMethod {
        self.config.hormones.delivery_method
    }

    pub fn expiration_interval(&self) -> ExpirationInterval {
        self.config.hormones.expiration_interval
    }

    fn persist_config(&self) -> Result<()> {
        self.config.validate()?;
        if let Some(path) = &self.config_path {
            self.config.save_to(path)?;
        }
        Ok(())
    }

    // === Hormones ===

    /// Name of the site a hormone is on, or the backup name of a deleted one.
    pub fn site_name_of(&self, hormone: &Hormone) -> Option<String> {
        match &hormone.site {
            SiteRef::Site(id) => self.sites.get(*id).map(|s| s.name.clone()),
            SiteRef::Backup(name) => Some(name.clone()),
            SiteRef::Unplaced => None,
        }
    }

    /// The site the rotation suggests next.
    pub fn suggested_site(&self) -> Option<&Site> {
        let cursor = SiteSchedule::cursor(&self.db);
        self.sites.suggested(cursor, &self.hormones)
    }

    /// Records an application at `date`, on the named site when given.
    /// Unknown site names become new sites.
    pub fn apply_hormone<Tz: TimeZone>(
        &mut self,
        id: Uuid,
        date: &DateTime<Tz>,
        site_name: Option<&str>,
    ) -> Result<()> {
        let date = date.with_timezone(&Utc);
        let Some(name) = site_name else {
            return self.hormones.set(&self.db, id, date, None);
        };
        match self.sites.get_or_insert_by_name(&self.db, name) {
            Some(site_id) => self.hormones.set(&self.db, id, date, Some(site_id)),
            None => {
                tracing::warn!("Could not store site '{name}', keeping it as a backup name");
                self.hormones.set_date(&self.db, id, date)?;
                self.hormones.set_site_backup(&self.db, id, name)
            }
        }
    }

    /// Applies now on the suggested site and advances the rotation.
    /// Returns the site used.
    pub fn apply_suggested<Tz: TimeZone>(&mut self, id: Uuid, now: &DateTime<Tz>) -> Result<Option<String>> {
        if self.hormones.get(id).is_none() {
            return Err(CoreError::NotFound {
                entity: Entity::Hormone,
                id: id.to_string(),
            });
        }
        let cursor = SiteSchedule::cursor(&self.db);
        let Some(index) = self.sites.next_index(cursor, &self.hormones) else {
            tracing::warn!("No sites to suggest, applying without one");
            self.hormones.set(&self.db, id, now.with_timezone(&Utc), None)?;
            return Ok(None);
        };
        let site = self.sites.at(index).cloned();
        let site_id = site.as_ref().map(|s| s.id);
        self.hormones.set(&self.db, id, now.with_timezone(&Utc), site_id)?;
        SiteSchedule::set_cursor(&self.db, index);
        Ok(site.map(|s| s.name))
    }

    pub fn reset_hormones(&mut self) -> usize {
        let method = self.delivery_method();
        let count = self.hormones.reset(&self.db, method);
        self.config.hormones.quantity = count as u32;
        if let Err(e) = self.persist_config() {
            tracing::error!("Failed to save quantity after reset: {e}");
        }
        count
    }

    // === Pills ===

    pub fn add_pill(&mut self, name: &str, attributes: PillAttributes) -> Result<Uuid> {
        let mut pill = Pill::new(name);
        pill.set(attributes)?;
        self.pills
            .insert(&self.db, pill)
            .map(|p| p.id)
            .ok_or_else(|| CoreError::Custom(format!("could not create pill '{name}'")))
    }

    pub fn edit_pill(&mut self, index: usize, attributes: PillAttributes) -> Result<()> {
        let id = self.pills.id_at(index)?;
        self.pills.set(&self.db, id, attributes)
    }

    pub fn remove_pill(&mut self, index: usize) -> Result<()> {
        let removed = self.pills.delete_at(&self.db, index)?;
        if let Err(e) = self
            .notifications
            .cancel(&NotificationRequest::request_id(notifications::NotificationKind::PillDue, removed.id))
        {
            tracing::error!("Failed to cancel reminder for pill {}: {e}", removed.id);
        }
        Ok(())
    }

    pub fn swallow_pill<Tz: TimeZone>(&mut self, id: Uuid, now: &DateTime<Tz>) -> Result<bool> {
        self.pills.swallow(&self.db, id, now)
    }

    pub fn reset_pills(&mut self) -> usize {
        self.pills.reset(&self.db)
    }

    // === Sites ===

    pub fn add_site(&mut self, name: &str) -> Result<Uuid> {
        self.sites
            .insert_new(&self.db, name)
            .map(|s| s.id)
            .ok_or_else(|| ValidationError::invalid("name", format!("could not create site '{name}'")).into())
    }

    pub fn rename_site(&mut self, index: usize, name: &str) -> Result<()> {
        self.sites.rename(&self.db, index, name)
    }

    pub fn reorder_site(&mut self, index: usize, new_order: usize) -> Result<()> {
        self.sites.reorder(&self.db, index, new_order)
    }

    pub fn set_site_image(&mut self, index: usize, image_id: &str) -> Result<()> {
        let method = self.delivery_method();
        self.sites.set_image_id(&self.db, index, image_id, method)
    }

    /// Deletes a site; hormones on it keep its name as a backup.
    pub fn delete_site(&mut self, index: usize) -> Result<Site> {
        let site = self.sites.delete(&self.db, index)?;
        self.hormones.clear_site(site.id, &site.name);
        let cursor = SiteSchedule::cursor(&self.db);
        if cursor >= self.sites.count() {
            SiteSchedule::set_cursor(&self.db, 0);
        }
        Ok(site)
    }

    pub fn reset_sites(&mut self) -> usize {
        let method = self.delivery_method();
        let count = self.sites.reset(&self.db, method);
        // the store moved names onto hormones as backups; reload to match
        self.hormones = HormoneSchedule::load(&self.db, method, self.config.hormones.quantity);
        count
    }

    // === Settings ===

    /// Fresh means nothing recorded and the default sites untouched.
    pub fn is_fresh(&self) -> bool {
        self.hormones.is_empty() && self.sites.is_default(self.delivery_method())
    }

    /// Switching methods wipes hormones and sites, so it needs `force`
    /// unless nothing has been recorded yet.
    pub fn set_delivery_method(&mut self, method: DeliveryMethod, force: bool) -> Result<SettingsMutation> {
        if method == self.delivery_method() {
            return Ok(SettingsMutation::Unchanged);
        }
        if !force && !self.is_fresh() {
            return Ok(SettingsMutation::RequiresConfirmation {
                reason: format!(
                    "switching to {method} resets all {} and sites",
                    self.delivery_method()
                ),
            });
        }
        self.config.hormones.delivery_method = method;
        self.config.hormones.quantity = method.default_quantity();
        self.hormones.reset(&self.db, method);
        self.sites.reset(&self.db, method);
        self.persist_config()?;
        tracing::info!("Delivery method set to {method}");
        Ok(SettingsMutation::Applied)
    }

    /// Growing adds empty slots; shrinking past recorded slots needs `force`.
    pub fn set_quantity(&mut self, quantity: u32, force: bool) -> Result<SettingsMutation> {
        let method = self.delivery_method();
        if !(1..=MAX_QUANTITY).contains(&quantity) || !method.allows_quantity(quantity) {
            return Err(ConfigError::InvalidValue {
                key: "hormones.quantity".into(),
                message: format!("{quantity} is not a valid quantity for {method}"),
            }
            .into());
        }
        let count = self.hormones.count();
        let target = quantity as usize;
        if target == count && quantity == self.config.hormones.quantity {
            return Ok(SettingsMutation::Unchanged);
        }
        if target < count {
            if !force && !self.hormones.is_empty_from(target) {
                return Ok(SettingsMutation::RequiresConfirmation {
                    reason: format!(
                        "reducing to {quantity} discards {} recorded {}",
                        count - target,
                        method
                    ),
                });
            }
            self.hormones.delete_after(&self.db, target);
        } else {
            self.hormones.fill_to(&self.db, quantity);
        }
        self.config.hormones.quantity = quantity;
        self.persist_config()?;
        Ok(SettingsMutation::Applied)
    }

    pub fn set_expiration_interval(&mut self, interval: ExpirationInterval) -> Result<()> {
        self.config.hormones.expiration_interval = interval;
        self.persist_config()
    }

    pub fn set_notifications(&mut self, enabled: bool, minutes_before: Option<u32>) -> Result<()> {
        let mut updated = self.config.clone();
        updated.notifications.enabled = enabled;
        if let Some(minutes) = minutes_before {
            updated.notifications.minutes_before = minutes;
        }
        updated.validate()?;
        self.config = updated;
        self.persist_config()
    }

    pub fn mark_disclaimer_mentioned(&mut self) -> Result<()> {
        self.config.mentioned_disclaimer = true;
        self.persist_config()
    }

    /// Dot-path config change routed through the facade so dependent
    /// state stays in step.
    pub fn set_config_value(&mut self, key: &str, value: &str, force: bool) -> Result<SettingsMutation> {
        match key {
            "hormones.delivery_method" => {
                let method = value.parse::<DeliveryMethod>()?;
                self.set_delivery_method(method, force)
            }
            "hormones.quantity" => {
                let quantity = value.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!("cannot parse '{value}' as number"),
                })?;
                self.set_quantity(quantity, force)
            }
            _ => {
                let mut updated = self.config.clone();
                updated.set(key, value)?;
                if updated == self.config {
                    return Ok(SettingsMutation::Unchanged);
                }
                self.config = updated;
                self.persist_config()?;
                Ok(SettingsMutation::Applied)
            }
        }
    }

    /// Restores default preferences. Delivery method and quantity describe
    /// the stored hormones and are left alone.
    pub fn reset_preferences(&mut self) -> Result<()> {
        self.config = Config {
            mentioned_disclaimer: self.config.mentioned_disclaimer,
            hormones: HormonesConfig {
                expiration_interval: ExpirationInterval::default(),
                ..self.config.hormones.clone()
            },
            ..Config::default()
        };
        self.persist_config()
    }

    /// Back to a first-launch state. The disclaimer flag survives.
    pub fn reset_all(&mut self) -> Result<()> {
        let mentioned = self.config.mentioned_disclaimer;
        self.config = Config {
            mentioned_disclaimer: mentioned,
            ..Config::default()
        };
        let method = self.delivery_method();
        self.hormones.reset(&self.db, method);
        self.sites.reset(&self.db, method);
        self.pills.reset(&self.db);
        if let Err(e) = self.notifications.cancel_all() {
            tracing::error!("Failed to clear notifications: {e}");
        }
        self.persist_config()?;
        tracing::info!("Reset all data");
        Ok(())
    }

    // === Queries ===

    /// Expired hormones plus due pills.
    pub fn total_alerts<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> usize {
        notifications::badge(
            self.hormones.total_expired(self.expiration_interval(), now),
            self.pills.total_due(now),
        )
    }

    pub fn today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> TodayData {
        let next_hormone = self.hormones.next().map(|h| NextHormone {
            site_name: self.suggested_site().map(|s| s.name.clone()),
            date: h.expiration(self.expiration_interval()),
        });
        let next_pill = self.pills.next_due(now).map(|p| NextPill {
            name: p.name.clone(),
            due: p.due(now).map(|d| d.with_timezone(&Utc)),
        });
        TodayData {
            delivery_method: self.delivery_method(),
            next_hormone,
            next_pill,
        }
    }

    /// Every reminder that should be pending as of `now`.
    pub fn plan_notifications<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<NotificationRequest> {
        let interval = self.expiration_interval();
        let minutes_before = self.config.notifications.minutes_before;
        let suggested = self.suggested_site().map(|s| s.name.clone());
        let mut requests = Vec::new();
        for hormone in self.hormones.all() {
            let current = self.site_name_of(hormone);
            requests.extend(notifications::hormone_expired_request(
                hormone,
                current.as_deref(),
                suggested.as_deref(),
                interval,
                minutes_before,
                now,
            ));
            requests.extend(notifications::hormone_overnight_request(hormone, interval, now));
        }
        for pill in self.pills.all() {
            requests.extend(notifications::pill_due_request(pill, now));
        }
        requests.sort_by_key(|r| r.fire_at);
        requests
    }

    /// Rolls pills over to a new day, re-plans reminders, and re-shares
    /// the today summary.
    pub fn refresh<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) {
        let awakened = self.pills.awaken(&self.db, now);
        if awakened > 0 {
            tracing::info!("Reset daily counts for {awakened} pills");
        }

        if self.config.notifications.enabled {
            let requests = self.plan_notifications(now);
            notifications::register(self.notifications.as_mut(), requests);
        } else if let Err(e) = self.notifications.cancel_all() {
            tracing::error!("Failed to clear notifications: {e}");
        }

        if let Some(dir) = &self.data_dir {
            let path = TodayData::path_in(dir);
            if let Err(e) = self.today(now).write_to(&path) {
                tracing::error!("Failed to share today data: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationKind;
    use crate::pill::PillExpirationInterval;
    use chrono::NaiveTime;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, d, h, 0, 0).unwrap()
    }

    fn data() -> PatchData {
        PatchData::open_in_memory(Config::default()).unwrap()
    }

    #[test]
    fn new_data_is_fresh() {
        let data = data();
        assert!(data.is_fresh());
        assert_eq!(data.hormones().count(), 3);
        assert_eq!(data.sites().count(), 4);
        assert_eq!(data.pills().count(), 2);
    }

    #[test]
    fn apply_hormone_with_new_site_name_creates_site() {
        let mut data = data();
        let id = data.hormones().at(0).unwrap().id;
        data.apply_hormone(id, &at(1, 8), Some("Left Thigh")).unwrap();

        let hormone = data.hormones().get(id).unwrap();
        assert_eq!(data.site_name_of(hormone).as_deref(), Some("Left Thigh"));
        assert_eq!(data.sites().count(), 5);
        assert!(!data.is_fresh());
    }

    #[test]
    fn apply_suggested_rotates_through_sites() {
        let mut data = data();
        let ids: Vec<Uuid> = data.hormones().all().iter().map(|h| h.id).collect();

        let first = data.apply_suggested(ids[0], &at(1, 8)).unwrap();
        let second = data.apply_suggested(ids[1], &at(1, 9)).unwrap();
        let third = data.apply_suggested(ids[2], &at(1, 10)).unwrap();

        assert_eq!(first.as_deref(), Some("Right Glute"));
        assert_eq!(second.as_deref(), Some("Left Glute"));
        assert_eq!(third.as_deref(), Some("Right Abdomen"));
        assert_eq!(data.suggested_site().unwrap().name, "Left Abdomen");
    }

    #[test]
    fn apply_suggested_unknown_hormone() {
        let mut data = data();
        assert!(data.apply_suggested(Uuid::new_v4(), &at(1, 8)).is_err());
    }

    #[test]
    fn quantity_decrease_needs_confirmation_when_data_would_be_lost() {
        let mut data = data();
        let ids: Vec<Uuid> = data.hormones().all().iter().map(|h| h.id).collect();
        for (i, id) in ids.iter().enumerate() {
            data.apply_hormone(*id, &at(1 + i as u32, 8), None).unwrap();
        }

        let outcome = data.set_quantity(1, false).unwrap();
        assert!(matches!(outcome, SettingsMutation::RequiresConfirmation { .. }));
        assert_eq!(data.hormones().count(), 3);

        assert_eq!(data.set_quantity(1, true).unwrap(), SettingsMutation::Applied);
        assert_eq!(data.hormones().count(), 1);
        assert_eq!(data.hormones().at(0).unwrap().id, ids[0]);
        assert_eq!(data.config().hormones.quantity, 1);
    }

    #[test]
    fn quantity_decrease_over_empty_slots_applies() {
        let mut data = data();
        assert_eq!(data.set_quantity(2, false).unwrap(), SettingsMutation::Applied);
        assert_eq!(data.hormones().count(), 2);
        assert_eq!(data.set_quantity(4, false).unwrap(), SettingsMutation::Applied);
        assert_eq!(data.hormones().count(), 4);
        assert_eq!(data.set_quantity(4, false).unwrap(), SettingsMutation::Unchanged);
        assert!(data.set_quantity(5, true).is_err());
    }

    #[test]
    fn delivery_method_change_requires_confirmation_once_used() {
        let mut data = data();
        let id = data.hormones().at(0).unwrap().id;
        data.apply_hormone(id, &at(1, 8), None).unwrap();

        let outcome = data.set_delivery_method(DeliveryMethod::Injections, false).unwrap();
        assert!(matches!(outcome, SettingsMutation::RequiresConfirmation { .. }));
        assert_eq!(data.delivery_method(), DeliveryMethod::Patches);

        data.set_delivery_method(DeliveryMethod::Injections, true).unwrap();
        assert_eq!(data.hormones().count(), 1);
        assert!(data.sites().is_default(DeliveryMethod::Injections));
        assert_eq!(data.config().hormones.quantity, 1);
        assert!(data.set_quantity(2, true).is_err());
    }

    #[test]
    fn fresh_data_switches_method_without_confirmation() {
        let mut data = data();
        let outcome = data.set_delivery_method(DeliveryMethod::Gel, false).unwrap();
        assert_eq!(outcome, SettingsMutation::Applied);
        assert_eq!(data.sites().names(), vec!["Arms"]);
    }

    #[test]
    fn delete_site_backs_up_hormone_site_name() {
        let mut data = data();
        let id = data.hormones().at(0).unwrap().id;
        data.apply_hormone(id, &at(1, 8), Some("Left Glute")).unwrap();

        let removed = data.delete_site(1).unwrap();
        assert_eq!(removed.name, "Left Glute");
        let hormone = data.hormones().get(id).unwrap();
        assert_eq!(hormone.site, SiteRef::Backup("Left Glute".into()));
        assert_eq!(data.db().list_hormones().unwrap()[0].site, SiteRef::Backup("Left Glute".into()));
    }

    #[test]
    fn total_alerts_adds_expired_and_due() {
        let mut data = data();
        let id = data.hormones().at(0).unwrap().id;
        data.apply_hormone(id, &at(1, 8), None).unwrap();
        // both default pills are due after 09:00, the patch expired after 84h
        assert_eq!(data.total_alerts(&at(6, 10)), 3);
        assert_eq!(data.total_alerts(&at(1, 8)), 0);
    }

    #[test]
    fn invalid_pill_add_stores_nothing() {
        let mut data = data();
        let result = data.add_pill(
            "Spiro",
            PillAttributes {
                times: Some(vec![]),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(CoreError::Validation(_))));
        assert_eq!(data.pills().count(), 2);
        assert_eq!(data.db().list_pills().unwrap().len(), 2);
    }

    #[test]
    fn rejected_pill_edit_keeps_memory_and_store_in_step() {
        let mut data = data();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let result = data.edit_pill(
            0,
            PillAttributes {
                times: Some(vec![NaiveTime::from_hms_opt(21, 0, 0).unwrap()]),
                expiration_interval: Some(PillExpirationInterval::FirstXDays(30)),
                ..Default::default()
            },
        );
        assert!(result.is_err());
        assert_eq!(data.pills().at(0).unwrap().times(), &[nine]);
        assert_eq!(data.db().list_pills().unwrap()[0].times(), &[nine]);
    }

    #[test]
    fn refresh_registers_reminders() {
        let mut data = data();
        let id = data.hormones().at(0).unwrap().id;
        data.apply_hormone(id, &at(1, 4), Some("Right Glute")).unwrap();
        data.refresh(&at(1, 6));

        let pending = data.notification_center().pending().unwrap();
        let kinds: Vec<NotificationKind> = pending.iter().map(|r| r.kind).collect();
        assert_eq!(kinds.iter().filter(|k| **k == NotificationKind::PillDue).count(), 2);
        let expired = pending
            .iter()
            .find(|r| r.kind == NotificationKind::HormoneExpired)
            .unwrap();
        assert_eq!(expired.subject_id, id);
        assert!(expired.body.contains("Right Glute"));
    }

    #[test]
    fn refresh_with_notifications_off_clears_queue() {
        let mut data = data();
        data.refresh(&at(1, 6));
        assert!(!data.notification_center().pending().unwrap().is_empty());

        assert!(data.set_notifications(true, Some(5000)).is_err());
        assert_eq!(data.config().notifications.minutes_before, 0);

        data.set_notifications(false, None).unwrap();
        data.refresh(&at(1, 6));
        assert!(data.notification_center().pending().unwrap().is_empty());
    }

    #[test]
    fn today_names_next_site_and_pill() {
        let mut data = data();
        let id = data.hormones().at(0).unwrap().id;
        data.apply_hormone(id, &at(1, 8), Some("Right Glute")).unwrap();

        let today = data.today(&at(1, 12));
        let next_hormone = today.next_hormone.unwrap();
        assert_eq!(next_hormone.site_name.as_deref(), Some("Left Glute"));
        assert_eq!(next_hormone.date, Some(Utc.with_ymd_and_hms(2026, 10, 4, 20, 0, 0).unwrap()));
        assert_eq!(today.next_pill.unwrap().due, Some(at(1, 9)));
    }

    #[test]
    fn reset_all_returns_to_first_launch() {
        let mut data = data();
        data.mark_disclaimer_mentioned().unwrap();
        data.set_delivery_method(DeliveryMethod::Injections, true).unwrap();
        data.add_pill("Spiro", PillAttributes::default()).unwrap();

        data.reset_all().unwrap();
        assert_eq!(data.delivery_method(), DeliveryMethod::Patches);
        assert_eq!(data.hormones().count(), 3);
        assert_eq!(data.pills().count(), 2);
        assert!(data.config().mentioned_disclaimer);
        assert!(data.is_fresh());
    }

    #[test]
    fn reset_preferences_keeps_hormone_shape() {
        let mut data = data();
        data.set_delivery_method(DeliveryMethod::Injections, false).unwrap();
        data.set_expiration_interval(ExpirationInterval::OnceWeekly).unwrap();
        data.set_notifications(false, Some(15)).unwrap();

        data.reset_preferences().unwrap();
        assert_eq!(data.delivery_method(), DeliveryMethod::Injections);
        assert_eq!(data.config().hormones.quantity, 1);
        assert_eq!(data.expiration_interval(), ExpirationInterval::TwiceWeekly);
        assert!(data.config().notifications.enabled);
        assert_eq!(data.config().notifications.minutes_before, 0);
    }

    #[test]
    fn set_config_value_routes_quantity_through_schedule() {
        let mut data = data();
        assert_eq!(
            data.set_config_value("hormones.quantity", "4", false).unwrap(),
            SettingsMutation::Applied
        );
        assert_eq!(data.hormones().count(), 4);
        assert_eq!(
            data.set_config_value("ui.theme", "dark", false).unwrap(),
            SettingsMutation::Applied
        );
        assert!(data.set_config_value("ui.nope", "1", false).is_err());
    }

    #[test]
    fn open_at_repairs_out_of_range_quantity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[hormones]\nquantity = 40\n").unwrap();

        let mut data = PatchData::open_at(dir.path()).unwrap();
        assert_eq!(data.config().hormones.quantity, 3);
        assert_eq!(data.hormones().count(), 3);
        assert_eq!(data.db().list_hormones().unwrap().len(), 3);
        data.set_expiration_interval(ExpirationInterval::OnceWeekly).unwrap();
    }

    #[test]
    fn open_at_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let mut data = PatchData::open_at(dir.path()).unwrap();
            let id = data.hormones().at(0).unwrap().id;
            data.apply_hormone(id, &at(1, 8), Some("Left Glute")).unwrap();
            data.set_expiration_interval(ExpirationInterval::OnceWeekly).unwrap();
            data.refresh(&at(1, 12));
            id
        };

        let data = PatchData::open_at(dir.path()).unwrap();
        assert_eq!(data.expiration_interval(), ExpirationInterval::OnceWeekly);
        let hormone = data.hormones().get(id).unwrap();
        assert_eq!(data.site_name_of(hormone).as_deref(), Some("Left Glute"));
        assert!(!data.notification_center().pending().unwrap().is_empty());
        assert!(TodayData::read_from(&TodayData::path_in(dir.path())).unwrap().is_some());
    }
}
