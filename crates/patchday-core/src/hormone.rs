//! Hormone records: one applied patch, injection, or gel dose.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::{self, ExpirationInterval};
use crate::settings::DeliveryMethod;

/// Where a hormone was placed.
///
/// A hormone points at a live site, or remembers the name of a site that
/// has since been deleted, or neither. Never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SiteRef {
    #[default]
    Unplaced,
    Site(Uuid),
    Backup(String),
}

impl SiteRef {
    pub fn site_id(&self) -> Option<Uuid> {
        match self {
            SiteRef::Site(id) => Some(*id),
            _ => None,
        }
    }

    pub fn backup_name(&self) -> Option<&str> {
        match self {
            SiteRef::Backup(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hormone {
    pub id: Uuid,
    /// When it was applied or injected.
    pub date: Option<DateTime<Utc>>,
    pub site: SiteRef,
    pub delivery_method: DeliveryMethod,
}

impl Hormone {
    pub fn new(delivery_method: DeliveryMethod) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: None,
            site: SiteRef::Unplaced,
            delivery_method,
        }
    }

    pub fn set_site(&mut self, site_id: Uuid) {
        self.site = SiteRef::Site(site_id);
    }

    pub fn set_site_backup(&mut self, name: impl Into<String>) {
        self.site = SiteRef::Backup(name.into());
    }

    pub fn clear_site(&mut self) {
        self.site = SiteRef::Unplaced;
    }

    pub fn stamp<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) {
        self.date = Some(now.with_timezone(&Utc));
    }

    /// Clears the date and placement, keeping the id.
    pub fn reset(&mut self) {
        self.date = None;
        self.site = SiteRef::Unplaced;
    }

    /// The applied date, ignoring the epoch placeholder.
    pub fn applied(&self) -> Option<&DateTime<Utc>> {
        self.date.as_ref().filter(|d| !dates::is_default_date(*d))
    }

    pub fn is_empty(&self) -> bool {
        self.applied().is_none() && self.site == SiteRef::Unplaced
    }

    pub fn expiration(&self, interval: ExpirationInterval) -> Option<DateTime<Utc>> {
        let applied = self.applied()?;
        dates::expiration_date(applied, interval.hours())
    }

    /// Time left before expiration; negative once expired.
    pub fn expiration_interval<Tz: TimeZone>(
        &self,
        interval: ExpirationInterval,
        now: &DateTime<Tz>,
    ) -> Option<Duration> {
        let applied = self.applied()?;
        dates::expiration_interval(applied, interval.hours(), now)
    }

    pub fn is_expired<Tz: TimeZone>(&self, interval: ExpirationInterval, now: &DateTime<Tz>) -> bool {
        self.expiration_interval(interval, now)
            .map(|remaining| remaining <= Duration::zero())
            .unwrap_or(false)
    }

    /// Whether the reminder `minutes_before` expiration has already passed.
    pub fn is_past_notification_time<Tz: TimeZone>(
        &self,
        interval: ExpirationInterval,
        minutes_before: u32,
        now: &DateTime<Tz>,
    ) -> bool {
        match self.expiration_interval(interval, now) {
            Some(remaining) => remaining <= Duration::minutes(i64::from(minutes_before)),
            None => false,
        }
    }

    /// Expires between midnight and 6am (in `now`'s zone) and hasn't yet.
    pub fn expires_overnight<Tz: TimeZone>(&self, interval: ExpirationInterval, now: &DateTime<Tz>) -> bool {
        if self.is_expired(interval, now) {
            return false;
        }
        self.expiration(interval)
            .map(|exp| exp.with_timezone(&now.timezone()).hour() < 6)
            .unwrap_or(false)
    }

    /// Earliest date first; hormones without a date sort last.
    pub fn cmp_by_date(a: &Hormone, b: &Hormone) -> Ordering {
        match (a.applied(), b.applied()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => x.cmp(y),
        }
    }
}
