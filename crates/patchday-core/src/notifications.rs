//! Reminder planning.
//!
//! Nothing here delivers a notification. Hormones and pills are turned into
//! [`NotificationRequest`]s with a trigger instant, and a
//! [`NotificationCenter`] keeps the pending queue. Registration is
//! fire-and-forget: queue failures are logged and never reach the caller.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::{self, ExpirationInterval};
use crate::error::Result;
use crate::hormone::Hormone;
use crate::pill::Pill;
use crate::settings::DeliveryMethod;
use crate::storage::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    HormoneExpired,
    /// Sent the evening before a hormone that expires in the small hours.
    HormoneOvernight,
    PillDue,
}

impl NotificationKind {
    fn prefix(&self) -> &'static str {
        match self {
            NotificationKind::HormoneExpired => "hormone-expired",
            NotificationKind::HormoneOvernight => "hormone-overnight",
            NotificationKind::PillDue => "pill-due",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Stable per kind and subject, so re-planning replaces instead of piling up.
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
    /// The hormone or pill the reminder is about.
    pub subject_id: Uuid,
}

impl NotificationRequest {
    pub fn request_id(kind: NotificationKind, subject_id: Uuid) -> String {
        format!("{}-{subject_id}", kind.prefix())
    }

    fn new(
        kind: NotificationKind,
        subject_id: Uuid,
        title: String,
        body: String,
        fire_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::request_id(kind, subject_id),
            kind,
            title,
            body,
            fire_at,
            subject_id,
        }
    }
}

/// A queue of pending notification requests.
pub trait NotificationCenter {
    /// Adds a request, replacing any pending one with the same id.
    fn schedule(&mut self, request: NotificationRequest) -> Result<()>;

    fn cancel(&mut self, id: &str) -> Result<()>;

    /// Pending requests, earliest first.
    fn pending(&self) -> Result<Vec<NotificationRequest>>;

    fn cancel_all(&mut self) -> Result<()> {
        for request in self.pending()? {
            self.cancel(&request.id)?;
        }
        Ok(())
    }
}

impl NotificationCenter for Database {
    fn schedule(&mut self, request: NotificationRequest) -> Result<()> {
        self.upsert_notification(&request)?;
        Ok(())
    }

    fn cancel(&mut self, id: &str) -> Result<()> {
        self.delete_notification(id)?;
        Ok(())
    }

    fn pending(&self) -> Result<Vec<NotificationRequest>> {
        Ok(self.list_notifications()?)
    }

    fn cancel_all(&mut self) -> Result<()> {
        self.delete_all_notifications()?;
        Ok(())
    }
}

/// Non-persistent queue.
#[derive(Debug, Default)]
pub struct MemoryNotificationCenter {
    requests: Vec<NotificationRequest>,
}

impl MemoryNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationCenter for MemoryNotificationCenter {
    fn schedule(&mut self, request: NotificationRequest) -> Result<()> {
        self.requests.retain(|r| r.id != request.id);
        self.requests.push(request);
        self.requests.sort_by_key(|r| r.fire_at);
        Ok(())
    }

    fn cancel(&mut self, id: &str) -> Result<()> {
        self.requests.retain(|r| r.id != id);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<NotificationRequest>> {
        Ok(self.requests.clone())
    }
}

fn hormone_title(method: DeliveryMethod, minutes_before: u32) -> String {
    match (method, minutes_before) {
        (DeliveryMethod::Gel, 0) => "Time to apply gel".to_string(),
        (DeliveryMethod::Gel, _) => "Almost time to apply gel".to_string(),
        (m, 0) => format!("Time for your next {}", m.noun()),
        (m, _) => format!("Almost time for your next {}", m.noun()),
    }
}

fn hormone_body(method: DeliveryMethod, current_site: Option<&str>, suggested_site: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(current) = current_site.filter(|s| !s.is_empty()) {
        parts.push(format!("Expiring site: {current}."));
    }
    if let Some(next) = suggested_site.filter(|s| !s.is_empty()) {
        parts.push(format!("Site for next {}: {next}", method.noun()));
    }
    parts.join(" ")
}

/// Reminder for a hormone reaching its expiration, `minutes_before` early.
///
/// `None` when the hormone has no date or the trigger is not in the future.
pub fn hormone_expired_request<Tz: TimeZone>(
    hormone: &Hormone,
    current_site: Option<&str>,
    suggested_site: Option<&str>,
    interval: ExpirationInterval,
    minutes_before: u32,
    now: &DateTime<Tz>,
) -> Option<NotificationRequest> {
    let expiration = hormone.expiration(interval)?;
    let fire_at = dates::add_minutes(&expiration, -i64::from(minutes_before))?;
    if fire_at <= now.with_timezone(&Utc) {
        return None;
    }
    Some(NotificationRequest::new(
        NotificationKind::HormoneExpired,
        hormone.id,
        hormone_title(hormone.delivery_method, minutes_before),
        hormone_body(hormone.delivery_method, current_site, suggested_site),
        fire_at,
    ))
}

/// Evening-before reminder for a hormone expiring overnight.
pub fn hormone_overnight_request<Tz: TimeZone>(
    hormone: &Hormone,
    interval: ExpirationInterval,
    now: &DateTime<Tz>,
) -> Option<NotificationRequest> {
    if !hormone.expires_overnight(interval, now) {
        return None;
    }
    let expiration = hormone.expiration(interval)?.with_timezone(&now.timezone());
    let fire_at = dates::date_before_at_eight_pm(&expiration)?.with_timezone(&Utc);
    if fire_at <= now.with_timezone(&Utc) {
        return None;
    }
    let noun = hormone.delivery_method.noun();
    Some(NotificationRequest::new(
        NotificationKind::HormoneOvernight,
        hormone.id,
        format!("Your {noun} expires overnight"),
        format!("Consider changing your {noun} before bed."),
        fire_at,
    ))
}

pub fn pill_due_request<Tz: TimeZone>(pill: &Pill, now: &DateTime<Tz>) -> Option<NotificationRequest> {
    if !pill.notify {
        return None;
    }
    let due = pill.due(now)?;
    if due <= *now {
        return None;
    }
    Some(NotificationRequest::new(
        NotificationKind::PillDue,
        pill.id,
        format!("Time to take pill: {}", pill.name),
        String::new(),
        due.with_timezone(&Utc),
    ))
}

/// App badge number: expired hormones plus due pills.
pub fn badge(total_expired: usize, total_due: usize) -> usize {
    total_expired + total_due
}

/// Replaces everything pending with `requests`. Failures are logged only.
pub fn register(center: &mut dyn NotificationCenter, requests: Vec<NotificationRequest>) {
    if let Err(e) = center.cancel_all() {
        tracing::error!("Failed to clear pending notifications: {e}");
    }
    for request in requests {
        let id = request.id.clone();
        match center.schedule(request) {
            Ok(()) => tracing::debug!("Scheduled notification {id}"),
            Err(e) => tracing::error!("Failed to schedule notification {id}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, d, h, 0, 0).unwrap()
    }

    fn applied(method: DeliveryMethod, date: DateTime<Utc>) -> Hormone {
        let mut h = Hormone::new(method);
        h.date = Some(date);
        h
    }

    #[test]
    fn expired_request_fires_before_expiration() {
        let h = applied(DeliveryMethod::Patches, at(1, 10));
        let req = hormone_expired_request(
            &h,
            Some("Left Glute"),
            Some("Right Abdomen"),
            ExpirationInterval::OnceDaily,
            30,
            &at(1, 12),
        )
        .unwrap();
        assert_eq!(req.fire_at, Utc.with_ymd_and_hms(2026, 5, 2, 9, 30, 0).unwrap());
        assert_eq!(req.title, "Almost time for your next patch");
        assert!(req.body.ends_with("Site for next patch: Right Abdomen"));
        assert_eq!(req.id, format!("hormone-expired-{}", h.id));
    }

    #[test]
    fn expired_request_title_without_lead_time() {
        let h = applied(DeliveryMethod::Injections, at(1, 10));
        let req =
            hormone_expired_request(&h, None, None, ExpirationInterval::OnceWeekly, 0, &at(1, 12)).unwrap();
        assert_eq!(req.title, "Time for your next injection");
        assert_eq!(req.body, "");
    }

    #[test]
    fn no_expired_request_in_the_past_or_without_date() {
        let h = applied(DeliveryMethod::Patches, at(1, 10));
        assert!(hormone_expired_request(&h, None, None, ExpirationInterval::OnceDaily, 0, &at(3, 0)).is_none());
        let empty = Hormone::new(DeliveryMethod::Patches);
        assert!(hormone_expired_request(&empty, None, None, ExpirationInterval::OnceDaily, 0, &at(3, 0)).is_none());
    }

    #[test]
    fn overnight_request_fires_evening_before() {
        let h = applied(DeliveryMethod::Patches, at(1, 3));
        let req = hormone_overnight_request(&h, ExpirationInterval::OnceDaily, &at(1, 12)).unwrap();
        assert_eq!(req.fire_at, at(1, 20));
        assert_eq!(req.kind, NotificationKind::HormoneOvernight);

        let daytime = applied(DeliveryMethod::Patches, at(1, 10));
        assert!(hormone_overnight_request(&daytime, ExpirationInterval::OnceDaily, &at(1, 12)).is_none());
    }

    #[test]
    fn pill_request_respects_notify() {
        let mut pill = Pill::new("Spiro");
        pill.set_times(vec![NaiveTime::from_hms_opt(21, 0, 0).unwrap()]).unwrap();
        let req = pill_due_request(&pill, &at(1, 12)).unwrap();
        assert_eq!(req.title, "Time to take pill: Spiro");
        assert_eq!(req.fire_at, at(1, 21));

        pill.notify = false;
        assert!(pill_due_request(&pill, &at(1, 12)).is_none());
    }

    #[test]
    fn memory_center_replaces_same_id() {
        let mut center = MemoryNotificationCenter::new();
        let pill = Pill::new("Spiro");
        let first = pill_due_request(&pill, &at(1, 6)).unwrap();
        let second = pill_due_request(&pill, &at(2, 6)).unwrap();
        center.schedule(first).unwrap();
        center.schedule(second.clone()).unwrap();
        assert_eq!(center.pending().unwrap(), vec![second]);
    }

    #[test]
    fn register_replaces_everything_pending() {
        let mut db = Database::open_memory().unwrap();
        let stale = pill_due_request(&Pill::new("Old"), &at(1, 6)).unwrap();
        db.schedule(stale).unwrap();

        let fresh = pill_due_request(&Pill::new("New"), &at(1, 6)).unwrap();
        register(&mut db, vec![fresh.clone()]);
        assert_eq!(db.pending().unwrap(), vec![fresh]);
    }

    #[test]
    fn badge_adds_counts() {
        assert_eq!(badge(2, 1), 3);
        assert_eq!(badge(0, 0), 0);
    }
}
