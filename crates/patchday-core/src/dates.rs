//! Date and expiration arithmetic.
//!
//! Every calendar-sensitive function takes the instant it should treat as
//! "now" (or the day it operates on) explicitly, generic over the time zone,
//! so callers pass `Local::now()` and tests pass fixed `Utc` instants.
//!
//! Scheduled times are time-of-day values ([`NaiveTime`]) truncated to the
//! minute; their date component does not exist.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Separator used when persisting a list of times as one string.
pub const TIME_SEPARATOR: char = ',';

const TIME_FORMAT: &str = "%H:%M";

/// How long an applied hormone lasts before it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationInterval {
    OnceDaily,
    #[default]
    TwiceWeekly,
    OnceWeekly,
    EveryTwoWeeks,
}

impl ExpirationInterval {
    pub const ALL: [ExpirationInterval; 4] = [
        ExpirationInterval::OnceDaily,
        ExpirationInterval::TwiceWeekly,
        ExpirationInterval::OnceWeekly,
        ExpirationInterval::EveryTwoWeeks,
    ];

    pub fn hours(&self) -> i64 {
        match self {
            ExpirationInterval::OnceDaily => 24,
            ExpirationInterval::TwiceWeekly => 84,
            ExpirationInterval::OnceWeekly => 168,
            ExpirationInterval::EveryTwoWeeks => 336,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpirationInterval::OnceDaily => "Once daily",
            ExpirationInterval::TwiceWeekly => "Twice a week",
            ExpirationInterval::OnceWeekly => "Once a week",
            ExpirationInterval::EveryTwoWeeks => "Once every two weeks",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            ExpirationInterval::OnceDaily => "once_daily",
            ExpirationInterval::TwiceWeekly => "twice_weekly",
            ExpirationInterval::OnceWeekly => "once_weekly",
            ExpirationInterval::EveryTwoWeeks => "every_two_weeks",
        }
    }
}

impl fmt::Display for ExpirationInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ExpirationInterval {
    type Err = ValidationError;

    /// Accepts the snake-case key or the display label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|i| i.key().eq_ignore_ascii_case(wanted) || i.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                ValidationError::invalid("expiration_interval", format!("unknown interval '{s}'"))
            })
    }
}

/// The placeholder instant used for "no real date" (the Unix epoch).
pub fn default_date() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub fn is_default_date<Tz: TimeZone>(date: &DateTime<Tz>) -> bool {
    date.timestamp() == 0
}

/// Drops seconds and sub-seconds; schedules only care about hour and minute.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// The calendar day of `date` at the given time-of-day.
///
/// Returns `None` when that wall-clock time does not exist in the zone
/// (a DST gap). Ambiguous times resolve to the earlier instant.
pub fn create_date_on<Tz: TimeZone>(date: &DateTime<Tz>, time: NaiveTime) -> Option<DateTime<Tz>> {
    let naive = date.date_naive().and_time(truncate_to_minute(time));
    date.timezone().from_local_datetime(&naive).earliest()
}

/// `days` calendar days from `now`, at the given time-of-day.
pub fn create_date_days_from<Tz: TimeZone>(
    now: &DateTime<Tz>,
    time: NaiveTime,
    days: i64,
) -> Option<DateTime<Tz>> {
    let day = now.date_naive().checked_add_signed(Duration::days(days))?;
    let naive = day.and_time(truncate_to_minute(time));
    now.timezone().from_local_datetime(&naive).earliest()
}

pub fn add_hours<Tz: TimeZone>(date: &DateTime<Tz>, hours: i64) -> Option<DateTime<Tz>> {
    date.clone().checked_add_signed(Duration::hours(hours))
}

pub fn add_minutes<Tz: TimeZone>(date: &DateTime<Tz>, minutes: i64) -> Option<DateTime<Tz>> {
    date.clone().checked_add_signed(Duration::minutes(minutes))
}

/// When something applied at `applied` expires.
pub fn expiration_date(applied: &DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    add_hours(applied, hours)
}

/// Time remaining until expiration, negative once expired.
///
/// `None` for the default date: an unplaced slot never expires.
pub fn expiration_interval<Tz: TimeZone>(
    applied: &DateTime<Utc>,
    hours: i64,
    now: &DateTime<Tz>,
) -> Option<Duration> {
    if is_default_date(applied) {
        return None;
    }
    let expiration = expiration_date(applied, hours)?;
    Some(expiration - now.with_timezone(&Utc))
}

pub fn is_expired<Tz: TimeZone>(applied: &DateTime<Utc>, hours: i64, now: &DateTime<Tz>) -> bool {
    expiration_interval(applied, hours, now)
        .map(|remaining| remaining <= Duration::zero())
        .unwrap_or(false)
}

/// 20:00 on the calendar day before `date`, in `date`'s zone.
pub fn date_before_at_eight_pm<Tz: TimeZone>(date: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let eight_pm = NaiveTime::from_hms_opt(20, 0, 0)?;
    create_date_days_from(date, eight_pm, -1)
}

/// Parses a single "HH:MM" (or "HH:MM:SS") time-of-day.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
        .map(truncate_to_minute)
}

/// Parses a comma-separated list of times, skipping entries that don't parse.
pub fn parse_times(csv: &str) -> Vec<NaiveTime> {
    csv.split(TIME_SEPARATOR)
        .filter(|part| !part.trim().is_empty())
        .filter_map(|part| {
            let parsed = parse_time(part);
            if parsed.is_none() {
                tracing::debug!("Skipping unparseable time '{part}'");
            }
            parsed
        })
        .collect()
}

pub fn format_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Inverse of [`parse_times`].
pub fn format_times(times: &[NaiveTime]) -> String {
    times
        .iter()
        .map(format_time)
        .collect::<Vec<_>>()
        .join(&TIME_SEPARATOR.to_string())
}
