//! Pills and their daily due policy.
//!
//! A pill is taken up to four times a day at fixed times. Whether it is due
//! is never stored; [`Pill::due`] recomputes it from the times, the number
//! taken today, and the wall clock.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates;
use crate::error::ValidationError;

/// Name given to pills the user has not named yet.
pub const NEW_PILL_NAME: &str = "New Pill";

pub const MAX_TIMES_A_DAY: usize = 4;

/// Widest day window for the first/last-days-of-month intervals.
pub const MAX_INTERVAL_DAYS: u8 = 25;

/// Which days of the calendar a pill is taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PillExpirationInterval {
    #[default]
    EveryDay,
    EveryOtherDay,
    /// Days 1..=x of each month.
    FirstXDays(u8),
    /// The last x days of each month.
    LastXDays(u8),
}

impl PillExpirationInterval {
    fn validate_days(days: u8) -> Result<u8, ValidationError> {
        if (1..=MAX_INTERVAL_DAYS).contains(&days) {
            Ok(days)
        } else {
            Err(ValidationError::invalid(
                "expiration_interval",
                format!("days must be between 1 and {MAX_INTERVAL_DAYS}, got {days}"),
            ))
        }
    }
}

impl fmt::Display for PillExpirationInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PillExpirationInterval::EveryDay => f.write_str("every_day"),
            PillExpirationInterval::EveryOtherDay => f.write_str("every_other_day"),
            PillExpirationInterval::FirstXDays(x) => write!(f, "first_x_days:{x}"),
            PillExpirationInterval::LastXDays(x) => write!(f, "last_x_days:{x}"),
        }
    }
}

impl FromStr for PillExpirationInterval {
    type Err = ValidationError;

    /// Parses `every_day`, `every_other_day`, `first_x_days:N`, `last_x_days:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, days) = match s.split_once(':') {
            Some((kind, days)) => (kind.to_string(), Some(days.trim().to_string())),
            None => (s.clone(), None),
        };
        let parse_days = |raw: Option<String>| -> Result<u8, ValidationError> {
            let raw = raw.ok_or_else(|| {
                ValidationError::invalid("expiration_interval", format!("'{kind}' needs a day count"))
            })?;
            let days = raw.parse::<u8>().map_err(|_| {
                ValidationError::invalid("expiration_interval", format!("invalid day count '{raw}'"))
            })?;
            Self::validate_days(days)
        };
        match kind.as_str() {
            "every_day" | "everyday" => Ok(PillExpirationInterval::EveryDay),
            "every_other_day" => Ok(PillExpirationInterval::EveryOtherDay),
            "first_x_days" => Ok(PillExpirationInterval::FirstXDays(parse_days(days)?)),
            "last_x_days" => Ok(PillExpirationInterval::LastXDays(parse_days(days)?)),
            _ => Err(ValidationError::invalid(
                "expiration_interval",
                format!("unknown pill interval '{s}'"),
            )),
        }
    }
}

/// Partial update applied with [`Pill::set`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PillAttributes {
    pub name: Option<String>,
    pub times: Option<Vec<NaiveTime>>,
    pub notify: Option<bool>,
    pub times_taken_today: Option<u32>,
    pub last_taken: Option<DateTime<Utc>>,
    pub expiration_interval: Option<PillExpirationInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pill {
    pub id: Uuid,
    pub name: String,
    /// Sorted, minute-precision times of day. Never empty.
    times: Vec<NaiveTime>,
    pub notify: bool,
    pub times_taken_today: u32,
    pub last_taken: Option<DateTime<Utc>>,
    pub expiration_interval: PillExpirationInterval,
}

fn nine_am() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl Pill {
    /// A once-a-day pill at 09:00.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            times: vec![nine_am()],
            notify: true,
            times_taken_today: 0,
            last_taken: None,
            expiration_interval: PillExpirationInterval::EveryDay,
        }
    }

    /// Rebuilds a pill from stored columns, repairing an empty or oversized
    /// time list instead of rejecting the row.
    pub(crate) fn from_parts(
        id: Uuid,
        name: String,
        times: Vec<NaiveTime>,
        notify: bool,
        times_taken_today: u32,
        last_taken: Option<DateTime<Utc>>,
        expiration_interval: PillExpirationInterval,
    ) -> Self {
        let mut pill = Self {
            id,
            name,
            times: vec![nine_am()],
            notify,
            times_taken_today,
            last_taken,
            expiration_interval,
        };
        let mut times: Vec<NaiveTime> = times.into_iter().map(dates::truncate_to_minute).collect();
        times.sort();
        times.truncate(MAX_TIMES_A_DAY);
        if !times.is_empty() {
            pill.times = times;
        }
        pill
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    pub fn timesaday(&self) -> usize {
        self.times.len()
    }

    pub fn set_times(&mut self, times: Vec<NaiveTime>) -> Result<(), ValidationError> {
        if times.is_empty() || times.len() > MAX_TIMES_A_DAY {
            return Err(ValidationError::invalid(
                "times",
                format!("a pill takes 1 to {MAX_TIMES_A_DAY} times a day, got {}", times.len()),
            ));
        }
        let mut times: Vec<NaiveTime> = times.into_iter().map(dates::truncate_to_minute).collect();
        times.sort();
        self.times = times;
        Ok(())
    }

    pub fn append_time(&mut self, time: NaiveTime) -> Result<(), ValidationError> {
        let mut times = self.times.clone();
        times.push(time);
        self.set_times(times)
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty() && self.name != NEW_PILL_NAME
    }

    pub fn is_new(&self) -> bool {
        self.last_taken.is_none()
    }

    pub fn is_done(&self) -> bool {
        self.times_taken_today as usize >= self.timesaday()
    }

    fn taken_on_day_of<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.last_taken
            .map(|t| t.with_timezone(&now.timezone()).date_naive() == now.date_naive())
            .unwrap_or(false)
    }

    /// Doses taken on `now`'s calendar day, without mutating anything.
    fn taken_today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> usize {
        if self.taken_on_day_of(now) {
            self.times_taken_today as usize
        } else {
            0
        }
    }

    /// Resets the daily count when the last dose was on an earlier day.
    /// Returns whether anything changed.
    pub fn awaken<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> bool {
        if self.times_taken_today > 0 && !self.taken_on_day_of(now) {
            self.times_taken_today = 0;
            return true;
        }
        false
    }

    /// Records a dose. Ignored once today's doses are all taken.
    pub fn swallow<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> bool {
        self.awaken(now);
        if !self.is_done() || self.last_taken.is_none() {
            self.times_taken_today += 1;
            self.last_taken = Some(now.with_timezone(&Utc));
            return true;
        }
        false
    }

    /// Applies every given field, or none of them when any is invalid.
    pub fn set(&mut self, attributes: PillAttributes) -> Result<(), ValidationError> {
        if let Some(PillExpirationInterval::FirstXDays(x) | PillExpirationInterval::LastXDays(x)) =
            attributes.expiration_interval
        {
            PillExpirationInterval::validate_days(x)?;
        }
        if let Some(times) = attributes.times {
            self.set_times(times)?;
        }
        if let Some(interval) = attributes.expiration_interval {
            self.expiration_interval = interval;
        }
        if let Some(name) = attributes.name {
            self.name = name;
        }
        if let Some(notify) = attributes.notify {
            self.notify = notify;
        }
        if let Some(taken) = attributes.times_taken_today {
            self.times_taken_today = taken;
        }
        if let Some(last_taken) = attributes.last_taken {
            self.last_taken = Some(last_taken);
        }
        Ok(())
    }

    /// When the next dose is due.
    pub fn due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let first = *self.times.first()?;
        let taken = self.taken_today(now);
        let done = taken >= self.timesaday();
        let today = now.date_naive();

        match self.expiration_interval {
            PillExpirationInterval::EveryDay => self.daily_due(now, taken),
            PillExpirationInterval::EveryOtherDay => {
                if done {
                    dates::create_date_days_from(now, first, 2)
                } else if taken == 0 && self.last_taken_on(now, today.pred_opt()?) {
                    dates::create_date_days_from(now, first, 1)
                } else {
                    self.daily_due(now, taken)
                }
            }
            PillExpirationInterval::FirstXDays(x) => {
                let day = today.day();
                let x = u32::from(x);
                if day > x || (day == x && done) {
                    at_on(now, first_of_next_month(today)?, first)
                } else {
                    self.daily_due(now, taken)
                }
            }
            PillExpirationInterval::LastXDays(x) => {
                let last = days_in_month(today)?;
                let start = window_start(last, x);
                let day = today.day();
                if day < start {
                    at_on(now, today.with_day(start)?, first)
                } else if day == last && done {
                    let next = first_of_next_month(today)?;
                    let next_start = window_start(days_in_month(next)?, x);
                    at_on(now, next.with_day(next_start)?, first)
                } else {
                    self.daily_due(now, taken)
                }
            }
        }
    }

    fn daily_due<Tz: TimeZone>(&self, now: &DateTime<Tz>, taken: usize) -> Option<DateTime<Tz>> {
        match self.times.get(taken) {
            Some(time) => dates::create_date_on(now, *time),
            None => dates::create_date_days_from(now, *self.times.first()?, 1),
        }
    }

    fn last_taken_on<Tz: TimeZone>(&self, now: &DateTime<Tz>, day: NaiveDate) -> bool {
        self.last_taken
            .map(|t| t.with_timezone(&now.timezone()).date_naive() == day)
            .unwrap_or(false)
    }

    pub fn is_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.due(now).map(|due| *now > due).unwrap_or(false)
    }
}

fn at_on<Tz: TimeZone>(now: &DateTime<Tz>, day: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    let offset = (day - now.date_naive()).num_days();
    dates::create_date_days_from(now, time, offset)
}

fn first_of_next_month(day: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if day.month() == 12 {
        (day.year() + 1, 1)
    } else {
        (day.year(), day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn days_in_month(day: NaiveDate) -> Option<u32> {
    Some(first_of_next_month(day)?.pred_opt()?.day())
}

fn window_start(days_in_month: u32, x: u8) -> u32 {
    days_in_month.saturating_sub(u32::from(x)) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, m, d, h, min, 0).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn pill_at(times: &[NaiveTime]) -> Pill {
        let mut pill = Pill::new("T-Blocker");
        pill.set_times(times.to_vec()).unwrap();
        pill
    }

    #[test]
    fn once_a_day_never_taken_is_due_today() {
        let pill = pill_at(&[time(9, 0)]);
        let now = at(3, 10, 7, 0);
        assert_eq!(pill.due(&now), Some(at(3, 10, 9, 0)));
        assert!(!pill.is_due(&now));
        assert!(pill.is_due(&at(3, 10, 9, 1)));
    }

    #[test]
    fn once_a_day_taken_today_is_due_tomorrow() {
        let mut pill = pill_at(&[time(9, 0)]);
        let now = at(3, 10, 9, 5);
        assert!(pill.swallow(&now));
        assert_eq!(pill.due(&now), Some(at(3, 11, 9, 0)));
    }

    #[test]
    fn twice_a_day_walks_through_times() {
        let mut pill = pill_at(&[time(20, 0), time(8, 0)]);
        let now = at(3, 10, 6, 0);
        assert_eq!(pill.due(&now), Some(at(3, 10, 8, 0)));
        pill.swallow(&now);
        assert_eq!(pill.due(&now), Some(at(3, 10, 20, 0)));
        pill.swallow(&now);
        assert_eq!(pill.due(&now), Some(at(3, 11, 8, 0)));
    }

    #[test]
    fn four_times_a_day() {
        let mut pill = pill_at(&[time(6, 0), time(12, 0), time(18, 0), time(22, 0)]);
        let now = at(3, 10, 5, 0);
        for _ in 0..3 {
            pill.swallow(&now);
        }
        assert_eq!(pill.due(&now), Some(at(3, 10, 22, 0)));
    }

    #[test]
    fn swallow_stops_when_done() {
        let mut pill = pill_at(&[time(9, 0)]);
        let now = at(3, 10, 9, 0);
        assert!(pill.swallow(&now));
        assert!(pill.is_done());
        assert!(!pill.swallow(&now));
        assert_eq!(pill.times_taken_today, 1);
    }

    #[test]
    fn awaken_resets_count_on_a_new_day() {
        let mut pill = pill_at(&[time(9, 0)]);
        pill.swallow(&at(3, 10, 9, 0));
        assert!(!pill.awaken(&at(3, 10, 23, 0)));
        assert!(pill.awaken(&at(3, 11, 0, 1)));
        assert_eq!(pill.times_taken_today, 0);
        assert!(!pill.is_new());
    }

    #[test]
    fn stale_count_does_not_affect_due() {
        let mut pill = pill_at(&[time(9, 0)]);
        pill.swallow(&at(3, 10, 9, 0));
        // a day later, without awaken
        assert_eq!(pill.due(&at(3, 11, 7, 0)), Some(at(3, 11, 9, 0)));
    }

    #[test]
    fn every_other_day_skips_a_day() {
        let mut pill = pill_at(&[time(9, 0)]);
        pill.expiration_interval = PillExpirationInterval::EveryOtherDay;
        pill.swallow(&at(3, 10, 9, 0));
        assert_eq!(pill.due(&at(3, 10, 12, 0)), Some(at(3, 12, 9, 0)));
        assert_eq!(pill.due(&at(3, 11, 12, 0)), Some(at(3, 12, 9, 0)));
    }

    #[test]
    fn first_x_days_jumps_to_next_month() {
        let mut pill = pill_at(&[time(9, 0)]);
        pill.expiration_interval = PillExpirationInterval::FirstXDays(5);
        assert_eq!(pill.due(&at(3, 3, 7, 0)), Some(at(3, 3, 9, 0)));
        assert_eq!(pill.due(&at(3, 9, 7, 0)), Some(at(4, 1, 9, 0)));

        pill.swallow(&at(3, 5, 9, 0));
        assert_eq!(pill.due(&at(3, 5, 10, 0)), Some(at(4, 1, 9, 0)));
    }

    #[test]
    fn last_x_days_waits_for_window() {
        let mut pill = pill_at(&[time(9, 0)]);
        pill.expiration_interval = PillExpirationInterval::LastXDays(3);
        // April has 30 days: window is 28..=30
        assert_eq!(pill.due(&at(4, 10, 7, 0)), Some(at(4, 28, 9, 0)));
        assert_eq!(pill.due(&at(4, 29, 7, 0)), Some(at(4, 29, 9, 0)));

        pill.swallow(&at(4, 30, 9, 0));
        // May has 31 days: window is 29..=31
        assert_eq!(pill.due(&at(4, 30, 10, 0)), Some(at(5, 29, 9, 0)));
    }

    #[test]
    fn set_times_rejects_bad_counts() {
        let mut pill = Pill::new("x");
        assert!(pill.set_times(vec![]).is_err());
        assert!(pill.set_times(vec![time(1, 0); 5]).is_err());
        assert_eq!(pill.timesaday(), 1);
    }

    #[test]
    fn append_time_keeps_times_sorted() {
        let mut pill = Pill::new("x");
        pill.append_time(time(7, 30)).unwrap();
        assert_eq!(pill.times(), &[time(7, 30), time(9, 0)]);
        pill.append_time(time(12, 0)).unwrap();
        pill.append_time(time(18, 0)).unwrap();
        assert!(pill.append_time(time(21, 0)).is_err());
        assert_eq!(pill.timesaday(), 4);
    }

    #[test]
    fn set_applies_only_given_fields() {
        let mut pill = Pill::new(NEW_PILL_NAME);
        assert!(!pill.has_name());
        pill.set(PillAttributes {
            name: Some("Progesterone".into()),
            times: Some(vec![time(21, 0), time(7, 30)]),
            ..Default::default()
        })
        .unwrap();
        assert!(pill.has_name());
        assert_eq!(pill.times(), &[time(7, 30), time(21, 0)]);
        assert!(pill.notify);
    }

    #[test]
    fn set_rejects_out_of_range_day_windows() {
        let mut pill = Pill::new("x");
        let err = pill.set(PillAttributes {
            expiration_interval: Some(PillExpirationInterval::LastXDays(26)),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(pill.expiration_interval, PillExpirationInterval::EveryDay);
    }

    #[test]
    fn rejected_set_leaves_every_field_alone() {
        let mut pill = Pill::new("Spiro");
        let err = pill.set(PillAttributes {
            name: Some("Estradiol".into()),
            times: Some(vec![time(21, 0)]),
            expiration_interval: Some(PillExpirationInterval::FirstXDays(30)),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(pill.times(), &[time(9, 0)]);
        assert_eq!(pill.name, "Spiro");

        let err = pill.set(PillAttributes {
            name: Some("Estradiol".into()),
            times: Some(vec![]),
            expiration_interval: Some(PillExpirationInterval::EveryOtherDay),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(pill.expiration_interval, PillExpirationInterval::EveryDay);
        assert_eq!(pill.name, "Spiro");
    }

    #[test]
    fn interval_parses_from_cli_strings() {
        assert_eq!(
            "first_x_days:7".parse::<PillExpirationInterval>().unwrap(),
            PillExpirationInterval::FirstXDays(7)
        );
        assert_eq!(
            "every_other_day".parse::<PillExpirationInterval>().unwrap(),
            PillExpirationInterval::EveryOtherDay
        );
        assert!("last_x_days".parse::<PillExpirationInterval>().is_err());
        assert!("last_x_days:0".parse::<PillExpirationInterval>().is_err());
        let shown = PillExpirationInterval::LastXDays(4).to_string();
        assert_eq!(shown.parse::<PillExpirationInterval>().unwrap(), PillExpirationInterval::LastXDays(4));
    }

    #[test]
    fn from_parts_repairs_empty_times() {
        let pill = Pill::from_parts(
            Uuid::new_v4(),
            "x".into(),
            vec![],
            false,
            0,
            None,
            PillExpirationInterval::EveryDay,
        );
        assert_eq!(pill.timesaday(), 1);
    }
}
