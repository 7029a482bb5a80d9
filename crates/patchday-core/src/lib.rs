//! # PatchDay Core Library
//!
//! This library provides the core logic for PatchDay, a reminder tool for
//! hormone replacement therapy. Every operation is available through the
//! standalone `patchday-cli` binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Records**: hormones (patches, injections, gel), pills, and body sites
//! - **Schedules**: ordered in-memory collections of records that write
//!   through to the store on every change
//! - **Storage**: SQLite for records and the notification queue, TOML for
//!   configuration
//! - **Notifications**: reminder planning; delivery is left to the caller
//!
//! ## Key Components
//!
//! - [`PatchData`]: facade that keeps schedules, settings, and reminders in step
//! - [`HormoneSchedule`], [`PillSchedule`], [`SiteSchedule`]: the three collections
//! - [`Database`]: record persistence
//! - [`Config`]: user settings

pub mod dates;
pub mod error;
pub mod hormone;
pub mod notifications;
pub mod patch_data;
pub mod pill;
pub mod schedule;
pub mod settings;
pub mod shared;
pub mod site;
pub mod storage;

pub use dates::ExpirationInterval;
pub use error::{ConfigError, CoreError, DatabaseError, Entity, ValidationError};
pub use hormone::{Hormone, SiteRef};
pub use notifications::{
    MemoryNotificationCenter, NotificationCenter, NotificationKind, NotificationRequest,
};
pub use patch_data::{PatchData, SettingsMutation};
pub use pill::{Pill, PillAttributes, PillExpirationInterval};
pub use schedule::{HormoneSchedule, PillSchedule, SiteSchedule};
pub use settings::{DeliveryMethod, Theme};
pub use shared::{NextHormone, NextPill, TodayData};
pub use site::Site;
pub use storage::{Config, Database};
