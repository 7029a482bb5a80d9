//! Summary data shared with widget-like readers (`patchday-cli today`).
//!
//! Written as JSON next to the database after every mutation so readers
//! never need to open SQLite.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::DeliveryMethod;

pub const TODAY_FILE_NAME: &str = "today.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextHormone {
    /// Where the next one should go.
    pub site_name: Option<String>,
    /// When the current one expires.
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextPill {
    pub name: String,
    pub due: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayData {
    pub delivery_method: DeliveryMethod,
    pub next_hormone: Option<NextHormone>,
    pub next_pill: Option<NextPill>,
}

impl TodayData {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(TODAY_FILE_NAME)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!("Shared today data at {}", path.display());
        Ok(())
    }

    /// `None` when nothing has been shared yet.
    pub fn read_from(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = TodayData::path_in(dir.path());
        assert!(TodayData::read_from(&path).unwrap().is_none());

        let data = TodayData {
            delivery_method: DeliveryMethod::Patches,
            next_hormone: Some(NextHormone {
                site_name: Some("Left Abdomen".into()),
                date: Some(Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap()),
            }),
            next_pill: None,
        };
        data.write_to(&path).unwrap();
        assert_eq!(TodayData::read_from(&path).unwrap(), Some(data));
    }
}
