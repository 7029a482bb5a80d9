//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Delivery method, expiration interval, and hormone quantity
//! - Notification preferences
//! - Theme
//!
//! Configuration is stored at `~/.config/patchday/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::dates::ExpirationInterval;
use crate::error::{ConfigError, Result};
use crate::settings::{DeliveryMethod, Theme, MAX_QUANTITY};

/// Longest accepted reminder lead time, in minutes.
const MAX_MINUTES_BEFORE: u32 = 24 * 60;

/// Hormone schedule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HormonesConfig {
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub expiration_interval: ExpirationInterval,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How long before expiration hormone reminders fire.
    #[serde(default)]
    pub minutes_before: u32,
}

/// UI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UiConfig {
    #[serde(default)]
    pub theme: Theme,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/patchday/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Whether the user has seen the medical disclaimer.
    #[serde(default)]
    pub mentioned_disclaimer: bool,
    #[serde(default)]
    pub hormones: HormonesConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

fn default_quantity() -> u32 {
    DeliveryMethod::default().default_quantity()
}
fn default_true() -> bool {
    true
}

impl Default for HormonesConfig {
    fn default() -> Self {
        Self {
            delivery_method: DeliveryMethod::default(),
            expiration_interval: ExpirationInterval::default(),
            quantity: default_quantity(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minutes_before: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mentioned_disclaimer: false,
            hormones: HormonesConfig::default(),
            notifications: NotificationsConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return (and write) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let mut cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                if let Err(e) = cfg.validate() {
                    tracing::warn!("Config at {} is out of range, repairing: {e}", path.display());
                    cfg.repair();
                    if let Err(e) = cfg.save_to(path) {
                        tracing::error!("Failed to save repaired config: {e}");
                    }
                }
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Every leaf key with its current value, dot-separated and sorted.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out.sort();
        out
    }

    /// Set a config value by key. The change is validated but not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid for it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Checks cross-field constraints serde can't express.
    /// Replaces out-of-range values so that [`Config::validate`] passes:
    /// a bad quantity becomes the method's default, the lead time is capped.
    pub fn repair(&mut self) {
        let method = self.hormones.delivery_method;
        let quantity = self.hormones.quantity;
        if !(1..=MAX_QUANTITY).contains(&quantity) || !method.allows_quantity(quantity) {
            self.hormones.quantity = method.default_quantity();
        }
        self.notifications.minutes_before = self.notifications.minutes_before.min(MAX_MINUTES_BEFORE);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let quantity = self.hormones.quantity;
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            return Err(ConfigError::InvalidValue {
                key: "hormones.quantity".into(),
                message: format!("must be between 1 and {MAX_QUANTITY}, got {quantity}"),
            });
        }
        if !self.hormones.delivery_method.allows_quantity(quantity) {
            return Err(ConfigError::InvalidValue {
                key: "hormones.quantity".into(),
                message: format!("{} only support a quantity of 1", self.hormones.delivery_method),
            });
        }
        if self.notifications.minutes_before > MAX_MINUTES_BEFORE {
            return Err(ConfigError::InvalidValue {
                key: "notifications.minutes_before".into(),
                message: format!("must be at most {MAX_MINUTES_BEFORE}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.hormones.quantity, 3);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[hormones]\ndelivery_method = \"injections\"\nquantity = 1\n").unwrap();
        assert_eq!(parsed.hormones.delivery_method, DeliveryMethod::Injections);
        assert_eq!(parsed.hormones.expiration_interval, ExpirationInterval::TwiceWeekly);
        assert!(parsed.notifications.enabled);
    }

    #[test]
    fn out_of_range_file_is_repaired_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[hormones]\nquantity = 40\n\n[notifications]\nminutes_before = 100000\n",
        )
        .unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.hormones.quantity, 3);
        assert_eq!(cfg.notifications.minutes_before, MAX_MINUTES_BEFORE);
        assert!(cfg.validate().is_ok());
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn repair_uses_the_method_default_quantity() {
        let mut cfg = Config::default();
        cfg.hormones.delivery_method = DeliveryMethod::Gel;
        cfg.hormones.quantity = 3;
        cfg.repair();
        assert_eq!(cfg.hormones.quantity, 1);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("hormones.delivery_method").as_deref(), Some("patches"));
        assert_eq!(cfg.get("hormones.quantity").as_deref(), Some("3"));
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert!(cfg.get("ui.missing_key").is_none());
    }

    #[test]
    fn set_updates_enums_by_name() {
        let mut cfg = Config::default();
        cfg.set("hormones.expiration_interval", "once_weekly").unwrap();
        assert_eq!(cfg.hormones.expiration_interval, ExpirationInterval::OnceWeekly);
        cfg.set("ui.theme", "dark").unwrap();
        assert_eq!(cfg.ui.theme, Theme::Dark);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("ui.nonexistent_key", "value").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(cfg.set("hormones", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("notifications.enabled", "not_a_bool").is_err());
        assert!(cfg.set("hormones.delivery_method", "pills").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_rejects_out_of_range_quantity() {
        let mut cfg = Config::default();
        assert!(cfg.set("hormones.quantity", "5").is_err());
        assert!(cfg.set("hormones.quantity", "0").is_err());
        cfg.set("hormones.quantity", "4").unwrap();
        assert_eq!(cfg.hormones.quantity, 4);
    }

    #[test]
    fn injections_need_quantity_one() {
        let mut cfg = Config::default();
        cfg.hormones.delivery_method = DeliveryMethod::Injections;
        assert!(cfg.validate().is_err());
        cfg.hormones.quantity = 1;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn entries_list_every_leaf() {
        let keys: Vec<String> = Config::default().entries().into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"mentioned_disclaimer".to_string()));
        assert!(keys.contains(&"notifications.minutes_before".to_string()));
        assert!(keys.contains(&"ui.theme".to_string()));
    }

    #[test]
    fn load_from_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("notifications.minutes_before", "30").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().notifications.minutes_before, 30);
    }

    #[test]
    fn load_from_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "hormones = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
