//! Setting value types shared by the config file, the schedules, and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Most hormones a schedule can hold at once.
pub const MAX_QUANTITY: u32 = 4;

/// Lead-time choices offered for hormone reminders, in minutes.
pub const NOTIFICATION_MINUTES_OPTIONS: [u32; 4] = [0, 30, 60, 120];

/// How the hormone is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    #[default]
    Patches,
    Injections,
    Gel,
}

impl DeliveryMethod {
    pub const ALL: [DeliveryMethod; 3] = [
        DeliveryMethod::Patches,
        DeliveryMethod::Injections,
        DeliveryMethod::Gel,
    ];

    /// Hormone slots a fresh schedule gets for this method.
    pub fn default_quantity(&self) -> u32 {
        match self {
            DeliveryMethod::Patches => 3,
            DeliveryMethod::Injections | DeliveryMethod::Gel => 1,
        }
    }

    /// Only patches can be worn several at a time.
    pub fn allows_quantity(&self, quantity: u32) -> bool {
        match self {
            DeliveryMethod::Patches => (1..=MAX_QUANTITY).contains(&quantity),
            DeliveryMethod::Injections | DeliveryMethod::Gel => quantity == 1,
        }
    }

    pub fn default_site_names(&self) -> &'static [&'static str] {
        match self {
            DeliveryMethod::Patches => &["Right Glute", "Left Glute", "Right Abdomen", "Left Abdomen"],
            DeliveryMethod::Injections => &["Right Quad", "Left Quad", "Right Glute", "Left Glute"],
            DeliveryMethod::Gel => &["Arms"],
        }
    }

    /// Singular noun used in reminder text ("patch", "injection", "gel").
    pub fn noun(&self) -> &'static str {
        match self {
            DeliveryMethod::Patches => "patch",
            DeliveryMethod::Injections => "injection",
            DeliveryMethod::Gel => "gel",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeliveryMethod::Patches => "Patches",
            DeliveryMethod::Injections => "Injections",
            DeliveryMethod::Gel => "Gel",
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeliveryMethod::Patches => "patches",
            DeliveryMethod::Injections => "injections",
            DeliveryMethod::Gel => "gel",
        })
    }
}

impl FromStr for DeliveryMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patches" | "patch" => Ok(DeliveryMethod::Patches),
            "injections" | "injection" => Ok(DeliveryMethod::Injections),
            "gel" => Ok(DeliveryMethod::Gel),
            other => Err(ValidationError::invalid(
                "delivery_method",
                format!("unknown delivery method '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}
