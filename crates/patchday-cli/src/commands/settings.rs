//! Settings commands for CLI.

use clap::{Subcommand, ValueEnum};
use patchday_core::settings::NOTIFICATION_MINUTES_OPTIONS;
use patchday_core::{DeliveryMethod, ExpirationInterval};
use serde_json::json;

use super::{commit, open, print_json, report, CmdResult};

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show current settings
    Show,
    /// Switch between patches, injections, and gel
    DeliveryMethod {
        /// patches, injections, or gel
        method: String,
        /// Accept losing recorded hormones and custom sites
        #[arg(long)]
        force: bool,
    },
    /// How many hormones are worn at once
    Quantity {
        /// 1 to 4
        quantity: u32,
        /// Accept discarding recorded hormones
        #[arg(long)]
        force: bool,
    },
    /// How long each hormone lasts
    Interval {
        /// once_daily, twice_weekly, once_weekly, or every_two_weeks
        interval: String,
    },
    /// Turn reminders on or off
    Notifications {
        state: Toggle,
        /// Remind this many minutes before expiration
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Record that the disclaimer was shown
    DisclaimerSeen,
    /// Erase all records and settings
    ResetAll {
        #[arg(long)]
        force: bool,
    },
}

pub fn run(action: SettingsAction) -> CmdResult {
    let mut data = open()?;
    match action {
        SettingsAction::Show => {
            let config = data.config();
            print_json(&json!({
                "delivery_method": config.hormones.delivery_method,
                "quantity": config.hormones.quantity,
                "expiration_interval": config.hormones.expiration_interval.to_string(),
                "notifications": config.notifications.enabled,
                "minutes_before": config.notifications.minutes_before,
                "minutes_before_options": NOTIFICATION_MINUTES_OPTIONS,
                "mentioned_disclaimer": config.mentioned_disclaimer,
                "theme": config.ui.theme,
                "fresh": data.is_fresh(),
            }))?;
        }
        SettingsAction::DeliveryMethod { method, force } => {
            let method: DeliveryMethod = method.parse()?;
            let outcome = data.set_delivery_method(method, force)?;
            commit(&mut data);
            report(outcome)?;
        }
        SettingsAction::Quantity { quantity, force } => {
            let outcome = data.set_quantity(quantity, force)?;
            commit(&mut data);
            report(outcome)?;
        }
        SettingsAction::Interval { interval } => {
            let interval: ExpirationInterval = interval.parse()?;
            data.set_expiration_interval(interval)?;
            commit(&mut data);
            println!("ok");
        }
        SettingsAction::Notifications { state, minutes } => {
            data.set_notifications(matches!(state, Toggle::On), minutes)?;
            commit(&mut data);
            println!("ok");
        }
        SettingsAction::DisclaimerSeen => {
            data.mark_disclaimer_mentioned()?;
            println!("ok");
        }
        SettingsAction::ResetAll { force } => {
            if !force {
                return Err("reset-all erases every hormone, pill, and site; rerun with --force".into());
            }
            data.reset_all()?;
            commit(&mut data);
            println!("all data reset");
        }
    }
    Ok(())
}
