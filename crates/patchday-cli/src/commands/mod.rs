pub mod completions;
pub mod config;
pub mod hormone;
pub mod notifications;
pub mod pill;
pub mod settings;
pub mod site;
pub mod today;

use chrono::Local;
use patchday_core::{PatchData, SettingsMutation};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn open() -> Result<PatchData, Box<dyn std::error::Error>> {
    let mut data = PatchData::open()?;
    data.refresh(&Local::now());
    Ok(data)
}

/// Re-plans reminders and re-shares today data after a change.
pub fn commit(data: &mut PatchData) {
    data.refresh(&Local::now());
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints the outcome; a change that needs confirmation is an error.
pub fn report(outcome: SettingsMutation) -> CmdResult {
    print_json(&outcome)?;
    match outcome {
        SettingsMutation::RequiresConfirmation { reason } => {
            Err(format!("{reason}; rerun with --force to continue").into())
        }
        _ => Ok(()),
    }
}
