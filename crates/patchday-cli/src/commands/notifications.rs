use clap::Subcommand;
use patchday_core::PatchData;

use super::{open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum NotificationsAction {
    /// List pending reminders, earliest first
    List,
    /// Re-plan reminders and list them
    Refresh,
}

pub fn run(action: NotificationsAction) -> CmdResult {
    let data = match action {
        NotificationsAction::List => PatchData::open()?,
        NotificationsAction::Refresh => open()?,
    };
    print_json(&data.notification_center().pending()?)
}
