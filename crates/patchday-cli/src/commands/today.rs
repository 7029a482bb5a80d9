use patchday_core::storage::data_dir;
use patchday_core::TodayData;

use super::{open, print_json, CmdResult};

/// Prints the shared summary, sharing it first when nothing has been yet.
pub fn run() -> CmdResult {
    let path = TodayData::path_in(&data_dir()?);
    let today = match TodayData::read_from(&path)? {
        Some(today) => today,
        None => {
            open()?;
            TodayData::read_from(&path)?.ok_or("today data could not be shared")?
        }
    };
    print_json(&today)
}
