//! Hormone commands for CLI.

use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use patchday_core::{Hormone, PatchData};
use serde_json::json;

use super::{commit, open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum HormoneAction {
    /// List hormones, earliest applied first
    List,
    /// Show the hormone that expires next
    Next,
    /// Count expired hormones
    Expired,
    /// Record an application
    Apply {
        /// Position in the list
        index: usize,
        /// Site name; unknown names become new sites
        #[arg(long)]
        site: Option<String>,
        /// When it was applied (RFC 3339, default: now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Apply now on the suggested site
    ApplySuggested {
        /// Position in the list
        index: usize,
    },
    /// Replace every hormone with empty slots
    Reset,
}

fn hormone_json(data: &PatchData, index: usize, hormone: &Hormone) -> serde_json::Value {
    let now = Local::now();
    let interval = data.expiration_interval();
    json!({
        "index": index,
        "id": hormone.id,
        "delivery_method": hormone.delivery_method,
        "date": hormone.applied(),
        "site": data.site_name_of(hormone),
        "expiration": hormone.expiration(interval),
        "expired": hormone.is_expired(interval, &now),
        "expires_overnight": hormone.expires_overnight(interval, &now),
    })
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("invalid date '{raw}': {e}"))
}

pub fn run(action: HormoneAction) -> CmdResult {
    let mut data = open()?;
    match action {
        HormoneAction::List => {
            let list: Vec<_> = data
                .hormones()
                .all()
                .iter()
                .enumerate()
                .map(|(i, h)| hormone_json(&data, i, h))
                .collect();
            print_json(&list)?;
        }
        HormoneAction::Next => match data.hormones().next() {
            Some(hormone) => print_json(&hormone_json(&data, 0, hormone))?,
            None => println!("null"),
        },
        HormoneAction::Expired => {
            let count = data
                .hormones()
                .total_expired(data.expiration_interval(), &Local::now());
            print_json(&json!({ "expired": count }))?;
        }
        HormoneAction::Apply { index, site, date } => {
            let id = data.hormones().id_at(index)?;
            let date = match date {
                Some(raw) => parse_date(&raw)?,
                None => Utc::now(),
            };
            data.apply_hormone(id, &date, site.as_deref())?;
            commit(&mut data);
            let Some(hormone) = data.hormones().get(id) else {
                return Err(format!("hormone {id} disappeared").into());
            };
            print_json(&hormone_json(&data, index, hormone))?;
        }
        HormoneAction::ApplySuggested { index } => {
            let id = data.hormones().id_at(index)?;
            let site = data.apply_suggested(id, &Local::now())?;
            commit(&mut data);
            print_json(&json!({ "id": id, "site": site }))?;
        }
        HormoneAction::Reset => {
            let count = data.reset_hormones();
            commit(&mut data);
            print_json(&json!({ "count": count }))?;
        }
    }
    Ok(())
}
