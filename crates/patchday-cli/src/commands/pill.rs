//! Pill commands for CLI.

use chrono::{Local, NaiveTime};
use clap::Subcommand;
use patchday_core::dates::{format_times, parse_times};
use patchday_core::{Pill, PillAttributes, PillExpirationInterval};
use serde_json::json;

use super::{commit, open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum PillAction {
    /// List pills
    List,
    /// Add a pill
    Add {
        /// Pill name
        name: String,
        /// Comma-separated times of day (e.g. "09:00,21:00")
        #[arg(long)]
        times: Option<String>,
        /// every_day, every_other_day, first_x_days:N, or last_x_days:N
        #[arg(long)]
        interval: Option<String>,
        /// Do not remind
        #[arg(long)]
        no_notify: bool,
    },
    /// Edit a pill
    Edit {
        /// Position in the list
        index: usize,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// Comma-separated times of day
        #[arg(long)]
        times: Option<String>,
        /// New interval
        #[arg(long)]
        interval: Option<String>,
        /// Turn reminders on or off
        #[arg(long)]
        notify: Option<bool>,
    },
    /// Record a dose
    Take {
        /// Position in the list
        index: usize,
    },
    /// Delete a pill
    Remove {
        /// Position in the list
        index: usize,
    },
    /// Count pills that are due
    Due,
}

fn pill_json(index: usize, pill: &Pill) -> serde_json::Value {
    let now = Local::now();
    json!({
        "index": index,
        "id": pill.id,
        "name": pill.name,
        "times": format_times(pill.times()),
        "notify": pill.notify,
        "times_taken_today": pill.times_taken_today,
        "last_taken": pill.last_taken,
        "expiration_interval": pill.expiration_interval.to_string(),
        "due": pill.due(&now),
        "is_due": pill.is_due(&now),
        "is_done": pill.is_done(),
    })
}

fn parse_time_list(raw: &str) -> Result<Vec<NaiveTime>, String> {
    let times = parse_times(raw);
    let given = raw.split(',').filter(|s| !s.trim().is_empty()).count();
    if times.is_empty() || times.len() != given {
        return Err(format!("invalid times '{raw}', expected HH:MM[,HH:MM...]"));
    }
    Ok(times)
}

fn attributes(
    name: Option<String>,
    times: Option<String>,
    interval: Option<String>,
    notify: Option<bool>,
) -> Result<PillAttributes, Box<dyn std::error::Error>> {
    Ok(PillAttributes {
        name,
        times: times.as_deref().map(parse_time_list).transpose()?,
        notify,
        expiration_interval: interval
            .as_deref()
            .map(str::parse::<PillExpirationInterval>)
            .transpose()?,
        ..Default::default()
    })
}

pub fn run(action: PillAction) -> CmdResult {
    let mut data = open()?;
    match action {
        PillAction::List => {
            let list: Vec<_> = data
                .pills()
                .all()
                .iter()
                .enumerate()
                .map(|(i, p)| pill_json(i, p))
                .collect();
            print_json(&list)?;
        }
        PillAction::Add {
            name,
            times,
            interval,
            no_notify,
        } => {
            let notify = if no_notify { Some(false) } else { None };
            let attrs = attributes(None, times, interval, notify)?;
            let id = data.add_pill(&name, attrs)?;
            commit(&mut data);
            let index = data.pills().all().iter().position(|p| p.id == id).unwrap_or_default();
            if let Some(pill) = data.pills().get(id) {
                print_json(&pill_json(index, pill))?;
            }
        }
        PillAction::Edit {
            index,
            name,
            times,
            interval,
            notify,
        } => {
            data.edit_pill(index, attributes(name, times, interval, notify)?)?;
            commit(&mut data);
            if let Some(pill) = data.pills().at(index) {
                print_json(&pill_json(index, pill))?;
            }
        }
        PillAction::Take { index } => {
            let id = data.pills().id_at(index)?;
            let taken = data.swallow_pill(id, &Local::now())?;
            commit(&mut data);
            print_json(&json!({ "id": id, "taken": taken }))?;
        }
        PillAction::Remove { index } => {
            data.remove_pill(index)?;
            commit(&mut data);
            println!("pill removed");
        }
        PillAction::Due => {
            let now = Local::now();
            let next = data.pills().next_due(&now).map(|p| p.name.clone());
            print_json(&json!({
                "due": data.pills().total_due(&now),
                "next": next,
            }))?;
        }
    }
    Ok(())
}
