use clap::Subcommand;
use patchday_core::Config;

use super::{commit, open, report, CmdResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "hormones.quantity", "ui.theme")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
        /// Accept changes that discard recorded data
        #[arg(long)]
        force: bool,
    },
    /// List all config values
    List,
    /// Reset preferences to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value, force } => {
            let mut data = open()?;
            let outcome = data.set_config_value(&key, &value, force)?;
            commit(&mut data);
            report(outcome)?;
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.entries() {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Reset => {
            let mut data = open()?;
            data.reset_preferences()?;
            commit(&mut data);
            println!("config reset to defaults");
        }
    }
    Ok(())
}
