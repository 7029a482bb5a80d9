use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "patchday-cli", version, about = "PatchDay CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patches, injections, or gel
    Hormone {
        #[command(subcommand)]
        action: commands::hormone::HormoneAction,
    },
    /// Pill management
    Pill {
        #[command(subcommand)]
        action: commands::pill::PillAction,
    },
    /// Body sites and rotation
    Site {
        #[command(subcommand)]
        action: commands::site::SiteAction,
    },
    /// Delivery method, quantity, interval, and reminders
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Pending reminders
    Notifications {
        #[command(subcommand)]
        action: commands::notifications::NotificationsAction,
    },
    /// Next hormone and pill at a glance
    Today,
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PATCHDAY_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Hormone { action } => commands::hormone::run(action),
        Commands::Pill { action } => commands::pill::run(action),
        Commands::Site { action } => commands::site::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Notifications { action } => commands::notifications::run(action),
        Commands::Today => commands::today::run(),
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
