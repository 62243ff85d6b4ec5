mod commands;
mod config;
mod gemini;
mod logging;
mod remote_loader;

use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{
    ChartKind, ProfileSetArgs, WeightLogArgs, cmd_bmi, cmd_chart, cmd_insights,
    cmd_prefs_language, cmd_prefs_theme, cmd_profile_clear, cmd_profile_set, cmd_profile_show,
    cmd_profile_status, cmd_remote_list, cmd_remote_load, cmd_weight_clear, cmd_weight_delete,
    cmd_weight_history, cmd_weight_log, cmd_weight_recalc, cmd_weight_show, parse_theme_action,
};
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::logging::{Verbosity, init_logging};
use crate::remote_loader::HttpPluginLoader;
use fitlog_core::chart::DEFAULT_WINDOW_DAYS;
use fitlog_core::legacy::{JsonFileStore, KeyValueStore};
use fitlog_core::models::{HeightUnit, WeightUnit};
use fitlog_core::plugin::RemoteModuleHost;
use fitlog_core::preferences::Preferences;
use fitlog_core::service::FitLog;

#[derive(Parser)]
#[command(
    name = "fitlog",
    version,
    about = "A local-first weight and BMI tracker",
    long_about = "\nfitlog keeps your weight log and profile in a local SQLite database,\n\
                  computes BMI against your height, and charts the trend.\n"
)]
struct Cli {
    /// More diagnostics on stderr (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage your profile (name, age, height, preferred units)
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Track body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Show BMI for your latest entry
    Bmi {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Chart weight or BMI over time
    Chart {
        #[command(subcommand)]
        command: ChartCommands,
    },
    /// Generate coaching insights from your history
    Insights {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect and load remote feature modules
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
    /// Theme and language preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the stored profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report whether the profile is complete enough for BMI
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create or update the profile
    Set {
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Age in years
        #[arg(long)]
        age: Option<u32>,
        /// Avatar image path or URL
        #[arg(long)]
        avatar: Option<String>,
        /// Height, in --height-unit (feet may be fractional, e.g. 5.5)
        #[arg(long)]
        height: Option<f64>,
        /// Unit for --height: cm, in or ft
        #[arg(long, default_value = "cm")]
        height_unit: HeightUnit,
        /// Preferred weight unit: kg or lb
        #[arg(long)]
        weight_unit: Option<WeightUnit>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the profile
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Log a weight entry
    Log {
        /// Weight value (number)
        value: f64,
        /// Unit: kg or lb (default: kg)
        #[arg(short, long, default_value = "kg")]
        unit: WeightUnit,
        /// Date (YYYY-MM-DD, today or yesterday; default: today). At most 5 years back.
        #[arg(long)]
        date: Option<String>,
        /// Time of day, free text (e.g. 07:30)
        #[arg(long)]
        time: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Overwrite the entry with this ID instead of creating one
        #[arg(long)]
        id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single entry
    Show {
        /// Weight entry ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight history, newest first
    History {
        /// Number of days to show (default: all)
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a weight entry by ID
    Delete {
        /// Weight entry ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every weight entry
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recompute stored BMI values from the current height
    Recalc {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ChartCommands {
    /// Weight over time
    Weight {
        /// Window size in days
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_DAYS)]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// BMI over time (requires a height)
    Bmi {
        /// Window size in days
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_DAYS)]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// List known remotes and their manifest URLs
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch a remote's manifest and mount its component
    Load {
        /// Remote name (e.g. fitlog-streaks)
        name: String,
        /// Retry a remote whose previous load failed (only valid after a failure)
        #[arg(long)]
        retry: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show or change the theme: light, dark, system, cycle or toggle
    Theme {
        value: Option<String>,
        /// Treat the system theme as dark when resolving `system`
        #[arg(long)]
        system_dark: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change the interface language
    Language {
        /// Language code: en, hi, kn, ta, te, fr, de
        code: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.quiet, cli.verbose));

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn open_app(config: &Config, kv: Arc<dyn KeyValueStore>) -> Result<FitLog> {
    FitLog::open(&config.db_path, kv, config.settings.mirror()).await
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let kv: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.local_storage_path));

    match cli.command {
        Commands::Profile { command } => {
            let app = open_app(&config, kv).await?;
            match command {
                ProfileCommands::Show { json } => cmd_profile_show(&app, json).await,
                ProfileCommands::Status { json } => cmd_profile_status(&app, json).await,
                ProfileCommands::Set {
                    name,
                    age,
                    avatar,
                    height,
                    height_unit,
                    weight_unit,
                    json,
                } => {
                    let args = ProfileSetArgs {
                        name,
                        age,
                        avatar,
                        height,
                        height_unit,
                        weight_unit,
                    };
                    cmd_profile_set(&app, args, json).await
                }
                ProfileCommands::Clear { json } => cmd_profile_clear(&app, json).await,
            }
        }
        Commands::Weight { command } => {
            let app = open_app(&config, kv).await?;
            match command {
                WeightCommands::Log {
                    value,
                    unit,
                    date,
                    time,
                    notes,
                    id,
                    json,
                } => {
                    let args = WeightLogArgs {
                        value,
                        unit,
                        date,
                        time,
                        notes,
                        id,
                    };
                    cmd_weight_log(&app, args, json).await
                }
                WeightCommands::Show { id, json } => cmd_weight_show(&app, &id, json).await,
                WeightCommands::History { days, json } => {
                    cmd_weight_history(&app, days, json).await
                }
                WeightCommands::Delete { id, json } => cmd_weight_delete(&app, &id, json).await,
                WeightCommands::Clear { json } => cmd_weight_clear(&app, json).await,
                WeightCommands::Recalc { json } => cmd_weight_recalc(&app, json).await,
            }
        }
        Commands::Bmi { json } => {
            let app = open_app(&config, kv).await?;
            cmd_bmi(&app, json).await
        }
        Commands::Chart { command } => {
            let app = open_app(&config, kv).await?;
            match command {
                ChartCommands::Weight { days, json } => {
                    cmd_chart(&app, ChartKind::Weight, days, json).await
                }
                ChartCommands::Bmi { days, json } => {
                    cmd_chart(&app, ChartKind::Bmi, days, json).await
                }
            }
        }
        Commands::Insights { json } => {
            let app = open_app(&config, kv).await?;
            let client = GeminiClient::new(&config.settings.insights)?;
            cmd_insights(&app, &client, json).await
        }
        Commands::Remote { command } => {
            let loader = Arc::new(HttpPluginLoader::new()?);
            let host = RemoteModuleHost::new(loader, config.settings.remote_registry());
            match command {
                RemoteCommands::List { json } => cmd_remote_list(&host, json),
                RemoteCommands::Load { name, retry, json } => {
                    cmd_remote_load(&host, &name, retry, json).await
                }
            }
        }
        Commands::Prefs { command } => {
            let prefs = Preferences::new(kv);
            match command {
                PrefsCommands::Theme {
                    value,
                    system_dark,
                    json,
                } => {
                    let action = parse_theme_action(value.as_deref())?;
                    cmd_prefs_theme(&prefs, action, system_dark, json)
                }
                PrefsCommands::Language { code, json } => {
                    cmd_prefs_language(&prefs, code.as_deref(), json)
                }
            }
        }
    }
}
