//! Food Diary CLI
//!
//! Command-line interface for the food diary, plus the place search proxy.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use diary_core::{Config, Font, Store, Theme};

mod commands;
mod editor;
mod output;
mod server;

use commands::entry::EntryArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "diary")]
#[command(about = "Food Diary - a scrapbook of the places you ate")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage diary entries
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },
    /// Look up restaurants through the search proxy
    Place {
        #[command(subcommand)]
        command: PlaceCommands,
    },
    /// Show or change theme, font and text colour
    Theme {
        #[command(subcommand)]
        command: Option<ThemeCommands>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show entry count and storage usage
    Status,
    /// Run the place search proxy
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum EntryCommands {
    /// Write a new entry
    #[command(alias = "add")]
    New {
        #[command(flatten)]
        args: EntryArgs,
    },
    /// Edit an existing entry
    Edit {
        /// Entry ID (full UUID or prefix)
        id: String,
        #[command(flatten)]
        args: EntryArgs,
    },
    /// List entries, newest first
    #[command(alias = "ls")]
    List {
        /// Filter by text in the place name, address or memo
        #[arg(long)]
        query: Option<String>,
        /// Page number
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Show entry details
    Show {
        /// Entry ID (full UUID or prefix)
        id: String,
    },
    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        /// Entry ID (full UUID or prefix)
        id: String,
    },
    /// Open the entry's place on Naver Map
    Map {
        /// Entry ID (full UUID or prefix)
        id: String,
    },
    /// Write an entry as JSON
    Export {
        /// Entry ID (full UUID or prefix)
        id: String,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read an entry from a JSON export
    Import {
        /// JSON file to import
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum PlaceCommands {
    /// Search once and print the candidates
    Search {
        /// Search query
        query: String,
    },
    /// Search as you type, one line per keystroke batch
    Live,
}

#[derive(Subcommand, Clone)]
enum ThemeCommands {
    /// Show current preferences
    Show,
    /// List available themes and fonts
    List,
    /// Change preferences
    Set {
        /// Theme key, A-K
        #[arg(long)]
        theme: Option<Theme>,
        /// Font key (malgun, roboto, nanum, gothic, serif, comic, courier, futura, garamond, impact)
        #[arg(long)]
        font: Option<Font>,
        /// Text colour as #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, search_url, port, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config = Config::load()?;

    init_logging(&config, matches!(cli.command, Commands::Serve { .. }));

    // Commands that don't need the store
    match cli.command {
        Commands::Config { command } => handle_config_command(command, &output),
        Commands::Place { command } => handle_place_command(command, &config, &output).await,
        Commands::Serve { port } => server::run(&config, port).await,
        command => {
            let mut store = open_store(config)?;
            run_store_command(command, &mut store, &output).await
        }
    }
}

fn open_store(config: Config) -> Result<Store> {
    Store::open_with_config(config).map_err(|e| match e.recovery_suggestion() {
        Some(hint) => anyhow!("Failed to open the diary store: {e}\n{hint}"),
        None => anyhow::Error::new(e).context("Failed to open the diary store"),
    })
}

async fn run_store_command(command: Commands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        Commands::Entry { command } => handle_entry_command(command, store, output).await,
        Commands::Theme { command } => handle_theme_command(command, store, output),
        Commands::Status => commands::status::show(store, output),
        Commands::Config { .. } | Commands::Place { .. } | Commands::Serve { .. } => {
            unreachable!() // Handled in main
        }
    }
}

async fn handle_entry_command(
    command: EntryCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        EntryCommands::New { args } => commands::entry::create(store, args, output).await,
        EntryCommands::Edit { id, args } => commands::entry::edit(store, id, args, output).await,
        EntryCommands::List { query, page } => commands::entry::list(store, query, page, output),
        EntryCommands::Show { id } => commands::entry::show(store, id, output),
        EntryCommands::Delete { id } => commands::entry::delete(store, id, output),
        EntryCommands::Map { id } => commands::entry::map(store, id, output),
        EntryCommands::Export { id, output: path } => {
            commands::entry::export(store, id, path, output)
        }
        EntryCommands::Import { path } => commands::entry::import(store, path, output),
    }
}

async fn handle_place_command(
    command: PlaceCommands,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        PlaceCommands::Search { query } => commands::place::search(config, query, output).await,
        PlaceCommands::Live => commands::place::live(config, output).await,
    }
}

fn handle_theme_command(
    command: Option<ThemeCommands>,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ThemeCommands::Show) | None => commands::theme::show(store, output),
        Some(ThemeCommands::List) => commands::theme::list(output),
        Some(ThemeCommands::Set { theme, font, color }) => {
            commands::theme::set(store, theme, font, color, output)
        }
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Set up tracing
///
/// `DIARY_LOG` sets the level for both crates, falling back to `RUST_LOG`
/// and then to `warn` (`info` for the proxy). When a log file is
/// configured, output goes there instead of stderr.
fn init_logging(config: &Config, serving: bool) {
    let default_level = if serving { "info" } else { "warn" };
    let env_filter = match std::env::var("DIARY_LOG") {
        Ok(level) => EnvFilter::new(format!("diary_core={level},diary_cli={level}")),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "diary_core={default_level},diary_cli={default_level}"
            ))
        }),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let Some(log_path) = &config.log_file else {
        let _ = builder.with_writer(std::io::stderr).try_init();
        return;
    };

    let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            let _ = builder.with_writer(std::io::stderr).try_init();
            return;
        }
    };

    let _ = builder
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    info!("Logging to {:?}", log_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_theme_set_accepts_theme_letters() {
        let cli = Cli::try_parse_from(["diary", "theme", "set", "--theme", "b", "--font", "nanum"])
            .unwrap();
        match cli.command {
            Commands::Theme {
                command: Some(ThemeCommands::Set { theme, font, color }),
            } => {
                assert_eq!(theme, Some(Theme::B));
                assert_eq!(font, Some(Font::Nanum));
                assert_eq!(color, None);
            }
            _ => panic!("expected theme set"),
        }

        assert!(Cli::try_parse_from(["diary", "theme", "set", "--theme", "pink"]).is_err());
    }

    #[test]
    fn test_help_matches_filter_fields() {
        let mut cmd = Cli::command();
        let list = cmd
            .find_subcommand_mut("entry")
            .and_then(|entry| entry.find_subcommand_mut("list"))
            .unwrap();
        let help = list.render_help().to_string();
        assert!(help.contains("address or memo"));
    }
}
