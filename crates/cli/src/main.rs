//! fmstamp CLI - keeps frontmatter modified timestamps current

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;
mod util;

/// fmstamp - Frontmatter timestamps for Markdown vaults
#[derive(Parser)]
#[command(name = "fmstamp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Vault root (default: nearest directory with .fmstamp/)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .fmstamp/config.toml in the vault
    Init,
    /// Watch the vault and stamp notes after edits
    Watch {
        /// Write logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Stamp notes now, without debouncing
    Stamp {
        /// Note paths
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Show what stamping a note would do, without writing
    Check {
        /// Note path
        path: String,
    },
    /// View and edit settings
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Manage excluded folders
    #[command(subcommand)]
    Exclude(ExcludeCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all settings
    List,
    /// Print one setting
    Get {
        key: String,
    },
    /// Change one setting
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an annotated example configuration
    Example,
}

#[derive(Subcommand)]
enum ExcludeCommands {
    /// List excluded folders
    List,
    /// Exclude a folder (and its subfolders)
    Add {
        folder: String,
    },
    /// Stop excluding a folder
    Remove {
        folder: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = match &cli.command {
        Commands::Watch { log_file } => init_tracing("info", log_file.as_deref())?,
        _ => init_tracing("warn", None)?,
    };

    let vault = cli.vault.as_deref();
    match cli.command {
        Commands::Init => cmd::init::run(vault).await,
        Commands::Watch { .. } => cmd::watch::run(vault).await,
        Commands::Stamp { paths } => cmd::stamp::run(vault, &paths).await,
        Commands::Check { path } => cmd::check::run(vault, &path).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(vault).await,
            ConfigCommands::Get { key } => cmd::config::run_get(vault, &key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(vault, &key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(vault, create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
        Commands::Exclude(exclude_cmd) => match exclude_cmd {
            ExcludeCommands::List => cmd::exclude::run_list(vault).await,
            ExcludeCommands::Add { folder } => cmd::exclude::run_add(vault, &folder).await,
            ExcludeCommands::Remove { folder } => cmd::exclude::run_remove(vault, &folder).await,
        },
    }
}

/// Install the global subscriber; `RUST_LOG` overrides `default_level`
///
/// The returned guard flushes the file writer and must outlive the command.
fn init_tracing(default_level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let Some(log_file) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = log_file
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", log_file.display()))?;
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}
