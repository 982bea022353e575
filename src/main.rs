//! FileShare command-line front end.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use fileshare::{net, Config, FileShareError, FileShareService, LocalContentStore, Result};

/// FileShare - share files with devices on the local network.
#[derive(Parser, Debug)]
#[command(name = "fileshare")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the file server until interrupted
    Serve {
        /// Start even if the run-on-startup preference is off
        #[arg(long, short)]
        force: bool,
    },

    /// Share a file or folder
    Share {
        /// Path to share
        path: PathBuf,
    },

    /// List shared folders
    Folders,

    /// Stop sharing a folder
    Remove {
        /// Folder ID
        folder_id: i64,
    },

    /// Set the access password, or clear it when omitted
    Password {
        /// New password
        new_password: Option<String>,
    },

    /// Show or change access preferences
    Prefs {
        /// Require a password for listing and downloads
        #[arg(long, value_name = "BOOL")]
        require_login: Option<bool>,

        /// Accept uploads into shared folders
        #[arg(long, value_name = "BOOL")]
        allow_uploads: Option<bool>,

        /// Start the server when `serve` is run without --force
        #[arg(long, value_name = "BOOL")]
        run_on_startup: Option<bool>,
    },
}

fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load_with_env(path)?
    } else {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    if matches!(cli.command, Commands::Serve { .. }) {
        if let Err(e) = fileshare::logging::init(&config.logging) {
            eprintln!("Failed to initialize logging: {e}");
            fileshare::logging::init_console_only(&config.logging.level);
        }
    } else if cli.verbose {
        fileshare::logging::init_console_only(&config.logging.level);
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    let service = FileShareService::open(config, Arc::new(LocalContentStore::new())).await?;

    match command {
        Commands::Serve { force } => {
            if !force && !service.run_on_startup().await? {
                println!("Run-on-startup is disabled; use --force to start anyway.");
                service.shutdown().await;
                return Ok(());
            }

            let addr = service.start().await?;
            println!("Sharing on {}", net::display_url(addr));
            println!("Press Ctrl-C to stop.");

            tokio::signal::ctrl_c().await?;
            info!("Shutdown requested");
        }
        Commands::Share { path } => {
            let path = std::fs::canonicalize(&path)?;
            let source = path.to_str().ok_or_else(|| {
                FileShareError::Validation(format!("path is not valid UTF-8: {}", path.display()))
            })?;

            let (folder, report) = service.ingestor().share_folder(source).await?;
            println!(
                "Shared folder {} \"{}\": {} file(s) added, {} skipped",
                folder.id, folder.name, report.added, report.skipped
            );
        }
        Commands::Folders => {
            let folders = service.registry().list_folders().await?;
            if folders.is_empty() {
                println!("No shared folders.");
            }
            for folder in folders {
                let count = service.registry().count_files(folder.id).await?;
                println!(
                    "{:>4}  {}  ({} file(s))  {}",
                    folder.id, folder.name, count, folder.storage_ref
                );
            }
        }
        Commands::Remove { folder_id } => {
            service.registry().remove_folder(folder_id).await?;
            println!("Removed folder {folder_id}");
        }
        Commands::Password { new_password } => {
            let new_password = new_password.unwrap_or_default();
            let changed = service.sessions().set_password(&new_password).await?;
            match (changed, new_password.is_empty()) {
                (false, _) => println!("Password unchanged."),
                (true, true) => println!("Password cleared; all sessions signed out."),
                (true, false) => println!("Password updated; all sessions signed out."),
            }
        }
        Commands::Prefs {
            require_login,
            allow_uploads,
            run_on_startup,
        } => {
            if let Some(value) = require_login {
                service.sessions().set_require_login(value).await?;
            }
            if let Some(value) = allow_uploads {
                service.sessions().set_allow_uploads(value).await?;
            }
            if let Some(value) = run_on_startup {
                service.set_run_on_startup(value).await?;
            }

            let access = service.sessions().access_config().await?;
            println!("require_login  = {}", access.require_login);
            println!("allow_uploads  = {}", access.allow_uploads);
            println!("password_set   = {}", access.has_password);
            println!("run_on_startup = {}", service.run_on_startup().await?);
        }
    }

    service.shutdown().await;
    Ok(())
}
