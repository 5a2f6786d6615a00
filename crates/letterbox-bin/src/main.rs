//! Letterbox - store-and-forward messaging between participants on one host.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use letterbox_client::ClientConfig;
use letterbox_config_and_utils::{init_logging_for_service, Config, Paths};

/// Letterbox command-line interface.
#[derive(Parser)]
#[command(name = "letterbox")]
#[command(about = "Local store-and-forward messaging")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for stores, logs and config. Defaults to ~/.letterbox
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a participant's store if it does not exist
    Init { id: String },
    /// Queue a message and run one delivery pass
    Send {
        from: String,
        to: String,
        message: String,
    },
    /// Print a participant's messages as JSON lines
    Inbox { id: String },
    /// Run a participant's client in the foreground until Ctrl-C
    Run { id: String },
    /// Upload the participant's key bundle to the registration service
    Register {
        id: String,
        /// Report registration failures even when `registration_mode` is silent
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging_for_service("letterbox", level, Some(&paths));

    let client_config = ClientConfig::from_config(&config, paths);

    match cli.command {
        Commands::Init { id } => commands::init(&client_config, &id).await?,
        Commands::Send { from, to, message } => {
            commands::send(&client_config, &from, &to, &message).await?
        }
        Commands::Inbox { id } => commands::inbox(&client_config, &id).await?,
        Commands::Run { id } => commands::run(&client_config, &id).await?,
        Commands::Register { id, strict } => {
            commands::register(&client_config, &id, strict).await?
        }
    }

    Ok(())
}
