//! fieldsync - inspect and exercise a shared field store.

mod app;
mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fieldsync_config_and_utils::{init_logging, Config, Paths};
use fieldsync_core::EntityId;

/// fieldsync command-line interface.
#[derive(Parser)]
#[command(name = "fieldsync")]
#[command(about = "Per-entity field synchronization over a shared SQL store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, database and logs. Defaults to ~/.fieldsync
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, create every field table and list the active fields
    Check,
    /// Move a player between two engines on the configured store
    Handoff {
        /// Entity to hand off. A random one is used when omitted
        #[arg(long)]
        entity: Option<EntityId>,
    },
    /// Print the stored rows of one entity without applying them
    Inspect {
        #[arg(long)]
        entity: EntityId,
    },
    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
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
    let log_file = config.log_to_file.then(|| paths.log_file());
    init_logging(level, log_file.as_deref())?;

    match cli.command {
        Commands::Check => app::check(&config, &paths).await?,
        Commands::Handoff { entity } => {
            app::handoff(&config, &paths, entity.unwrap_or_default()).await?
        }
        Commands::Inspect { entity } => app::inspect(&config, &paths, entity).await?,
        Commands::Config { save } => app::show_config(&config, &paths, save)?,
    }

    Ok(())
}
