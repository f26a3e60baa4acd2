use anyhow::Result;
use clap::{Args, Parser, Subcommand};

pub mod analyse;
pub mod inspect;
pub mod migrate;
pub mod serve;

use crate::core::{AppConfig, logging};

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ThreadSelector {
    /// Thread key as reported by the API
    #[arg(long)]
    key: Option<String>,

    /// Message-ID of the message that started the thread
    #[arg(long)]
    message_id: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Create the sqlite schema
    Migrate {},
    /// Print the stored state of a thread
    Inspect {
        #[command(flatten)]
        thread: ThreadSelector,
    },
    /// Run a raw .eml file through the classifier
    ///
    /// Thread locks only hold within one process. Without --dry-run,
    /// don't point this at the store of a running server.
    Analyse {
        #[arg(long)]
        path: String,

        /// Don't persist thread state or send replies
        #[arg(long, action, default_value = "false")]
        dry_run: bool,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    let config = AppConfig::from_env()?;

    logging::init();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port, config).await?;
        }
        Some(Command::Migrate {}) => {
            migrate::run(&config).await?;
        }
        Some(Command::Inspect { thread }) => {
            inspect::run(&config, thread.key, thread.message_id).await?;
        }
        Some(Command::Analyse { path, dry_run }) => {
            analyse::run(config, &path, dry_run).await?;
        }
        None => {}
    }

    Ok(())
}
