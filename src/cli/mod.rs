use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod chat;
pub mod history;
pub mod serve;

use history::HistoryCommand;

#[derive(Subcommand)]
enum Command {
    /// Run the relay server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, env = "PORT", default_value = "8000")]
        port: String,
    },
    /// Start an interactive chat session against the relay server
    Chat {},
    /// Inspect and manage the stored chat history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

/// Logging for the client side commands. Goes to stderr so it never
/// interleaves with chat output.
fn init_cli_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}={}", env!("CARGO_CRATE_NAME"), default_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await?;
        }
        Some(Command::Chat {}) => {
            init_cli_tracing("warn");
            chat::run().await?;
        }
        Some(Command::History { command }) => {
            init_cli_tracing("info");
            history::run(command)?;
        }
        None => {}
    }

    Ok(())
}
