use std::fs;
use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::{TimeZone, Utc};
use clap::Subcommand;

use crate::chat::{ChatStore, FileStorage, Storage};
use crate::core::ClientConfig;

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List saved chats, most recent first
    List,
    /// Print every message of a chat
    Show { id: String },
    /// Delete a chat
    Delete { id: String },
    /// Delete all saved chats
    Clear,
    /// Write the full history to a JSON file
    Export {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn format_millis(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "chatbot-history-{}.json",
        Utc::now().format("%Y-%m-%d")
    ))
}

pub fn run(command: HistoryCommand) -> Result<()> {
    let config = ClientConfig::default();
    let store = ChatStore::new(FileStorage::new(&config.storage_path));
    execute(&store, command)
}

pub fn execute<S: Storage>(store: &ChatStore<S>, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List => {
            for session in store.list_sessions() {
                println!(
                    "{}  {}  {} ({} messages)",
                    session.id,
                    format_millis(session.last_updated),
                    session.title,
                    session.messages.len()
                );
            }
        }
        HistoryCommand::Show { id } => {
            let Some(session) = store.get_session(&id) else {
                bail!("No chat with id {}", id);
            };
            println!("# {}", session.title);
            for msg in session.messages {
                println!("{:?}: {}", msg.sender, msg.text);
            }
        }
        HistoryCommand::Delete { id } => {
            let remaining = store.delete_session(&id);
            println!("{} saved chats left.", remaining.len());
        }
        HistoryCommand::Clear => {
            store.clear_all();
            println!("Chat history cleared.");
        }
        HistoryCommand::Export { path } => {
            let path = path.unwrap_or_else(default_export_path);
            fs::write(&path, store.export_history())?;
            tracing::info!("Exported chat history to {}", path.display());
        }
    }

    Ok(())
}
