use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::chat::{
    ChatStore, FileStorage, Message, SessionController, Sender, Storage, TurnOutcome,
};
use crate::core::ClientConfig;
use crate::relay::{PromptRelay, RelayClient};

const HELP: &str = "Commands: /new, /list, /open <id>, /delete <id>, /help, /quit";

fn print_message(msg: &Message) {
    match (msg.sender, msg.loading) {
        (_, true) => println!("ai> ..."),
        (Sender::User, _) => println!("you> {}", msg.text),
        (Sender::Ai, _) => println!("ai> {}", msg.text),
    }
}

/// Delete a chat and report how many are left and whether it was the
/// active one.
fn delete_chat<S: Storage, R: PromptRelay>(
    controller: &mut SessionController<S, R>,
    id: &str,
) -> (usize, bool) {
    let was_active = controller.active_session_id() == Some(id);
    let remaining = controller.on_delete_chat(id);
    (remaining.len(), was_active)
}

pub async fn run() -> Result<()> {
    let config = ClientConfig::default();
    let store = ChatStore::new(FileStorage::new(&config.storage_path));
    let relay = RelayClient::new(&config.relay_url, config.relay_timeout);
    let mut controller = SessionController::new(store, relay);

    let mut rl = DefaultEditor::new()?;
    println!("Chatting via {}. {}", controller.relay().url(), HELP);

    loop {
        let readline = rl.readline(">>> ");
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };
        let _ = rl.add_history_entry(line.as_str());
        let input = line.trim();

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => println!("{}", HELP),
            ("/new", _) => {
                controller.on_new_chat();
                println!("Started a new chat.");
            }
            ("/list", _) => {
                let sidebar = controller.sidebar();
                if sidebar.is_empty() {
                    println!("No saved chats.");
                }
                for row in sidebar {
                    let marker = if row.is_current { "*" } else { " " };
                    println!("{} {}  {}", marker, row.id, row.title);
                }
            }
            ("/open", id) => {
                if controller.on_select_chat(id.trim()) {
                    controller.active_messages().iter().for_each(print_message);
                } else {
                    println!("No chat with id {}", id.trim());
                }
            }
            ("/delete", id) => {
                let (remaining, was_active) = delete_chat(&mut controller, id.trim());
                println!("{} saved chats left.", remaining);
                if was_active {
                    println!("Started a new chat.");
                }
            }
            _ => {
                let Some(turn) = controller.begin_turn(input)? else {
                    continue;
                };
                if let Some(placeholder) = controller.active_messages().last() {
                    print_message(placeholder);
                }
                let result = controller.relay().send(&turn.prompt).await;
                if let TurnOutcome::Completed(msg) = controller.finish_turn(turn, result) {
                    print_message(&msg);
                }
            }
        }
    }

    Ok(())
}
