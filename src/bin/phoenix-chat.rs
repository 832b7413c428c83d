//! Interactive terminal client for a Phoenix chat server.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a server on localhost:5000
//! phoenix-chat
//!
//! # Point at another server
//! phoenix-chat --endpoint http://chat.internal:8080/
//!
//! # Show replies at once, without colors (useful for piping output)
//! phoenix-chat --immediate --no-color
//! ```
//!
//! Logging goes to stderr and is controlled by `PHOENIX_LOG` (default `warn`).
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start a new conversation
//! - `/list`, `/load <n>`, `/delete <n>` - Manage saved conversations
//! - `/attach <path>` - Attach a file to the next message
//! - `/quit` - Exit the application

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use phoenix_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, ConversationRef, help_text, parse_command,
};
use phoenix_chat::{
    Attachment, FileStore, HttpEndpoint, KeyValueStore, PlainTextRenderer, Renderer, SendOutcome,
};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "PHOENIX_LOG";

/// Main entry point for the phoenix-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let (args, _) = ChatArgs::from_command_line_relaxed("phoenix-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    let endpoint = HttpEndpoint::with_options(config.endpoint_url.clone(), Some(config.timeout))?;
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);
    let server = endpoint.base_url().to_string();
    let session = ChatSession::new(endpoint, kv, config);

    // Flag for interrupt handling during a reveal
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer = PlainTextRenderer::with_color(use_color).with_interrupt(interrupted.clone());
    renderer.set_theme(session.theme());
    let mut rl = DefaultEditor::new()?;

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("Phoenix AI (server: {server})");
    println!("Type /help for commands, /quit to exit\n");
    session.welcome(&mut renderer);

    let mut prefill: Option<String> = None;
    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = match prefill.take() {
            Some(template) => rl.readline_with_initial("You: ", (&template, "")),
            None => rl.readline("You: "),
        };

        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        };
        if line.trim().is_empty() && session.attachments().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        let Some(cmd) = parse_command(&line) else {
            match session.send(&line, &mut renderer).await {
                SendOutcome::Replied | SendOutcome::Ignored => {}
                SendOutcome::Failed(kind) => {
                    tracing::debug!(?kind, "send reported failure");
                }
            }
            continue;
        };

        match cmd {
            ChatCommand::Quit => {
                println!("Goodbye!");
                break;
            }
            ChatCommand::Help => {
                for line in help_text().lines() {
                    println!("    {}", line);
                }
            }
            ChatCommand::New => {
                if let Err(err) = session.new_chat(&mut renderer) {
                    renderer.print_error(&err.to_string());
                }
            }
            ChatCommand::List => print_conversations(&session),
            ChatCommand::Load(target) => match resolve(&session, &target) {
                Some(id) => {
                    if let Err(err) = session.load_conversation(&id, &mut renderer) {
                        renderer.print_error(&err.to_string());
                    }
                }
                None => renderer.print_error("No such conversation (see /list)"),
            },
            ChatCommand::Delete(target) => match resolve(&session, &target) {
                Some(id) => match session.delete_conversation(&id, &mut renderer) {
                    Ok(()) => renderer.print_info("Conversation deleted."),
                    Err(err) => renderer.print_error(&err.to_string()),
                },
                None => renderer.print_error("No such conversation (see /list)"),
            },
            ChatCommand::Clear => {
                let confirm = rl.readline("Clear all chat history? This cannot be undone. [y/N] ");
                if matches!(confirm.as_deref().map(str::trim), Ok("y" | "Y" | "yes")) {
                    match session.clear_history(&mut renderer) {
                        Ok(()) => renderer.print_info("History cleared."),
                        Err(err) => renderer.print_error(&err.to_string()),
                    }
                }
            }
            ChatCommand::Attach(path) => match Attachment::from_path(&path).await {
                Ok(attachment) => {
                    let name = attachment.name.clone();
                    match session.attach(attachment) {
                        Ok(()) => renderer.print_info(&format!("Attached {name}")),
                        Err(err) => renderer.print_error(&err.to_string()),
                    }
                }
                Err(err) => renderer.print_error(&err.to_string()),
            },
            ChatCommand::Detach(Some(name)) => {
                if session.remove_attachment(&name) {
                    renderer.print_info(&format!("Removed {name}"));
                } else {
                    renderer.print_error(&format!("{name} is not attached"));
                }
            }
            ChatCommand::Detach(None) => {
                session.clear_attachments();
                renderer.print_info("Attachments cleared.");
            }
            ChatCommand::Files => {
                let attachments = session.attachments();
                if attachments.is_empty() {
                    println!("    (no attachments)");
                }
                for attachment in attachments {
                    println!(
                        "    {} ({}, {} bytes)",
                        attachment.name,
                        attachment.mime,
                        attachment.data.len()
                    );
                }
            }
            ChatCommand::Export(path) => {
                let path = path
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(session.export_file_name()));
                match std::fs::write(&path, session.export()) {
                    Ok(()) => renderer.print_info(&format!("Exported to {}", path.display())),
                    Err(err) => {
                        renderer.print_error(&format!("Failed to export conversation: {err}"))
                    }
                }
            }
            ChatCommand::Theme(theme) => {
                let theme = theme.unwrap_or_else(|| session.theme().toggled());
                session.set_theme(theme);
                renderer.set_theme(theme);
                renderer.print_info(&format!("Theme set to {theme}"));
            }
            ChatCommand::Quick(action) => {
                prefill = Some(action.template().to_string());
            }
            ChatCommand::Invalid(msg) => {
                renderer.print_error(&msg);
            }
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn resolve<E: phoenix_chat::ChatEndpoint>(
    session: &ChatSession<E>,
    target: &ConversationRef,
) -> Option<String> {
    let conversations = session.conversations();
    match target {
        ConversationRef::Index(index) => index
            .checked_sub(1)
            .and_then(|i| conversations.get(i))
            .map(|conversation| conversation.id.clone()),
        ConversationRef::Id(id) => conversations
            .iter()
            .find(|conversation| &conversation.id == id)
            .map(|conversation| conversation.id.clone()),
    }
}

fn print_conversations<E: phoenix_chat::ChatEndpoint>(session: &ChatSession<E>) {
    let conversations = session.conversations();
    if conversations.is_empty() {
        println!("    (no saved conversations)");
        return;
    }
    let current = session.current().id;
    println!("    Saved conversations:");
    for (i, conversation) in conversations.iter().enumerate() {
        let marker = if conversation.id == current { "*" } else { " " };
        let when = conversation
            .timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| "?".to_string());
        println!(
            "    {marker}{:>2}. {} ({} messages, {when}) [{}]",
            i + 1,
            conversation.title,
            conversation.messages.len(),
            conversation.id
        );
    }
}
