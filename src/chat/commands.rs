//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to manage conversations, attachments and preferences
//! without sending anything to the server.

use crate::types::{QuickAction, Theme};

/// Identifies a stored conversation: by its 1-based position in `/list`, or by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationRef {
    /// Position in the listing, starting at 1.
    Index(usize),
    /// Conversation id.
    Id(String),
}

impl ConversationRef {
    fn parse(arg: &str) -> Self {
        match arg.parse::<usize>() {
            Ok(index) => ConversationRef::Index(index),
            Err(_) => ConversationRef::Id(arg.to_string()),
        }
    }
}

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Save the current conversation and start a new one.
    New,

    /// List stored conversations.
    List,

    /// Make a stored conversation current.
    Load(ConversationRef),

    /// Delete a stored conversation.
    Delete(ConversationRef),

    /// Delete every stored conversation.
    Clear,

    /// Attach a file to the next message.
    Attach(String),

    /// Remove one pending attachment, or all of them.
    Detach(Option<String>),

    /// List pending attachments.
    Files,

    /// Export the current conversation, optionally to a specific path.
    Export(Option<String>),

    /// Set the theme, or toggle it when `None`.
    Theme(Option<Theme>),

    /// Prefill the input with a prompt template.
    Quick(QuickAction),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use phoenix_chat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/load 2").is_some());
/// assert!(parse_command("Hello, Phoenix!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "list" | "history" => ChatCommand::List,
        "load" => match argument {
            Some(arg) => ChatCommand::Load(ConversationRef::parse(arg)),
            None => ChatCommand::Invalid("/load requires a number or id (see /list)".to_string()),
        },
        "delete" => match argument {
            Some(arg) => ChatCommand::Delete(ConversationRef::parse(arg)),
            None => {
                ChatCommand::Invalid("/delete requires a number or id (see /list)".to_string())
            }
        },
        "clear" => ChatCommand::Clear,
        "attach" => match argument {
            Some(path) => ChatCommand::Attach(path.to_string()),
            None => ChatCommand::Invalid("/attach requires a file path".to_string()),
        },
        "detach" => ChatCommand::Detach(argument.map(|s| s.to_string())),
        "files" => ChatCommand::Files,
        "export" => ChatCommand::Export(argument.map(|s| s.to_string())),
        "theme" => match argument {
            Some(arg) => match arg.parse::<Theme>() {
                Ok(theme) => ChatCommand::Theme(Some(theme)),
                Err(err) => ChatCommand::Invalid(format!("/theme: {err}")),
            },
            None => ChatCommand::Theme(None),
        },
        "quick" => match argument.map(|arg| arg.parse::<QuickAction>()) {
            Some(Ok(action)) => ChatCommand::Quick(action),
            Some(Err(err)) => ChatCommand::Invalid(format!("/quick: {err}")),
            None => ChatCommand::Invalid(
                "/quick requires one of debug, explain, write or optimize".to_string(),
            ),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Save this conversation and start a new one
  /list                  List saved conversations
  /load <n|id>           Switch to a saved conversation
  /delete <n|id>         Delete a saved conversation
  /clear                 Delete all saved conversations
  /attach <path>         Attach a file to the next message
  /detach [name]         Remove one attachment (no argument removes all)
  /files                 List pending attachments
  /export [path]         Export this conversation as text
  /theme [light|dark]    Set the theme (no argument toggles it)
  /quick <action>        Start from a template: debug, explain, write, optimize
  /help                  Show this help message
  /quit                  Exit the chat

Press Ctrl-C while a reply is being typed to show it all at once."#
}
