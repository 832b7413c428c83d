//! Chat application module for conversations with a Phoenix chat server.
//!
//! This module provides the session state machine behind the REPL. It
//! supports:
//!
//! - Single-flight sends with progressive reveal of replies
//! - A bounded, persisted history of conversations
//! - File attachments, quick-action templates and transcript export
//! - Slash commands for session control
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and server interaction
//! - [`title`]: Titles derived from a conversation's first message
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;
mod title;

pub use commands::{ChatCommand, ConversationRef, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, default_data_dir};
pub use session::{
    ChatSession, FAILURE_MESSAGE, SendOutcome, SessionEvent, SessionState, WELCOME_MESSAGE,
};
pub use title::{CODE_KEYWORDS, MAX_TITLE_CHARS, derive_title};
