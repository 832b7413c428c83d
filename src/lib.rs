//! Terminal client for a Phoenix chat server.
//!
//! The crate keeps a bounded local history of conversations, sends one message
//! at a time to the server, and reveals each reply progressively while keeping
//! the rendered markup valid for every prefix shown.

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod markup;
pub mod observability;
pub mod render;
pub mod segment;
pub mod store;
pub mod types;
pub mod utils;

// Re-exports
pub use chat::{ChatConfig, ChatSession, SendOutcome, SessionEvent, SessionState};
pub use client::{ChatEndpoint, HttpEndpoint};
pub use error::{Error, ErrorKind, Result};
pub use observability::register_biometrics;
pub use render::{MarkupDocument, PlainTextRenderer, Renderer, RevealMode};
pub use store::{ConversationStore, FileStore, KeyValueStore, MemoryStore};
pub use types::*;
