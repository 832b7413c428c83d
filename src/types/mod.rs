// Public modules
pub mod attachment;
pub mod chat_reply;
pub mod conversation;
pub mod message;
pub mod quick_action;
pub mod theme;

// Re-exports
pub use attachment::{
    ACCEPTED_EXTENSIONS, Attachment, MAX_ATTACHMENT_BYTES, default_attachment_prompt,
    uploaded_files_note,
};
pub use chat_reply::{ChatReply, ChatRequest};
pub use conversation::{Conversation, DEFAULT_TITLE, export_file_name};
pub use message::{Message, MessageRole};
pub use quick_action::QuickAction;
pub use theme::Theme;
