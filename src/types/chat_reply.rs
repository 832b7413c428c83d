use serde::{Deserialize, Serialize};

use crate::types::Attachment;

/// Outbound payload for one send: the trimmed user text plus attached files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// The `message` text field.
    pub message: String,

    /// One `files[]` part per attachment.
    pub files: Vec<Attachment>,
}

impl ChatRequest {
    /// Creates a request with no files.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            files: Vec::new(),
        }
    }

    /// Attaches files to the request.
    pub fn with_files(mut self, files: Vec<Attachment>) -> Self {
        self.files = files;
        self
    }
}

/// JSON body returned by the chat endpoint.
///
/// A successful reply carries `response`; failures usually carry `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    /// The assistant's reply text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Server-side error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    /// Creates a successful reply.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            error: None,
        }
    }

    /// Returns the reply text if it is present and not blank.
    pub fn text(&self) -> Option<&str> {
        self.response
            .as_deref()
            .filter(|response| !response.trim().is_empty())
    }
}
