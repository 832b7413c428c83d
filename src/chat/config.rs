//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_TIMEOUT;
use crate::render::RevealMode;
use crate::store::DEFAULT_CAPACITY;

/// Default pause between revealed characters.
const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(10);

/// Directory name used under the platform data directory.
const DATA_DIR_NAME: &str = "phoenix-chat";

/// Command-line arguments for the phoenix-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the chat server.
    #[arrrg(
        optional,
        "Chat server base URL (default: $PHOENIX_CHAT_URL or http://127.0.0.1:5000/)",
        "URL"
    )]
    pub endpoint: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 30)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Where history and preferences are kept.
    #[arrrg(optional, "Directory for saved conversations and preferences", "DIR")]
    pub data_dir: Option<String>,

    /// How many conversations to keep.
    #[arrrg(optional, "Number of conversations to keep (default: 10)", "COUNT")]
    pub history: Option<usize>,

    /// Pause between revealed characters.
    #[arrrg(optional, "Milliseconds between revealed characters (default: 10)", "MS")]
    pub reveal_delay_ms: Option<u64>,

    /// Show replies at once instead of revealing them.
    #[arrrg(flag, "Show replies at once instead of typing them out")]
    pub immediate: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Chat server base URL; `None` defers to `PHOENIX_CHAT_URL` or the local default.
    pub endpoint_url: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Directory holding the key-value files.
    pub data_dir: PathBuf,

    /// Maximum number of stored conversations.
    pub history_capacity: usize,

    /// Pause before each revealed character.
    pub reveal_delay: Duration,

    /// Whether replies are revealed character by character.
    pub progressive: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Endpoint: from the environment, else the local server
    /// - Timeout: 30 seconds
    /// - History: 10 conversations
    /// - Reveal: progressive, 10ms per character
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            endpoint_url: None,
            timeout: DEFAULT_TIMEOUT,
            data_dir: default_data_dir(),
            history_capacity: DEFAULT_CAPACITY,
            reveal_delay: DEFAULT_REVEAL_DELAY,
            progressive: true,
            use_color: true,
        }
    }

    /// Sets the chat server base URL.
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Sets how many conversations are kept.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Sets the pause between revealed characters.
    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = delay;
        self
    }

    /// Shows replies at once.
    pub fn immediate(mut self) -> Self {
        self.progressive = false;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The reveal mode for fresh replies.
    pub fn reply_mode(&self) -> RevealMode {
        if self.progressive {
            RevealMode::Progressive
        } else {
            RevealMode::Immediate
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            endpoint_url: args.endpoint,
            timeout: args
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            data_dir: args.data_dir.map(PathBuf::from).unwrap_or(defaults.data_dir),
            history_capacity: args.history.unwrap_or(defaults.history_capacity),
            reveal_delay: args
                .reveal_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reveal_delay),
            progressive: !args.immediate,
            use_color: !args.no_color,
        }
    }
}

/// The platform data directory for this tool, or `.phoenix-chat` when unknown.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{DATA_DIR_NAME}")))
}
