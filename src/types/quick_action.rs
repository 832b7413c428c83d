use std::fmt;
use std::str::FromStr;

/// Canned prompt starters offered next to the input box.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum QuickAction {
    /// Ask for help debugging a snippet.
    Debug,
    /// Ask for an explanation.
    Explain,
    /// Ask for a new function.
    Write,
    /// Ask for an optimization.
    Optimize,
}

impl QuickAction {
    /// All actions in display order.
    pub const ALL: [QuickAction; 4] = [
        QuickAction::Debug,
        QuickAction::Explain,
        QuickAction::Write,
        QuickAction::Optimize,
    ];

    /// The text placed into the input when the action is chosen.
    pub fn template(&self) -> &'static str {
        match self {
            QuickAction::Debug => "Help me debug this code:\n```\n\n```",
            QuickAction::Explain => "Explain this concept:\n",
            QuickAction::Write => "Help me write a function that:\n",
            QuickAction::Optimize => "Help me optimize this code:\n```\n\n```",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            QuickAction::Debug => "debug",
            QuickAction::Explain => "explain",
            QuickAction::Write => "write",
            QuickAction::Optimize => "optimize",
        }
    }
}

impl fmt::Display for QuickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QuickAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        QuickAction::ALL
            .into_iter()
            .find(|action| action.name() == wanted)
            .ok_or_else(|| {
                format!("unknown quick action '{wanted}' (expected debug, explain, write or optimize)")
            })
    }
}
