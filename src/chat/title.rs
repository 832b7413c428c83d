//! Conversation titles derived from the first user message.

/// Longest title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 35;

/// Titles shorter than this fall back to the raw message.
const MIN_TITLE_CHARS: usize = 3;

/// Most words kept from a code request.
const MAX_IMPORTANT_WORDS: usize = 4;

const ELLIPSIS: &str = "...";

/// Words that mark a message as a request for code.
pub const CODE_KEYWORDS: &[&str] = &[
    "code",
    "function",
    "write",
    "create",
    "implement",
    "class",
    "script",
    "program",
    "algorithm",
    "debug",
    "fix",
];

/// Derives a title for a conversation whose first user message is `message`.
///
/// Questions are cut after their first `?`. Requests for code are reduced to
/// up to four words longer than three characters that are not code keywords.
/// Anything else is used as is. The result is clipped to
/// [`MAX_TITLE_CHARS`]; a result under three characters falls back to the
/// start of the raw message.
pub fn derive_title(message: &str) -> String {
    let message = message.trim();
    let derived = if let Some(question) = message.find('?') {
        message[..=question].to_string()
    } else if is_code_request(message) {
        important_words(message).join(" ")
    } else {
        message.to_string()
    };
    let derived = clip(derived.trim());
    if derived.chars().count() < MIN_TITLE_CHARS {
        message.chars().take(MAX_TITLE_CHARS).collect()
    } else {
        derived
    }
}

fn is_code_request(message: &str) -> bool {
    let lower = message.to_lowercase();
    CODE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

fn important_words(message: &str) -> Vec<&str> {
    message
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| word.chars().count() > 3)
        .filter(|word| !CODE_KEYWORDS.contains(&word.to_lowercase().as_str()))
        .take(MAX_IMPORTANT_WORDS)
        .collect()
}

fn clip(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let kept: String = title
        .chars()
        .take(MAX_TITLE_CHARS - ELLIPSIS.len())
        .collect();
    format!("{}{ELLIPSIS}", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_are_cut_at_first_question_mark() {
        assert_eq!(derive_title("Why does this fail?"), "Why does this fail?");
        assert_eq!(derive_title("Why? I mean, really?"), "Why?");
    }

    #[test]
    fn code_requests_keep_important_words() {
        assert_eq!(derive_title("write a function that sorts"), "that sorts");
        assert_eq!(
            derive_title("Please implement parsing, validation, caching and logging for config"),
            "Please parsing validation caching"
        );
    }

    #[test]
    fn code_request_without_important_words_falls_back() {
        assert_eq!(derive_title("fix it"), "fix it");
    }

    #[test]
    fn plain_messages_are_used_as_is() {
        assert_eq!(derive_title("  Tell me a story  "), "Tell me a story");
    }

    #[test]
    fn long_titles_are_clipped_with_ellipsis() {
        let title = derive_title("Tell me everything about the history of the Roman empire");
        assert_eq!(title, "Tell me everything about the his...");
        assert!(title.chars().count() <= MAX_TITLE_CHARS);
    }

    #[test]
    fn short_results_fall_back_to_raw_message() {
        assert_eq!(derive_title("?"), "?");
        assert_eq!(derive_title("a? b"), "a? b");
    }

    #[test]
    fn clipping_counts_characters() {
        let title = derive_title(&"é".repeat(50));
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
        assert!(title.ends_with(ELLIPSIS));
    }
}
