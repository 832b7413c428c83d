//! Prose to markup formatting.
//!
//! [`format`] turns a prose segment into inert HTML-style markup. The source is
//! escaped first, so raw HTML in a message is shown as text and never
//! interpreted. The rules then run in a fixed order; later rules never see the
//! markup produced by earlier ones as source syntax:
//!
//! 1. `**bold**` → `<strong>`
//! 2. `*italic*` → `<em>`
//! 3. `` `code` `` → `<code>`
//! 4. `[text](url)` → `<a>` opening in a new, unprivileged context
//! 5. lines starting with `-` or `*` → `<li>`, contiguous runs wrapped in `<ul>`
//! 6. remaining newlines → `<br>`
//!
//! [`to_terminal`] converts that markup into ANSI-styled text for the REPL.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use crate::types::Theme;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern should compile"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern should compile"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("inline code pattern should compile"));
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern should compile")
});
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+(.+)$").expect("list pattern should compile"));

/// Link schemes that are rendered as live links.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Formats a prose segment as markup.
pub fn format(prose: &str) -> String {
    let text = escape(prose);
    let text = BOLD.replace_all(&text, "<strong>$1</strong>");
    let text = ITALIC.replace_all(&text, "<em>$1</em>");
    let text = INLINE_CODE.replace_all(&text, "<code>$1</code>");
    let text = LINK.replace_all(&text, |caps: &Captures| {
        format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
            safe_href(&caps[2]),
            &caps[1]
        )
    });
    wrap_lists_and_breaks(&text)
}

/// Escapes the characters that have meaning in markup.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverses [`escape`].
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn safe_href(href: &str) -> String {
    match Url::parse(&unescape(href)) {
        Ok(url) if SAFE_SCHEMES.contains(&url.scheme()) => href.to_string(),
        Ok(_) => "#".to_string(),
        // Relative references have no scheme to abuse.
        Err(url::ParseError::RelativeUrlWithoutBase) => href.to_string(),
        Err(_) => "#".to_string(),
    }
}

fn wrap_lists_and_breaks(text: &str) -> String {
    let mut pieces: Vec<String> = Vec::new();
    let mut list: Option<String> = None;
    for line in text.split('\n') {
        if let Some(caps) = LIST_ITEM.captures(line) {
            let run = list.get_or_insert_with(|| "<ul>".to_string());
            run.push_str("<li>");
            run.push_str(&caps[1]);
            run.push_str("</li>");
            continue;
        }
        if let Some(mut run) = list.take() {
            run.push_str("</ul>");
            pieces.push(run);
        }
        pieces.push(line.to_string());
    }
    if let Some(mut run) = list.take() {
        run.push_str("</ul>");
        pieces.push(run);
    }
    pieces.join("<br>")
}

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_NO_BOLD: &str = "\x1b[22m";
const ANSI_ITALIC: &str = "\x1b[3m";
const ANSI_NO_ITALIC: &str = "\x1b[23m";
const ANSI_UNDERLINE: &str = "\x1b[4m";
const ANSI_NO_UNDERLINE: &str = "\x1b[24m";
const ANSI_DEFAULT_FG: &str = "\x1b[39m";

/// Foreground color used for code in the given theme.
pub fn code_color(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "\x1b[34m",
        Theme::Dark => "\x1b[36m",
    }
}

/// Converts markup produced by [`format`] into terminal text.
///
/// With `theme` set, emphasis is rendered with ANSI styles; without it the
/// tags are simply dropped.
pub fn to_terminal(markup: &str, theme: Option<Theme>) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    let mut after_list = false;
    while let Some(open) = rest.find('<') {
        out.push_str(&unescape(&rest[..open]));
        if open > 0 {
            after_list = false;
        }
        let Some(close) = rest[open..].find('>') else {
            out.push_str(&unescape(&rest[open..]));
            return out;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];
        let styled = |code: &'static str| if theme.is_some() { code } else { "" };
        match tag {
            "strong" => out.push_str(styled(ANSI_BOLD)),
            "/strong" => out.push_str(styled(ANSI_NO_BOLD)),
            "em" => out.push_str(styled(ANSI_ITALIC)),
            "/em" => out.push_str(styled(ANSI_NO_ITALIC)),
            "code" => out.push_str(theme.map(code_color).unwrap_or("")),
            "/code" => out.push_str(styled(ANSI_DEFAULT_FG)),
            "/a" => out.push_str(styled(ANSI_NO_UNDERLINE)),
            "ul" => {}
            "/ul" => {
                after_list = true;
                continue;
            }
            "li" => out.push_str("  • "),
            "/li" => out.push('\n'),
            "br" => {
                if !after_list {
                    out.push('\n');
                }
            }
            _ if tag.starts_with("a ") => out.push_str(styled(ANSI_UNDERLINE)),
            _ => {}
        }
        after_list = false;
    }
    out.push_str(&unescape(rest));
    out
}
