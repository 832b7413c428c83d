//! Incremental rendering of message bodies.
//!
//! A message body is segmented ([`crate::segment`]) and revealed through a
//! [`Reveal`], a tick-driven state machine producing [`RenderUpdate`]s. In
//! [`RevealMode::Immediate`] every segment arrives fully formatted in one
//! update. In [`RevealMode::Progressive`] prose is revealed one character per
//! update, each update carrying the markup of the whole prefix seen so far,
//! while code segments arrive in one piece.
//!
//! [`render_message`] drives a reveal into a [`Renderer`] at a fixed cadence.
//! Dropping its future abandons the reveal; raising the renderer's interrupt
//! flag finishes the remaining content at once.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};

use crate::markup;
use crate::observability::{RENDER_INTERRUPTS, RENDER_UPDATES};
use crate::segment::{Segment, SegmentKind, segment};
use crate::types::{MessageRole, Theme};

/// ANSI escape code for dim text (used for code language labels).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for sender names).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for red text (used for failures).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code that clears from the cursor to the end of the screen.
const ANSI_CLEAR_BELOW: &str = "\x1b[J";

///////////////////////////////////////// Updates //////////////////////////////////////////

/// How a message body is revealed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RevealMode {
    /// Everything at once: user messages, loaded history, errors.
    Immediate,
    /// Character by character: a freshly received assistant reply.
    Progressive,
}

/// One step of a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderUpdate {
    /// A message begins.
    Start {
        /// Author of the message.
        role: MessageRole,
        /// Whether the message reports a failure.
        error: bool,
    },
    /// The visible markup of a prose segment, replacing any earlier snapshot.
    Prose {
        /// Position of the segment within the message.
        index: usize,
        /// Markup for the revealed prefix.
        markup: String,
        /// Whether the whole segment is now visible.
        complete: bool,
    },
    /// A code segment, revealed atomically.
    Code {
        /// Position of the segment within the message.
        index: usize,
        /// Language tag, if any.
        language: Option<String>,
        /// Verbatim code.
        code: String,
    },
    /// The message is fully revealed.
    Finish {
        /// Author of the message.
        role: MessageRole,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Position {
    Start,
    Segment { index: usize, shown: usize },
    End,
    Done,
}

/// Reveal state for one message.
///
/// `Reveal` is an [`Iterator`] over its updates; use [`paced`] or
/// [`render_message`] to spread a progressive reveal over time.
#[derive(Debug, Clone)]
pub struct Reveal {
    role: MessageRole,
    error: bool,
    mode: RevealMode,
    segments: Vec<Segment>,
    position: Position,
}

impl Reveal {
    /// Segments `raw` and prepares to reveal it.
    pub fn new(role: MessageRole, raw: &str, mode: RevealMode) -> Self {
        Self {
            role,
            error: false,
            mode,
            segments: segment(raw),
            position: Position::Start,
        }
    }

    /// An assistant-side failure notice, revealed immediately.
    pub fn error(text: &str) -> Self {
        Self {
            error: true,
            ..Self::new(MessageRole::Assistant, text, RevealMode::Immediate)
        }
    }

    /// The segments being revealed.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the next update is a paced character step.
    pub fn next_is_paced(&self) -> bool {
        match self.position {
            Position::Segment { index, .. } => {
                self.mode == RevealMode::Progressive
                    && self.segments[index].kind == SegmentKind::Prose
            }
            _ => false,
        }
    }

    /// Returns true once the final update has been produced.
    pub fn is_done(&self) -> bool {
        self.position == Position::Done
    }

    /// Produces the next update, or `None` when the reveal is over.
    pub fn next_update(&mut self) -> Option<RenderUpdate> {
        match self.position {
            Position::Start => {
                self.position = self.first_position(0);
                Some(RenderUpdate::Start {
                    role: self.role,
                    error: self.error,
                })
            }
            Position::Segment { index, shown } => Some(self.step(index, shown)),
            Position::End => {
                self.position = Position::Done;
                Some(RenderUpdate::Finish { role: self.role })
            }
            Position::Done => None,
        }
    }

    /// Switches to immediate mode and returns every remaining update.
    ///
    /// A partially revealed prose segment is completed by the first update.
    pub fn finish_now(&mut self) -> Vec<RenderUpdate> {
        self.mode = RevealMode::Immediate;
        std::iter::from_fn(|| self.next_update()).collect()
    }

    fn first_position(&self, index: usize) -> Position {
        if index < self.segments.len() {
            Position::Segment { index, shown: 0 }
        } else {
            Position::End
        }
    }

    fn step(&mut self, index: usize, shown: usize) -> RenderUpdate {
        let segment = &self.segments[index];
        match (segment.kind, self.mode) {
            (SegmentKind::Code, _) => {
                let update = RenderUpdate::Code {
                    index,
                    language: segment.language.clone(),
                    code: segment.text.clone(),
                };
                self.position = self.first_position(index + 1);
                update
            }
            (SegmentKind::Prose, RevealMode::Immediate) => {
                let update = RenderUpdate::Prose {
                    index,
                    markup: markup::format(&segment.text),
                    complete: true,
                };
                self.position = self.first_position(index + 1);
                update
            }
            (SegmentKind::Prose, RevealMode::Progressive) => {
                let shown = shown + 1;
                let end = segment
                    .text
                    .char_indices()
                    .nth(shown)
                    .map_or(segment.text.len(), |(offset, _)| offset);
                let complete = end == segment.text.len();
                let update = RenderUpdate::Prose {
                    index,
                    markup: markup::format(&segment.text[..end]),
                    complete,
                };
                self.position = if complete {
                    self.first_position(index + 1)
                } else {
                    Position::Segment { index, shown }
                };
                update
            }
        }
    }
}

impl Iterator for Reveal {
    type Item = RenderUpdate;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_update()
    }
}

/// Streams the updates of `reveal`, sleeping `delay` before every character step.
pub fn paced(reveal: &mut Reveal, delay: Duration) -> impl Stream<Item = RenderUpdate> + '_ {
    stream::unfold(reveal, move |reveal| async move {
        if reveal.next_is_paced() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let update = reveal.next_update()?;
        Some((update, reveal))
    })
}

/// How a call to [`render_message`] ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Every update was delivered at its cadence.
    Completed,
    /// The renderer asked to stop; the rest was delivered at once.
    Interrupted,
}

/// Drives `reveal` into `renderer`, resolving after the last update.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use phoenix_chat::render::{Block, RenderOutcome, Reveal, render_message};
/// use phoenix_chat::{MarkupDocument, MessageRole, RevealMode};
///
/// # tokio_test::block_on(async {
/// let mut document = MarkupDocument::new();
/// let reveal = Reveal::new(MessageRole::Assistant, "Hello **world**", RevealMode::Progressive);
/// let outcome = render_message(&mut document, reveal, Duration::ZERO).await;
/// assert_eq!(outcome, RenderOutcome::Completed);
/// assert_eq!(
///     document.last().unwrap().blocks,
///     vec![Block::Prose { markup: "Hello <strong>world</strong>".to_string() }]
/// );
/// # })
/// ```
pub async fn render_message(
    renderer: &mut dyn Renderer,
    mut reveal: Reveal,
    delay: Duration,
) -> RenderOutcome {
    let mut interrupted = false;
    {
        let updates = paced(&mut reveal, delay);
        futures::pin_mut!(updates);
        while let Some(update) = updates.next().await {
            RENDER_UPDATES.click();
            let finished = matches!(update, RenderUpdate::Finish { .. });
            renderer.apply(&update);
            if !finished && renderer.should_interrupt() {
                interrupted = true;
                break;
            }
        }
    }
    if !interrupted {
        return RenderOutcome::Completed;
    }
    RENDER_INTERRUPTS.click();
    for update in reveal.finish_now() {
        RENDER_UPDATES.click();
        renderer.apply(&update);
    }
    renderer.print_interrupted();
    RenderOutcome::Interrupted
}

///////////////////////////////////////// Renderer /////////////////////////////////////////

/// Output target for rendered messages.
///
/// A prose segment may be updated many times; each update replaces the
/// previous markup for the same segment index.
pub trait Renderer: Send {
    /// Called when a message begins.
    fn start_message(&mut self, role: MessageRole, error: bool);

    /// Shows the current markup of a prose segment.
    fn update_prose(&mut self, index: usize, markup: &str, complete: bool);

    /// Shows a complete code segment.
    fn print_code(&mut self, index: usize, language: Option<&str>, code: &str);

    /// Called after the last segment of a message.
    fn finish_message(&mut self, role: MessageRole);

    /// Print an error message outside the transcript.
    fn print_error(&mut self, error: &str);

    /// Print an informational message outside the transcript.
    fn print_info(&mut self, info: &str);

    /// Removes every rendered message, e.g. when switching conversations.
    fn clear_transcript(&mut self) {}

    /// Shows or hides the indicator that a reply is being awaited.
    fn show_typing(&mut self, _visible: bool) {}

    /// Called when a progressive reveal was cut short.
    fn print_interrupted(&mut self) {}

    /// Returns true if an in-flight reveal should finish immediately.
    fn should_interrupt(&self) -> bool {
        false
    }

    /// Dispatches one update to the methods above.
    fn apply(&mut self, update: &RenderUpdate) {
        match update {
            RenderUpdate::Start { role, error } => self.start_message(*role, *error),
            RenderUpdate::Prose {
                index,
                markup,
                complete,
            } => self.update_prose(*index, markup, *complete),
            RenderUpdate::Code {
                index,
                language,
                code,
            } => self.print_code(*index, language.as_deref(), code),
            RenderUpdate::Finish { role } => self.finish_message(*role),
        }
    }
}

/// A rendered block of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Formatted prose.
    Prose {
        /// The latest markup snapshot.
        markup: String,
    },
    /// Verbatim code.
    Code {
        /// Language tag, if any.
        language: Option<String>,
        /// The code.
        code: String,
    },
}

/// A message as it currently appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Author.
    pub role: MessageRole,
    /// Whether the message reports a failure.
    pub error: bool,
    /// Whether the reveal has finished.
    pub finished: bool,
    /// Blocks in segment order.
    pub blocks: Vec<Block>,
}

/// In-memory transcript of markup, the equivalent of the chat window's DOM.
#[derive(Debug, Clone, Default)]
pub struct MarkupDocument {
    messages: Vec<RenderedMessage>,
    errors: Vec<String>,
    infos: Vec<String>,
    typing: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl MarkupDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an interrupt flag to the document.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[RenderedMessage] {
        &self.messages
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&RenderedMessage> {
        self.messages.last()
    }

    /// Errors reported outside the transcript.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Informational notes reported outside the transcript.
    pub fn infos(&self) -> &[String] {
        &self.infos
    }

    /// Whether the typing indicator is showing.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Serializes the transcript as HTML.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for message in &self.messages {
            let class = match message.role {
                MessageRole::User => "message user-message",
                MessageRole::Assistant => "message ai-message",
            };
            let error = if message.error { " error" } else { "" };
            html.push_str(&format!(
                r#"<div class="{class}{error}"><div class="message-header"><span class="sender">{}</span></div><div class="message-text">"#,
                message.role.sender()
            ));
            for block in &message.blocks {
                match block {
                    Block::Prose { markup } => {
                        html.push_str(r#"<div class="text-content">"#);
                        html.push_str(markup);
                        html.push_str("</div>");
                    }
                    Block::Code { language, code } => {
                        match language {
                            Some(language) => html.push_str(&format!(
                                r#"<pre><code class="language-{}">"#,
                                markup::escape(language)
                            )),
                            None => html.push_str("<pre><code>"),
                        }
                        html.push_str(&markup::escape(code));
                        html.push_str("</code></pre>");
                    }
                }
            }
            html.push_str("</div></div>");
        }
        html
    }

    fn set_block(&mut self, index: usize, block: Block) {
        let Some(message) = self.messages.last_mut() else {
            return;
        };
        if index < message.blocks.len() {
            message.blocks[index] = block;
        } else {
            message.blocks.push(block);
        }
    }
}

impl Renderer for MarkupDocument {
    fn start_message(&mut self, role: MessageRole, error: bool) {
        self.messages.push(RenderedMessage {
            role,
            error,
            finished: false,
            blocks: Vec::new(),
        });
    }

    fn update_prose(&mut self, index: usize, markup: &str, _complete: bool) {
        self.set_block(
            index,
            Block::Prose {
                markup: markup.to_string(),
            },
        );
    }

    fn print_code(&mut self, index: usize, language: Option<&str>, code: &str) {
        self.set_block(
            index,
            Block::Code {
                language: language.map(str::to_string),
                code: code.to_string(),
            },
        );
    }

    fn finish_message(&mut self, _role: MessageRole) {
        if let Some(message) = self.messages.last_mut() {
            message.finished = true;
        }
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, info: &str) {
        self.infos.push(info.to_string());
    }

    fn clear_transcript(&mut self) {
        self.messages.clear();
    }

    fn show_typing(&mut self, visible: bool) {
        self.typing = visible;
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Terminal renderer with optional ANSI styling.
///
/// With color enabled a prose segment is redrawn in place on every update.
/// Without color only completed segments are printed.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    theme: Theme,
    live_lines: Option<usize>,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            theme: Theme::default(),
            live_lines: None,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Picks the palette for code.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Flushes stdout to ensure immediate display of revealed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn styled_theme(&self) -> Option<Theme> {
        self.use_color.then_some(self.theme)
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_message(&mut self, role: MessageRole, error: bool) {
        self.live_lines = None;
        match (self.use_color, error) {
            (true, true) => println!("{ANSI_BOLD}{ANSI_RED}{}:{ANSI_RESET}", role.sender()),
            (true, false) => println!("{ANSI_BOLD}{}:{ANSI_RESET}", role.sender()),
            (false, _) => println!("{}:", role.sender()),
        }
        self.flush();
    }

    fn update_prose(&mut self, _index: usize, markup: &str, complete: bool) {
        let text = markup::to_terminal(markup, self.styled_theme());
        if !self.use_color {
            if complete {
                println!("{}", text.trim_end_matches('\n'));
            }
            return;
        }
        match self.live_lines {
            Some(0) => print!("\r{ANSI_CLEAR_BELOW}"),
            Some(lines) => print!("\x1b[{lines}F{ANSI_CLEAR_BELOW}"),
            None => {}
        }
        print!("{text}{ANSI_RESET}");
        if complete {
            if !text.ends_with('\n') {
                println!();
            }
            self.live_lines = None;
        } else {
            self.live_lines = Some(text.matches('\n').count());
        }
        self.flush();
    }

    fn print_code(&mut self, _index: usize, language: Option<&str>, code: &str) {
        self.live_lines = None;
        let code = code.trim_end_matches('\n');
        if self.use_color {
            let color = markup::code_color(self.theme);
            println!("{ANSI_DIM}```{}{ANSI_RESET}", language.unwrap_or(""));
            println!("{color}{code}{ANSI_RESET}");
            println!("{ANSI_DIM}```{ANSI_RESET}");
        } else {
            println!("```{}", language.unwrap_or(""));
            println!("{code}");
            println!("```");
        }
        self.flush();
    }

    fn finish_message(&mut self, _role: MessageRole) {
        self.live_lines = None;
        println!();
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }

    fn clear_transcript(&mut self) {
        self.live_lines = None;
        if self.use_color {
            print!("\x1b[2J\x1b[H");
        } else {
            println!("----------------------------------------");
        }
        self.flush();
    }

    fn show_typing(&mut self, visible: bool) {
        if !self.use_color {
            return;
        }
        if visible {
            print!("{ANSI_DIM}Phoenix AI is typing...{ANSI_RESET}");
        } else {
            print!("\r\x1b[2K");
        }
        self.flush();
    }

    fn print_interrupted(&mut self) {
        println!("[revealed]");
        self.flush();
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose_markups(updates: &[RenderUpdate]) -> Vec<&str> {
        updates
            .iter()
            .filter_map(|update| match update {
                RenderUpdate::Prose { markup, .. } => Some(markup.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn immediate_reveal_emits_one_update_per_segment() {
        let updates: Vec<_> = Reveal::new(
            MessageRole::User,
            "**hi** ```sh\nls\n``` bye",
            RevealMode::Immediate,
        )
        .collect();
        assert_eq!(
            updates,
            vec![
                RenderUpdate::Start {
                    role: MessageRole::User,
                    error: false
                },
                RenderUpdate::Prose {
                    index: 0,
                    markup: "<strong>hi</strong> ".to_string(),
                    complete: true
                },
                RenderUpdate::Code {
                    index: 1,
                    language: Some("sh".to_string()),
                    code: "ls\n".to_string()
                },
                RenderUpdate::Prose {
                    index: 2,
                    markup: " bye".to_string(),
                    complete: true
                },
                RenderUpdate::Finish {
                    role: MessageRole::User
                },
            ]
        );
    }

    #[test]
    fn progressive_reveal_grows_prefix_one_char_at_a_time() {
        let updates: Vec<_> =
            Reveal::new(MessageRole::Assistant, "*a*", RevealMode::Progressive).collect();
        assert_eq!(prose_markups(&updates), vec!["*", "*a", "<em>a</em>"]);
        assert!(matches!(
            updates[3],
            RenderUpdate::Prose { complete: true, .. }
        ));
    }

    #[test]
    fn progressive_reveal_handles_multibyte_chars() {
        let updates: Vec<_> =
            Reveal::new(MessageRole::Assistant, "héé", RevealMode::Progressive).collect();
        assert_eq!(prose_markups(&updates), vec!["h", "hé", "héé"]);
    }

    #[test]
    fn code_segments_are_atomic_in_progressive_mode() {
        let reveal = Reveal::new(
            MessageRole::Assistant,
            "ab```py\nprint(1)\n```",
            RevealMode::Progressive,
        );
        let updates: Vec<_> = reveal.collect();
        let code_updates = updates
            .iter()
            .filter(|update| matches!(update, RenderUpdate::Code { .. }))
            .count();
        assert_eq!(code_updates, 1);
        assert_eq!(prose_markups(&updates), vec!["a", "ab"]);
        assert!(matches!(updates.last(), Some(RenderUpdate::Finish { .. })));
    }

    #[test]
    fn empty_body_is_start_and_finish() {
        let updates: Vec<_> =
            Reveal::new(MessageRole::Assistant, "   ", RevealMode::Progressive).collect();
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn finish_now_completes_partial_segment() {
        let mut reveal = Reveal::new(MessageRole::Assistant, "hello", RevealMode::Progressive);
        reveal.next_update();
        reveal.next_update();
        assert!(reveal.next_is_paced());
        let rest = reveal.finish_now();
        assert_eq!(prose_markups(&rest), vec!["hello"]);
        assert!(reveal.is_done());
    }

    #[test]
    fn error_reveal_is_flagged() {
        let mut reveal = Reveal::error("oops");
        assert_eq!(
            reveal.next_update(),
            Some(RenderUpdate::Start {
                role: MessageRole::Assistant,
                error: true
            })
        );
        assert!(!reveal.next_is_paced());
    }

    #[test]
    fn document_replaces_prose_snapshots() {
        let mut document = MarkupDocument::new();
        for update in Reveal::new(MessageRole::Assistant, "**b**", RevealMode::Progressive) {
            document.apply(&update);
        }
        let message = document.last().unwrap();
        assert!(message.finished);
        assert_eq!(
            message.blocks,
            vec![Block::Prose {
                markup: "<strong>b</strong>".to_string()
            }]
        );
    }

    #[test]
    fn document_html_escapes_code() {
        let mut document = MarkupDocument::new();
        for update in Reveal::new(
            MessageRole::Assistant,
            "```html\n<b>x</b>\n```",
            RevealMode::Immediate,
        ) {
            document.apply(&update);
        }
        let html = document.to_html();
        assert!(html.contains(r#"<code class="language-html">&lt;b&gt;x&lt;/b&gt;"#));
        assert!(html.contains("ai-message"));
    }

    #[tokio::test(start_paused = true)]
    async fn render_message_waits_per_character() {
        let mut document = MarkupDocument::new();
        let start = tokio::time::Instant::now();
        let reveal = Reveal::new(MessageRole::Assistant, "abcd", RevealMode::Progressive);
        let outcome = render_message(&mut document, reveal, Duration::from_millis(10)).await;
        assert_eq!(outcome, RenderOutcome::Completed);
        assert_eq!(start.elapsed(), Duration::from_millis(40));
        assert_eq!(
            document.last().unwrap().blocks,
            vec![Block::Prose {
                markup: "abcd".to_string()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn render_message_immediate_does_not_wait() {
        let mut document = MarkupDocument::new();
        let start = tokio::time::Instant::now();
        let reveal = Reveal::new(MessageRole::User, "abcd", RevealMode::Immediate);
        render_message(&mut document, reveal, Duration::from_millis(10)).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_reveals_the_rest_at_once() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut document = MarkupDocument::new().with_interrupt(flag);
        let reveal = Reveal::new(
            MessageRole::Assistant,
            "long text ```js\nx\n``` tail",
            RevealMode::Progressive,
        );
        let outcome = render_message(&mut document, reveal, Duration::from_millis(10)).await;
        assert_eq!(outcome, RenderOutcome::Interrupted);
        let message = document.last().unwrap();
        assert!(message.finished);
        assert_eq!(message.blocks.len(), 3);
        assert_eq!(
            message.blocks[2],
            Block::Prose {
                markup: " tail".to_string()
            }
        );
    }
}
