//! Splitting message bodies into prose and fenced code.
//!
//! A message body is cut at triple-backtick fences. Each closed fence pair
//! becomes a [`Segment`] of kind [`SegmentKind::Code`] whose first line is the
//! language tag; everything else is prose. A fence without a partner is left
//! in the prose untouched.

/// The fence delimiter.
pub const FENCE: &str = "```";

/// Whether a segment is formatted prose or verbatim code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Text that goes through the markup formatter.
    Prose,
    /// Fenced code, shown verbatim.
    Code,
}

/// A contiguous span of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Prose or code.
    pub kind: SegmentKind,
    /// Language tag of a code segment, if one was given.
    pub language: Option<String>,
    /// The segment body, fence syntax removed.
    pub text: String,
}

impl Segment {
    /// Creates a prose segment.
    pub fn prose(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Prose,
            language: None,
            text: text.into(),
        }
    }

    /// Creates a code segment.
    pub fn code(language: Option<String>, text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Code,
            language,
            text: text.into(),
        }
    }

    /// Returns true for code segments.
    pub fn is_code(&self) -> bool {
        self.kind == SegmentKind::Code
    }
}

/// Splits `raw` into ordered prose and code segments.
///
/// Whitespace-only prose between fences is dropped. The function is total:
/// any input, including one with an odd number of fences, yields a result.
pub fn segment(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find(FENCE) {
        let body = &rest[open + FENCE.len()..];
        let Some(close) = body.find(FENCE) else {
            break;
        };
        push_prose(&mut segments, &rest[..open]);
        segments.push(code_segment(&body[..close]));
        rest = &body[close + FENCE.len()..];
    }
    push_prose(&mut segments, rest);
    segments
}

fn push_prose(segments: &mut Vec<Segment>, text: &str) {
    if !text.trim().is_empty() {
        segments.push(Segment::prose(text));
    }
}

fn code_segment(inner: &str) -> Segment {
    let (first_line, body) = inner.split_once('\n').unwrap_or((inner, ""));
    let language = first_line.trim();
    let language = (!language.is_empty()).then(|| language.to_string());
    Segment::code(language, body)
}
