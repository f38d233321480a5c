use std::fmt;

use log::{debug, warn};

use crate::subtitle::timing;

// @module: Common cue representation shared by every decoder

// @struct: Inline text style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    // @field: Italic text
    pub italic: bool,

    // @field: Bold text
    pub bold: bool,

    // @field: Underlined text
    pub underline: bool,
}

impl SpanStyle {
    /// Italic-only style
    pub fn italic() -> Self {
        Self { italic: true, ..Self::default() }
    }

    /// Whether no style flag is set
    pub fn is_plain(&self) -> bool {
        !self.italic && !self.bold && !self.underline
    }
}

// @struct: Run of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self { text: text.into(), style }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, SpanStyle::default())
    }
}

/// One displayed line of a cue, made of styled spans
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CueLine {
    pub spans: Vec<Span>,
}

impl CueLine {
    /// Create a line with a single unstyled span
    pub fn plain(text: impl Into<String>) -> Self {
        Self { spans: vec![Span::plain(text)] }
    }

    /// Append text, extending the last span when the style matches
    pub fn push_text(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(Span::new(text, style)),
        }
    }

    /// Text of the line without style markers
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Whether the line has no visible characters
    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }

    /// Trim outer whitespace, drop empty spans and merge neighbours with equal style
    pub fn tidy(&mut self) {
        if let Some(first) = self.spans.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(last) = self.spans.last_mut() {
            last.text = last.text.trim_end().to_string();
        }

        let mut merged: Vec<Span> = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            if span.text.is_empty() {
                continue;
            }
            match merged.last_mut() {
                Some(prev) if prev.style == span.style => prev.text.push_str(&span.text),
                _ => merged.push(span),
            }
        }
        self.spans = merged;
    }
}

/// Vertical placement of a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Bottom,
    Top,
}

// @struct: One timed subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Displayed lines
    pub lines: Vec<CueLine>,

    // @field: Vertical placement
    pub alignment: Alignment,

    // @field: Language tag from the source document, if any
    pub language: Option<String>,
}

impl Cue {
    pub fn new(start_time_ms: u64, end_time_ms: u64, lines: Vec<CueLine>) -> Self {
        Self {
            start_time_ms,
            end_time_ms,
            lines,
            alignment: Alignment::Bottom,
            language: None,
        }
    }

    /// Build a cue from plain text, one line per `\n`
    pub fn from_text(start_time_ms: u64, end_time_ms: u64, text: &str) -> Self {
        let lines = text.lines().map(CueLine::plain).collect();
        Self::new(start_time_ms, end_time_ms, lines)
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }

    /// Plain text of all lines joined by `\n`
    pub fn text(&self) -> String {
        self.lines.iter().map(CueLine::text).collect::<Vec<_>>().join("\n")
    }

    /// Whether any line carries visible text
    pub fn has_text(&self) -> bool {
        self.lines.iter().any(|l| !l.is_blank())
    }

    /// Whether `next` repeats this cue's content and starts exactly where it ends
    pub fn is_continued_by(&self, next: &Cue) -> bool {
        self.end_time_ms == next.start_time_ms
            && self.alignment == next.alignment
            && self.lines == next.lines
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} --> {} {:?}",
            timing::format_srt(self.start_time_ms),
            timing::format_srt(self.end_time_ms),
            self.text()
        )
    }
}

/// Ordered cues produced by a decoder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CueSequence {
    /// Cues, ordered by start time once normalized
    pub cues: Vec<Cue>,
}

impl CueSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cue> {
        self.cues.iter()
    }

    /// Stable sort by start time and drop cues that cannot be displayed.
    ///
    /// Ties keep their decode order. Returns the number of dropped cues.
    pub fn normalize(&mut self) -> usize {
        self.cues.sort_by_key(|cue| cue.start_time_ms);

        let before = self.cues.len();
        self.cues.retain(|cue| {
            if cue.end_time_ms <= cue.start_time_ms {
                warn!("Dropping cue with empty time range: {}", cue);
                return false;
            }
            if !cue.has_text() {
                debug!("Dropping cue without text at {}", timing::format_srt(cue.start_time_ms));
                return false;
            }
            true
        });
        before - self.cues.len()
    }

    /// Fill in the language of cues that have none
    pub fn set_default_language(&mut self, language: &str) {
        for cue in self.cues.iter_mut().filter(|c| c.language.is_none()) {
            cue.language = Some(language.to_string());
        }
    }
}

impl From<Vec<Cue>> for CueSequence {
    fn from(cues: Vec<Cue>) -> Self {
        Self { cues }
    }
}

impl IntoIterator for CueSequence {
    type Item = Cue;
    type IntoIter = std::vec::IntoIter<Cue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.into_iter()
    }
}

/// Re-join cues that a container split across consecutive samples or documents.
///
/// A cue is merged into an earlier one when its content is identical and it starts
/// exactly where the earlier one ends. Only the last `lookback` output cues are
/// considered, which covers cues shown simultaneously in one sample.
pub fn merge_continuations(cues: Vec<Cue>, lookback: usize) -> Vec<Cue> {
    let mut merged: Vec<Cue> = Vec::with_capacity(cues.len());

    for cue in cues {
        let window_start = merged.len().saturating_sub(lookback);
        let target = merged[window_start..]
            .iter()
            .rposition(|prev| prev.is_continued_by(&cue))
            .map(|pos| window_start + pos);

        match target {
            Some(index) => merged[index].end_time_ms = cue.end_time_ms,
            None => merged.push(cue),
        }
    }

    merged
}
