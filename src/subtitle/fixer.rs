/*!
 * Common issues fixer.
 *
 * Repairs a decoded cue sequence without ever failing:
 * - text cleanup per cue (control characters, whitespace, quotes, dialogue dashes)
 * - script specific punctuation rules selected by the cue or fixer language
 * - cues sharing a start time are merged into one
 * - overlaps are clamped to the next start and short gaps are closed
 *
 * Running the fixer on its own output reports no issues.
 */

use std::borrow::Cow;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::language_utils;
use crate::subtitle::model::{Cue, CueLine, CueSequence};

// @const: Default threshold below which gaps between cues are closed
pub const DEFAULT_SHORT_GAP_THRESHOLD_MS: u64 = 85;

// @const: Runs of ASCII whitespace (no-break spaces are kept)
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\n\x0B\x0C]{2,}|[\t\r\n\x0B\x0C]").unwrap());

// @const: Leading dialogue dash with missing or extra spacing
static DIALOGUE_DASH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-[ ]*([^\s-])").unwrap());

// @const: Leading em or en dash used as dialogue marker
static LONG_DASH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\u{2014}\u{2013}][ ]*").unwrap());

// @const: Opening guillemet followed by optional spacing
static GUILLEMET_OPEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"«[ \u{a0}]*").unwrap());

// @const: Closing guillemet preceded by optional spacing
static GUILLEMET_CLOSE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \u{a0}]*»").unwrap());

// @const: ASCII punctuation right after CJK characters
static CJK_PUNCTUATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([\p{Han}\p{Hiragana}\p{Katakana}])([,!?])").unwrap()
});

/// Script specific cleanup rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LanguageRules {
    /// No-break spaces before high punctuation and inside guillemets
    French,
    /// Em/en dash dialogue markers
    DashDialogue,
    /// Full-width punctuation after ideographs
    Cjk,
    /// Stray directional marks removed
    RightToLeft,
}

impl LanguageRules {
    fn for_tag(tag: &str) -> Option<Self> {
        let primary = language_utils::normalize_to_part1_or_part2t(tag)
            .unwrap_or_else(|_| language_utils::primary_subtag(tag));
        match primary.as_str() {
            "fr" => Some(Self::French),
            "pt" | "es" | "it" => Some(Self::DashDialogue),
            "zh" | "ja" => Some(Self::Cjk),
            "ar" | "he" | "fa" | "ur" => Some(Self::RightToLeft),
            _ => None,
        }
    }
}

/// What the fixer changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixReport {
    /// Cues merged because they shared a start time with the previous cue
    pub merged_collisions: usize,
    /// End times clamped to the next cue's start
    pub clamped_overlaps: usize,
    /// Short gaps closed by extending the previous cue
    pub closed_gaps: usize,
    /// Cues whose text was rewritten
    pub text_fixes: usize,
    /// Cues removed because nothing displayable was left
    pub dropped_cues: usize,
}

impl FixReport {
    /// Total number of repairs
    pub fn total(&self) -> usize {
        self.merged_collisions + self.clamped_overlaps + self.closed_gaps + self.text_fixes + self.dropped_cues
    }

    /// Whether any repair was applied
    pub fn issues_found(&self) -> bool {
        self.total() > 0
    }
}

/// Repaired sequence and the report of what changed
#[derive(Debug, Clone, PartialEq)]
pub struct FixOutcome {
    pub sequence: CueSequence,
    pub report: FixReport,
}

impl FixOutcome {
    pub fn issues_found(&self) -> bool {
        self.report.issues_found()
    }
}

// @struct: Heuristic repair pass over a cue sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonIssuesFixer {
    // @field: Close gaps shorter than the threshold
    pub remove_gaps: bool,

    // @field: Gap threshold in ms
    pub short_gap_threshold_ms: u64,

    // @field: Language used when a cue carries none
    pub language: Option<String>,
}

impl Default for CommonIssuesFixer {
    fn default() -> Self {
        Self {
            remove_gaps: true,
            short_gap_threshold_ms: DEFAULT_SHORT_GAP_THRESHOLD_MS,
            language: None,
        }
    }
}

impl CommonIssuesFixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remove_gaps(mut self, remove_gaps: bool) -> Self {
        self.remove_gaps = remove_gaps;
        self
    }

    pub fn with_short_gap_threshold(mut self, threshold_ms: u64) -> Self {
        self.short_gap_threshold_ms = threshold_ms;
        self
    }

    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.language = language.map(str::to_string);
        self
    }

    /// Repair the sequence in place and report what changed
    pub fn fix(&self, mut sequence: CueSequence) -> FixOutcome {
        let mut report = FixReport::default();

        for cue in sequence.cues.iter_mut() {
            let language = cue.language.as_deref().or(self.language.as_deref());
            let rules = language.and_then(LanguageRules::for_tag);
            if fix_cue_text(cue, rules) {
                report.text_fixes += 1;
            }
        }

        let before = sequence.cues.len();
        sequence.cues.retain(|cue| cue.has_text() && cue.end_time_ms > cue.start_time_ms);
        report.dropped_cues = before - sequence.cues.len();

        // Stable, so ties keep their decode order
        sequence.cues.sort_by_key(|cue| cue.start_time_ms);
        let cues = std::mem::take(&mut sequence.cues);
        sequence.cues = merge_collisions(cues, &mut report);

        for i in 1..sequence.cues.len() {
            let next_start = sequence.cues[i].start_time_ms;
            let current = &mut sequence.cues[i - 1];

            if current.end_time_ms > next_start {
                debug!("Clamping overlapping cue {} to {}ms", current, next_start);
                current.end_time_ms = next_start;
                report.clamped_overlaps += 1;
            } else if self.remove_gaps {
                let gap = next_start - current.end_time_ms;
                if gap > 0 && gap < self.short_gap_threshold_ms {
                    current.end_time_ms = next_start;
                    report.closed_gaps += 1;
                }
            }
        }

        debug!("Fixer report: {:?}", report);
        FixOutcome { sequence, report }
    }
}

// Cues with the same start become one cue showing both texts
fn merge_collisions(cues: Vec<Cue>, report: &mut FixReport) -> Vec<Cue> {
    let mut merged: Vec<Cue> = Vec::with_capacity(cues.len());
    for cue in cues {
        match merged.last_mut() {
            Some(prev) if prev.start_time_ms == cue.start_time_ms => {
                prev.end_time_ms = prev.end_time_ms.max(cue.end_time_ms);
                for line in cue.lines {
                    if !prev.lines.contains(&line) {
                        prev.lines.push(line);
                    }
                }
                report.merged_collisions += 1;
            }
            _ => merged.push(cue),
        }
    }
    merged
}

// Returns whether the cue's lines changed
fn fix_cue_text(cue: &mut Cue, rules: Option<LanguageRules>) -> bool {
    let mut lines: Vec<CueLine> = Vec::with_capacity(cue.lines.len());

    for line in &cue.lines {
        let mut fixed = line.clone();
        for span in fixed.spans.iter_mut() {
            span.text = fix_span_text(&span.text, rules);
        }
        // Whitespace across span boundaries
        for i in 1..fixed.spans.len() {
            if fixed.spans[i - 1].text.ends_with(' ') && fixed.spans[i].text.starts_with(' ') {
                fixed.spans[i].text = fixed.spans[i].text.trim_start_matches(' ').to_string();
            }
        }
        fixed.tidy();
        if let Some(first) = fixed.spans.first_mut() {
            first.text = fix_line_start(&first.text, rules).into_owned();
        }
        if !fixed.is_blank() {
            lines.push(fixed);
        }
    }

    if lines == cue.lines {
        return false;
    }
    cue.lines = lines;
    true
}

fn is_stripped_character(c: char, rules: Option<LanguageRules>) -> bool {
    match c {
        '\u{200e}' | '\u{200f}' => rules == Some(LanguageRules::RightToLeft),
        '\t' | '\n' | '\r' => false,
        '\u{202a}'..='\u{202e}' | '\u{2066}'..='\u{2069}' | '\u{200b}' | '\u{feff}' => true,
        c => c.is_control(),
    }
}

fn fix_span_text(text: &str, rules: Option<LanguageRules>) -> String {
    let mut fixed: String = text.chars().filter(|c| !is_stripped_character(*c, rules)).collect();

    if fixed.contains(|c: char| c.is_ascii_whitespace() && c != ' ') || fixed.contains("  ") {
        fixed = WHITESPACE_REGEX.replace_all(&fixed, " ").into_owned();
    }
    if fixed.contains("''") {
        fixed = fixed.replace("''", "\"");
    }

    match rules {
        Some(LanguageRules::French) => {
            fixed = GUILLEMET_OPEN_REGEX.replace_all(&fixed, "«\u{a0}").into_owned();
            fixed = GUILLEMET_CLOSE_REGEX.replace_all(&fixed, "\u{a0}»").into_owned();
            fixed = french_high_punctuation(&fixed);
        }
        Some(LanguageRules::Cjk) => {
            fixed = CJK_PUNCTUATION_REGEX
                .replace_all(&fixed, |caps: &regex::Captures| {
                    let full_width = match &caps[2] {
                        "," => '，',
                        "!" => '！',
                        _ => '？',
                    };
                    format!("{}{}", &caps[1], full_width)
                })
                .into_owned();
        }
        _ => {}
    }

    fixed
}

fn fix_line_start(text: &str, rules: Option<LanguageRules>) -> Cow<'_, str> {
    let text: Cow<str> = if rules == Some(LanguageRules::DashDialogue) && LONG_DASH_REGEX.is_match(text) {
        Cow::Owned(LONG_DASH_REGEX.replace(text, "- ").into_owned())
    } else {
        Cow::Borrowed(text)
    };
    if DIALOGUE_DASH_REGEX.is_match(&text) {
        return Cow::Owned(DIALOGUE_DASH_REGEX.replace(&text, "- $1").into_owned());
    }
    text
}

// No-break space before `?`, `!`, `:` and `;`, except inside clock times and punctuation runs
fn french_high_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !matches!(c, '?' | '!' | ':' | ';') {
            out.push(c);
            continue;
        }
        let had_space = out.ends_with([' ', '\u{a0}']);
        let trimmed_len = out.trim_end_matches([' ', '\u{a0}']).len();
        out.truncate(trimmed_len);

        let prev = out.chars().last();
        let next = chars.get(i + 1).copied();
        let is_clock = c == ':' && prev.is_some_and(|p| p.is_ascii_digit()) && next.is_some_and(|n| n.is_ascii_digit());
        let after_punctuation = prev.is_some_and(|p| matches!(p, '?' | '!' | ':' | ';' | '.'));

        match prev {
            None => {}
            Some(_) if is_clock => {
                if had_space {
                    out.push(' ');
                }
            }
            Some(_) if after_punctuation => {}
            Some(_) => out.push('\u{a0}'),
        }
        out.push(c);
    }

    out
}
