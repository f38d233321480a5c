// @module: SAMI decoder (HTML-like tag soup, case-insensitive tags)

use log::{debug, warn};

use crate::errors::DecodeError;
use crate::subtitle::decoders::markup::{collapse_whitespace, decode_entities, Token, Tokenizer};
use crate::subtitle::decoders::{decode_text, Decoder};
use crate::subtitle::model::{Cue, CueLine, CueSequence, SpanStyle};
use crate::subtitle::sniffer::SubtitleFormat;

// @const: Display time of the last block when no terminating SYNC follows
const LAST_CUE_DURATION_MS: u64 = 4000;

/// Decoder for Microsoft SAMI files
#[derive(Debug, Default, Clone, Copy)]
pub struct SamiDecoder;

impl Decoder for SamiDecoder {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Sami
    }

    fn decode(&self, data: &[u8]) -> Result<CueSequence, DecodeError> {
        let text = decode_text(data);
        let blocks = read_sync_blocks(&text)?;
        Ok(CueSequence::from(blocks_to_cues(blocks)?))
    }
}

// @struct: Content between one SYNC tag and the next
#[derive(Debug, Default)]
struct SyncBlock {
    // @field: Start attribute in ms
    start_ms: u64,

    // @field: Lines of the first paragraph class seen in the file
    lines: Vec<CueLine>,
}

// Tag-soup state while inside a SYNC block
#[derive(Default)]
struct TextState {
    italic: usize,
    bold: usize,
    underline: usize,
    // Paragraph belongs to another language class
    skipping: bool,
}

impl TextState {
    fn style(&self) -> SpanStyle {
        SpanStyle {
            italic: self.italic > 0,
            bold: self.bold > 0,
            underline: self.underline > 0,
        }
    }
}

fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn read_sync_blocks(text: &str) -> Result<Vec<SyncBlock>, DecodeError> {
    let mut blocks: Vec<SyncBlock> = Vec::new();
    let mut state = TextState::default();
    let mut primary_class: Option<String> = None;
    let mut in_body = false;

    for token in Tokenizer::new(text) {
        match token? {
            Token::Open { name, attributes, self_closing } => {
                let name = name.to_ascii_uppercase();
                match name.as_str() {
                    "BODY" => in_body = true,
                    "SYNC" => {
                        let start = attribute(&attributes, "Start")
                            .ok_or_else(|| DecodeError::InvalidAttribute {
                                name: "Start".to_string(),
                                value: String::new(),
                            })?;
                        let start_ms = start
                            .trim()
                            .trim_end_matches("ms")
                            .parse::<u64>()
                            .map_err(|_| DecodeError::invalid_timestamp(start))?;
                        blocks.push(SyncBlock { start_ms, lines: vec![CueLine::default()] });
                        state = TextState::default();
                        in_body = true;
                    }
                    "P" => {
                        let class = attribute(&attributes, "Class").map(str::to_ascii_lowercase);
                        state.skipping = match (&primary_class, class) {
                            (None, Some(class)) => {
                                debug!("SAMI primary class: {}", class);
                                primary_class = Some(class);
                                false
                            }
                            (Some(primary), Some(class)) => *primary != class,
                            (_, None) => false,
                        };
                        if let Some(block) = blocks.last_mut() {
                            if !state.skipping && block.lines.last().is_some_and(|l| !l.spans.is_empty()) {
                                block.lines.push(CueLine::default());
                            }
                        }
                    }
                    "BR" => {
                        if let Some(block) = blocks.last_mut() {
                            if !state.skipping {
                                block.lines.push(CueLine::default());
                            }
                        }
                    }
                    "I" if !self_closing => state.italic += 1,
                    "B" if !self_closing => state.bold += 1,
                    "U" if !self_closing => state.underline += 1,
                    _ => {}
                }
            }
            Token::Close { name } => match name.to_ascii_uppercase().as_str() {
                "I" => state.italic = state.italic.saturating_sub(1),
                "B" => state.bold = state.bold.saturating_sub(1),
                "U" => state.underline = state.underline.saturating_sub(1),
                "BODY" => in_body = false,
                _ => {}
            },
            Token::Text(raw) => {
                if !in_body || state.skipping {
                    continue;
                }
                let Some(block) = blocks.last_mut() else { continue };
                let decoded = decode_entities(raw);
                let collapsed = collapse_whitespace(&decoded);
                if let Some(line) = block.lines.last_mut() {
                    line.push_text(&collapsed, state.style());
                }
            }
            // CDATA holds style sheets in SAMI headers
            Token::CData(_) => {}
        }
    }

    if blocks.is_empty() {
        return Err(DecodeError::MissingPayload("SYNC"));
    }

    for block in blocks.iter_mut() {
        for line in block.lines.iter_mut() {
            // Non-breaking spaces mark empty terminator blocks
            for span in line.spans.iter_mut() {
                span.text = span.text.replace('\u{a0}', " ");
            }
            line.tidy();
        }
        block.lines.retain(|line| !line.is_blank());
    }

    Ok(blocks)
}

// Each block lasts until the next SYNC; empty blocks only terminate the previous one
fn blocks_to_cues(blocks: Vec<SyncBlock>) -> Result<Vec<Cue>, DecodeError> {
    let mut cues = Vec::new();
    let mut iter = blocks.into_iter().peekable();

    while let Some(block) = iter.next() {
        if block.lines.is_empty() {
            continue;
        }
        let end = match iter.peek() {
            Some(next) => next.start_ms,
            None => {
                warn!("Last SAMI block has no terminator, assuming {}ms", LAST_CUE_DURATION_MS);
                block
                    .start_ms
                    .checked_add(LAST_CUE_DURATION_MS)
                    .ok_or_else(|| DecodeError::invalid_timestamp(block.start_ms.to_string()))?
            }
        };
        cues.push(Cue::new(block.start_ms, end, block.lines));
    }

    Ok(cues)
}
