/*!
 * SubRip (SRT) serializer.
 *
 * Renders a cue sequence as numbered blocks:
 *
 * ```text
 * 1
 * 00:00:01,000 --> 00:00:02,500
 * Hello
 *
 * ```
 *
 * Styles are written as `<i>`, `<b>` and `<u>` tags and top-aligned cues get the
 * `{\an8}` override. The text is then encoded to the requested character set;
 * characters the encoding cannot represent are reported, never replaced.
 */

use std::fs;
use std::path::Path;

use encoding_rs::{EncoderResult, Encoding};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{EncodingError, SubtitleError};
use crate::subtitle::model::{Alignment, Cue, CueLine, CueSequence, Span};
use crate::subtitle::timing;

/// Line terminator of the written file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

// Resolved output character set
#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputEncoding {
    Utf8 { bom: bool },
    Utf16 { big_endian: bool },
    Ascii,
    Latin1,
    Legacy(&'static Encoding),
}

impl OutputEncoding {
    fn from_label(label: &str) -> Result<Self, EncodingError> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        let resolved = match normalized.as_str() {
            "utf-8" | "utf8" => Self::Utf8 { bom: false },
            "utf-8-sig" | "utf8-sig" | "utf-8-bom" => Self::Utf8 { bom: true },
            "utf-16" | "utf16" | "utf-16le" | "utf16le" => Self::Utf16 { big_endian: false },
            "utf-16be" | "utf16be" => Self::Utf16 { big_endian: true },
            "ascii" | "us-ascii" => Self::Ascii,
            "latin1" | "latin-1" | "l1" | "iso-8859-1" | "iso8859-1" | "iso-ir-100" => Self::Latin1,
            _ => match Encoding::for_label(normalized.as_bytes()) {
                Some(encoding) if encoding == encoding_rs::UTF_8 => Self::Utf8 { bom: false },
                Some(encoding) if encoding == encoding_rs::UTF_16LE => Self::Utf16 { big_endian: false },
                Some(encoding) if encoding == encoding_rs::UTF_16BE => Self::Utf16 { big_endian: true },
                // The replacement encoding can never be written
                Some(encoding) if encoding == encoding_rs::REPLACEMENT => {
                    return Err(EncodingError::UnknownEncoding(label.to_string()));
                }
                Some(encoding) => Self::Legacy(encoding),
                None => return Err(EncodingError::UnknownEncoding(label.to_string())),
            },
        };
        Ok(resolved)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Utf8 { bom: false } => "UTF-8",
            Self::Utf8 { bom: true } => "UTF-8 (BOM)",
            Self::Utf16 { big_endian: false } => "UTF-16LE",
            Self::Utf16 { big_endian: true } => "UTF-16BE",
            Self::Ascii => "US-ASCII",
            Self::Latin1 => "ISO-8859-1",
            Self::Legacy(encoding) => encoding.name(),
        }
    }

    fn byte_order_mark(&self) -> &'static [u8] {
        match self {
            Self::Utf8 { bom: true } => b"\xEF\xBB\xBF",
            Self::Utf16 { big_endian: false } => b"\xFF\xFE",
            Self::Utf16 { big_endian: true } => b"\xFE\xFF",
            _ => b"",
        }
    }

    fn encode_into(&self, text: &str, cue_index: usize, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        match self {
            Self::Utf8 { .. } => out.extend_from_slice(text.as_bytes()),
            Self::Utf16 { big_endian } => {
                for unit in text.encode_utf16() {
                    let bytes = if *big_endian { unit.to_be_bytes() } else { unit.to_le_bytes() };
                    out.extend_from_slice(&bytes);
                }
            }
            Self::Ascii => {
                if let Some(character) = text.chars().find(|c| !c.is_ascii()) {
                    return Err(EncodingError::Unrepresentable {
                        character,
                        cue_index,
                        encoding: self.name().to_string(),
                    });
                }
                out.extend_from_slice(text.as_bytes());
            }
            Self::Latin1 => {
                if let Some(character) = text.chars().find(|c| *c > '\u{ff}') {
                    return Err(EncodingError::Unrepresentable {
                        character,
                        cue_index,
                        encoding: self.name().to_string(),
                    });
                }
                out.extend(text.chars().map(|c| c as u8));
            }
            Self::Legacy(encoding) => encode_legacy(*encoding, text, cue_index, out)?,
        }
        Ok(())
    }
}

fn encode_legacy(
    encoding: &'static Encoding,
    text: &str,
    cue_index: usize,
    out: &mut Vec<u8>,
) -> Result<(), EncodingError> {
    let mut encoder = encoding.new_encoder();
    let needed = encoder
        .max_buffer_length_from_utf8_without_replacement(text.len())
        .unwrap_or(text.len() * 4);
    out.reserve(needed);

    let mut src = text;
    loop {
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(src, out, true);
        src = &src[read..];
        match result {
            EncoderResult::InputEmpty => return Ok(()),
            EncoderResult::OutputFull => out.reserve(src.len() * 4 + 16),
            EncoderResult::Unmappable(character) => {
                return Err(EncodingError::Unrepresentable {
                    character,
                    cue_index,
                    encoding: encoding.name().to_string(),
                });
            }
        }
    }
}

// @struct: SRT serializer for one output encoding
#[derive(Debug, Clone)]
pub struct SrtWriter {
    // @field: Output character set
    encoding: OutputEncoding,

    // @field: Line terminator
    line_ending: LineEnding,
}

impl SrtWriter {
    /// Create a writer for an encoding label (`utf-8`, `utf-8-sig`, `utf-16`, `windows-1252`, ...)
    pub fn new(encoding: &str) -> Result<Self, EncodingError> {
        Ok(Self {
            encoding: OutputEncoding::from_label(encoding)?,
            line_ending: LineEnding::default(),
        })
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Name of the resolved output encoding
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Render the sequence as SRT text
    pub fn render(&self, sequence: &CueSequence) -> String {
        sequence
            .iter()
            .enumerate()
            .map(|(i, cue)| self.render_block(i + 1, cue))
            .collect::<Vec<_>>()
            .join(self.line_ending.as_str())
    }

    fn render_block(&self, index: usize, cue: &Cue) -> String {
        let eol = self.line_ending.as_str();
        let mut block = format!(
            "{}{}{} --> {}{}",
            index,
            eol,
            timing::format_srt(cue.start_time_ms),
            timing::format_srt(cue.end_time_ms),
            eol
        );
        for (line_index, line) in cue.lines.iter().enumerate() {
            if line_index == 0 && cue.alignment == Alignment::Top {
                block.push_str("{\\an8}");
            }
            block.push_str(&render_line(line));
            block.push_str(eol);
        }
        block
    }

    /// Render and encode the sequence, byte order mark included
    pub fn serialize(&self, sequence: &CueSequence) -> Result<Vec<u8>, EncodingError> {
        let mut out = self.encoding.byte_order_mark().to_vec();
        let eol = self.line_ending.as_str();

        for (i, cue) in sequence.iter().enumerate() {
            if i > 0 {
                self.encoding.encode_into(eol, i + 1, &mut out)?;
            }
            let block = self.render_block(i + 1, cue);
            self.encoding.encode_into(&block, i + 1, &mut out)?;
        }

        debug!("Serialized {} cues as {} ({} bytes)", sequence.len(), self.encoding.name(), out.len());
        Ok(out)
    }

    /// Serialize and write to `path`; nothing is written when encoding fails
    pub fn write_to_path(&self, sequence: &CueSequence, path: &Path) -> Result<(), SubtitleError> {
        let bytes = self.serialize(sequence)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}

fn render_line(line: &CueLine) -> String {
    line.spans.iter().map(render_span).collect()
}

fn render_span(span: &Span) -> String {
    let style = span.style;
    let mut out = String::with_capacity(span.text.len() + 14);
    if style.bold {
        out.push_str("<b>");
    }
    if style.italic {
        out.push_str("<i>");
    }
    if style.underline {
        out.push_str("<u>");
    }
    out.push_str(&span.text);
    if style.underline {
        out.push_str("</u>");
    }
    if style.italic {
        out.push_str("</i>");
    }
    if style.bold {
        out.push_str("</b>");
    }
    out
}
