/*!
 * WebVTT decoder.
 *
 * Handles the text format (`WEBVTT` header, blocks separated by blank lines) and
 * exposes the cue-text and cue-settings parsers reused by the WVTT decoder.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::DecodeError;
use crate::subtitle::decoders::markup::decode_entities;
use crate::subtitle::decoders::{decode_text, Decoder};
use crate::subtitle::model::{Alignment, Cue, CueLine, CueSequence, SpanStyle};
use crate::subtitle::sniffer::SubtitleFormat;
use crate::subtitle::timing;

// @const: WebVTT timestamp, hours optional
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+):)?(\d{2}):(\d{2})[.,](\d{1,3})$").unwrap()
});

/// Decoder for plain text WebVTT
#[derive(Debug, Default, Clone, Copy)]
pub struct WebVttDecoder;

impl Decoder for WebVttDecoder {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::WebVtt
    }

    fn decode(&self, data: &[u8]) -> Result<CueSequence, DecodeError> {
        let text = decode_text(data);
        parse_document(&text)
    }
}

/// Parse a WebVTT timestamp (`HH:MM:SS.mmm` or `MM:SS.mmm`) to milliseconds
pub fn parse_timestamp(value: &str) -> Result<u64, DecodeError> {
    let caps = TIMESTAMP_REGEX
        .captures(value.trim())
        .ok_or_else(|| DecodeError::invalid_timestamp(value))?;

    let hours: u64 = caps.get(1).map_or(Ok(0), |m| m.as_str().parse())
        .map_err(|_| DecodeError::invalid_timestamp(value))?;
    let minutes: u64 = caps[2].parse().map_err(|_| DecodeError::invalid_timestamp(value))?;
    let seconds: u64 = caps[3].parse().map_err(|_| DecodeError::invalid_timestamp(value))?;
    let millis = timing::fraction_to_ms(&caps[4]).ok_or_else(|| DecodeError::invalid_timestamp(value))?;

    timing::clock_to_ms(hours, minutes, seconds, millis).ok_or_else(|| DecodeError::invalid_timestamp(value))
}

fn parse_document(text: &str) -> Result<CueSequence, DecodeError> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let body = normalized.trim_start_matches('\u{feff}').trim_start();

    let signature_ok = body
        .strip_prefix("WEBVTT")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t', '\n']));
    if !signature_ok {
        return Err(DecodeError::MissingHeader("WEBVTT"));
    }

    let mut sequence = CueSequence::new();
    // The first block is the header and may carry free text after the signature
    for block in body.split("\n\n").skip(1) {
        let block = block.trim_matches('\n');
        if block.is_empty() {
            continue;
        }
        if block.starts_with("NOTE") || block.starts_with("STYLE") || block.starts_with("REGION") {
            continue;
        }

        let lines: Vec<&str> = block.lines().collect();
        let Some(timing_index) = lines.iter().take(2).position(|l| l.contains("-->")) else {
            log::debug!("Skipping WebVTT block without timing line: {:?}", lines.first());
            continue;
        };

        let (start, end, settings) = parse_timing_line(lines[timing_index])?;
        let payload = lines[timing_index + 1..].join("\n");
        let cue = Cue::new(start, end, parse_cue_text(&payload)).with_alignment(parse_settings(settings));
        sequence.push(cue);
    }

    Ok(sequence)
}

fn parse_timing_line(line: &str) -> Result<(u64, u64, &str), DecodeError> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| DecodeError::invalid_timestamp(line))?;
    let rest = rest.trim_start();
    let (end, settings) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim()),
        None => (rest, ""),
    };

    Ok((parse_timestamp(start)?, parse_timestamp(end)?, settings))
}

/// Derive the vertical alignment from a cue settings list (`line:10% align:center`)
pub fn parse_settings(settings: &str) -> Alignment {
    for setting in settings.split_whitespace() {
        let Some(value) = setting.strip_prefix("line:") else {
            continue;
        };
        let value = value.split(',').next().unwrap_or_default();
        if let Some(percent) = value.strip_suffix('%') {
            if let Ok(percent) = percent.parse::<f64>() {
                return if percent < 50.0 { Alignment::Top } else { Alignment::Bottom };
            }
        } else if let Ok(line_number) = value.parse::<i32>() {
            // Non-negative line numbers count from the top of the video
            return if line_number >= 0 { Alignment::Top } else { Alignment::Bottom };
        }
    }
    Alignment::Bottom
}

/// Parse WebVTT cue text into styled lines.
///
/// `<i>`, `<b>` and `<u>` become span styles; class, voice, language and
/// timestamp tags are dropped while keeping their text; ruby annotations are removed.
pub fn parse_cue_text(payload: &str) -> Vec<CueLine> {
    let mut lines = Vec::new();
    let mut italic = 0usize;
    let mut bold = 0usize;
    let mut underline = 0usize;
    let mut in_ruby_text = false;

    for raw_line in payload.lines() {
        let mut line = CueLine::default();
        let mut rest = raw_line;

        while !rest.is_empty() {
            let Some(open) = rest.find('<') else {
                if !in_ruby_text {
                    let style = style_for(italic, bold, underline);
                    line.push_text(&decode_entities(rest), style);
                }
                break;
            };

            if open > 0 && !in_ruby_text {
                let style = style_for(italic, bold, underline);
                line.push_text(&decode_entities(&rest[..open]), style);
            }

            let Some(close) = rest[open..].find('>') else {
                // A lone '<' is kept as text
                line.push_text(&rest[open..], style_for(italic, bold, underline));
                break;
            };
            let tag = &rest[open + 1..open + close];
            rest = &rest[open + close + 1..];

            let (closing, name) = match tag.strip_prefix('/') {
                Some(name) => (true, name),
                None => (false, tag),
            };
            let name = name.split(['.', ' ', '\t']).next().unwrap_or_default();
            let counter = match name {
                "i" => Some(&mut italic),
                "b" => Some(&mut bold),
                "u" => Some(&mut underline),
                "rt" => {
                    in_ruby_text = !closing;
                    None
                }
                _ => None,
            };
            if let Some(counter) = counter {
                *counter = if closing { counter.saturating_sub(1) } else { *counter + 1 };
            }
        }

        lines.push(line);
    }

    lines
}

fn style_for(italic: usize, bold: usize, underline: usize) -> SpanStyle {
    SpanStyle {
        italic: italic > 0,
        bold: bold > 0,
        underline: underline > 0,
    }
}
