use serde::Deserialize;

use crate::errors::DecodeError;
use crate::subtitle::decoders::Decoder;
use crate::subtitle::model::{Alignment, Cue, CueSequence};
use crate::subtitle::sniffer::SubtitleFormat;
use crate::subtitle::timing;

// @module: Bilibili JSON subtitle decoder

// @struct: Top level document; styling keys are ignored
#[derive(Debug, Deserialize)]
struct BilibiliDocument {
    // @field: Timed entries
    #[serde(default)]
    body: Vec<BilibiliEntry>,
}

// @struct: One entry of the `body` array
#[derive(Debug, Deserialize)]
struct BilibiliEntry {
    // @field: Start in seconds
    from: f64,

    // @field: End in seconds
    to: f64,

    // @field: Numeric keypad position (7, 8, 9 are the top row)
    #[serde(default)]
    location: Option<u8>,

    // @field: Text, `\n` separated lines
    #[serde(default)]
    content: String,
}

/// Decoder for Bilibili style JSON subtitles
#[derive(Debug, Default, Clone, Copy)]
pub struct BilibiliJsonDecoder;

impl Decoder for BilibiliJsonDecoder {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::BilibiliJson
    }

    fn decode(&self, data: &[u8]) -> Result<CueSequence, DecodeError> {
        let document: BilibiliDocument =
            serde_json::from_slice(data).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

        let mut sequence = CueSequence::new();
        for entry in document.body {
            let start = timing::seconds_to_ms(entry.from)
                .ok_or_else(|| DecodeError::invalid_timestamp(entry.from.to_string()))?;
            let end = timing::seconds_to_ms(entry.to)
                .ok_or_else(|| DecodeError::invalid_timestamp(entry.to.to_string()))?;

            let alignment = match entry.location {
                Some(7..=9) => Alignment::Top,
                _ => Alignment::Bottom,
            };
            let text = entry.content.replace("\\n", "\n");
            sequence.push(Cue::from_text(start, end, &text).with_alignment(alignment));
        }

        Ok(sequence)
    }
}
