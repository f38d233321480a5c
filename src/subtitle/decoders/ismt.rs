// @module: ISMT decoder (TTML documents carried in fragmented MP4 samples)

use log::debug;

use crate::errors::DecodeError;
use crate::subtitle::decoders::{decode_text, mp4, ttml, Decoder};
use crate::subtitle::model::{merge_continuations, Cue, CueSequence};
use crate::subtitle::sniffer::SubtitleFormat;

// @const: Cues shown together that may continue in the next document
const CONTINUATION_LOOKBACK: usize = 8;

/// Decoder for ISMT (DFXP in MP4) tracks
#[derive(Debug, Default, Clone, Copy)]
pub struct IsmtDecoder;

impl Decoder for IsmtDecoder {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Ismt
    }

    fn decode(&self, data: &[u8]) -> Result<CueSequence, DecodeError> {
        let payloads = mp4::mdat_payloads(data)?;
        if payloads.is_empty() {
            return Err(DecodeError::MissingPayload("mdat"));
        }

        let mut cues: Vec<Cue> = Vec::new();
        let mut documents = 0usize;
        for payload in payloads {
            let text = decode_text(payload);
            for document in split_documents(&text) {
                documents += 1;
                cues.extend(ttml::decode_document(document)?);
            }
        }
        debug!("ISMT track held {} TTML documents", documents);

        Ok(CueSequence::from(merge_continuations(cues, CONTINUATION_LOOKBACK)))
    }
}

/// Split a payload that may hold several concatenated TTML documents
fn split_documents(text: &str) -> Vec<&str> {
    let mut documents = Vec::new();
    let mut rest = text;

    loop {
        let close = match (rest.find("</tt>"), rest.find("</tt:tt>")) {
            (Some(a), Some(b)) if a < b => Some(a + "</tt>".len()),
            (Some(_), Some(b)) => Some(b + "</tt:tt>".len()),
            (Some(a), None) => Some(a + "</tt>".len()),
            (None, Some(b)) => Some(b + "</tt:tt>".len()),
            (None, None) => None,
        };
        let Some(end) = close else { break };
        let document = rest[..end].trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if !document.is_empty() {
            documents.push(document);
        }
        rest = &rest[end..];
    }

    if !rest.trim_matches(|c: char| c.is_whitespace() || c == '\0').is_empty() {
        debug!("Ignoring {} bytes after the last TTML document", rest.len());
    }
    documents
}
