use std::fmt;

use log::{debug, info};

// @module: Content-based subtitle format detection

/// Closed set of subtitle formats the pipeline can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtitleFormat {
    /// Plain text WebVTT
    WebVtt,
    /// WebVTT cues embedded in fragmented MP4 (`wvtt` sample entry)
    Wvtt,
    /// TTML / DFXP / SMPTE-TT XML documents
    Ttml,
    /// Microsoft SAMI
    Sami,
    /// Bilibili style JSON subtitles
    BilibiliJson,
    /// TTML documents embedded in fragmented MP4
    Ismt,
}

impl SubtitleFormat {
    // @returns: Human readable description used in logs
    pub fn description(&self) -> &'static str {
        match self {
            Self::WebVtt => "WebVTT",
            Self::Wvtt => "WVTT (WebVTT in MP4)",
            Self::Ttml => "DFXP/TTML/TTML2",
            Self::Sami => "SAMI",
            Self::BilibiliJson => "JSON (Bilibili)",
            Self::Ismt => "ISMT (DFXP in MP4)",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

const MDAT: &[u8] = b"mdat";
const MOOF: &[u8] = b"moof";
const VTTC: &[u8] = b"vttc";
const TT_CLOSE: &[u8] = b"</tt>";
const TT_PREFIXED_CLOSE: &[u8] = b"</tt:tt>";
const SAMI_OPEN: &[u8] = b"<SAMI>";
const WEBVTT: &[u8] = b"WEBVTT";
const JSON_STROKE: &[u8] = b"\"Stroke\"";
const JSON_BACKGROUND: &[u8] = b"\"background_color\"";

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Classify a byte buffer by its content.
///
/// The checks run in a fixed priority order: MP4 container signatures first, then
/// SAMI, TTML, WebVTT and finally the JSON heuristic. Every check is a plain
/// substring test, so the result depends on the bytes alone.
pub fn sniff(data: &[u8]) -> Option<SubtitleFormat> {
    let format = if contains(data, MDAT) && contains(data, MOOF) {
        if contains(data, TT_CLOSE) {
            Some(SubtitleFormat::Ismt)
        } else if contains(data, VTTC) {
            Some(SubtitleFormat::Wvtt)
        } else {
            debug!("MP4 fragments found but no known text track payload");
            None
        }
    } else if contains(data, SAMI_OPEN) {
        Some(SubtitleFormat::Sami)
    } else if contains(data, TT_CLOSE) || contains(data, TT_PREFIXED_CLOSE) {
        Some(SubtitleFormat::Ttml)
    } else if contains(data, WEBVTT) {
        Some(SubtitleFormat::WebVtt)
    } else if data.starts_with(b"{") && contains(data, JSON_STROKE) && contains(data, JSON_BACKGROUND) {
        Some(SubtitleFormat::BilibiliJson)
    } else {
        None
    };

    if let Some(format) = format {
        info!("Subtitle format: {}", format);
    }
    format
}
