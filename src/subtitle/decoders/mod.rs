/*!
 * Format decoders.
 *
 * Every supported `SubtitleFormat` maps to exactly one `Decoder` implementation.
 * The MP4-embedded variants demultiplex their box tree and hand the payloads to
 * the text decoders (`ttml` for ISMT, `webvtt` cue text for WVTT).
 */

use std::borrow::Cow;

use log::warn;

use crate::errors::DecodeError;
use crate::subtitle::model::CueSequence;
use crate::subtitle::sniffer::SubtitleFormat;

pub mod markup;
pub mod mp4;
pub mod webvtt;
pub mod ttml;
pub mod sami;
pub mod bilibili;
pub mod ismt;
pub mod wvtt;

pub use bilibili::BilibiliJsonDecoder;
pub use ismt::IsmtDecoder;
pub use sami::SamiDecoder;
pub use ttml::TtmlDecoder;
pub use webvtt::WebVttDecoder;
pub use wvtt::WvttDecoder;

/// Common interface of all format decoders
///
/// Decoders keep cues in source order; sorting is applied afterwards by the converter.
pub trait Decoder: Send + Sync {
    /// Format handled by this decoder
    fn format(&self) -> SubtitleFormat;

    /// Decode a complete subtitle payload
    fn decode(&self, data: &[u8]) -> Result<CueSequence, DecodeError>;
}

static WEBVTT: WebVttDecoder = WebVttDecoder;
static WVTT: WvttDecoder = WvttDecoder;
static TTML: TtmlDecoder = TtmlDecoder;
static SAMI: SamiDecoder = SamiDecoder;
static BILIBILI: BilibiliJsonDecoder = BilibiliJsonDecoder;
static ISMT: IsmtDecoder = IsmtDecoder;

/// Select the decoder for a sniffed format
pub fn decoder_for(format: SubtitleFormat) -> &'static dyn Decoder {
    match format {
        SubtitleFormat::WebVtt => &WEBVTT,
        SubtitleFormat::Wvtt => &WVTT,
        SubtitleFormat::Ttml => &TTML,
        SubtitleFormat::Sami => &SAMI,
        SubtitleFormat::BilibiliJson => &BILIBILI,
        SubtitleFormat::Ismt => &ISMT,
    }
}

/// Decode subtitle bytes to text.
///
/// A byte order mark selects the encoding; otherwise UTF-8 is required, with a
/// Windows-1252 fallback for legacy files.
pub fn decode_text(data: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(data) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&data[bom_len..]);
        if had_errors {
            warn!("Subtitle text contained invalid {} sequences", encoding.name());
        }
        return text;
    }

    match std::str::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (text, encoding, replacements) = encoding_rs::WINDOWS_1252.decode(data);
            if replacements {
                warn!("Could not decode subtitle accurately with {}", encoding.name());
            }
            text
        }
    }
}
