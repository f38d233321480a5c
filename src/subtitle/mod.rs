/*!
 * Subtitle conversion pipeline.
 *
 * Raw bytes flow through these stages:
 * - `sniffer`: classify the byte buffer into a `SubtitleFormat`
 * - `decoders`: decode the buffer into a `CueSequence`
 * - `fixer`: optional repair pass over the cues
 * - `srt`: render the cues as SubRip text in the requested encoding
 *
 * `converter` wires the stages together and owns the soft/hard failure policy.
 */

pub mod model;
pub mod timing;
pub mod sniffer;
pub mod decoders;
pub mod fixer;
pub mod srt;
pub mod converter;

pub use model::{Alignment, Cue, CueLine, CueSequence, Span, SpanStyle};
pub use sniffer::{sniff, SubtitleFormat};
pub use decoders::{decoder_for, Decoder};
pub use fixer::{CommonIssuesFixer, FixOutcome, FixReport};
pub use srt::{LineEnding, SrtWriter};
pub use converter::{convert, ConversionOutcome, ConvertOptions, Converter};
