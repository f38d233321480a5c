// @module: WVTT decoder (WebVTT cues in fragmented MP4 samples)

use log::{debug, warn};

use crate::errors::DecodeError;
use crate::subtitle::decoders::mp4::{self, FragmentedTrack};
use crate::subtitle::decoders::webvtt::{parse_cue_text, parse_settings};
use crate::subtitle::decoders::Decoder;
use crate::subtitle::model::{merge_continuations, Alignment, Cue, CueSequence};
use crate::subtitle::sniffer::SubtitleFormat;
use crate::subtitle::timing;

// @const: Timescale assumed when the file has no mdhd
const FALLBACK_TIMESCALE: u32 = 1000;

// @const: Cues shown together in one sample
const CONTINUATION_LOOKBACK: usize = 8;

/// Decoder for WebVTT-in-MP4 tracks
#[derive(Debug, Default, Clone, Copy)]
pub struct WvttDecoder;

impl Decoder for WvttDecoder {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Wvtt
    }

    fn decode(&self, data: &[u8]) -> Result<CueSequence, DecodeError> {
        let FragmentedTrack { timescale, samples } = mp4::fragment_samples(data)?;
        let timescale = timescale.unwrap_or_else(|| {
            warn!("No media header found, assuming a timescale of {}", FALLBACK_TIMESCALE);
            FALLBACK_TIMESCALE
        });

        let mut cues = Vec::new();
        for sample in samples {
            let out_of_range = || DecodeError::malformed_box(b"trun", "sample time out of range");
            let end_ticks = sample.start.checked_add(sample.duration).ok_or_else(out_of_range)?;
            let start = timing::ticks_to_ms(sample.start, timescale).ok_or_else(out_of_range)?;
            let end = timing::ticks_to_ms(end_ticks, timescale).ok_or_else(out_of_range)?;
            cues.extend(sample_cues(sample.data, start, end)?);
        }
        debug!("Read {} WVTT cue boxes", cues.len());

        Ok(CueSequence::from(merge_continuations(cues, CONTINUATION_LOOKBACK)))
    }
}

// Every vttc box of a sample is one cue shown for the sample's duration
fn sample_cues(data: &[u8], start: u64, end: u64) -> Result<Vec<Cue>, DecodeError> {
    let mut cues = Vec::new();

    for item in mp4::boxes(data) {
        let cue_box = item?;
        match &cue_box.box_type {
            b"vttc" => {
                let mut payload = None;
                let mut alignment = Alignment::Bottom;
                for child in mp4::boxes(cue_box.payload) {
                    let child = child?;
                    match &child.box_type {
                        b"payl" => payload = Some(box_text(child.payload)?),
                        b"sttg" => alignment = parse_settings(&box_text(child.payload)?),
                        // Cue identifiers are not carried to SRT
                        b"iden" => {}
                        _ => {}
                    }
                }
                let text = payload.ok_or(DecodeError::MissingPayload("payl"))?;
                cues.push(Cue::new(start, end, parse_cue_text(&text)).with_alignment(alignment));
            }
            b"vtte" => {}
            other => debug!("Ignoring '{}' box in WVTT sample", String::from_utf8_lossy(other)),
        }
    }

    Ok(cues)
}

fn box_text(payload: &[u8]) -> Result<String, DecodeError> {
    std::str::from_utf8(payload)
        .map(|text| text.trim_end_matches('\0').to_string())
        .map_err(|e| DecodeError::InvalidText(e.to_string()))
}
