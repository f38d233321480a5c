/*!
 * Tests for the format decoders
 */

use lookerip::errors::DecodeError;
use lookerip::subtitle::decoders::ttml::{parse_time_expression, TimingParameters};
use lookerip::subtitle::decoders::webvtt::parse_timestamp;
use lookerip::subtitle::{decoder_for, Alignment, SubtitleFormat};
use crate::common;

/// WebVTT identifiers, settings and styles
#[test]
fn test_webvtt_withIdentifiersAndSettings_shouldDecodeCues() {
    let sequence = decoder_for(SubtitleFormat::WebVtt)
        .decode(common::WEBVTT_SAMPLE.as_bytes())
        .unwrap();

    assert_eq!(sequence.len(), 3);
    assert_eq!((sequence.cues[0].start_time_ms, sequence.cues[0].end_time_ms), (1000, 2000));
    assert_eq!(sequence.cues[0].text(), "First line");
    assert_eq!(sequence.cues[1].alignment, Alignment::Top);
    assert!(sequence.cues[1].lines[0].spans[0].style.italic);
    assert_eq!(sequence.cues[2].lines.len(), 2);
}

#[test]
fn test_webvtt_withoutSignature_shouldFail() {
    let result = decoder_for(SubtitleFormat::WebVtt).decode(b"00:00:01.000 --> 00:00:02.000\nHi\n");
    assert_eq!(result, Err(DecodeError::MissingHeader("WEBVTT")));
}

#[test]
fn test_parseTimestamp_withShortForm_shouldAcceptMinutes() {
    assert_eq!(parse_timestamp("01:02.345").unwrap(), 62_345);
    assert_eq!(parse_timestamp("01:00:00.000").unwrap(), 3_600_000);
    assert!(parse_timestamp("1:2.3").is_err());
}

#[test]
fn test_ttml_withBeginEndAndDur_shouldDecodeCues() {
    let sequence = decoder_for(SubtitleFormat::Ttml)
        .decode(common::TTML_SAMPLE.as_bytes())
        .unwrap();

    assert_eq!(sequence.len(), 3);
    assert_eq!((sequence.cues[1].start_time_ms, sequence.cues[1].end_time_ms), (3000, 4500));
    assert_eq!(sequence.cues[1].lines.len(), 2);
    assert_eq!((sequence.cues[2].start_time_ms, sequence.cues[2].end_time_ms), (60_000, 62_000));
    assert_eq!(sequence.cues[0].language.as_deref(), Some("en"));
}

#[test]
fn test_ttml_withUnclosedParagraph_shouldFail() {
    let data = br#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div><p begin="1s" end="2s">Hi</div></body></tt>"#;
    assert!(decoder_for(SubtitleFormat::Ttml).decode(data).is_err());
}

#[test]
fn test_parseTimeExpression_withFramesAndTicks_shouldUseRates() {
    let params = TimingParameters {
        frame_rate: 25.0,
        sub_frame_rate: 1.0,
        tick_rate: 10_000_000.0,
    };

    assert_eq!(parse_time_expression("00:00:01:05", &params).unwrap(), 1200);
    assert_eq!(parse_time_expression("25000000t", &params).unwrap(), 2500);
    assert_eq!(parse_time_expression("1.5m", &params).unwrap(), 90_000);
    assert!(matches!(
        parse_time_expression("soon", &params),
        Err(DecodeError::InvalidTimestamp { .. })
    ));
}

#[test]
fn test_sami_withTerminatorBlock_shouldEndAtNextSync() {
    let sequence = decoder_for(SubtitleFormat::Sami)
        .decode(common::SAMI_SAMPLE.as_bytes())
        .unwrap();

    assert_eq!(sequence.len(), 3);
    assert_eq!((sequence.cues[0].start_time_ms, sequence.cues[0].end_time_ms), (1000, 2000));
    assert_eq!((sequence.cues[1].start_time_ms, sequence.cues[1].end_time_ms), (2000, 3000));
    assert_eq!(sequence.cues[2].text(), "Third");
}

#[test]
fn test_bilibili_withLocations_shouldDecodeAlignment() {
    let sequence = decoder_for(SubtitleFormat::BilibiliJson)
        .decode(common::BILIBILI_SAMPLE.as_bytes())
        .unwrap();

    assert_eq!(sequence.len(), 3);
    assert_eq!(sequence.cues[1].end_time_ms, 4500);
    assert_eq!(sequence.cues[2].alignment, Alignment::Top);
}

#[test]
fn test_ismt_withOneDocumentPerFragment_shouldConcatenateCues() {
    let sequence = decoder_for(SubtitleFormat::Ismt).decode(&common::ismt_sample()).unwrap();

    assert_eq!(sequence.len(), 3);
    assert_eq!(sequence.cues[0].text(), "First");
    assert_eq!(sequence.cues[2].start_time_ms, 60_000);
}

#[test]
fn test_wvtt_withEmptySample_shouldSkipGap() {
    let sequence = decoder_for(SubtitleFormat::Wvtt).decode(&common::wvtt_sample()).unwrap();

    assert_eq!(sequence.len(), 3);
    assert_eq!((sequence.cues[0].start_time_ms, sequence.cues[0].end_time_ms), (1000, 2000));
    assert_eq!((sequence.cues[1].start_time_ms, sequence.cues[1].end_time_ms), (3000, 4500));
    assert_eq!((sequence.cues[2].start_time_ms, sequence.cues[2].end_time_ms), (60_000, 62_000));
}

#[test]
fn test_wvtt_withCueSplitAcrossSamples_shouldMergeIt() {
    let data = [
        common::moov_with_timescale(1000),
        common::fragment(0, &[(500, common::vttc("Long cue")), (700, common::vttc("Long cue"))]),
    ]
    .concat();

    let sequence = decoder_for(SubtitleFormat::Wvtt).decode(&data).unwrap();

    assert_eq!(sequence.len(), 1);
    assert_eq!((sequence.cues[0].start_time_ms, sequence.cues[0].end_time_ms), (0, 1200));
}

#[test]
fn test_wvtt_withTruncatedBox_shouldReturnMalformedBox() {
    let mut data = common::wvtt_sample();
    data.truncate(data.len() - 3);

    let result = decoder_for(SubtitleFormat::Wvtt).decode(&data);

    assert!(matches!(result, Err(DecodeError::MalformedBox { .. })));
}

#[test]
fn test_webvtt_withHugeHours_shouldReturnInvalidTimestamp() {
    let data = b"WEBVTT\n\n99999999999999999:00:00.000 --> 99999999999999999:00:01.000\nBoom\n";

    let result = decoder_for(SubtitleFormat::WebVtt).decode(data);

    assert!(matches!(result, Err(DecodeError::InvalidTimestamp { .. })));
}

#[test]
fn test_sami_withStartAtMaximum_shouldReturnInvalidTimestamp() {
    let data = b"<SAMI><BODY><SYNC Start=18446744073709551615><P>Last</BODY></SAMI>";

    let result = decoder_for(SubtitleFormat::Sami).decode(data);

    assert!(matches!(result, Err(DecodeError::InvalidTimestamp { .. })));
}

#[test]
fn test_ttml_withOffsetBeyondRange_shouldReturnInvalidTimestamp() {
    let data = br#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div begin="1s">
        <p begin="99999999999999999999999h" end="2s">Boom</p></div></body></tt>"#;

    let result = decoder_for(SubtitleFormat::Ttml).decode(data);

    assert!(matches!(result, Err(DecodeError::InvalidTimestamp { .. })));
}

#[test]
fn test_bilibili_withHugeSeconds_shouldReturnInvalidTimestamp() {
    let data = br##"{"Stroke":"none","background_color":"#000000","body":[{"from":1e300,"to":1e301,"content":"Boom"}]}"##;

    let result = decoder_for(SubtitleFormat::BilibiliJson).decode(data);

    assert!(matches!(result, Err(DecodeError::InvalidTimestamp { .. })));
}

#[test]
fn test_wvtt_withTicksBeyondMillisecondRange_shouldReturnMalformedBox() {
    let data = [
        common::moov_with_timescale(1),
        common::fragment(u64::MAX / 2, &[(10, common::vttc("Boom"))]),
    ]
    .concat();

    let result = decoder_for(SubtitleFormat::Wvtt).decode(&data);

    assert!(matches!(result, Err(DecodeError::MalformedBox { .. })));
}

#[test]
fn test_wvtt_withDecodeTimeOverflow_shouldReturnMalformedBox() {
    let data = [
        common::moov_with_timescale(1000),
        common::fragment(u64::MAX - 5, &[(10, common::vttc("Boom"))]),
    ]
    .concat();

    let result = decoder_for(SubtitleFormat::Wvtt).decode(&data);

    assert!(matches!(result, Err(DecodeError::MalformedBox { .. })));
}

#[test]
fn test_ismt_withDocumentTimeBeyondRange_shouldReturnInvalidTimestamp() {
    let document = r#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div>
        <p begin="99999999999999999999999h" end="2s">Boom</p></div></body></tt>"#;
    let data = common::fragment(0, &[(2000, document.as_bytes().to_vec())]);

    let result = decoder_for(SubtitleFormat::Ismt).decode(&data);

    assert!(matches!(result, Err(DecodeError::InvalidTimestamp { .. })));
}

#[test]
fn test_ismt_withLaterDocumentFirst_shouldKeepFragmentOrder() {
    let late = r#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div><p begin="10s" end="11s">Late</p></div></body></tt>"#;
    let early = r#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div><p begin="1s" end="2s">Early</p></div></body></tt>"#;
    let data = [
        common::fragment(0, &[(1000, late.as_bytes().to_vec())]),
        common::fragment(1000, &[(1000, early.as_bytes().to_vec())]),
    ]
    .concat();

    let mut sequence = decoder_for(SubtitleFormat::Ismt).decode(&data).unwrap();

    assert_eq!(sequence.cues[0].text(), "Late");
    assert_eq!(sequence.cues[1].text(), "Early");

    sequence.normalize();
    assert_eq!(sequence.cues[0].text(), "Early");
}
