/*!
 * Tests for subtitle format sniffing
 */

use lookerip::subtitle::{sniff, SubtitleFormat};
use crate::common;

#[test]
fn test_sniff_withEachFixture_shouldClassifyFormat() {
    assert_eq!(sniff(common::WEBVTT_SAMPLE.as_bytes()), Some(SubtitleFormat::WebVtt));
    assert_eq!(sniff(common::TTML_SAMPLE.as_bytes()), Some(SubtitleFormat::Ttml));
    assert_eq!(sniff(common::SAMI_SAMPLE.as_bytes()), Some(SubtitleFormat::Sami));
    assert_eq!(sniff(common::BILIBILI_SAMPLE.as_bytes()), Some(SubtitleFormat::BilibiliJson));
    assert_eq!(sniff(&common::ismt_sample()), Some(SubtitleFormat::Ismt));
    assert_eq!(sniff(&common::wvtt_sample()), Some(SubtitleFormat::Wvtt));
}

#[test]
fn test_sniff_withRandomBytes_shouldReturnNone() {
    let noise: Vec<u8> = (0u32..512).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
    assert_eq!(sniff(&noise), None);
    assert_eq!(sniff(b""), None);
}

#[test]
fn test_sniff_withSameBytes_shouldBeDeterministic() {
    let data = common::ismt_sample();
    let first = sniff(&data);
    for _ in 0..10 {
        assert_eq!(sniff(&data), first);
    }
}

#[test]
fn test_sniff_withFragmentsAndTimedText_shouldPreferIsmtOverTtml() {
    let mut data = common::TTML_SAMPLE.as_bytes().to_vec();
    data.extend_from_slice(&common::mp4_box(b"moof", &[]));
    data.extend_from_slice(&common::mp4_box(b"mdat", &[]));

    assert_eq!(sniff(&data), Some(SubtitleFormat::Ismt));
}

#[test]
fn test_sniff_withPrefixedTtmlRoot_shouldClassifyTtml() {
    let data = br#"<tt:tt xmlns:tt="http://www.w3.org/ns/ttml"><tt:body/></tt:tt>"#;
    assert_eq!(sniff(data), Some(SubtitleFormat::Ttml));
}

#[test]
fn test_sniff_withJsonMissingStyleKeys_shouldReturnNone() {
    assert_eq!(sniff(br#"{"body":[{"from":1,"to":2,"content":"x"}]}"#), None);
}
