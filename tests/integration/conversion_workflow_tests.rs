/*!
 * End-to-end tests for the conversion pipeline
 */

use anyhow::Result;
use std::fs;
use std::thread;

use lookerip::errors::{EncodingError, SubtitleError};
use lookerip::subtitle::{decoder_for, ConvertOptions, Converter, SubtitleFormat};
use crate::common;

/// Name, format, bytes and the number of cues each sample holds
fn fixtures() -> Vec<(&'static str, SubtitleFormat, Vec<u8>, usize)> {
    vec![
        ("webvtt", SubtitleFormat::WebVtt, common::WEBVTT_SAMPLE.as_bytes().to_vec(), 3),
        ("ttml", SubtitleFormat::Ttml, common::TTML_SAMPLE.as_bytes().to_vec(), 3),
        ("sami", SubtitleFormat::Sami, common::SAMI_SAMPLE.as_bytes().to_vec(), 3),
        ("bilibili", SubtitleFormat::BilibiliJson, common::BILIBILI_SAMPLE.as_bytes().to_vec(), 3),
        ("wvtt", SubtitleFormat::Wvtt, common::wvtt_sample(), 3),
        ("ismt", SubtitleFormat::Ismt, common::ismt_sample(), 3),
    ]
}

/// Overlapping cues end up clamped to the next start
#[test]
fn test_convert_withOverlappingWebVtt_shouldWriteRepairedSrt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let destination = temp_dir.path().join("out.srt");

    let converted = lookerip::convert(
        common::OVERLAPPING_WEBVTT.as_bytes(),
        &destination,
        None,
        "utf-8",
        false,
        false,
    )?;

    assert!(converted);
    let text = fs::read_to_string(&destination)?;
    assert!(text.starts_with(
        "1\n00:00:01,000 --> 00:00:02,500\nHello\n\n2\n00:00:02,500 --> 00:00:05,000\nWorld\n"
    ));
    Ok(())
}

/// Every supported format goes through the whole pipeline with its cues intact
#[test]
fn test_render_withEveryFormat_shouldKeepCueCount() -> Result<()> {
    let converter = Converter::new(ConvertOptions::default())?;

    for (name, format, data, expected) in fixtures() {
        assert_eq!(decoder_for(format).decode(&data)?.len(), expected, "decoded cues of {}", name);
        let (bytes, outcome) = converter.render(&data)?;
        let text = String::from_utf8(bytes)?;

        assert_eq!(outcome.format, format, "format of {}", name);
        assert_eq!(outcome.cue_count, expected, "cue count of {}", name);
        assert_eq!(text.matches(" --> ").count(), expected, "SRT cues of {}", name);
        assert!(text.starts_with("1\n00:00:01,000 --> "), "first cue of {}", name);
    }
    Ok(())
}

#[test]
fn test_convert_withUnknownBytes_shouldWriteNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let destination = temp_dir.path().join("noise.srt");
    let noise: Vec<u8> = (0u8..=255).cycle().take(2048).collect();

    let converted = lookerip::convert(&noise, &destination, None, "utf-8", false, false)?;

    assert!(!converted);
    assert!(!destination.exists());
    Ok(())
}

#[test]
fn test_convert_withUnrepresentableCharacter_shouldNotWriteFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let destination = temp_dir.path().join("cjk.srt");
    let data = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nOlá\n\n00:00:03.000 --> 00:00:04.000\n你好\n";

    let result = lookerip::convert(data.as_bytes(), &destination, None, "windows-1252", false, false);

    assert!(matches!(
        result,
        Err(SubtitleError::Encoding(EncodingError::Unrepresentable { character: '你', cue_index: 2, .. }))
    ));
    assert!(!destination.exists());
    Ok(())
}

#[test]
fn test_convert_withBrokenTtml_shouldReturnDecodeError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let destination = temp_dir.path().join("broken.srt");
    let data = br#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div><p begin="1s" end="2s">Hi</div></body></tt>"#;

    let result = lookerip::convert(data, &destination, None, "utf-8", false, false);

    assert!(matches!(result, Err(SubtitleError::Decode { format: SubtitleFormat::Ttml, .. })));
    assert!(!destination.exists());
    Ok(())
}

/// One converter shared by several threads gives the same output as sequential runs
#[test]
fn test_converter_withParallelConversions_shouldProduceIdenticalFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let converter = Converter::new(ConvertOptions::default())?;
    let fixtures = fixtures();

    thread::scope(|scope| {
        for (name, _, data, _) in &fixtures {
            let converter = &converter;
            let destination = temp_dir.path().join(format!("{}.srt", name));
            scope.spawn(move || converter.convert(data, &destination));
        }
    });

    for (name, _, data, _) in &fixtures {
        let (expected, _) = converter.render(data)?;
        let written = fs::read(temp_dir.path().join(format!("{}.srt", name)))?;
        assert_eq!(written, expected, "output of {}", name);
    }
    Ok(())
}
