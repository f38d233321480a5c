/*!
 * Common test utilities for the lookerip test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use tempfile::TempDir;

// Re-export the mock media source module
pub mod mock_source;

/// Two overlapping WebVTT cues
pub const OVERLAPPING_WEBVTT: &str =
    "WEBVTT\n\n00:00:01.000 --> 00:00:03.000\nHello\n\n00:00:02.500 --> 00:00:05.000\nWorld\n";

/// Three well formed WebVTT cues
pub const WEBVTT_SAMPLE: &str = "WEBVTT

1
00:00:01.000 --> 00:00:02.000
First line

00:00:03.000 --> 00:00:04.500 line:0
<i>Second</i> line

00:01:00.000 --> 00:01:02.000
Third
and last
";

/// Three well formed TTML paragraphs
pub const TTML_SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<tt xmlns="http://www.w3.org/ns/ttml" xml:lang="en">
  <body>
    <div>
      <p begin="00:00:01.000" end="00:00:02.000">First</p>
      <p begin="3s" end="4.5s">Second<br/>line</p>
      <p begin="00:01:00.000" dur="2s">Third</p>
    </div>
  </body>
</tt>"#;

/// Three SAMI blocks, the second one followed by a terminator
pub const SAMI_SAMPLE: &str = r#"<SAMI>
<HEAD><STYLE TYPE="text/css"><!--
.ENCC { Name: English; lang: en-US; }
--></STYLE></HEAD>
<BODY>
<SYNC Start=1000><P Class=ENCC>First
<SYNC Start=2000><P Class=ENCC>Second
<SYNC Start=3000><P Class=ENCC>&nbsp;
<SYNC Start=4000><P Class=ENCC>Third
</BODY></SAMI>"#;

/// Three Bilibili JSON entries
pub const BILIBILI_SAMPLE: &str = r##"{"font_size":0.4,"font_color":"#FFFFFF","background_alpha":0.5,"background_color":"#9C27B0","Stroke":"none","body":[
    {"from":1.0,"to":2.0,"location":2,"content":"First"},
    {"from":3.0,"to":4.5,"location":2,"content":"Second"},
    {"from":60.0,"to":62.0,"location":8,"content":"Third"}
]}"##;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Encode one MP4 box
pub fn mp4_box(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(box_type);
    out.extend_from_slice(payload);
    out
}

/// Encode one MP4 full box (version and flags header)
pub fn full_box(box_type: &[u8; 4], version: u8, flags: u32, body: &[u8]) -> Vec<u8> {
    let mut payload = ((u32::from(version) << 24) | flags).to_be_bytes().to_vec();
    payload.extend_from_slice(body);
    mp4_box(box_type, &payload)
}

/// A `moov` box declaring a media timescale
pub fn moov_with_timescale(timescale: u32) -> Vec<u8> {
    let mut mdhd_body = vec![0u8; 8];
    mdhd_body.extend_from_slice(&timescale.to_be_bytes());
    mdhd_body.extend_from_slice(&[0u8; 8]);
    mp4_box(b"moov", &mp4_box(b"trak", &mp4_box(b"mdia", &full_box(b"mdhd", 0, 0, &mdhd_body))))
}

/// One fragment (`moof` + `mdat`) holding `samples` as (duration, bytes), starting at `base_time`
pub fn fragment(base_time: u64, samples: &[(u32, Vec<u8>)]) -> Vec<u8> {
    // default-base-is-moof
    let tfhd = full_box(b"tfhd", 0, 0x020000, &1u32.to_be_bytes());
    let tfdt = full_box(b"tfdt", 1, 0, &base_time.to_be_bytes());

    let mut trun_body = (samples.len() as u32).to_be_bytes().to_vec();
    for (duration, data) in samples {
        trun_body.extend_from_slice(&duration.to_be_bytes());
        trun_body.extend_from_slice(&(data.len() as u32).to_be_bytes());
    }
    // sample-duration-present | sample-size-present
    let trun = full_box(b"trun", 0, 0x100 | 0x200, &trun_body);

    let moof = mp4_box(b"moof", &mp4_box(b"traf", &[tfhd, tfdt, trun].concat()));
    let payload: Vec<u8> = samples.iter().flat_map(|(_, data)| data.clone()).collect();
    [moof, mp4_box(b"mdat", &payload)].concat()
}

/// A WVTT cue sample
pub fn vttc(text: &str) -> Vec<u8> {
    mp4_box(b"vttc", &mp4_box(b"payl", text.as_bytes()))
}

/// An empty WVTT sample
pub fn vtte() -> Vec<u8> {
    mp4_box(b"vtte", &[])
}

/// Fragmented WVTT track with three cues and one gap sample, timescale 1000
pub fn wvtt_sample() -> Vec<u8> {
    [
        moov_with_timescale(1000),
        fragment(1000, &[(1000, vttc("First")), (1000, vtte()), (1500, vttc("Second"))]),
        fragment(60_000, &[(2000, vttc("Third"))]),
    ]
    .concat()
}

/// ISMT track: one TTML document per fragment
pub fn ismt_sample() -> Vec<u8> {
    let first = r#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div>
        <p begin="00:00:01.000" end="00:00:02.000">First</p>
        <p begin="00:00:03.000" end="00:00:04.500">Second</p>
    </div></body></tt>"#;
    let second = r#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div>
        <p begin="00:01:00.000" end="00:01:02.000">Third</p>
    </div></body></tt>"#;
    [
        fragment(0, &[(2000, first.as_bytes().to_vec())]),
        fragment(2000, &[(2000, second.as_bytes().to_vec())]),
    ]
    .concat()
}
