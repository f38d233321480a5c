/*!
 * ISO-BMFF (fragmented MP4) reader used by the ISMT and WVTT decoders.
 *
 * Only the boxes needed to locate text samples are interpreted: `mdhd` and `trex`
 * inside `moov`, `tfhd`/`tfdt`/`trun` inside `moof/traf`, and the `mdat` payloads.
 */

use log::{debug, warn};

use crate::errors::DecodeError;

// tfhd flags
const TFHD_BASE_DATA_OFFSET: u32 = 0x00_0001;
const TFHD_SAMPLE_DESCRIPTION_INDEX: u32 = 0x00_0002;
const TFHD_DEFAULT_DURATION: u32 = 0x00_0008;
const TFHD_DEFAULT_SIZE: u32 = 0x00_0010;
const TFHD_DEFAULT_FLAGS: u32 = 0x00_0020;
const TFHD_DEFAULT_BASE_IS_MOOF: u32 = 0x02_0000;

// trun flags
const TRUN_DATA_OFFSET: u32 = 0x00_0001;
const TRUN_FIRST_SAMPLE_FLAGS: u32 = 0x00_0004;
const TRUN_SAMPLE_DURATION: u32 = 0x00_0100;
const TRUN_SAMPLE_SIZE: u32 = 0x00_0200;
const TRUN_SAMPLE_FLAGS: u32 = 0x00_0400;
const TRUN_SAMPLE_CTO: u32 = 0x00_0800;

/// One box within a buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mp4Box<'a> {
    /// Four character code
    pub box_type: [u8; 4],
    /// Offset of the box header in the walked buffer
    pub offset: usize,
    /// Offset of the payload in the walked buffer
    pub payload_offset: usize,
    pub payload: &'a [u8],
}

impl Mp4Box<'_> {
    pub fn is(&self, box_type: &[u8; 4]) -> bool {
        &self.box_type == box_type
    }
}

/// Iterator over the sibling boxes of a buffer.
///
/// Stops after the first malformed box.
pub struct BoxIter<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

/// Iterate the boxes laid out back to back in `data`
pub fn boxes(data: &[u8]) -> BoxIter<'_> {
    BoxIter { data, pos: 0, failed: false }
}

impl<'a> BoxIter<'a> {
    fn read_box(&mut self) -> Result<Mp4Box<'a>, DecodeError> {
        let data = self.data;
        let start = self.pos;
        let rest = &data[start..];
        if rest.len() < 8 {
            return Err(DecodeError::MalformedBox {
                box_type: "????".to_string(),
                reason: format!("{} trailing bytes cannot hold a box header", rest.len()),
            });
        }

        let size32 = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
        let box_type = [rest[4], rest[5], rest[6], rest[7]];
        let (size, header_len) = match size32 {
            // Box extends to the end of the buffer
            0 => (rest.len(), 8),
            1 => {
                let mut reader = ByteReader::new(&box_type, &rest[8..]);
                let large = reader.be_u64()?;
                let size = usize::try_from(large)
                    .map_err(|_| DecodeError::malformed_box(&box_type, format!("largesize {} too big", large)))?;
                (size, 16)
            }
            n => (n as usize, 8),
        };

        if size < header_len {
            return Err(DecodeError::malformed_box(
                &box_type,
                format!("size {} is smaller than its header", size),
            ));
        }
        if size > rest.len() {
            return Err(DecodeError::malformed_box(
                &box_type,
                format!("size {} exceeds the {} available bytes", size, rest.len()),
            ));
        }

        self.pos = start + size;
        Ok(Mp4Box {
            box_type,
            offset: start,
            payload_offset: start + header_len,
            payload: &rest[header_len..size],
        })
    }
}

impl<'a> Iterator for BoxIter<'a> {
    type Item = Result<Mp4Box<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let result = self.read_box();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Walk all boxes in pre-order, descending into the listed container types.
///
/// Offsets passed to `callback` are relative to the buffer that holds each box.
pub fn walk_boxes<'a, F>(data: &'a [u8], containers: &[&[u8; 4]], callback: &mut F) -> Result<(), DecodeError>
where
    F: FnMut(&Mp4Box<'a>) -> Result<(), DecodeError>,
{
    for item in boxes(data) {
        let mp4_box = item?;
        callback(&mp4_box)?;
        if containers.contains(&&mp4_box.box_type) {
            walk_boxes(mp4_box.payload, containers, callback)?;
        }
    }
    Ok(())
}

/// Big-endian cursor over a box payload
pub struct ByteReader<'a> {
    box_type: [u8; 4],
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(box_type: &[u8; 4], data: &'a [u8]) -> Self {
        Self { box_type: *box_type, data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::malformed_box(
                &self.box_type,
                format!("needs {} more bytes at offset {}, {} left", len, self.pos, self.remaining()),
            ));
        }
        let data = self.data;
        let slice = &data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.take(len).map(|_| ())
    }

    pub fn be_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn be_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn be_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn be_u64(&mut self) -> Result<u64, DecodeError> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    /// Version and 24-bit flags of a full box
    pub fn full_box_header(&mut self) -> Result<(u8, u32), DecodeError> {
        let word = self.be_u32()?;
        Ok(((word >> 24) as u8, word & 0x00FF_FFFF))
    }
}

// @struct: Per-track defaults from moov/mvex/trex
#[derive(Debug, Default, Clone, Copy)]
struct TrackDefaults {
    duration: Option<u32>,
    size: Option<u32>,
}

// @struct: Track fragment header
#[derive(Debug, Default, Clone, Copy)]
struct TrackFragmentHeader {
    base_data_offset: Option<u64>,
    default_duration: Option<u32>,
    default_size: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
struct RunSample {
    duration: Option<u32>,
    size: Option<u32>,
    composition_offset: i64,
}

#[derive(Debug, Default)]
struct TrackRun {
    data_offset: Option<i32>,
    samples: Vec<RunSample>,
}

#[derive(Debug, Default)]
struct TrackFragment {
    header: TrackFragmentHeader,
    base_decode_time: Option<u64>,
    runs: Vec<TrackRun>,
}

fn parse_mdhd(payload: &[u8]) -> Result<u32, DecodeError> {
    let mut reader = ByteReader::new(b"mdhd", payload);
    let (version, _) = reader.full_box_header()?;
    // creation and modification times
    reader.skip(if version == 1 { 16 } else { 8 })?;
    let timescale = reader.be_u32()?;
    if timescale == 0 {
        return Err(DecodeError::malformed_box(b"mdhd", "timescale is zero"));
    }
    Ok(timescale)
}

fn parse_trex(payload: &[u8]) -> Result<TrackDefaults, DecodeError> {
    let mut reader = ByteReader::new(b"trex", payload);
    reader.full_box_header()?;
    let _track_id = reader.be_u32()?;
    let _description_index = reader.be_u32()?;
    let duration = reader.be_u32()?;
    let size = reader.be_u32()?;
    Ok(TrackDefaults {
        duration: Some(duration).filter(|d| *d > 0),
        size: Some(size).filter(|s| *s > 0),
    })
}

fn parse_tfhd(payload: &[u8]) -> Result<TrackFragmentHeader, DecodeError> {
    let mut reader = ByteReader::new(b"tfhd", payload);
    let (_, flags) = reader.full_box_header()?;
    let _track_id = reader.be_u32()?;

    let mut header = TrackFragmentHeader::default();
    if flags & TFHD_BASE_DATA_OFFSET != 0 {
        header.base_data_offset = Some(reader.be_u64()?);
    }
    if flags & TFHD_SAMPLE_DESCRIPTION_INDEX != 0 {
        reader.be_u32()?;
    }
    if flags & TFHD_DEFAULT_DURATION != 0 {
        header.default_duration = Some(reader.be_u32()?);
    }
    if flags & TFHD_DEFAULT_SIZE != 0 {
        header.default_size = Some(reader.be_u32()?);
    }
    if flags & TFHD_DEFAULT_FLAGS != 0 {
        reader.be_u32()?;
    }
    if flags & TFHD_DEFAULT_BASE_IS_MOOF != 0 && header.base_data_offset.is_some() {
        debug!("tfhd sets both base-data-offset and default-base-is-moof, using the explicit offset");
    }
    Ok(header)
}

fn parse_tfdt(payload: &[u8]) -> Result<u64, DecodeError> {
    let mut reader = ByteReader::new(b"tfdt", payload);
    let (version, _) = reader.full_box_header()?;
    if version == 1 {
        reader.be_u64()
    } else {
        reader.be_u32().map(u64::from)
    }
}

fn parse_trun(payload: &[u8]) -> Result<TrackRun, DecodeError> {
    let mut reader = ByteReader::new(b"trun", payload);
    let (version, flags) = reader.full_box_header()?;
    let sample_count = reader.be_u32()?;

    let mut run = TrackRun::default();
    if flags & TRUN_DATA_OFFSET != 0 {
        run.data_offset = Some(reader.be_u32()? as i32);
    }
    if flags & TRUN_FIRST_SAMPLE_FLAGS != 0 {
        reader.be_u32()?;
    }

    // Each field present costs four bytes per sample
    let per_sample = [TRUN_SAMPLE_DURATION, TRUN_SAMPLE_SIZE, TRUN_SAMPLE_FLAGS, TRUN_SAMPLE_CTO]
        .iter()
        .filter(|flag| flags & **flag != 0)
        .count()
        * 4;
    if per_sample > 0 && (sample_count as usize).saturating_mul(per_sample) > reader.remaining() {
        return Err(DecodeError::malformed_box(
            b"trun",
            format!("{} samples do not fit in {} bytes", sample_count, reader.remaining()),
        ));
    }

    for _ in 0..sample_count {
        let duration = if flags & TRUN_SAMPLE_DURATION != 0 { Some(reader.be_u32()?) } else { None };
        let size = if flags & TRUN_SAMPLE_SIZE != 0 { Some(reader.be_u32()?) } else { None };
        if flags & TRUN_SAMPLE_FLAGS != 0 {
            reader.be_u32()?;
        }
        let composition_offset = if flags & TRUN_SAMPLE_CTO != 0 {
            let raw = reader.be_u32()?;
            if version == 0 { i64::from(raw) } else { i64::from(raw as i32) }
        } else {
            0
        };
        run.samples.push(RunSample { duration, size, composition_offset });
    }

    Ok(run)
}

fn parse_moof(payload: &[u8]) -> Result<Vec<TrackFragment>, DecodeError> {
    let mut fragments = Vec::new();
    for item in boxes(payload) {
        let traf = item?;
        if !traf.is(b"traf") {
            continue;
        }
        let mut fragment = TrackFragment::default();
        for child in boxes(traf.payload) {
            let child = child?;
            match &child.box_type {
                b"tfhd" => fragment.header = parse_tfhd(child.payload)?,
                b"tfdt" => fragment.base_decode_time = Some(parse_tfdt(child.payload)?),
                b"trun" => fragment.runs.push(parse_trun(child.payload)?),
                _ => {}
            }
        }
        fragments.push(fragment);
    }
    Ok(fragments)
}

/// Timed sample of a fragmented track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<'a> {
    /// Presentation time in timescale units
    pub start: u64,
    /// Duration in timescale units
    pub duration: u64,
    pub data: &'a [u8],
}

/// Samples of a fragmented track together with its media timescale
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentedTrack<'a> {
    /// Ticks per second from `mdhd`, if the file carries a `moov`
    pub timescale: Option<u32>,
    pub samples: Vec<Sample<'a>>,
}

/// Locate every sample of a fragmented MP4 file.
///
/// Sample data is resolved through the `trun` data offset when present and
/// otherwise read back to back from the `mdat` that follows the `moof`.
pub fn fragment_samples(data: &[u8]) -> Result<FragmentedTrack<'_>, DecodeError> {
    let mut timescale = None;
    let mut defaults = TrackDefaults::default();
    let mut pending: Option<(usize, Vec<TrackFragment>)> = None;
    let mut next_decode_time = 0u64;
    let mut samples = Vec::new();

    for item in boxes(data) {
        let top = item?;
        match &top.box_type {
            b"moov" => {
                walk_boxes(top.payload, &[b"trak", b"mdia", b"mvex"], &mut |b| {
                    if b.is(b"mdhd") && timescale.is_none() {
                        timescale = Some(parse_mdhd(b.payload)?);
                    } else if b.is(b"trex") {
                        defaults = parse_trex(b.payload)?;
                    }
                    Ok(())
                })?;
            }
            b"moof" => {
                if pending.is_some() {
                    debug!("moof at offset {} replaces a fragment without mdat", top.offset);
                }
                pending = Some((top.offset, parse_moof(top.payload)?));
            }
            b"mdat" => {
                let Some((moof_offset, fragments)) = pending.take() else {
                    debug!("Skipping mdat at offset {} without a preceding moof", top.offset);
                    continue;
                };
                let mdat_end = top.payload_offset + top.payload.len();
                let mut cursor = top.payload_offset;

                for fragment in fragments {
                    let mut decode_time = fragment.base_decode_time.unwrap_or(next_decode_time);
                    let base = match fragment.header.base_data_offset {
                        Some(offset) => usize::try_from(offset)
                            .map_err(|_| DecodeError::malformed_box(b"tfhd", "base data offset out of range"))?,
                        None => moof_offset,
                    };

                    for run in fragment.runs {
                        if let Some(offset) = run.data_offset {
                            cursor = base
                                .checked_add_signed(offset as isize)
                                .ok_or_else(|| DecodeError::malformed_box(b"trun", "data offset out of range"))?;
                        }
                        for sample in run.samples {
                            let size = match sample.size.or(fragment.header.default_size).or(defaults.size) {
                                Some(size) => size as usize,
                                None => mdat_end.saturating_sub(cursor),
                            };
                            let end = cursor.checked_add(size).filter(|end| *end <= data.len()).ok_or_else(|| {
                                DecodeError::malformed_box(b"trun", format!("sample of {} bytes at {} is out of range", size, cursor))
                            })?;
                            let duration = u64::from(
                                sample
                                    .duration
                                    .or(fragment.header.default_duration)
                                    .or(defaults.duration)
                                    .unwrap_or(0),
                            );
                            let start = decode_time
                                .checked_add_signed(sample.composition_offset)
                                .ok_or_else(|| DecodeError::malformed_box(b"trun", "composition time out of range"))?;
                            samples.push(Sample { start, duration, data: &data[cursor..end] });
                            decode_time = decode_time
                                .checked_add(duration)
                                .ok_or_else(|| DecodeError::malformed_box(b"trun", "decode time overflows"))?;
                            cursor = end;
                        }
                    }
                    next_decode_time = decode_time;
                }
            }
            _ => {}
        }
    }

    if pending.is_some() {
        warn!("Last movie fragment has no mdat, its samples are ignored");
    }

    Ok(FragmentedTrack { timescale, samples })
}

/// Payloads of all top-level `mdat` boxes, in file order
pub fn mdat_payloads(data: &[u8]) -> Result<Vec<&[u8]>, DecodeError> {
    let mut payloads = Vec::new();
    for item in boxes(data) {
        let top = item?;
        if top.is(b"mdat") {
            payloads.push(top.payload);
        }
    }
    Ok(payloads)
}
