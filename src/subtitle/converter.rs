/*!
 * Conversion orchestrator.
 *
 * Wires sniffing, decoding, the optional repair pass and SRT serialization.
 * This is the only place that turns a failure into a soft `false`: an
 * unrecognized format is reported and skipped, while decode, encoding and I/O
 * errors are returned to the caller.
 */

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::errors::{EncodingError, SubtitleError};
use crate::subtitle::decoders::decoder_for;
use crate::subtitle::fixer::{CommonIssuesFixer, FixReport, DEFAULT_SHORT_GAP_THRESHOLD_MS};
use crate::subtitle::model::CueSequence;
use crate::subtitle::sniffer::{sniff, SubtitleFormat};
use crate::subtitle::srt::{LineEnding, SrtWriter};

// @struct: Per-conversion settings
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    // @field: Language tag for cues without one, also selects fixer rules
    pub language: Option<String>,

    // @field: Output encoding label
    pub encoding: String,

    // @field: Skip the repair pass entirely
    pub skip_post_processing: bool,

    // @field: Keep gaps shorter than the threshold
    pub keep_short_gaps: bool,

    // @field: Short gap threshold in ms
    pub short_gap_threshold_ms: u64,

    // @field: Line terminator of the SRT file
    pub line_ending: LineEnding,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            language: None,
            encoding: "utf-8".to_string(),
            skip_post_processing: false,
            keep_short_gaps: false,
            short_gap_threshold_ms: DEFAULT_SHORT_GAP_THRESHOLD_MS,
            line_ending: LineEnding::Lf,
        }
    }
}

impl ConvertOptions {
    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.language = language.map(str::to_string);
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }
}

/// Summary of one successful conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    /// Sniffed source format
    pub format: SubtitleFormat,
    /// Cues written
    pub cue_count: usize,
    /// Cues dropped during normalization
    pub dropped_cues: usize,
    /// Fixer report, `None` when post-processing was skipped
    pub report: Option<FixReport>,
}

impl ConversionOutcome {
    pub fn issues_found(&self) -> bool {
        self.report.is_some_and(|report| report.issues_found())
    }
}

/// Stateless subtitle converter; one instance can serve parallel conversions
#[derive(Debug, Clone)]
pub struct Converter {
    options: ConvertOptions,
    writer: SrtWriter,
    fixer: CommonIssuesFixer,
}

impl Converter {
    /// Create a converter, rejecting unknown encodings up front
    pub fn new(options: ConvertOptions) -> Result<Self, EncodingError> {
        let writer = SrtWriter::new(&options.encoding)?.with_line_ending(options.line_ending);
        let fixer = CommonIssuesFixer::new()
            .with_remove_gaps(!options.keep_short_gaps)
            .with_short_gap_threshold(options.short_gap_threshold_ms)
            .with_language(options.language.as_deref());
        Ok(Self { options, writer, fixer })
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Sniff and decode a buffer into a normalized cue sequence
    pub fn decode(&self, data: &[u8]) -> Result<(SubtitleFormat, CueSequence, usize), SubtitleError> {
        let format = sniff(data).ok_or(SubtitleError::UnrecognizedFormat)?;
        let mut sequence = decoder_for(format)
            .decode(data)
            .map_err(|source| SubtitleError::Decode { format, source })?;

        let dropped = sequence.normalize();
        if let Some(language) = &self.options.language {
            sequence.set_default_language(language);
        }
        debug!("Decoded {} cues ({} dropped)", sequence.len(), dropped);
        Ok((format, sequence, dropped))
    }

    /// Run the whole pipeline and return the encoded SRT bytes
    pub fn render(&self, data: &[u8]) -> Result<(Vec<u8>, ConversionOutcome), SubtitleError> {
        let (format, sequence, dropped_cues) = self.decode(data)?;
        info!("Converted subtitle to SubRip (SRT)");

        let (sequence, report) = if self.options.skip_post_processing {
            (sequence, None)
        } else {
            let outcome = self.fixer.fix(sequence);
            if outcome.issues_found() {
                info!("Processed subtitle and repaired some issues!");
            } else {
                info!("Processed subtitle but no issues were found...");
            }
            (outcome.sequence, Some(outcome.report))
        };

        debug!("Encoding output as {}", self.writer.encoding_name());
        let bytes = self.writer.serialize(&sequence)?;
        let outcome = ConversionOutcome {
            format,
            cue_count: sequence.len(),
            dropped_cues,
            report,
        };
        Ok((bytes, outcome))
    }

    /// Convert a buffer and write the SRT file.
    ///
    /// Returns `Ok(false)` when the format is not recognized; nothing is written then.
    pub fn convert(&self, data: &[u8], destination: &Path) -> Result<bool, SubtitleError> {
        match self.convert_with_outcome(data, destination) {
            Ok(_) => Ok(true),
            Err(SubtitleError::UnrecognizedFormat) => {
                error!("Subtitle format was unrecognized...");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Same as `convert` but keeps the unrecognized format as an error and returns the outcome
    pub fn convert_with_outcome(&self, data: &[u8], destination: &Path) -> Result<ConversionOutcome, SubtitleError> {
        let (bytes, outcome) = self.render(data)?;
        fs::write(destination, bytes)?;
        info!("Saved to: {}", destination.display());
        Ok(outcome)
    }

    /// Convert a file on disk; the default output is the input path with an `.srt` extension
    pub fn convert_file(&self, input: &Path, output: Option<&Path>) -> Result<bool, SubtitleError> {
        let data = fs::read(input)?;
        let destination = output.map(Path::to_path_buf).unwrap_or_else(|| default_output_path(input));
        debug!("Converting {} -> {}", input.display(), destination.display());
        self.convert(&data, &destination)
    }
}

/// Sibling `.srt` path of a subtitle file
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("srt")
}

/// Convert a raw subtitle buffer to an SRT file in one call
pub fn convert(
    raw: &[u8],
    destination: &Path,
    language: Option<&str>,
    encoding: &str,
    skip_post_processing: bool,
    keep_short_gaps: bool,
) -> Result<bool, SubtitleError> {
    let options = ConvertOptions {
        language: language.map(str::to_string),
        encoding: encoding.to_string(),
        skip_post_processing,
        keep_short_gaps,
        ..ConvertOptions::default()
    };
    Converter::new(options)?.convert(raw, destination)
}
