use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::api::body::{self, Group};
use crate::api::models::{Media, SubtitleTrack};
use crate::api::LookeClient;
use crate::app_config::Config;
use crate::errors::{ApiError, SubtitleError};
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::subtitle::Converter;

// @module: Application controller for subtitle download and conversion

static SEASON_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)ª").unwrap());

/// Source of media metadata and subtitle bytes
#[allow(async_fn_in_trait)]
pub trait MediaSource {
    /// Look a media up by id, optionally requesting one extra property group
    async fn find_media(&self, media_id: u64, groups_extra: Option<Group>) -> Result<Media, ApiError>;

    /// Fetch the bytes behind a URL
    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}

impl MediaSource for LookeClient {
    async fn find_media(&self, media_id: u64, groups_extra: Option<Group>) -> Result<Media, ApiError> {
        LookeClient::find_media(self, media_id, groups_extra).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        LookeClient::download(self, url).await
    }
}

// @struct: One subrip invocation
#[derive(Debug, Clone, PartialEq)]
pub struct SubripRequest {
    // @field: Media id (movie, episode or series)
    pub media_id: u64,

    // @field: Only download this season
    pub season: Option<u32>,

    // @field: Download every season, overrides `season`
    pub all_seasons: bool,

    // @field: Subtitle language tag
    pub language: String,

    // @field: Root of the output folders
    pub output_folder: PathBuf,

    // @field: Keep the downloaded file next to the SRT
    pub keep_original: bool,

    // @field: Convert downloads to SRT
    pub convert_to_srt: bool,
}

impl SubripRequest {
    /// Request for a media id using the configured defaults
    pub fn from_config(media_id: u64, config: &Config) -> Self {
        Self {
            media_id,
            season: None,
            all_seasons: false,
            language: config.language.clone(),
            output_folder: PathBuf::from(&config.output_folder),
            keep_original: config.keep_original,
            convert_to_srt: config.convert_to_srt,
        }
    }

    fn wants_seasons(&self) -> bool {
        self.season.is_some() || self.all_seasons
    }
}

/// Counters of a batch; one failure never stops the batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files downloaded from the service
    pub downloaded: usize,
    /// Files converted to SRT
    pub converted: usize,
    /// Files whose format was not recognized
    pub unrecognized: usize,
    /// Downloads or conversions that failed with an error
    pub failed: usize,
}

impl BatchSummary {
    /// Conversion attempts
    pub fn attempted(&self) -> usize {
        self.converted + self.unrecognized + self.failed
    }

    /// Files that did not make it
    pub fn failures(&self) -> usize {
        self.unrecognized + self.failed
    }

    /// True when something was attempted and nothing succeeded
    pub fn all_failed(&self) -> bool {
        self.converted == 0 && self.failures() > 0
    }
}

/// Parse a media id, or take the last path segment of a media URL
pub fn parse_media_id(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let candidate = if trimmed.starts_with("http") {
        let url = url::Url::parse(trimmed).context(format!("Invalid media URL: '{}'", trimmed))?;
        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .unwrap_or_default()
            .to_string()
    } else {
        trimmed.to_string()
    };

    if candidate.is_empty() || !candidate.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("Invalid media ID: '{}'. It must be a numeric value.", candidate));
    }

    candidate
        .parse()
        .map_err(|_| anyhow!("Invalid media ID: '{}'. It must be a numeric value.", candidate))
}

/// Season number from a title token such as "2ª Temporada"
pub fn season_number(text: &str) -> Option<u32> {
    SEASON_TOKEN
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Copyright years for the version banner, `2024` or `2024-<current>`
pub fn copyright_years(current_year: i32) -> String {
    const FIRST_YEAR: i32 = 2024;
    if current_year > FIRST_YEAR {
        format!("{}-{}", FIRST_YEAR, current_year)
    } else {
        FIRST_YEAR.to_string()
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Shared stateless converter
    converter: Converter,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let options = config.conversion.to_options(Some(&config.language));
        let converter = Converter::new(options).context("Invalid conversion settings")?;
        Ok(Self { config, converter })
    }

    /// Controller whose converter leaves untagged cues untagged, for local files
    pub fn without_language(config: Config) -> Result<Self> {
        let options = config.conversion.to_options(None);
        let converter = Converter::new(options).context("Invalid conversion settings")?;
        Ok(Self { config, converter })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Converter with the language of a subtitle track
    fn converter_for(&self, language: &str) -> Result<Converter> {
        if self.converter.options().language.as_deref() == Some(language) {
            return Ok(self.converter.clone());
        }
        let options = self.config.conversion.to_options(Some(language));
        Ok(Converter::new(options)?)
    }

    /// Download, and convert, the subtitles of a media and its episodes
    pub async fn subrip<S: MediaSource>(&self, source: &S, request: &SubripRequest) -> Result<BatchSummary> {
        info!("Starting subrip for media id: {}", request.media_id);

        let data = source
            .find_media(request.media_id, None)
            .await
            .context(format!("Failed to look up media {}", request.media_id))?;

        let medias = self.collect_medias(source, data, request).await?;
        let mut summary = BatchSummary::default();

        let progress = ProgressBar::new(medias.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} titles ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style.progress_chars("=>-"));

        for media in &medias {
            progress.set_message(media.full_title.clone());
            self.process_media(source, media, request, &mut summary).await?;
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            "Finished. {} downloaded, {} converted, {} failed.",
            summary.downloaded,
            summary.converted,
            summary.failures()
        );
        Ok(summary)
    }

    /// Expand a media into the titles to process
    ///
    /// Without a season selection the media itself is processed. With one, the
    /// parent series is looked up and the episodes of every season gathered; when
    /// the media has no usable parent its own children are used.
    pub async fn collect_medias<S: MediaSource>(
        &self,
        source: &S,
        data: Media,
        request: &SubripRequest,
    ) -> Result<Vec<Media>> {
        if !request.wants_seasons() {
            return Ok(vec![data]);
        }

        let mut episodes = Vec::new();
        let parent_id = data.parent_id.filter(|&id| id != 0);
        let series = match parent_id {
            Some(parent_id) => Some(
                source
                    .find_media(parent_id, Some(body::play_details_group()))
                    .await
                    .context(format!("Failed to look up series {}", parent_id))?,
            ),
            None => None,
        };

        match (parent_id, series) {
            (Some(parent_id), Some(series))
                if !series.children().is_empty()
                    && series.children().iter().all(|s| s.parent_id == Some(parent_id)) =>
            {
                for season in series.children() {
                    debug!("Looking up season {} ({})", season.full_title, season.id);
                    let season_data = source
                        .find_media(season.id, None)
                        .await
                        .context(format!("Failed to look up season {}", season.id))?;
                    episodes.extend(season_data.childs.unwrap_or_default());
                }
            }
            _ => episodes.extend(data.children().iter().cloned()),
        }

        if episodes.is_empty() {
            Ok(vec![data])
        } else {
            Ok(episodes)
        }
    }

    /// Output folder of a media, `None` when it belongs to a season that was not requested
    pub fn media_folder(&self, media: &Media, request: &SubripRequest) -> Option<PathBuf> {
        let year = media.year();
        let folder = match media.position() {
            Some(position) => {
                let season = season_number(&media.full_title)
                    .or_else(|| season_number(position))
                    .unwrap_or(1);
                if let Some(wanted) = request.season {
                    if wanted != season && !request.all_seasons {
                        debug!("Skipping {} (season {})", media.full_title, season);
                        return None;
                    }
                }
                FileManager::season_folder(&media.full_title, season)
            }
            None => FileManager::movie_folder(&media.full_title, year),
        };
        Some(request.output_folder.join(folder))
    }

    async fn process_media<S: MediaSource>(
        &self,
        source: &S,
        media: &Media,
        request: &SubripRequest,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        let year = media.year();
        let subtitles = media.subtitles();
        if subtitles.is_empty() {
            warn!("No subtitle for {} - {} (ID: {}).", media.full_title, year, media.id);
            return Ok(());
        }

        let Some(folder) = self.media_folder(media, request) else {
            return Ok(());
        };
        FileManager::ensure_dir(&folder)?;

        info!("Downloading subtitle for {} - {} (ID: {}).", media.full_title, year, media.id);

        let tracks = subtitles
            .iter()
            .filter(|track| language_utils::tags_match_exactly(&track.code, &request.language));
        for track in tracks {
            info!("Subtitle Name: {} - Language Code: {}", track.name, track.code);
            self.process_track(source, media, track, &folder, request, summary).await;
        }
        Ok(())
    }

    async fn process_track<S: MediaSource>(
        &self,
        source: &S,
        media: &Media,
        track: &SubtitleTrack,
        folder: &Path,
        request: &SubripRequest,
        summary: &mut BatchSummary,
    ) {
        let Some(url) = track.download_url() else {
            warn!("Subtitle {} of {} has no download URL", track.code, media.id);
            summary.failed += 1;
            return;
        };

        let file_name = FileManager::subtitle_file_name(&media.full_title, media.year(), &track.code, media.id, url);
        let path = folder.join(file_name);

        let data = match source.download(url).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to download {}: {}", url, e);
                summary.failed += 1;
                return;
            }
        };
        if let Err(e) = FileManager::write_bytes(&path, &data) {
            error!("{:#}", e);
            summary.failed += 1;
            return;
        }
        summary.downloaded += 1;

        if !request.convert_to_srt {
            return;
        }

        let converted = match self.converter_for(&track.code) {
            Ok(converter) => self.record(converter.convert_file(&path, None), &path, summary),
            Err(e) => {
                error!("{:#}", e);
                summary.failed += 1;
                false
            }
        };

        if converted && !request.keep_original {
            if let Err(e) = FileManager::remove_file(&path) {
                warn!("{:#}", e);
            }
        }
    }

    fn record(&self, result: Result<bool, SubtitleError>, path: &Path, summary: &mut BatchSummary) -> bool {
        match result {
            Ok(true) => {
                summary.converted += 1;
                true
            }
            Ok(false) => {
                summary.unrecognized += 1;
                false
            }
            Err(e) => {
                error!("Failed to convert {}: {}", path.display(), e);
                summary.failed += 1;
                false
            }
        }
    }

    /// Convert local subtitle files and directories to SRT
    ///
    /// `output` is only honoured when exactly one file is converted.
    pub fn convert_paths(&self, inputs: &[PathBuf], output: Option<&Path>) -> Result<BatchSummary> {
        let files = FileManager::collect_inputs(inputs)?;
        if files.is_empty() {
            return Err(anyhow!("No subtitle files found"));
        }
        if output.is_some() && files.len() > 1 {
            return Err(anyhow!("An output path can only be given for a single input file"));
        }

        let progress = ProgressBar::new(files.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style.progress_chars("=>-"));

        let mut summary = BatchSummary::default();
        for file in &files {
            progress.set_message(file.display().to_string());
            info!("Converting {}", file.display());
            let result = self.converter.convert_file(file, output);
            self.record(result, file, &mut summary);
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!("Converted {} of {} files.", summary.converted, summary.attempted());
        Ok(summary)
    }
}
