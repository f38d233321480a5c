use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::subtitle::{ConvertOptions, LineEnding, SrtWriter};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Language tag of the subtitles to download (e.g. "pt-BR")
    #[serde(default = "default_language")]
    pub language: String,

    /// Folder where downloaded subtitles are stored
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Keep the original subtitle file next to the converted one
    #[serde(default)]
    pub keep_original: bool,

    /// Convert downloaded subtitles to SRT
    #[serde(default = "default_true")]
    pub convert_to_srt: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Media service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Conversion pipeline settings
    #[serde(default)]
    pub conversion: ConversionConfig,
}

/// Media service configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServiceConfig {
    // @field: Application ticket sent with every request
    #[serde(default = "default_authentication_ticket")]
    pub authentication_ticket: String,

    // @field: Base URL of the media catalogue service
    #[serde(default = "default_service_media_url")]
    pub service_media_url: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    // @field: User agent of the official client
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            authentication_ticket: default_authentication_ticket(),
            service_media_url: default_service_media_url(),
            request_timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Subtitle conversion configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConversionConfig {
    // @field: Output encoding label
    #[serde(default = "default_encoding")]
    pub encoding: String,

    // @field: Skip the repair pass
    #[serde(default)]
    pub skip_post_processing: bool,

    // @field: Keep short gaps between cues
    #[serde(default)]
    pub keep_short_gaps: bool,

    // @field: Gaps below this many ms are closed
    #[serde(default = "default_short_gap_threshold_ms")]
    pub short_gap_threshold_ms: u64,

    // @field: Line terminator of written files
    #[serde(default)]
    pub line_ending: LineEnding,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            encoding: default_encoding(),
            skip_post_processing: false,
            keep_short_gaps: false,
            short_gap_threshold_ms: default_short_gap_threshold_ms(),
            line_ending: LineEnding::default(),
        }
    }
}

impl ConversionConfig {
    /// Converter options for a language
    pub fn to_options(&self, language: Option<&str>) -> ConvertOptions {
        ConvertOptions {
            language: language.map(str::to_string),
            encoding: self.encoding.clone(),
            skip_post_processing: self.skip_post_processing,
            keep_short_gaps: self.keep_short_gaps,
            short_gap_threshold_ms: self.short_gap_threshold_ms,
            line_ending: self.line_ending,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_language() -> String {
    "pt-BR".to_string()
}

fn default_output_folder() -> String {
    "Subtitles".to_string()
}

fn default_true() -> bool {
    true
}

fn default_authentication_ticket() -> String {
    "looke@looke:v7c8ad@#$".to_string()
}

fn default_service_media_url() -> String {
    "https://looke-service-media.delightfulwave-5cfdd77b.brazilsouth.azurecontainerapps.io".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "okhttp/4.10.0".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_short_gap_threshold_ms() -> u64 {
    crate::subtitle::fixer::DEFAULT_SHORT_GAP_THRESHOLD_MS
}

impl Config {
    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .context(format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .context(format!("Failed to write config to file: {}", path.display()))?;

        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(anyhow!("Subtitle language must not be empty"));
        }

        if self.output_folder.trim().is_empty() {
            return Err(anyhow!("Output folder must not be empty"));
        }

        if self.service.service_media_url.trim().is_empty() {
            return Err(anyhow!("Media service URL must not be empty"));
        }
        url::Url::parse(&self.service.service_media_url)
            .context(format!("Invalid media service URL: {}", self.service.service_media_url))?;

        if self.service.request_timeout_secs == 0 {
            return Err(anyhow!("Request timeout must be greater than zero"));
        }

        SrtWriter::new(&self.conversion.encoding)
            .map_err(|e| anyhow!("Invalid conversion encoding: {}", e))?;

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            language: default_language(),
            output_folder: default_output_folder(),
            keep_original: false,
            convert_to_srt: true,
            log_level: LogLevel::default(),
            service: ServiceConfig::default(),
            conversion: ConversionConfig::default(),
        }
    }
}
