// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use chrono::Datelike;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use lookerip::api::LookeClient;
use lookerip::app_config::{self, Config};
use lookerip::app_controller::{self, BatchSummary, Controller, SubripRequest};
use lookerip::subtitle::LineEnding;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for LineEnding to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLineEnding {
    Lf,
    Crlf,
}

impl From<CliLineEnding> for LineEnding {
    fn from(cli_line_ending: CliLineEnding) -> Self {
        match cli_line_ending {
            CliLineEnding::Lf => LineEnding::Lf,
            CliLineEnding::Crlf => LineEnding::CrLf,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download subtitles of a media and convert them to SRT
    Subrip(SubripArgs),

    /// Convert local subtitle files or directories to SRT
    Convert(ConvertArgs),

    /// Print version
    Version,

    /// Generate shell completions for lookerip
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct SubripArgs {
    /// Media id, or the URL of the media page
    #[arg(value_name = "MEDIA_ID")]
    media_id: String,

    /// Language code of the subtitles to download (default: pt-BR)
    #[arg(short, long)]
    language: Option<String>,

    /// Folder to save subtitles in (default: Subtitles)
    #[arg(short, long)]
    output_folder: Option<PathBuf>,

    /// Season number to download
    #[arg(short, long)]
    season: Option<u32>,

    /// Download every season, overrides --season
    #[arg(short, long)]
    all_season: bool,

    /// Keep the original subtitle file after conversion
    #[arg(short, long)]
    keep: bool,

    /// Do not convert downloaded subtitles to SRT
    #[arg(long)]
    no_convert: bool,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Subtitle files or directories to convert
    #[arg(value_name = "INPUT_PATH", required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (single input file only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Language tag of the subtitles, selects language specific fixes
    #[arg(short, long)]
    language: Option<String>,

    /// Output encoding (utf-8, utf-8-sig, utf-16, windows-1252, ...)
    #[arg(short, long)]
    encoding: Option<String>,

    /// Skip the repair pass
    #[arg(long)]
    skip_post_processing: bool,

    /// Keep short gaps between cues
    #[arg(long)]
    keep_short_gaps: bool,

    /// Line ending of written files
    #[arg(long, value_enum)]
    line_ending: Option<CliLineEnding>,
}

/// lookerip - subtitle ripper for the Looke catalogue
///
/// Downloads subtitles of movies and series and converts WebVTT, TTML, SAMI,
/// Bilibili JSON and MP4 embedded captions to SubRip.
#[derive(Parser, Debug)]
#[command(name = "lookerip")]
#[command(version)]
#[command(about = "Download Looke subtitles and convert them to SRT")]
#[command(long_about = "lookerip downloads subtitles from the Looke catalogue and converts them to SubRip (SRT).

EXAMPLES:
    lookerip subrip 12345                          # Download pt-BR subtitles of a movie
    lookerip subrip -s 2 -l en 67890               # Second season, English subtitles
    lookerip subrip -a https://looke.test/serie/1  # Every season of a series
    lookerip convert episode.vtt                   # Convert a local file to episode.srt
    lookerip convert -e windows-1252 Subtitles/    # Convert a whole directory
    lookerip completions bash > lookerip.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug level logs
    #[arg(short, long, global = true)]
    debug: bool,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Configuration file path
    #[arg(short, long = "config", global = true, default_value = "conf.json")]
    config_path: String,
}

impl CommandLineOptions {
    // Level requested on the command line, -d wins
    fn requested_level(&self) -> Option<app_config::LogLevel> {
        if self.debug {
            Some(app_config::LogLevel::Debug)
        } else {
            self.log_level.clone().map(Into::into)
        }
    }
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI colour for a log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "31"),
            Level::Warn => ("WARN ", "33"),
            Level::Info => ("INFO ", "32"),
            Level::Debug => ("DEBUG", "36"),
            Level::Trace => ("TRACE", "35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[1;{}m{} {} {}\x1B[0m", colour, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the max level filters
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // If log level is set via command line, apply it immediately
    let requested_level = cli.requested_level();
    if let Some(level) = &requested_level {
        log::set_max_level(level.to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "lookerip", &mut std::io::stdout());
            Ok(())
        }
        Commands::Version => {
            let current_year = chrono::Local::now().year();
            info!(
                "lookerip version {} Copyright (c) {}",
                env!("CARGO_PKG_VERSION"),
                app_controller::copyright_years(current_year)
            );
            Ok(())
        }
        Commands::Subrip(args) => {
            let config = load_config(&cli.config_path, requested_level)?;
            run_subrip(args, config).await
        }
        Commands::Convert(args) => {
            let config = load_config(&cli.config_path, requested_level)?;
            run_convert(args, config)
        }
    }
}

// Load the configuration, or write the default one when the file is missing
fn load_config(config_path: &str, requested_level: Option<app_config::LogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        Config::from_file(Path::new(config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        config
            .save(Path::new(config_path))
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    // Update log level in config if specified via command line
    match requested_level {
        Some(level) => config.log_level = level,
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    Ok(config)
}

async fn run_subrip(args: SubripArgs, mut config: Config) -> Result<()> {
    let media_id = app_controller::parse_media_id(&args.media_id)?;

    // Override config with CLI options if provided
    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    if let Some(output_folder) = &args.output_folder {
        config.output_folder = output_folder.to_string_lossy().to_string();
    }

    let mut request = SubripRequest::from_config(media_id, &config);
    request.season = args.season;
    request.all_seasons = args.all_season;
    request.keep_original |= args.keep;
    request.convert_to_srt &= !args.no_convert;

    let client = LookeClient::new(&config.service)?;
    let controller = Controller::with_config(config)?;

    let summary = controller.subrip(&client, &request).await?;
    check_summary(&summary)
}

fn run_convert(args: ConvertArgs, mut config: Config) -> Result<()> {
    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    if let Some(encoding) = &args.encoding {
        config.conversion.encoding = encoding.clone();
    }
    if let Some(line_ending) = args.line_ending {
        config.conversion.line_ending = line_ending.into();
    }
    config.conversion.skip_post_processing |= args.skip_post_processing;
    config.conversion.keep_short_gaps |= args.keep_short_gaps;

    // Only tag cues with a language the user asked for
    let controller = if args.language.is_some() {
        Controller::with_config(config)?
    } else {
        Controller::without_language(config)?
    };

    let summary = controller.convert_paths(&args.inputs, args.output.as_deref())?;
    check_summary(&summary)
}

fn check_summary(summary: &BatchSummary) -> Result<()> {
    if summary.all_failed() {
        error!("Every subtitle conversion failed.");
        return Err(anyhow!("{} of {} conversions failed", summary.failures(), summary.attempted()));
    }
    Ok(())
}
