use anyhow::{Result, Context};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Extensions of subtitle files picked up when converting a directory
pub const SUBTITLE_EXTENSIONS: &[&str] = &[
    "vtt", "webvtt", "ttml", "dfxp", "xml", "smi", "sami", "json", "mp4", "ismt", "m4s",
];

// Characters that are not allowed in file names on common file systems
static RESERVED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap());
static REPEATED_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Strip characters that cannot appear in a file name, and trailing dots and spaces
    pub fn sanitize_filename(name: &str) -> String {
        let cleaned = RESERVED_CHARS.replace_all(name, "");
        let collapsed = REPEATED_SPACES.replace_all(&cleaned, " ");
        collapsed.trim().trim_end_matches(['.', ' ']).to_string()
    }

    // @generates: Folder name of a movie
    pub fn movie_folder(full_title: &str, year: u32) -> String {
        Self::sanitize_filename(&format!("{} - {}", full_title, year))
    }

    // @generates: Folder name of a series season
    pub fn season_folder(full_title: &str, season: u32) -> String {
        let series = full_title.split(" - ").next().unwrap_or(full_title).trim();
        Self::sanitize_filename(&format!("{} - S{:02}", series, season))
    }

    // @generates: Name of a downloaded subtitle file
    // @params: full_title, year, language code, media id, download url
    pub fn subtitle_file_name(full_title: &str, year: u32, code: &str, media_id: u64, url: &str) -> String {
        Self::sanitize_filename(&format!(
            "{} {} {} {}.{}",
            full_title,
            year,
            code,
            media_id,
            Self::url_extension(url)
        ))
    }

    /// Extension of the last path segment of a URL, query string ignored
    pub fn url_extension(url: &str) -> String {
        let path = url::Url::parse(url)
            .map(|parsed| parsed.path().to_string())
            .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or_default().to_string());
        let segment = path.rsplit('/').next().unwrap_or_default();
        match segment.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
            _ => "vtt".to_string(),
        }
    }

    /// Whether a path has one of the subtitle extensions
    pub fn is_subtitle_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| SUBTITLE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Find subtitle files under a directory, sorted by path
    pub fn find_subtitle_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && Self::is_subtitle_file(path) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Expand files and directories into the list of subtitle files to convert
    pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if Self::dir_exists(input) {
                files.extend(Self::find_subtitle_files(input)?);
            } else if Self::file_exists(input) {
                files.push(input.clone());
            } else {
                return Err(anyhow::anyhow!("Input does not exist: {:?}", input));
            }
        }
        Ok(files)
    }

    /// Write bytes to a file, creating the parent directory
    pub fn write_bytes<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))
    }

    /// Remove a file
    pub fn remove_file<P: AsRef<Path>>(path: P) -> Result<()> {
        fs::remove_file(&path).with_context(|| format!("Failed to remove file: {:?}", path.as_ref()))
    }
}
