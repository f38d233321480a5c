use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ApiError;

// @module: Media catalogue response models

/// Envelope of a `findmedia` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FindMediaResponse {
    pub find_media_result: Option<FindMediaResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FindMediaResult {
    #[serde(default)]
    pub movies: Option<Vec<Media>>,
}

/// A title of the catalogue: a movie, a series, a season or an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Media {
    pub id: u64,

    #[serde(default)]
    pub parent_id: Option<u64>,

    #[serde(default)]
    pub full_title: String,

    #[serde(default)]
    pub metadata: Option<Metadata>,

    #[serde(default)]
    pub file_info: Option<FileInfo>,

    #[serde(default)]
    pub serie_info: Option<SerieInfo>,

    #[serde(default)]
    pub childs: Option<Vec<Media>>,
}

impl Media {
    /// Release year, 0 when unknown
    pub fn year(&self) -> u32 {
        self.metadata.as_ref().and_then(|m| m.year).unwrap_or(0)
    }

    pub fn subtitles(&self) -> &[SubtitleTrack] {
        self.file_info
            .as_ref()
            .and_then(|info| info.subtitles.as_deref())
            .unwrap_or_default()
    }

    pub fn children(&self) -> &[Media] {
        self.childs.as_deref().unwrap_or_default()
    }

    /// Series position label such as "1ª Temporada - Episódio 3", when this is an episode
    pub fn position(&self) -> Option<&str> {
        self.serie_info
            .as_ref()
            .and_then(|info| info.position.as_deref())
            .filter(|position| !position.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata {
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<u32>,

    #[serde(default)]
    pub synopsis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct FileInfo {
    #[serde(default)]
    pub subtitles: Option<Vec<SubtitleTrack>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SerieInfo {
    #[serde(default)]
    pub episode_name: Option<String>,

    #[serde(default)]
    pub position: Option<String>,

    #[serde(default)]
    pub season_name: Option<String>,
}

/// One subtitle track of a media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SubtitleTrack {
    #[serde(default)]
    pub name: String,

    /// Language tag, e.g. "pt-BR"
    #[serde(default)]
    pub code: String,

    #[serde(default, rename = "UrlVTT")]
    pub url_vtt: Option<String>,

    #[serde(default, rename = "UrlTTM")]
    pub url_ttm: Option<String>,

    #[serde(default, rename = "UrlSRT")]
    pub url_srt: Option<String>,
}

impl SubtitleTrack {
    /// WebVTT URL first, then the TTML one
    pub fn download_url(&self) -> Option<&str> {
        [&self.url_vtt, &self.url_ttm]
            .into_iter()
            .filter_map(|url| url.as_deref())
            .find(|url| !url.trim().is_empty())
    }
}

// The service sends the year either as a number or as a string
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Extract the first media of a `findmedia` response body
pub fn parse_find_media_response(body: &str, media_id: u64) -> Result<Media, ApiError> {
    let response: FindMediaResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::ParseError(format!("Invalid findmedia response: {}", e)))?;

    response
        .find_media_result
        .and_then(|result| result.movies)
        .and_then(|movies| movies.into_iter().next())
        .ok_or_else(|| ApiError::MediaNotFound {
            media_id,
            response: body.to_string(),
        })
}
