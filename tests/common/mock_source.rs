/*!
 * In-memory media source for controller tests
 */

use std::collections::HashMap;
use std::sync::Mutex;

use lookerip::api::body::Group;
use lookerip::api::models::{FileInfo, Media, Metadata, SerieInfo, SubtitleTrack};
use lookerip::app_controller::MediaSource;
use lookerip::errors::ApiError;

/// Media catalogue backed by maps, recording every lookup
#[derive(Default)]
pub struct MockSource {
    medias: HashMap<u64, Media>,
    files: HashMap<String, Vec<u8>>,
    lookups: Mutex<Vec<(u64, Option<String>)>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.medias.insert(media.id, media);
        self
    }

    pub fn with_file(mut self, url: &str, data: impl Into<Vec<u8>>) -> Self {
        self.files.insert(url.to_string(), data.into());
        self
    }

    /// Looked up ids with the name of the extra group, in call order
    pub fn lookups(&self) -> Vec<(u64, Option<String>)> {
        self.lookups.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl MediaSource for MockSource {
    async fn find_media(&self, media_id: u64, groups_extra: Option<Group>) -> Result<Media, ApiError> {
        if let Ok(mut calls) = self.lookups.lock() {
            calls.push((media_id, groups_extra.map(|g| g.group_name)));
        }
        self.medias.get(&media_id).cloned().ok_or_else(|| ApiError::MediaNotFound {
            media_id,
            response: "{}".to_string(),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.files.get(url).cloned().ok_or_else(|| ApiError::ApiError {
            status_code: 404,
            message: format!("{} not found", url),
        })
    }
}

/// A subtitle track with a WebVTT URL
pub fn track(code: &str, url: &str) -> SubtitleTrack {
    SubtitleTrack {
        name: code.to_string(),
        code: code.to_string(),
        url_vtt: Some(url.to_string()),
        ..SubtitleTrack::default()
    }
}

/// A movie with subtitle tracks
pub fn movie(id: u64, title: &str, year: u32, tracks: Vec<SubtitleTrack>) -> Media {
    Media {
        id,
        full_title: title.to_string(),
        metadata: Some(Metadata { year: Some(year), synopsis: None }),
        file_info: Some(FileInfo { subtitles: Some(tracks) }),
        ..Media::default()
    }
}

/// An episode of `parent_id`, titled "{series} - {season}ª Temporada - Episódio {number}"
pub fn episode(id: u64, parent_id: u64, series: &str, season: u32, number: u32, tracks: Vec<SubtitleTrack>) -> Media {
    let position = format!("{}ª Temporada - Episódio {}", season, number);
    Media {
        id,
        parent_id: Some(parent_id),
        full_title: format!("{} - {}", series, position),
        metadata: Some(Metadata { year: Some(2020), synopsis: None }),
        file_info: Some(FileInfo { subtitles: Some(tracks) }),
        serie_info: Some(SerieInfo {
            episode_name: None,
            position: Some(position),
            season_name: None,
        }),
        childs: None,
    }
}

/// A container (series or season) listing `children`
pub fn container(id: u64, parent_id: Option<u64>, title: &str, children: Vec<Media>) -> Media {
    Media {
        id,
        parent_id,
        full_title: title.to_string(),
        childs: Some(children),
        ..Media::default()
    }
}
