/*!
 * Tests for the application controller against an in-memory catalogue
 */

use anyhow::Result;
use std::path::Path;

use lookerip::app_config::Config;
use lookerip::app_controller::{Controller, SubripRequest};
use crate::common;
use crate::common::mock_source::{container, episode, movie, track, MockSource};

fn request_for(media_id: u64, output: &Path) -> SubripRequest {
    let mut request = SubripRequest::from_config(media_id, &Config::default());
    request.output_folder = output.to_path_buf();
    request
}

fn series_source() -> MockSource {
    let season_one = vec![
        episode(1001, 901, "Série", 1, 1, vec![]),
        episode(1002, 901, "Série", 1, 2, vec![]),
    ];
    let season_two = vec![episode(1003, 902, "Série", 2, 1, vec![])];

    MockSource::new()
        .with_media(container(
            900,
            None,
            "Série",
            vec![
                container(901, Some(900), "Série - 1ª Temporada", vec![]),
                container(902, Some(900), "Série - 2ª Temporada", vec![]),
            ],
        ))
        .with_media(container(901, Some(900), "Série - 1ª Temporada", season_one))
        .with_media(container(902, Some(900), "Série - 2ª Temporada", season_two))
}

#[test]
fn test_subripRequest_fromConfig_shouldCopyDefaults() {
    let mut config = Config::default();
    config.keep_original = true;
    config.language = "en".to_string();

    let request = SubripRequest::from_config(5, &config);

    assert_eq!(request.media_id, 5);
    assert_eq!(request.language, "en");
    assert!(request.keep_original);
    assert!(request.convert_to_srt);
    assert_eq!(request.season, None);
    assert!(!request.all_seasons);
}

#[tokio::test]
async fn test_collectMedias_withoutSeason_shouldKeepMedia() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    let source = series_source();
    let data = episode(1001, 901, "Série", 1, 1, vec![]);

    let medias = controller.collect_medias(&source, data, &request_for(1001, Path::new("out"))).await?;

    assert_eq!(medias.len(), 1);
    assert_eq!(medias[0].id, 1001);
    assert!(source.lookups().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_collectMedias_withSeason_shouldGatherEveryEpisodeThroughParent() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    let source = series_source();
    let data = container(901, Some(900), "Série - 1ª Temporada", vec![]);
    let mut request = request_for(901, Path::new("out"));
    request.season = Some(2);

    let medias = controller.collect_medias(&source, data, &request).await?;

    let ids: Vec<u64> = medias.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1001, 1002, 1003]);
    assert_eq!(
        source.lookups(),
        vec![
            (900, Some("PlayDetails".to_string())),
            (901, None),
            (902, None),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_collectMedias_withoutParent_shouldUseOwnChildren() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    let source = MockSource::new();
    let data = container(950, Some(0), "Outra Série - 1ª Temporada", vec![
        episode(951, 950, "Outra Série", 1, 1, vec![]),
    ]);
    let mut request = request_for(950, Path::new("out"));
    request.all_seasons = true;

    let medias = controller.collect_medias(&source, data, &request).await?;

    assert_eq!(medias.len(), 1);
    assert_eq!(medias[0].id, 951);
    assert!(source.lookups().is_empty());
    Ok(())
}

#[test]
fn test_mediaFolder_withSeasonFilter_shouldSkipOtherSeasons() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    let first = episode(1001, 901, "Série", 1, 1, vec![]);
    let second = episode(1003, 902, "Série", 2, 1, vec![]);

    let mut request = request_for(901, Path::new("out"));
    request.season = Some(2);
    assert_eq!(controller.media_folder(&first, &request), None);
    assert_eq!(
        controller.media_folder(&second, &request),
        Some(Path::new("out").join("Série - S02"))
    );

    request.all_seasons = true;
    assert!(controller.media_folder(&first, &request).is_some());
    Ok(())
}

#[test]
fn test_mediaFolder_withoutSeasonRequest_shouldKeepEpisodeAndMovie() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    let request = request_for(1, Path::new("out"));

    let first_episode = episode(1001, 901, "Série", 1, 1, vec![]);
    let film = movie(10, "Filme", 2021, vec![]);

    assert_eq!(controller.media_folder(&first_episode, &request), Some(Path::new("out").join("Série - S01")));
    assert_eq!(controller.media_folder(&film, &request), Some(Path::new("out").join("Filme - 2021")));
    Ok(())
}

#[tokio::test]
async fn test_subrip_withOtherLanguages_shouldOnlyDownloadRequestedOne() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;
    let source = MockSource::new()
        .with_media(movie(
            10,
            "Filme",
            2021,
            vec![track("en", "https://cdn.test/10/en.vtt"), track("pt-BR", "https://cdn.test/10/pt.vtt")],
        ))
        .with_file("https://cdn.test/10/en.vtt", common::WEBVTT_SAMPLE)
        .with_file("https://cdn.test/10/pt.vtt", common::WEBVTT_SAMPLE);

    let summary = controller.subrip(&source, &request_for(10, temp_dir.path())).await?;

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.converted, 1);
    let folder = temp_dir.path().join("Filme - 2021");
    assert!(folder.join("Filme 2021 pt-BR 10.srt").exists());
    assert!(!folder.join("Filme 2021 en 10.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_subrip_withMissingFile_shouldCountFailure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;
    let source = MockSource::new().with_media(movie(
        11,
        "Filme",
        2021,
        vec![track("pt-BR", "https://cdn.test/11/pt.vtt")],
    ));

    let summary = controller.subrip(&source, &request_for(11, temp_dir.path())).await?;

    assert_eq!(summary.downloaded, 0);
    assert_eq!(summary.failed, 1);
    assert!(summary.all_failed());
    Ok(())
}

#[tokio::test]
async fn test_subrip_withUnknownPayload_shouldKeepRawFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;
    let source = MockSource::new()
        .with_media(movie(12, "Filme", 2021, vec![track("pt-BR", "https://cdn.test/12/pt.vtt")]))
        .with_file("https://cdn.test/12/pt.vtt", "not a subtitle at all");

    let summary = controller.subrip(&source, &request_for(12, temp_dir.path())).await?;

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.unrecognized, 1);
    let folder = temp_dir.path().join("Filme - 2021");
    assert!(folder.join("Filme 2021 pt-BR 12.vtt").exists());
    assert!(!folder.join("Filme 2021 pt-BR 12.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_subrip_withoutConversion_shouldOnlyDownload() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;
    let source = MockSource::new()
        .with_media(movie(13, "Filme", 2021, vec![track("pt-BR", "https://cdn.test/13/pt.vtt")]))
        .with_file("https://cdn.test/13/pt.vtt", common::WEBVTT_SAMPLE);
    let mut request = request_for(13, temp_dir.path());
    request.convert_to_srt = false;

    let summary = controller.subrip(&source, &request).await?;

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.attempted(), 0);
    let folder = temp_dir.path().join("Filme - 2021");
    assert!(folder.join("Filme 2021 pt-BR 13.vtt").exists());
    assert!(!folder.join("Filme 2021 pt-BR 13.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_subrip_withUnknownMedia_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;

    let result = controller.subrip(&MockSource::new(), &request_for(404, temp_dir.path())).await;

    let error = result.unwrap_err();
    assert!(format!("{:#}", error).contains("Media 404 not found"));
    Ok(())
}
