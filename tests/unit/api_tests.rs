/*!
 * Tests for media service requests and responses
 */

use lookerip::api::body;
use lookerip::api::models::parse_find_media_response;
use lookerip::api::LookeClient;
use lookerip::app_config::ServiceConfig;

const SERIES: &str = r#"{"FindMediaResult":{"Movies":[{
    "Id": 900,
    "ParentId": null,
    "FullTitle": "Série",
    "Metadata": {"Year": 2020},
    "FileInfo": {"Subtitles": null},
    "SerieInfo": {"Position": ""},
    "Childs": [
        {"Id": 901, "ParentId": 900, "FullTitle": "Série - 1ª Temporada"},
        {"Id": 902, "ParentId": 900, "FullTitle": "Série - 2ª Temporada"}
    ]
}]}}"#;

#[test]
fn test_parseFindMediaResponse_withSeries_shouldListSeasons() {
    let media = parse_find_media_response(SERIES, 900).unwrap();

    assert_eq!(media.parent_id, None);
    assert_eq!(media.year(), 2020);
    assert!(media.subtitles().is_empty());
    assert_eq!(media.position(), None);
    assert_eq!(media.children().len(), 2);
    assert_eq!(media.children()[1].parent_id, Some(900));
}

#[test]
fn test_parseFindMediaResponse_withoutResult_shouldReturnNotFound() {
    let error = parse_find_media_response(r#"{"FindMediaResult":null}"#, 1).unwrap_err();
    assert!(error.to_string().contains("Media 1 not found"));
}

#[test]
fn test_findMediaBody_withPlayDetails_shouldAppendGroup() {
    let payload = body::find_media_body("ticket", 7, Some(body::play_details_group()));

    let groups = payload["Groups"].as_array().unwrap();
    assert_eq!(groups.len(), 7);
    assert_eq!(groups[6]["GroupName"], "PlayDetails");
    assert_eq!(payload["Options"]["ImageTypeIds"][1], 4001);
    assert_eq!(payload["Options"]["RecordsPerPage"], 50);
}

#[test]
fn test_buildFindMediaRequest_shouldSendJsonBody() {
    let config = ServiceConfig {
        service_media_url: "https://media.test".to_string(),
        ..ServiceConfig::default()
    };
    let client = LookeClient::new(&config).unwrap();

    let request = client.build_find_media_request(7, None).build().unwrap();

    assert_eq!(request.url().path(), "/v1/android/findmedia");
    let sent: serde_json::Value =
        serde_json::from_slice(request.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
    assert_eq!(sent["Criteria"]["MediaId"], 7);
    assert_eq!(sent["AuthenticationTicket"], config.authentication_ticket);
}
