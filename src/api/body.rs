/*!
 * Request body builders for the media catalogue.
 *
 * A `findmedia` query names the property groups, entities and paging options
 * the service should fill in. Callers may append one extra group or entity and
 * override individual options.
 */

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Media type id used by the catalogue for every title
pub const MEDIA_TYPE_TITLE: u32 = 31;

/// A property group requested from the service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    pub group_name: String,
    pub group_properties: String,
}

impl Group {
    pub fn new(name: &str, properties: &[&str]) -> Self {
        Self {
            group_name: name.to_string(),
            group_properties: properties.join("|"),
        }
    }
}

/// An entity requested from the service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entity {
    pub entity_name: String,
    pub entity_properties: String,
}

impl Entity {
    pub fn new(name: &str, properties: &[&str]) -> Self {
        Self {
            entity_name: name.to_string(),
            entity_properties: properties.join("|"),
        }
    }
}

/// Groups of a `findmedia` query, plus `extra` when given
pub fn groups(extra: Option<Group>) -> Vec<Group> {
    let mut groups = vec![
        Group::new("SerieInfo", &["EpisodeName", "Position", "SeasonName"]),
        Group::new(
            "Metadata",
            &[
                "Actors", "AverageRating", "Censure", "Country", "Description", "Directors",
                "Distributor", "Genres", "IsCinema", "PreOrderDate", "Synopsis", "TrailerUrl",
                "UniqueUrl", "Year",
            ],
        ),
        Group::new(
            "FileInfo",
            &[
                "Audios", "CreditStartsAt", "Definition", "DubbedInfo", "Duration",
                "RestrictDownloadBrazil", "RestrictDownloadBuy", "RestrictDownloadRent",
                "RestrictDownloadSVOD", "Subtitles",
            ],
        ),
        Group::new("Smooth", &["TimeFrameDistance", "TimeFrameUrl", "UrlDashStreaming"]),
        Group::new("Images", &["TypeId", "Url"]),
        Group::new("Price", &["FreePrice", "PreOrder", "PurchasePrice", "RentPrice", "SVODPrice"]),
    ];
    groups.extend(extra);
    groups
}

/// Group used to resolve the parent series of an episode
pub fn play_details_group() -> Group {
    Group::new("PlayDetails", &["LastPosition", "Status"])
}

/// Entities of a `findmedia` query, plus `extra` when given
pub fn entities(extra: Option<Entity>) -> Vec<Entity> {
    let mut entities = vec![Entity::new("Subtitles", &["UrlVTT", "UrlTTM", "UrlSRT", "Name", "Code"])];
    entities.extend(extra);
    entities
}

/// Query options; keys of `extra` override the defaults
pub fn options(extra: Option<Map<String, Value>>) -> Value {
    let mut options = json!({
        "BoxBehavior": "Group",
        "FillSiblings": false,
        "FillSiblingsChilds": false,
        "ImageTypeIds": [-1, 4001, 9001, 9011],
        "IncludeCinemaItens": true,
        "IncludeNullPriceItens": false,
        "IncludePreOrderItens": true,
        "OnlyEnabledItens": true,
        "OnlySVODItens": false,
        "PageNumber": 0,
        "RecordsPerPage": 50,
        "SortCriteria": "None",
        "SortOrder": "DESC",
        "UseApplePriceBRL": false,
    });
    if let (Some(map), Some(extra)) = (options.as_object_mut(), extra) {
        map.extend(extra);
    }
    options
}

/// Full `findmedia` request body
pub fn find_media_body(authentication_ticket: &str, media_id: u64, groups_extra: Option<Group>) -> Value {
    json!({
        "AuthenticationTicket": authentication_ticket,
        "Criteria": {
            "MediaId": media_id,
            "MediaType": MEDIA_TYPE_TITLE,
        },
        "Entities": entities(None),
        "Groups": groups(groups_extra),
        "Options": options(None),
    })
}
