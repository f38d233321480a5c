use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use crate::api::body::{self, Group};
use crate::api::models::{parse_find_media_response, Media};
use crate::app_config::ServiceConfig;
use crate::errors::ApiError;

/// Client for the media catalogue service
#[derive(Debug, Clone)]
pub struct LookeClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the media service
    service_media_url: String,
    /// Application ticket
    authentication_ticket: String,
}

impl LookeClient {
    /// Create a new client from the service configuration
    pub fn new(config: &ServiceConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            service_media_url: config.service_media_url.trim_end_matches('/').to_string(),
            authentication_ticket: config.authentication_ticket.clone(),
        })
    }

    /// URL of the `findmedia` endpoint
    pub fn find_media_url(&self) -> String {
        format!("{}/v1/android/findmedia", self.service_media_url)
    }

    /// Build the `findmedia` request without sending it
    pub fn build_find_media_request(&self, media_id: u64, groups_extra: Option<Group>) -> RequestBuilder {
        let payload = body::find_media_body(&self.authentication_ticket, media_id, groups_extra);
        self.client.post(self.find_media_url()).json(&payload)
    }

    /// Look a media up by id
    pub async fn find_media(&self, media_id: u64, groups_extra: Option<Group>) -> Result<Media, ApiError> {
        debug!("Looking up media {}", media_id);
        let response = self.build_find_media_request(media_id, groups_extra).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!("Media service error ({}): {}", status, text);
            return Err(ApiError::ApiError {
                status_code: status.as_u16(),
                message: text,
            });
        }

        parse_find_media_response(&text, media_id)
    }

    /// Download a subtitle file
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        debug!("Downloading {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(ApiError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
