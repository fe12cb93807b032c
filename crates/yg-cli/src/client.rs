use std::time::Duration;

use yg_core::api::{self, ApiError, Submission};
use yg_core::segments::FetchTicket;
use yg_core::Segment;

/// HTTP side of the segment service.
pub struct SegmentClient {
    http: reqwest::Client,
}

impl SegmentClient {
    pub fn new() -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ytguard/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self { http })
    }

    /// GET the ticket's URL. A 404 is an empty list.
    pub async fn fetch(&self, ticket: &FetchTicket) -> Result<Vec<Segment>, ApiError> {
        log::debug!("GET {}", ticket.url);
        let response = self
            .http
            .get(&ticket.url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        api::segments_from_response(status, &body)
    }

    pub async fn submit(&self, submission: &Submission) -> Result<(), ApiError> {
        let body = submission.to_json()?;
        log::debug!("POST {} {}", submission.url, body);
        let response = self
            .http
            .post(&submission.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(status.as_u16()))
        }
    }
}
