//! Remote segment service wire format
//!
//! Request construction and response decoding only. The host performs the
//! actual HTTP exchange.

use serde::{Deserialize, Serialize};

use crate::types::{Segment, SegmentCategory};
use crate::url::encode_uri_component;

/// Error from a segment service exchange.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Network(String),
    #[error("Service returned HTTP {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// `GET` endpoint for an item's segments in the given categories.
pub fn segments_url(base: &str, item_id: &str, categories: &[SegmentCategory]) -> String {
    let names: Vec<&str> = categories.iter().map(|category| category.as_str()).collect();
    // Serializing a list of plain strings cannot fail
    let list = serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string());
    format!(
        "{}/skipSegments?videoID={}&categories={}",
        base.trim_end_matches('/'),
        encode_uri_component(item_id),
        encode_uri_component(&list)
    )
}

/// `POST` endpoint for submissions.
pub fn submit_url(base: &str) -> String {
    format!("{}/skipSegments", base.trim_end_matches('/'))
}

/// One entry of the service's segment list.
#[derive(Debug, Clone, Deserialize)]
struct RawSegment {
    segment: [f64; 2],
    category: SegmentCategory,
    #[serde(default, rename = "UUID")]
    uuid: String,
    #[serde(default)]
    votes: i64,
    #[serde(default, deserialize_with = "lenient_bool")]
    locked: bool,
    #[serde(default)]
    description: Option<String>,
}

// `locked` arrives as 0/1 from some mirrors
fn lenient_bool<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    })
}

impl From<RawSegment> for Segment {
    fn from(raw: RawSegment) -> Self {
        Segment {
            category: raw.category,
            start_time: raw.segment[0],
            end_time: raw.segment[1],
            id: raw.uuid,
            votes: raw.votes,
            locked: raw.locked,
            description: raw.description.unwrap_or_default(),
        }
    }
}

/// Decode a segment list response.
///
/// Entries with an empty or inverted range are dropped.
pub fn parse_segments(body: &str) -> Result<Vec<Segment>, ApiError> {
    let raw: Vec<RawSegment> = serde_json::from_str(body)?;
    let total = raw.len();
    let segments: Vec<Segment> = raw
        .into_iter()
        .map(Segment::from)
        .filter(|segment| segment.start_time.is_finite() && segment.end_time > segment.start_time)
        .collect();
    if segments.len() < total {
        log::warn!("Dropped {} segments with invalid ranges", total - segments.len());
    }
    Ok(segments)
}

/// Map an HTTP exchange to a segment list. The service answers 404 when an
/// item has no segments.
pub fn segments_from_response(status: u16, body: &str) -> Result<Vec<Segment>, ApiError> {
    match status {
        200..=299 => parse_segments(body),
        404 => Ok(Vec::new()),
        other => Err(ApiError::Status(other)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedSegment {
    pub segment: [f64; 2],
    pub category: SegmentCategory,
}

/// Body of a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionBody {
    #[serde(rename = "videoID")]
    pub item_id: String,
    pub segments: Vec<SubmittedSegment>,
    #[serde(rename = "userID")]
    pub user_id: String,
}

/// A ready-to-send submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub url: String,
    pub body: SubmissionBody,
}

impl Submission {
    pub fn to_json(&self) -> Result<String, ApiError> {
        Ok(serde_json::to_string(&self.body)?)
    }
}
