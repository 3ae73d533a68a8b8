//! Client for the external natural-language detection service.

use crate::config::PageConfig;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NlError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for NlError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NlError::Parse(err.to_string())
        } else {
            NlError::Http(err.to_string())
        }
    }
}

/// The place the NL service resolved the query to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NlPlace {
    pub dcid: String,
    pub name: String,
    pub place_type: String,
}

/// Topics related to the query, used to suggest follow-up questions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelatedThings {
    pub child_topics: Vec<String>,
    pub peer_topics: Vec<String>,
}

/// Detection result: a resolved place plus a page config describing
/// which charts answer the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NlResponse {
    pub place: NlPlace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PageConfig>,
    pub related_things: RelatedThings,
}

impl NlResponse {
    /// Whether a place was resolved; without one the query has a
    /// defined empty result.
    pub fn has_place(&self) -> bool {
        !self.place.dcid.is_empty()
    }
}

/// Detection service client, object safe for injection.
pub trait NlApi: Send + Sync {
    fn detect_and_fulfill<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<NlResponse, NlError>>;
}

/// reqwest-backed client for `POST /api/explore/detect-and-fulfill`.
pub struct ReqwestNlClient {
    client: reqwest::Client,
    api_root: String,
}

#[derive(Serialize)]
struct DetectRequestBody {
    #[serde(rename = "contextHistory")]
    context_history: serde_json::Value,
    dc: String,
}

impl ReqwestNlClient {
    /// Creates a client against the given API root with default
    /// configuration. Detection can take a while, so the timeout is
    /// generous.
    pub fn new(api_root: &str) -> Result<Self, NlError> {
        Self::with_timeout(api_root, Duration::from_secs(60))
    }

    pub fn with_timeout(api_root: &str, timeout: Duration) -> Result<Self, NlError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chartpipe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NlError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
        })
    }
}

impl NlApi for ReqwestNlClient {
    fn detect_and_fulfill<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<NlResponse, NlError>> {
        Box::pin(async move {
            let url = format!("{}/api/explore/detect-and-fulfill", self.api_root);
            let response = self
                .client
                .post(&url)
                .query(&[("q", query)])
                .json(&DetectRequestBody {
                    context_history: serde_json::json!({}),
                    dc: String::new(),
                })
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(NlError::Status {
                    status: status.as_u16(),
                    url,
                });
            }
            Ok(response.json::<NlResponse>().await?)
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Canned detection result for orchestrator tests.
    #[derive(Clone, Default)]
    pub struct MockNlApi {
        pub response: Option<NlResponse>,
        pub error: Option<String>,
    }

    impl NlApi for MockNlApi {
        fn detect_and_fulfill<'a>(
            &'a self,
            _query: &'a str,
        ) -> BoxFuture<'a, Result<NlResponse, NlError>> {
            let result = match &self.error {
                Some(message) => Err(NlError::Http(message.clone())),
                None => Ok(self.response.clone().unwrap_or_default()),
            };
            Box::pin(std::future::ready(result))
        }
    }

    #[test]
    fn test_has_place_requires_a_dcid() {
        assert!(!NlResponse::default().has_place());
        let resolved = NlResponse {
            place: NlPlace {
                dcid: "geoId/06".to_string(),
                name: "California".to_string(),
                place_type: "State".to_string(),
            },
            ..Default::default()
        };
        assert!(resolved.has_place());
    }
}
