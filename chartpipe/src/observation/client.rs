//! HTTP client abstraction for the observation API.
//!
//! The [`ObservationApi`] trait allows dependency injection and easier
//! testing by enabling mock clients; the pipeline only ever holds an
//! `Arc<dyn ObservationApi>`. Methods return boxed futures so the trait
//! stays object safe.

use super::types::{EventApiResponse, ObservationError, PointResponse, SeriesResponse};
use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Client for the observation, place and event endpoints.
pub trait ObservationApi: Send + Sync {
    /// `GET /api/observations/point` for an explicit entity list.
    fn get_point<'a>(
        &'a self,
        entities: &'a [String],
        variables: &'a [String],
        date: &'a str,
    ) -> BoxFuture<'a, Result<PointResponse, ObservationError>>;

    /// `GET /api/observations/point/within` for all children of
    /// `child_type` within `parent_entity`.
    fn get_point_within<'a>(
        &'a self,
        parent_entity: &'a str,
        child_type: &'a str,
        variables: &'a [String],
        date: &'a str,
    ) -> BoxFuture<'a, Result<PointResponse, ObservationError>>;

    /// `POST /api/observations/series` for an explicit entity list.
    fn get_series<'a>(
        &'a self,
        entities: &'a [String],
        variables: &'a [String],
    ) -> BoxFuture<'a, Result<SeriesResponse, ObservationError>>;

    /// `GET /api/observations/series/within` for all children of
    /// `child_type` within `parent_entity`.
    fn get_series_within<'a>(
        &'a self,
        parent_entity: &'a str,
        child_type: &'a str,
        variables: &'a [String],
    ) -> BoxFuture<'a, Result<SeriesResponse, ObservationError>>;

    /// `GET /api/place/name` for display names of the given dcids.
    fn get_place_names<'a>(
        &'a self,
        dcids: &'a [String],
    ) -> BoxFuture<'a, Result<HashMap<String, String>, ObservationError>>;

    /// Event data for the given event types affecting `place`.
    fn get_event_data<'a>(
        &'a self,
        event_type_dcids: &'a [String],
        place: &'a str,
        date: &'a str,
    ) -> BoxFuture<'a, Result<EventApiResponse, ObservationError>>;
}

/// Real observation client using reqwest.
#[derive(Clone)]
pub struct ReqwestObservationClient {
    client: reqwest::Client,
    api_root: String,
}

impl ReqwestObservationClient {
    /// Creates a client against the given API root with default
    /// configuration.
    pub fn new(api_root: &str) -> Result<Self, ObservationError> {
        Self::with_timeout(api_root, 30)
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(api_root: &str, timeout_secs: u64) -> Result<Self, ObservationError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(concat!("chartpipe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ObservationError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T, ObservationError> {
        let url = format!("{}{}", self.api_root, path);
        debug!(url = %url, "observation GET");
        let response = self.client.get(&url).query(&params).send().await?;
        if !response.status().is_success() {
            warn!(url = %url, status = response.status().as_u16(), "observation API error status");
            return Err(ObservationError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ObservationError> {
        let url = format!("{}{}", self.api_root, path);
        debug!(url = %url, "observation POST");
        let response = self.client.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            warn!(url = %url, status = response.status().as_u16(), "observation API error status");
            return Err(ObservationError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

fn repeated<'a>(key: &'a str, values: &[String]) -> Vec<(&'a str, String)> {
    values.iter().map(|v| (key, v.clone())).collect()
}

impl ObservationApi for ReqwestObservationClient {
    fn get_point<'a>(
        &'a self,
        entities: &'a [String],
        variables: &'a [String],
        date: &'a str,
    ) -> BoxFuture<'a, Result<PointResponse, ObservationError>> {
        Box::pin(async move {
            let mut params = repeated("entities", entities);
            params.extend(repeated("variables", variables));
            params.push(("date", date.to_string()));
            self.get_json("/api/observations/point", params).await
        })
    }

    fn get_point_within<'a>(
        &'a self,
        parent_entity: &'a str,
        child_type: &'a str,
        variables: &'a [String],
        date: &'a str,
    ) -> BoxFuture<'a, Result<PointResponse, ObservationError>> {
        Box::pin(async move {
            let mut params = repeated("variables", variables);
            params.push(("parentEntity", parent_entity.to_string()));
            params.push(("childType", child_type.to_string()));
            params.push(("date", date.to_string()));
            self.get_json("/api/observations/point/within", params).await
        })
    }

    fn get_series<'a>(
        &'a self,
        entities: &'a [String],
        variables: &'a [String],
    ) -> BoxFuture<'a, Result<SeriesResponse, ObservationError>> {
        Box::pin(async move {
            let body = serde_json::json!({
                "entities": entities,
                "variables": variables,
            });
            self.post_json("/api/observations/series", &body).await
        })
    }

    fn get_series_within<'a>(
        &'a self,
        parent_entity: &'a str,
        child_type: &'a str,
        variables: &'a [String],
    ) -> BoxFuture<'a, Result<SeriesResponse, ObservationError>> {
        Box::pin(async move {
            let mut params = repeated("variables", variables);
            params.push(("parentEntity", parent_entity.to_string()));
            params.push(("childType", child_type.to_string()));
            self.get_json("/api/observations/series/within", params).await
        })
    }

    fn get_place_names<'a>(
        &'a self,
        dcids: &'a [String],
    ) -> BoxFuture<'a, Result<HashMap<String, String>, ObservationError>> {
        Box::pin(async move {
            let params = repeated("dcids", dcids);
            self.get_json("/api/place/name", params).await
        })
    }

    fn get_event_data<'a>(
        &'a self,
        event_type_dcids: &'a [String],
        place: &'a str,
        date: &'a str,
    ) -> BoxFuture<'a, Result<EventApiResponse, ObservationError>> {
        Box::pin(async move {
            let mut params = repeated("eventTypes", event_type_dcids);
            params.push(("place", place.to_string()));
            params.push(("date", date.to_string()));
            self.get_json("/api/disaster-dashboard/event-data", params)
                .await
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Mock observation client for testing.
    ///
    /// Every method clones its canned response; errors are stored as
    /// strings and surfaced as [`ObservationError::Http`].
    #[derive(Clone)]
    pub struct MockObservationApi {
        pub point: Result<PointResponse, String>,
        pub series: Result<SeriesResponse, String>,
        pub place_names: HashMap<String, String>,
        pub events: Result<EventApiResponse, String>,
    }

    impl Default for MockObservationApi {
        fn default() -> Self {
            Self {
                point: Ok(PointResponse::default()),
                series: Ok(SeriesResponse::default()),
                place_names: HashMap::new(),
                events: Ok(EventApiResponse::default()),
            }
        }
    }

    fn to_err<T: Clone>(canned: &Result<T, String>) -> Result<T, ObservationError> {
        canned.clone().map_err(ObservationError::Http)
    }

    impl ObservationApi for MockObservationApi {
        fn get_point<'a>(
            &'a self,
            _entities: &'a [String],
            _variables: &'a [String],
            _date: &'a str,
        ) -> BoxFuture<'a, Result<PointResponse, ObservationError>> {
            Box::pin(std::future::ready(to_err(&self.point)))
        }

        fn get_point_within<'a>(
            &'a self,
            _parent_entity: &'a str,
            _child_type: &'a str,
            _variables: &'a [String],
            _date: &'a str,
        ) -> BoxFuture<'a, Result<PointResponse, ObservationError>> {
            Box::pin(std::future::ready(to_err(&self.point)))
        }

        fn get_series<'a>(
            &'a self,
            _entities: &'a [String],
            _variables: &'a [String],
        ) -> BoxFuture<'a, Result<SeriesResponse, ObservationError>> {
            Box::pin(std::future::ready(to_err(&self.series)))
        }

        fn get_series_within<'a>(
            &'a self,
            _parent_entity: &'a str,
            _child_type: &'a str,
            _variables: &'a [String],
        ) -> BoxFuture<'a, Result<SeriesResponse, ObservationError>> {
            Box::pin(std::future::ready(to_err(&self.series)))
        }

        fn get_place_names<'a>(
            &'a self,
            _dcids: &'a [String],
        ) -> BoxFuture<'a, Result<HashMap<String, String>, ObservationError>> {
            Box::pin(std::future::ready(Ok(self.place_names.clone())))
        }

        fn get_event_data<'a>(
            &'a self,
            _event_type_dcids: &'a [String],
            _place: &'a str,
            _date: &'a str,
        ) -> BoxFuture<'a, Result<EventApiResponse, ObservationError>> {
            Box::pin(std::future::ready(to_err(&self.events)))
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockObservationApi::default();
        let result = mock.get_point(&[], &[], "").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockObservationApi {
            point: Err("boom".to_string()),
            ..Default::default()
        };
        let result = mock.get_point(&[], &[], "").await;
        assert!(result.is_err());
    }
}
