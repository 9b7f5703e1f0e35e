use std::time::SystemTime;

use energy_client::domain::RemoteReading;
use serde::Deserialize;

use crate::{
    paging::{self, FIRST_PAGE},
    pipeline::{Envelope, ReadingSource, ReadingStream, SyncError},
};

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    count: Option<i64>,
    #[serde(default)]
    results: Vec<RemoteReading>,
}

/// Client for one building's monitoring endpoint.
///
/// The API returns one page per call, oldest first, so a fetch probes page
/// one for the total count and then requests only the last page, which holds
/// the newest readings.
#[derive(Debug, Clone)]
pub struct MonitoringApiSource {
    building: String,
    url: String,
    http: reqwest::Client,
}

impl MonitoringApiSource {
    pub fn new(http: reqwest::Client, base_url: &str, endpoint: &str, building: impl Into<String>) -> Self {
        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        Self {
            building: building.into(),
            url,
            http,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn unavailable(&self, reason: String) -> SyncError {
        metrics::counter!("sync_source_unavailable_total").increment(1);
        SyncError::SourceUnavailable {
            building: self.building.clone(),
            reason,
        }
    }

    /// `Ok(None)` when the API answers with an empty body.
    async fn fetch_page(&self, page: u64) -> Result<Option<PageResponse>, SyncError> {
        tracing::debug!(building = %self.building, url = %self.url, page, "requesting monitoring page");

        let resp = self
            .http
            .get(&self.url)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| self.unavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("http error status={}", status.as_u16())));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| self.unavailable(format!("failed to read response body: {e}")))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice::<Option<PageResponse>>(&body)
            .map_err(|e| self.unavailable(format!("malformed response body: {e}")))
    }
}

#[async_trait::async_trait]
impl ReadingSource for MonitoringApiSource {
    fn building(&self) -> &str {
        &self.building
    }

    async fn stream(&self) -> ReadingStream {
        let this = self.clone();
        let s = async_stream::try_stream! {
            if let Some(probe) = this.fetch_page(FIRST_PAGE).await? {
                let results = match paging::last_page(probe.count) {
                    None | Some(0) => Vec::new(),
                    Some(last) if last == FIRST_PAGE => probe.results,
                    Some(last) => this
                        .fetch_page(last)
                        .await?
                        .map(|page| page.results)
                        .unwrap_or_default(),
                };

                for reading in results {
                    yield Envelope {
                        payload: reading,
                        received_at: SystemTime::now(),
                    };
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use httpmock::prelude::*;
    use serde_json::json;

    const ENDPOINT: &str = "/api/by-hour/energy_meter_a/";

    fn reading_json(id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "timestamp": "2024-05-01T10:00:00",
            "tensaoa": 220.0,
            "potativatotal": 1.5,
            "created_at": "2024-05-01T10:00:03"
        })
    }

    fn source_for(server: &MockServer) -> MonitoringApiSource {
        MonitoringApiSource::new(reqwest::Client::new(), &server.base_url(), ENDPOINT, "Building A")
    }

    async fn collect_ids(source: &MonitoringApiSource) -> Result<Vec<i64>, SyncError> {
        let items: Vec<Envelope<RemoteReading>> = source.stream().await.try_collect().await?;
        Ok(items.into_iter().map(|e| e.payload.id).collect())
    }

    #[tokio::test]
    async fn fetches_last_page_computed_from_probe_count() {
        let server = MockServer::start_async().await;
        let probe = server
            .mock_async(|when, then| {
                when.method(GET).path(ENDPOINT).query_param("page", "1");
                then.status(200)
                    .json_body(json!({ "count": 23, "results": (1..=10).map(reading_json).collect::<Vec<_>>() }));
            })
            .await;
        let last = server
            .mock_async(|when, then| {
                when.method(GET).path(ENDPOINT).query_param("page", "3");
                then.status(200)
                    .json_body(json!({ "count": 23, "results": [reading_json(21), reading_json(22), reading_json(23)] }));
            })
            .await;

        let ids = collect_ids(&source_for(&server)).await.unwrap();

        assert_eq!(ids, vec![21, 22, 23]);
        probe.assert_async().await;
        last.assert_async().await;
    }

    #[tokio::test]
    async fn single_page_result_reuses_probe_response() {
        let server = MockServer::start_async().await;
        let probe = server
            .mock_async(|when, then| {
                when.method(GET).path(ENDPOINT).query_param("page", "1");
                then.status(200)
                    .json_body(json!({ "count": 2, "results": [reading_json(1), reading_json(2)] }));
            })
            .await;

        let ids = collect_ids(&source_for(&server)).await.unwrap();

        assert_eq!(ids, vec![1, 2]);
        probe.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn empty_body_yields_no_readings() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(ENDPOINT);
                then.status(200);
            })
            .await;

        let ids = collect_ids(&source_for(&server)).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn zero_missing_or_negative_count_skips_second_request() {
        let bodies = [
            json!({ "count": 0, "results": [] }),
            json!({ "results": [reading_json(1)] }),
            json!({ "count": -3, "results": [reading_json(1)] }),
        ];

        for body in bodies {
            let server = MockServer::start_async().await;
            let any_page = server
                .mock_async(|when, then| {
                    when.method(GET).path(ENDPOINT);
                    then.status(200).json_body(body.clone());
                })
                .await;

            let ids = collect_ids(&source_for(&server)).await.unwrap();

            assert!(ids.is_empty(), "body {body} yielded {ids:?}");
            any_page.assert_hits_async(1).await;
        }
    }

    #[tokio::test]
    async fn non_success_status_is_source_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(ENDPOINT);
                then.status(503);
            })
            .await;

        let err = collect_ids(&source_for(&server)).await.unwrap_err();
        match err {
            SyncError::SourceUnavailable { building, reason } => {
                assert_eq!(building, "Building A");
                assert!(reason.contains("503"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_on_last_page_is_source_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(ENDPOINT).query_param("page", "1");
                then.status(200).json_body(json!({ "count": 15, "results": [] }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(ENDPOINT).query_param("page", "2");
                then.status(500);
            })
            .await;

        let err = collect_ids(&source_for(&server)).await.unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_source_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(ENDPOINT);
                then.status(200).body("<html>gateway timeout</html>");
            })
            .await;

        let err = collect_ids(&source_for(&server)).await.unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_source_unavailable() {
        let source = MonitoringApiSource::new(reqwest::Client::new(), "http://127.0.0.1:1", ENDPOINT, "Building A");
        let err = collect_ids(&source).await.unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable { .. }));
    }

    #[test]
    fn joins_base_url_and_endpoint() {
        let source = MonitoringApiSource::new(
            reqwest::Client::new(),
            "http://10.0.0.5:30125/",
            "/api/by-hour/energy_meter_c/",
            "Building C",
        );
        assert_eq!(source.url(), "http://10.0.0.5:30125/api/by-hour/energy_meter_c/");
        assert_eq!(source.building(), "Building C");
    }
}
