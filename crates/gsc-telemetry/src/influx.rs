//! InfluxDB (1.x HTTP API) sink

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    active_lines, exceeding_lines, ActiveSample, TelemetryError, TelemetryResult, TelemetrySink,
};

/// Sink writing line protocol to an InfluxDB server
pub struct InfluxSink {
    client: Client,
    base_url: String,
    database: String,
}

impl InfluxSink {
    /// Connect and create the database.
    ///
    /// Fails if the server does not acknowledge the database creation.
    pub async fn connect(
        url: impl Into<String>,
        database: impl Into<String>,
        timeout: Duration,
    ) -> TelemetryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        let sink = Self {
            client,
            base_url: url.into().trim_end_matches('/').to_string(),
            database: database.into(),
        };

        sink.create_database().await?;
        info!(url = %sink.base_url, database = %sink.database, "Created database");

        Ok(sink)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn create_database(&self) -> TelemetryResult<()> {
        let query = format!("CREATE DATABASE \"{}\"", self.database);
        let request = self
            .client
            .post(self.endpoint("query"))
            .query(&[("q", query.as_str())]);
        self.do_request(request, StatusCode::OK).await
    }

    async fn write(&self, body: String) -> TelemetryResult<()> {
        let request = self
            .client
            .post(self.endpoint("write"))
            .query(&[("db", self.database.as_str())])
            .body(body);
        self.do_request(request, StatusCode::NO_CONTENT).await
    }

    async fn do_request(&self, request: RequestBuilder, expect: StatusCode) -> TelemetryResult<()> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = %status, "HTTP request complete");

        if status != expect {
            warn!(status = %status, expected = %expect, "Request unsuccessful");
            return Err(TelemetryError::UnexpectedStatus {
                expected: expect.as_u16(),
                actual: status.as_u16(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for InfluxSink {
    async fn insert_active(&self, samples: &[ActiveSample]) -> TelemetryResult<()> {
        self.write(active_lines(samples)).await
    }

    async fn insert_exceeding(&self, names: &BTreeSet<String>) -> TelemetryResult<()> {
        self.write(exceeding_lines(names)).await
    }

    async fn ping(&self) -> TelemetryResult<()> {
        let request = self.client.get(self.endpoint("ping"));
        self.do_request(request, StatusCode::NO_CONTENT).await
    }
}
