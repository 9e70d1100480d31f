use crate::error::{ClientError, Result};
use crate::fetch::{ConfigDocument, ConfigSource, ScopedFile};
use crate::logs::{LogRecord, LogSink};
use crate::status::StatusReporter;
use async_trait::async_trait;
use nimbus_core::config::HttpConfig;
use nimbus_core::constants::{files, http};
use nimbus_core::model::{AuthToken, SchedulerJobId, Status};
use reqwest::{Client, RequestBuilder, Response};

/// HTTP side of the orchestrator: configuration downloads, status and job-id
/// callbacks and log forwarding, all authenticated with the same token header.
#[derive(Clone)]
pub struct HttpCallbacks {
    client: Client,
    token_header: String,
}

impl HttpCallbacks {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            token_header: config.token_header.clone(),
        })
    }

    fn authed(&self, builder: RequestBuilder, token: &AuthToken) -> RequestBuilder {
        builder.header(self.token_header.as_str(), token.expose())
    }

    async fn rejection(response: Response) -> String {
        let code = response.status();
        let body = response.text().await.unwrap_or_default();
        if body.trim().is_empty() {
            code.to_string()
        } else {
            format!("{}: {}", code, body.trim())
        }
    }

    async fn put(
        &self,
        url: &str,
        token: &AuthToken,
        param: &str,
        value: &str,
    ) -> std::result::Result<(), String> {
        let response = self
            .authed(self.client.put(url), token)
            .query(&[(param, value)])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for HttpCallbacks {
    async fn fetch(&self, url: &str, token: &AuthToken) -> Result<ConfigDocument> {
        let fetch_error = |message: String| ClientError::ConfigFetch {
            url: url.to_string(),
            message,
        };

        tracing::debug!("Fetching cluster configuration from {}", url);
        let response = self
            .authed(self.client.get(url), token)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(Self::rejection(response).await));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        ScopedFile::with_contents(files::CONFIG_PREFIX, &body)
    }
}

#[async_trait]
impl StatusReporter for HttpCallbacks {
    async fn push_status(&self, url: &str, token: &AuthToken, status: Status) -> Result<()> {
        tracing::info!("Reporting status '{}' to {}", status, url);
        self.put(url, token, http::STATUS_PARAM, status.as_str())
            .await
            .map_err(|message| ClientError::StatusPushFailure {
                url: url.to_string(),
                status: status.to_string(),
                message,
            })
    }

    async fn push_scheduler_job_id(
        &self,
        url: &str,
        token: &AuthToken,
        id: &SchedulerJobId,
    ) -> Result<()> {
        tracing::info!("Recording scheduler job id {} at {}", id, url);
        self.put(url, token, http::SCHEDULER_JOB_ID_PARAM, &id.0)
            .await
            .map_err(|message| ClientError::StatusPushFailure {
                url: url.to_string(),
                status: format!("{}={}", http::SCHEDULER_JOB_ID_PARAM, id),
                message,
            })
    }
}

#[async_trait]
impl LogSink for HttpCallbacks {
    async fn forward(&self, url: &str, token: &AuthToken, records: &[LogRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let forward_error = |message: String| ClientError::LogForward {
            url: url.to_string(),
            message,
        };

        let response = self
            .authed(self.client.post(url), token)
            .json(records)
            .send()
            .await
            .map_err(|e| forward_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(forward_error(Self::rejection(response).await));
        }
        Ok(())
    }
}
