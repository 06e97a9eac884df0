use crate::core::backend::{BackendError, ErrorContext, IndexBackend};
use crate::core::config::ServerConfig;
use crate::core::job::{CancelJobResponse, JobSnapshot, StartJobResponse};
use crate::core::models::DataPath;
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use std::io;
use std::time::Duration;

const USER_AGENT: &str = "indexr/1.0";

/// HTTP implementation of the indexing service operations
pub struct HttpBackend {
    config: ServerConfig,
    data_path: DataPath,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: ServerConfig, data_path: DataPath) -> Self {
        let client = Client::new();
        Self {
            config,
            data_path,
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }
}

#[async_trait]
impl IndexBackend for HttpBackend {
    async fn job_status(&self) -> io::Result<JobSnapshot> {
        let url = self.endpoint("/api/index/status");

        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.request_timeout())
            .send()
            .await
            .map_err(|e| {
                ErrorContext::new("job_status")
                    .with_error("network_error", &e.to_string())
                    .with_request_details(&url, None, None)
                    .log_error(&self.data_path);
                io::Error::from(BackendError::ConnectionError(format!(
                    "status request failed: {e}"
                )))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            ErrorContext::new("job_status")
                .with_error("api_error", &format!("HTTP {status}"))
                .with_request_details(&url, Some(status.as_u16()), Some(&error_text))
                .log_error(&self.data_path);

            return Err(BackendError::ApiError(format!(
                "status endpoint returned {status}: {error_text}"
            ))
            .into());
        }

        let snapshot: JobSnapshot = response.json().await.map_err(|e| {
            ErrorContext::new("job_status")
                .with_error("json_parse_error", &e.to_string())
                .with_request_details(&url, None, None)
                .log_error(&self.data_path);
            io::Error::from(BackendError::DataParseError(format!(
                "invalid status payload: {e}"
            )))
        })?;

        Ok(snapshot)
    }

    async fn start_job(&self) -> io::Result<StartJobResponse> {
        let url = self.endpoint("/api/index/start");
        info!("Requesting new indexing run from {url}");

        let response = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.request_timeout())
            .send()
            .await
            .map_err(|e| {
                ErrorContext::new("start_job")
                    .with_error("network_error", &e.to_string())
                    .with_request_details(&url, None, None)
                    .log_error(&self.data_path);
                io::Error::from(BackendError::ConnectionError(format!(
                    "start request failed: {e}"
                )))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            ErrorContext::new("start_job")
                .with_error("api_error", &format!("HTTP {status}"))
                .with_request_details(&url, Some(status.as_u16()), Some(&error_text))
                .log_error(&self.data_path);

            return Err(BackendError::ApiError(format!(
                "start endpoint returned {status}: {error_text}"
            ))
            .into());
        }

        let start: StartJobResponse = response.json().await.map_err(|e| {
            ErrorContext::new("start_job")
                .with_error("json_parse_error", &e.to_string())
                .with_request_details(&url, None, None)
                .log_error(&self.data_path);
            io::Error::from(BackendError::DataParseError(format!(
                "invalid start payload: {e}"
            )))
        })?;

        Ok(start)
    }

    async fn cancel_job(&self, task_id: &str) -> io::Result<CancelJobResponse> {
        let url = self.endpoint("/api/index/cancel");
        info!("Requesting cancellation of indexing run {task_id}");

        let response = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.request_timeout())
            .json(&serde_json::json!({ "task_id": task_id }))
            .send()
            .await
            .map_err(|e| {
                ErrorContext::new("cancel_job")
                    .with_error("network_error", &e.to_string())
                    .with_request_details(&url, None, None)
                    .with_metadata("task_id", task_id)
                    .log_error(&self.data_path);
                io::Error::from(BackendError::ConnectionError(format!(
                    "cancel request failed: {e}"
                )))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            ErrorContext::new("cancel_job")
                .with_error("api_error", &format!("HTTP {status}"))
                .with_request_details(&url, Some(status.as_u16()), Some(&error_text))
                .with_metadata("task_id", task_id)
                .log_error(&self.data_path);

            return Err(BackendError::ApiError(format!(
                "cancel endpoint returned {status}: {error_text}"
            ))
            .into());
        }

        let cancel: CancelJobResponse = response.json().await.map_err(|e| {
            ErrorContext::new("cancel_job")
                .with_error("json_parse_error", &e.to_string())
                .with_request_details(&url, None, None)
                .with_metadata("task_id", task_id)
                .log_error(&self.data_path);
            io::Error::from(BackendError::DataParseError(format!(
                "invalid cancel payload: {e}"
            )))
        })?;

        Ok(cancel)
    }
}
