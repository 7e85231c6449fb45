//! REST API client for the remote enhancement service.
//!
//! Wraps the service's HTTP endpoints (image description, enhancement
//! submission, job polling, result retrieval) using [`reqwest`].
//! Enhancement is a long-running remote generation: submission returns a
//! job id which is then polled until it reaches a terminal status.

use std::time::Duration;

use serde::Deserialize;

/// How often a pending job is re-checked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Hard ceiling on how long a single job may stay non-terminal.
pub const JOB_DEADLINE: Duration = Duration::from_secs(180);

/// HTTP client for one enhancement service endpoint.
pub struct EnhanceApi {
    client: reqwest::Client,
    api_url: String,
    /// Unique client ID sent with every submission so the service can
    /// correlate requests from this process.
    client_id: String,
}

/// Response returned by `POST /describe`.
#[derive(Debug, Deserialize)]
pub struct DescribeResponse {
    /// Natural-language description of the image content.
    pub description: String,
}

/// Response returned by `POST /enhance` after queuing a job.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the queued job.
    pub job_id: String,
}

/// Lifecycle status of a queued enhancement job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether polling can stop for this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Response returned by `GET /jobs/{id}`.
#[derive(Debug, Deserialize)]
pub struct JobResponse {
    pub status: JobStatus,
    /// Service failure message, set when `status` is `failed`.
    pub error: Option<String>,
}

/// Errors from the enhancement service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum EnhanceApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("enhancement service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service reported the job as failed.
    #[error("enhancement job failed: {0}")]
    JobFailed(String),

    /// The job did not reach a terminal status before the deadline.
    #[error("enhancement job {job_id} still not finished after {deadline_secs}s")]
    Deadline { job_id: String, deadline_secs: u64 },
}

impl EnhanceApi {
    /// Create a new API client for an enhancement service.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:9090`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            client_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across services).
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url,
            client_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Base HTTP API URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Ask the service to describe an image.
    ///
    /// Sends a `POST /describe` request with the image as a multipart
    /// part. Used only for smart-mode context analysis.
    pub async fn describe(&self, image: &[u8]) -> Result<String, EnhanceApiError> {
        let form = reqwest::multipart::Form::new().part(
            "image",
            reqwest::multipart::Part::bytes(image.to_vec()).file_name("frame.png"),
        );

        let response = self
            .client
            .post(format!("{}/describe", self.api_url))
            .multipart(form)
            .send()
            .await?;

        let parsed: DescribeResponse = Self::parse_response(response).await?;
        Ok(parsed.description)
    }

    /// Submit an enhancement job.
    ///
    /// Sends a `POST /enhance` request with the image, the method tag,
    /// and the prompt. Returns the server-assigned job id.
    pub async fn submit(
        &self,
        image: &[u8],
        method: &str,
        prompt: &str,
    ) -> Result<String, EnhanceApiError> {
        let form = reqwest::multipart::Form::new()
            .part(
                "image",
                reqwest::multipart::Part::bytes(image.to_vec()).file_name("frame.png"),
            )
            .text("method", method.to_string())
            .text("prompt", prompt.to_string())
            .text("client_id", self.client_id.clone());

        let response = self
            .client
            .post(format!("{}/enhance", self.api_url))
            .multipart(form)
            .send()
            .await?;

        let parsed: SubmitResponse = Self::parse_response(response).await?;
        Ok(parsed.job_id)
    }

    /// Fetch the current status of a job.
    ///
    /// Sends a `GET /jobs/{id}` request.
    pub async fn job_status(&self, job_id: &str) -> Result<JobResponse, EnhanceApiError> {
        let response = self
            .client
            .get(format!("{}/jobs/{}", self.api_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download the result image of a completed job.
    ///
    /// Sends a `GET /jobs/{id}/result` request and returns the raw bytes.
    pub async fn job_result(&self, job_id: &str) -> Result<Vec<u8>, EnhanceApiError> {
        let response = self
            .client
            .get(format!("{}/jobs/{}/result", self.api_url, job_id))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Poll a job until it completes, then download the result.
    ///
    /// Re-checks every [`POLL_INTERVAL`] up to [`JOB_DEADLINE`]. A failed
    /// job surfaces the service's failure message.
    pub async fn await_result(&self, job_id: &str) -> Result<Vec<u8>, EnhanceApiError> {
        let deadline = tokio::time::Instant::now() + JOB_DEADLINE;

        loop {
            let job = self.job_status(job_id).await?;
            match job.status {
                JobStatus::Completed => return self.job_result(job_id).await,
                JobStatus::Failed => {
                    return Err(EnhanceApiError::JobFailed(
                        job.error
                            .unwrap_or_else(|| "no failure message from service".to_string()),
                    ));
                }
                JobStatus::Queued | JobStatus::Running => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(EnhanceApiError::Deadline {
                            job_id: job_id.to_string(),
                            deadline_secs: JOB_DEADLINE.as_secs(),
                        });
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`EnhanceApiError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, EnhanceApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EnhanceApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, EnhanceApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
