//! HTTP client for the backend submission endpoints.

use crate::api::{ApiError, ApiResult};
use crate::config::ApiConfig;
use crate::session::state::QueryResult;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Client for the query backend.
///
/// One instance per application; submissions are cheap to clone out to
/// background tasks via `Arc`.
pub struct QueryApi {
    base_url: String,
    client: reqwest::Client,
    retry_attempts: u32,
    retry_base: Duration,
}

impl QueryApi {
    /// Creates a client from the API section of the config.
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            retry_attempts: config.retry_attempts.max(1),
            retry_base: Duration::from_millis(config.retry_base_ms),
        }
    }

    /// `POST /query` — upload the finalized query recording.
    ///
    /// Multipart fields: `id` (request id), `file` (WAV bytes).
    pub async fn submit_query(&self, request_id: Uuid, file: &Path) -> ApiResult<Uuid> {
        let audio = read_file(file).await?;
        let filename = file_name(file);
        let url = format!("{}/query", self.base_url);

        let response = self
            .send_with_retry(|| {
                let form = Form::new()
                    .text("id", request_id.to_string())
                    .part("file", wav_part(audio.clone(), filename.clone()));
                self.client.post(&url).multipart(form).send()
            })
            .await?;

        expect_uuid(response, StatusCode::CREATED).await
    }

    /// `POST /query/{id}/comment` — upload a voice-over comment.
    pub async fn submit_comment(&self, request_id: Uuid, file: &Path) -> ApiResult<Uuid> {
        let audio = read_file(file).await?;
        let filename = file_name(file);
        let url = format!("{}/query/{}/comment", self.base_url, request_id);

        let response = self
            .send_with_retry(|| {
                let form = Form::new().part("file", wav_part(audio.clone(), filename.clone()));
                self.client.post(&url).multipart(form).send()
            })
            .await?;

        expect_uuid(response, StatusCode::CREATED).await
    }

    /// `POST /query/{id}/results` — upload the recognized result list.
    pub async fn submit_results(
        &self,
        request_id: Uuid,
        results: &[QueryResult],
    ) -> ApiResult<Uuid> {
        let url = format!("{}/query/{}/results", self.base_url, request_id);
        let response = self
            .send_with_retry(|| self.client.post(&url).json(results).send())
            .await?;
        expect_uuid(response, StatusCode::OK).await
    }

    /// `POST /query/{id}/rating` — upload a single updated rating.
    pub async fn submit_rating(&self, request_id: Uuid, result: &QueryResult) -> ApiResult<Uuid> {
        let url = format!("{}/query/{}/rating", self.base_url, request_id);
        let response = self
            .send_with_retry(|| self.client.post(&url).json(result).send())
            .await?;
        expect_uuid(response, StatusCode::OK).await
    }

    /// Run a request, retrying transport failures with exponential
    /// backoff. Server responses (any status) are never retried here —
    /// status handling happens at the call site.
    async fn send_with_retry<F, Fut>(&self, mut request: F) -> ApiResult<reqwest::Response>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = reqwest::Result<reqwest::Response>>,
    {
        let mut delay = self.retry_base;
        let mut attempt = 1;
        loop {
            match request().await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry_attempts => {
                    eprintln!(
                        "voiq: submission attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, self.retry_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(ApiError::Network(e)),
            }
        }
    }
}

async fn read_file(path: &Path) -> ApiResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| ApiError::Server {
        message: format!("cannot read {}: {}", path.display(), e),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "query.wav".to_string())
}

fn wav_part(bytes: Vec<u8>, filename: String) -> Part {
    // The server keys on the filename in the content disposition; no
    // explicit content type is sent.
    Part::bytes(bytes).file_name(filename)
}

/// Map a response to the UUID the backend returns on success.
///
/// `expected` is 201 for uploads and 200 for JSON posts; 409 and other
/// non-success statuses become `ApiError::Server` carrying the body.
async fn expect_uuid(response: reqwest::Response, expected: StatusCode) -> ApiResult<Uuid> {
    let status = response.status();
    let body = response.text().await.map_err(ApiError::Network)?;

    if status == expected {
        return Uuid::parse_str(body.trim()).map_err(|_| ApiError::Server {
            message: format!("unexpected response body: {}", body),
        });
    }
    if status == StatusCode::CONFLICT {
        return Err(ApiError::Server {
            message: "Conflict".to_string(),
        });
    }
    Err(ApiError::Server { message: body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::Rating;

    fn api(attempts: u32) -> QueryApi {
        QueryApi::new(&ApiConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            retry_attempts: attempts,
            retry_base_ms: 1,
        })
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = api(1);
        assert_eq!(api.base_url, "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_network_error_after_bounded_retries() {
        // Port 9 (discard) refuses connections; all attempts fail with
        // a transport error and surface as ApiError::Network.
        let api = api(2);
        let result = QueryResult::new("corn", 0.5);
        let err = api.submit_rating(Uuid::new_v4(), &result).await;
        assert!(matches!(err, Err(ApiError::Network(_))));
    }

    #[tokio::test]
    async fn test_submit_query_missing_file() {
        let api = api(1);
        let err = api
            .submit_query(Uuid::new_v4(), Path::new("/nonexistent/query.wav"))
            .await;
        assert!(matches!(err, Err(ApiError::Server { .. })));
    }

    #[test]
    fn test_rating_payload_shape() {
        // The rating endpoint receives a single result with its rating
        let mut result = QueryResult::new("millet", 0.92);
        result.rating = Rating::Positive;
        let json = serde_json::to_string(&result).expect("serialize");
        assert!(json.contains("\"rating\":\"POSITIVE\""));
    }

    #[test]
    fn test_file_name_fallback() {
        assert_eq!(file_name(Path::new("/tmp/abc.wav")), "abc.wav");
        assert_eq!(file_name(Path::new("/")), "query.wav");
    }
}
