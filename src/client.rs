use std::env;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{ChatReply, ChatRequest};

/// Environment variable naming the server base URL.
pub const ENDPOINT_URL_ENV: &str = "PHOENIX_CHAT_URL";

/// Base URL used when nothing else is configured.
pub const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:5000/";

/// Request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The remote completion boundary.
///
/// `send` carries one user turn and returns the parsed reply body.
/// `reset_history` asks the server to forget any context it holds for this
/// client; callers treat it as best effort.
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Sends a message (and any attached files) and waits for the reply.
    async fn send(&self, request: ChatRequest) -> Result<ChatReply>;

    /// Clears server-held conversation context.
    async fn reset_history(&self) -> Result<()>;
}

/// HTTP client for a Phoenix chat server.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl HttpEndpoint {
    /// Create a new endpoint client.
    ///
    /// The base URL can be provided directly or read from the PHOENIX_CHAT_URL
    /// environment variable; otherwise a local server on port 5000 is assumed.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new endpoint client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(ENDPOINT_URL_ENV).unwrap_or_else(|_| DEFAULT_ENDPOINT_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::network(
                    format!("Failed to build HTTP client: {}", e),
                    None,
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            Error::validation(
                format!("Invalid endpoint path {path}: {e}"),
                Some("endpoint_url".to_string()),
            )
        })
    }

    fn form(request: ChatRequest) -> Result<Form> {
        let mut form = Form::new().text("message", request.message);
        for file in request.files {
            let part = Part::bytes(file.data.to_vec())
                .file_name(file.name)
                .mime_str(file.mime)
                .map_err(|e| {
                    Error::validation(
                        format!("Invalid attachment type: {}", e),
                        Some("files[]".to_string()),
                    )
                })?;
            form = form.part("files[]", part);
        }
        Ok(form)
    }

    /// Process error responses and convert to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::network(
                    format!("Failed to read error response: {}", e),
                    Some(status_code),
                    Some(Box::new(e)),
                );
            }
        };

        let error_message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or(error_body);
        Error::network(
            format!("Server returned {status_code}: {error_message}"),
            Some(status_code),
            None,
        )
    }

    async fn post(&self, path: &str, form: Option<Form>) -> Result<Response> {
        let url = self.url(path)?;
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let request = self.client.post(url.clone());
        let request = match form {
            Some(form) => request.multipart(form),
            None => request,
        };
        let result = request.send().await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        let response = result.inspect_err(|_| {
            CLIENT_REQUEST_ERRORS.click();
        })?;
        debug!(%url, status = response.status().as_u16(), "chat server responded");
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatEndpoint for HttpEndpoint {
    async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
        let form = Self::form(request)?;
        let response = self.post("api/chat", Some(form)).await?;
        response.json::<ChatReply>().await.map_err(|e| {
            Error::network(
                format!("Failed to parse response: {}", e),
                None,
                Some(Box::new(e)),
            )
        })
    }

    async fn reset_history(&self) -> Result<()> {
        self.post("api/reset", None).await?;
        Ok(())
    }
}

/// Parses a base URL, making sure relative joins stay under its path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| {
        Error::validation(
            format!("Invalid endpoint URL {raw}: {e}"),
            Some("endpoint_url".to_string()),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::validation(
            format!("Endpoint URL must be http or https: {raw}"),
            Some("endpoint_url".to_string()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let endpoint = HttpEndpoint::new(Some("http://localhost:5000/phoenix".to_string())).unwrap();
        assert_eq!(
            endpoint.url("api/chat").unwrap().as_str(),
            "http://localhost:5000/phoenix/api/chat"
        );
    }

    #[test]
    fn default_base_url_targets_api_paths() {
        let endpoint =
            HttpEndpoint::with_options(Some(DEFAULT_ENDPOINT_URL.to_string()), None).unwrap();
        assert_eq!(
            endpoint.url("api/reset").unwrap().as_str(),
            "http://127.0.0.1:5000/api/reset"
        );
        assert_eq!(endpoint.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn rejects_non_http_urls() {
        let err = HttpEndpoint::new(Some("ftp://example.com".to_string())).unwrap_err();
        assert!(err.is_validation());
        let err = HttpEndpoint::new(Some("not a url".to_string())).unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_failure() {
        let endpoint = HttpEndpoint::with_options(
            Some("http://127.0.0.1:9/".to_string()),
            Some(Duration::from_millis(500)),
        )
        .unwrap();
        let err = endpoint.send(ChatRequest::new("hello")).await.unwrap_err();
        assert!(err.is_network_failure());
        let err = endpoint.reset_history().await.unwrap_err();
        assert!(err.is_network_failure());
    }
}
