//! Chat client seam and its HTTP implementation for the Ollama API.

use std::error::Error as _;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::types::ChatMessage;

/// Longest NDJSON record accepted from a streaming response.
const MAX_STREAM_LINE_BYTES: usize = 1024 * 1024;

/// Text chunks produced by a streaming chat request.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

/// A transport or backend failure, described in plain text.
///
/// The provider classifies failures by their description, so the text must
/// not embed request URLs.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ClientError(String);

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        let prefix = if e.is_connect() {
            Some("connection failed")
        } else if e.is_timeout() {
            Some("request timed out")
        } else {
            None
        };

        let e = e.without_url();
        let mut detail = e.to_string();
        let mut source = e.source();
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }

        match prefix {
            Some(prefix) => Self(format!("{prefix}: {detail}")),
            None => Self(detail),
        }
    }
}

/// The chat operations a backend adapter needs.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `messages` and wait for the full reply; `None` if it has no content.
    async fn chat(&self, model: &str, messages: &[ChatMessage])
        -> Result<Option<String>, ClientError>;

    /// Send `messages` and stream the reply as it is generated.
    async fn chat_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChunkStream, ClientError>;

    /// List installed models; doubles as a reachability probe.
    async fn list_models(&self) -> Result<Vec<String>, ClientError>;
}

/// HTTP client for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for the server at `base_url`.
    ///
    /// `timeout` bounds connecting and each non-streaming request. Streaming
    /// responses are not cut off once they have started.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    /// Server address.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        stream: bool,
    ) -> Result<Response, ClientError> {
        let request = ApiChatRequest {
            model,
            messages,
            stream,
        };

        debug!(model, stream, "sending request to Ollama API: {}", self.base_url);

        let mut builder = self.client.post(self.endpoint("/api/chat")).json(&request);
        if !stream {
            builder = builder.timeout(self.timeout);
        }
        check_status(builder.send().await?).await
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, ClientError> {
        let response = self.post_chat(model, messages, false).await?;
        let body: ApiChatResponse = response
            .json()
            .await
            .map_err(|e| ClientError::new(format!("invalid response body: {}", ClientError::from(e))))?;
        body.into_content()
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChunkStream, ClientError> {
        let response = self.post_chat(model, messages, true).await?;

        let bytes = response.bytes_stream().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, ClientError::from(e))
        });
        let codec = LinesCodec::new_with_max_length(MAX_STREAM_LINE_BYTES);
        let chunks = FramedRead::new(StreamReader::new(bytes), codec)
            .map_err(|e| match e {
                LinesCodecError::Io(io) => ClientError::new(io.to_string()),
                LinesCodecError::MaxLineLengthExceeded => ClientError::new(format!(
                    "invalid stream data: record longer than {MAX_STREAM_LINE_BYTES} bytes"
                )),
            })
            .try_filter_map(|line| futures::future::ready(parse_stream_line(&line)));

        Ok(chunks.boxed())
    }

    async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .timeout(self.timeout)
            .send()
            .await?;
        let tags: ApiTagsResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::new(format!("invalid response body: {}", ClientError::from(e))))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Turn a non-success status into an error carrying the server's message.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(ClientError::new(format!("Ollama returned HTTP {status}: {detail}")))
}

/// Parse one newline-delimited JSON record of a streamed reply.
fn parse_stream_line(line: &str) -> Result<Option<String>, ClientError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let chunk: ApiChatResponse = serde_json::from_str(line)
        .map_err(|e| ClientError::new(format!("invalid stream chunk: {e}")))?;
    chunk.into_content()
}

// API types

#[derive(Debug, Serialize)]
struct ApiChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    #[serde(default)]
    message: Option<ApiResponseMessage>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiChatResponse {
    fn into_content(self) -> Result<Option<String>, ClientError> {
        if let Some(error) = self.error {
            return Err(ClientError::new(error));
        }
        Ok(self
            .message
            .map(|m| m.content)
            .filter(|content| !content.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiTagsResponse {
    #[serde(default)]
    models: Vec<ApiModelTag>,
}

#[derive(Debug, Deserialize)]
struct ApiModelTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_line_content() {
        let line = r#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        assert_eq!(parse_stream_line(line).unwrap().as_deref(), Some("Hel"));
    }

    #[test]
    fn test_parse_stream_line_skips_blank_and_final() {
        assert_eq!(parse_stream_line("   ").unwrap(), None);
        let done = r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true}"#;
        assert_eq!(parse_stream_line(done).unwrap(), None);
    }

    #[test]
    fn test_parse_stream_line_error_record() {
        let err = parse_stream_line(r#"{"error":"model runner crashed"}"#).unwrap_err();
        assert_eq!(err.message(), "model runner crashed");
    }

    #[test]
    fn test_parse_stream_line_garbage() {
        let err = parse_stream_line("not json").unwrap_err();
        assert!(err.message().starts_with("invalid stream chunk"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.endpoint("/api/tags"), "http://localhost:11434/api/tags");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("hi")];
        let request = ApiChatRequest {
            model: "llama3",
            messages: &messages,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }
}
