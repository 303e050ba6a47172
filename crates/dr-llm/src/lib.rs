//! OpenAI-compatible chat completion streaming.
//!
//! [`Client`] implements [`dr_core::GenerationProvider`]: each request posts
//! the prompt to `<base_url>/chat/completions` with `stream: true` and relays
//! the server-sent deltas as [`StreamChunk`]s. Every failure becomes a single
//! error chunk that ends the stream.

mod sse;

use std::fmt;
use std::time::Duration;

use dr_core::{ChunkStream, GenerationProvider, GenerationRequest, GenerationSettings, StreamChunk};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use sse::{SseDecoder, SseEvent};

/// LLM client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// The response body broke off mid-stream.
    #[error("failed to read response stream: {0}")]
    Body(#[source] reqwest::Error),
}

/// Chat completions client.
///
/// Credentials and timeouts come with each [`GenerationRequest`], so one
/// client serves any number of configurations. Clones share the connection
/// pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    pub fn new() -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(LlmError::ClientBuild)?;
        Ok(Self { http })
    }

    /// Streams the completion for `request`.
    ///
    /// The stream always ends with exactly one terminal chunk (done or error).
    pub fn stream(&self, request: GenerationRequest) -> impl Stream<Item = StreamChunk> + Send + 'static {
        let http = self.http.clone();
        async_stream::stream! {
            let response = match send(&http, &request.settings, &request.prompt).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(error = %err, base_url = %request.settings.base_url, "completion request failed");
                    yield StreamChunk::error(err.to_string());
                    return;
                }
            };

            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            while let Some(bytes) = body.next().await {
                let bytes = match bytes {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        let err = LlmError::Body(err);
                        tracing::warn!(error = %err, "completion stream broke off");
                        yield StreamChunk::error(err.to_string());
                        return;
                    }
                };
                for event in decoder.push(&bytes) {
                    let chunk = into_chunk(event);
                    let terminal = chunk.is_terminal();
                    yield chunk;
                    if terminal {
                        return;
                    }
                }
            }

            if let Some(event) = decoder.finish() {
                let chunk = into_chunk(event);
                let terminal = chunk.is_terminal();
                yield chunk;
                if terminal {
                    return;
                }
            }
            yield StreamChunk::done();
        }
    }
}

impl GenerationProvider for Client {
    fn open_stream(&self, request: GenerationRequest) -> ChunkStream {
        Box::pin(self.stream(request))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

async fn send(
    http: &reqwest::Client,
    settings: &GenerationSettings,
    prompt: &str,
) -> Result<reqwest::Response, LlmError> {
    let body = ChatRequest {
        model: &settings.model,
        messages: [Message {
            role: "user",
            content: prompt,
        }],
        temperature: settings.temperature,
        stream: true,
    };

    tracing::debug!(model = %settings.model, prompt_chars = prompt.len(), "requesting completion");
    let response = http
        .post(completions_url(&settings.base_url))
        .bearer_auth(&settings.api_key)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status: status.as_u16(),
            message: parse_api_error(&body).unwrap_or(body),
        });
    }
    Ok(response)
}

fn parse_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.error.message)
}

fn into_chunk(event: SseEvent) -> StreamChunk {
    match event {
        SseEvent::Content(text) => StreamChunk::content(text),
        SseEvent::Done => StreamChunk::done(),
        SseEvent::Error(message) => StreamChunk::error(message),
    }
}
