//! Chat completion backend client
//!
//! Speaks the OpenAI-compatible `/chat/completions` streaming API:
//! the response is an event stream of `data: {chunk json}` frames ending
//! with `data: [DONE]`. Each chunk carries a text delta at
//! `choices[0].delta.content`.

use async_trait::async_trait;
use dugout_common::FrameDecoder;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::generation::{GenerationError, TextGenerator, TokenStream};

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// One decoded backend frame
#[derive(Debug, PartialEq, Eq)]
enum BackendChunk {
    /// Text delta (possibly empty, e.g. the role-only first chunk)
    Delta(String),
    /// End-of-stream sentinel
    Finished,
}

fn decode_payload(payload: &str) -> Result<BackendChunk, GenerationError> {
    if payload.trim() == DONE_SENTINEL {
        return Ok(BackendChunk::Finished);
    }

    let chunk: ChatChunk = serde_json::from_str(payload)
        .map_err(|e| GenerationError::Parse(format!("{}: {}", e, payload)))?;

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();

    Ok(BackendChunk::Delta(text))
}

/// Chat completion API client
///
/// Constructed once at startup from `BackendConfig` and shared.
pub struct ChatCompletionClient {
    http_client: reqwest::Client,
    config: BackendConfig,
}

impl ChatCompletionClient {
    pub fn new(config: BackendConfig) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn stream_completion(&self, prompt: &str) -> Result<TokenStream, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::NotConfigured("API key missing".to_string()))?;

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        tracing::debug!(url = %url, model = %self.config.model, "Requesting streamed completion");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(status.as_u16(), error_text));
        }

        let mut bytes = Box::pin(response.bytes_stream());

        let stream = async_stream::stream! {
            let mut decoder = FrameDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(GenerationError::Network(e.to_string()));
                        return;
                    }
                };

                let payloads = match decoder.push(&chunk) {
                    Ok(payloads) => payloads,
                    Err(e) => {
                        yield Err(GenerationError::Parse(e.to_string()));
                        return;
                    }
                };

                for payload in payloads {
                    match decode_payload(&payload) {
                        Ok(BackendChunk::Finished) => return,
                        Ok(BackendChunk::Delta(text)) => {
                            if !text.is_empty() {
                                yield Ok(text);
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            // Body ended without the sentinel: the connection dropped
            yield Err(GenerationError::Interrupted);
        };

        Ok(Box::pin(stream))
    }
}
