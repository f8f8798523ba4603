// OpenAI-compatible chat completions client (HTTP direct, no SDK)

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::accumulator::snapshot_stream;
use super::provider::{
    GenerationError, GenerationProvider, GenerationRequest, PartialObjectStream,
};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

pub struct OpenAiProvider {
    http_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    /// The key may be absent; every `generate` call then fails with a
    /// configuration error before any request is made.
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GenerationError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn build_request(&self, request: &GenerationRequest) -> Value {
        // o1 and gpt-5 families take max_completion_tokens instead of max_tokens
        let token_field = if self.model.starts_with("o1") || self.model.starts_with("gpt-5") {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };

        let mut body = json!({
            "model": self.model,
            "stream": true,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "schema": request.schema,
                    "strict": false,
                }
            },
        });
        if let Some(obj) = body.as_object_mut() {
            obj.insert(token_field.to_string(), json!(request.max_output_tokens));
        }
        body
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<PartialObjectStream, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GenerationError::Configuration("OPENAI_API_KEY is not set".to_string())
        })?;

        let body = self.build_request(&request);
        debug!(
            "Starting {} generation with {} max tokens",
            request.schema_name, request.max_output_tokens
        );

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Generation provider returned {}: {}", status, body);
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        Ok(snapshot_stream(content_deltas(response.bytes_stream())))
    }
}

/// Parse an SSE byte stream into the text content deltas of the first choice.
pub fn content_deltas<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, GenerationError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    async_stream::stream! {
        let mut chunks = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::with_capacity(4096);

        'outer: while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(GenerationError::Network(format!("Stream error: {}", e)));
                    break;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim();

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    break 'outer;
                }

                match serde_json::from_str::<ChatStreamChunk>(data) {
                    Ok(parsed) => {
                        for choice in parsed.choices.into_iter().take(1) {
                            if let Some(content) = choice.delta.content {
                                if !content.is_empty() {
                                    yield Ok(content);
                                }
                            }
                            if choice.finish_reason.as_deref() == Some("length") {
                                warn!("Generation stopped at the output token ceiling");
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(GenerationError::Schema(format!("Bad stream chunk: {}", e)));
                        break 'outer;
                    }
                }
            }
        }
    }
}
