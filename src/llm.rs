use crate::config::{ApiToken, Config};
use crate::error::{ChatError, ChatResult};
use crate::params::GenerationParams;
use crate::prompts::PROMPT_TEMPLATE;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Events emitted during LLM streaming
#[derive(Debug)]
pub enum LlmEvent {
    /// Text fragment from the streaming response
    TextDelta(String),
    /// Stream completed
    StreamComplete,
    /// Error occurred; no further events follow
    Error(ChatError),
}

/// Prompt plus sampling parameters for one turn
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(prompt: String, params: GenerationParams) -> Self {
        Self { prompt, params }
    }

    fn input(&self) -> PredictionInput<'_> {
        PredictionInput {
            prompt: &self.prompt,
            prompt_template: PROMPT_TEMPLATE,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictionInput<'a> {
    prompt: &'a str,
    prompt_template: &'static str,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct CreatePrediction<'a> {
    input: PredictionInput<'a>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    urls: PredictionUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionUrls {
    stream: Option<String>,
}

/// Client for Replicate's streaming predictions API
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    predictions_url: String,
    request_timeout: Duration,
}

impl LlmClient {
    pub fn new(config: &Config) -> ChatResult<Self> {
        let (owner, name) = config.model_parts()?;
        let predictions_url = format!(
            "{}/v1/models/{}/{}/predictions",
            config.base_url.trim_end_matches('/'),
            owner,
            name
        );

        // No overall timeout here: a response stream may legitimately run for minutes
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            predictions_url,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Start a streaming generation.
    ///
    /// Returns immediately; fragments arrive on the receiver as the service
    /// produces them, ending with either `StreamComplete` or `Error`.
    pub fn stream_response(&self, token: &ApiToken, request: GenerationRequest) -> mpsc::Receiver<LlmEvent> {
        let (tx, rx) = mpsc::channel(1000);

        let this = self.clone();
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = this.stream_prediction(&token, &request, &tx).await {
                warn!(error = %e, "generation failed");
                let _ = tx.send(LlmEvent::Error(e)).await;
            }
        });

        rx
    }

    async fn stream_prediction(
        &self,
        token: &ApiToken,
        request: &GenerationRequest,
        tx: &mpsc::Sender<LlmEvent>,
    ) -> ChatResult<()> {
        let prediction = self.create_prediction(token, request).await?;
        info!(prediction = %prediction.id, status = ?prediction.status, "prediction created");

        if let Some(error) = prediction.error.filter(|e| !e.is_null()) {
            return Err(ChatError::Stream(error_detail(&error.to_string())));
        }

        let stream_url = prediction.urls.stream.ok_or_else(|| {
            ChatError::Stream(format!("prediction {} has no stream URL", prediction.id))
        })?;

        let response = self
            .client
            .get(&stream_url)
            .bearer_auth(token.expose())
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-store")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, body });
        }

        Self::process_sse_stream(response, tx).await
    }

    async fn create_prediction(&self, token: &ApiToken, request: &GenerationRequest) -> ChatResult<Prediction> {
        let payload = CreatePrediction {
            input: request.input(),
            stream: true,
        };

        debug!(
            url = %self.predictions_url,
            prompt_len = request.prompt.len(),
            temperature = request.params.temperature,
            top_p = request.params.top_p,
            "creating prediction"
        );

        let response = self
            .client
            .post(&self.predictions_url)
            .bearer_auth(token.expose())
            .timeout(self.request_timeout)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, body });
        }

        Ok(response.json::<Prediction>().await?)
    }

    /// Read Replicate's server-sent events and forward output fragments
    async fn process_sse_stream(response: reqwest::Response, tx: &mpsc::Sender<LlmEvent>) -> ChatResult<()> {
        let mut stream = response.bytes_stream();
        let mut parser = SseParser::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in parser.push(&chunk) {
                if Self::dispatch(event, tx).await? {
                    return Ok(());
                }
            }
        }

        if let Some(event) = parser.finish() {
            if Self::dispatch(event, tx).await? {
                return Ok(());
            }
        }

        Err(ChatError::Stream("stream ended before completion".to_string()))
    }

    /// Handle one event; returns `Ok(true)` once the stream is done
    async fn dispatch(event: SseEvent, tx: &mpsc::Sender<LlmEvent>) -> ChatResult<bool> {
        match event.event.as_str() {
            "output" => {
                if !event.data.is_empty() {
                    // Receiver gone means nobody is listening; stop reading
                    if tx.send(LlmEvent::TextDelta(event.data)).await.is_err() {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            "error" => Err(ChatError::Stream(error_detail(&event.data))),
            "done" => {
                let reason = serde_json::from_str::<serde_json::Value>(&event.data)
                    .ok()
                    .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_string));
                match reason.as_deref() {
                    Some("error") => Err(ChatError::Stream("prediction failed".to_string())),
                    Some("canceled") => Err(ChatError::Stream("prediction was canceled".to_string())),
                    _ => {
                        let _ = tx.send(LlmEvent::StreamComplete).await;
                        Ok(true)
                    }
                }
            }
            other => {
                debug!(event = other, "ignoring stream event");
                Ok(false)
            }
        }
    }
}

/// Pull a human-readable message out of an error payload
fn error_detail(data: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(serde_json::Value::Object(map)) => map
            .get("detail")
            .and_then(|d| d.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string()),
        Ok(serde_json::Value::String(s)) => s,
        _ => data.to_string(),
    }
}

/// A single server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental server-sent-events parser.
///
/// Bytes are buffered until a full line is available, so UTF-8 sequences and
/// lines split across network chunks are reassembled before decoding.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every event it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    fn deltas(events: &[LlmEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                LlmEvent::TextDelta(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Flush a trailing line without newline and any pending event
    pub fn finish(mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() && event.is_none() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}
