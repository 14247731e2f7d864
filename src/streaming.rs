use crate::error::ChatError;
use crate::llm::LlmEvent;

/// Where a stream stands after an event has been applied
#[derive(Debug)]
pub enum StreamStatus {
    /// More fragments may follow
    Streaming,
    /// The stream finished; carries the full response
    Complete(String),
    /// The stream failed; the partial response has been discarded
    Failed(ChatError),
}

/// Accumulates streamed fragments into a single response
#[derive(Debug, Clone, Default)]
pub struct StreamController {
    text_buffer: String,
    fragments: usize,
    is_streaming: bool,
}

impl StreamController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new response, dropping anything left from the last one
    pub fn start_streaming(&mut self) {
        self.reset();
        self.is_streaming = true;
    }

    /// Apply an LLM event
    pub fn process_event(&mut self, event: LlmEvent) -> StreamStatus {
        if !self.is_streaming {
            return StreamStatus::Failed(ChatError::Stream("no response is being streamed".to_string()));
        }

        match event {
            LlmEvent::TextDelta(delta) => {
                self.text_buffer.push_str(&delta);
                self.fragments += 1;
                StreamStatus::Streaming
            }
            LlmEvent::StreamComplete => {
                self.is_streaming = false;
                StreamStatus::Complete(std::mem::take(&mut self.text_buffer))
            }
            LlmEvent::Error(error) => {
                self.is_streaming = false;
                self.text_buffer.clear();
                StreamStatus::Failed(error)
            }
        }
    }

    /// Text received so far in the current response
    pub fn partial(&self) -> &str {
        &self.text_buffer
    }

    /// Number of fragments received so far
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn reset(&mut self) {
        self.text_buffer.clear();
        self.fragments = 0;
        self.is_streaming = false;
    }
}
