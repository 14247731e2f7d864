use crate::config::{ApiToken, Config};
use crate::conversation::{Conversation, Message};
use crate::error::{ChatError, ChatResult};
use crate::llm::{GenerationRequest, LlmClient, LlmEvent};
use crate::params::GenerationParams;
use crate::prompts::format_prompt;
use crate::streaming::{StreamController, StreamStatus};
use strum::Display;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-turn lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TurnState {
    /// Between turns
    Idle,
    /// The user's message has been recorded
    AwaitingUserInput,
    /// The history is being serialized into a prompt
    Formatting,
    /// Fragments are arriving from the model
    Streaming,
    /// The response has been appended to the history
    Committed,
}

/// One interactive chat session: history, parameters, credential and the client
pub struct ChatSession {
    id: Uuid,
    conversation: Conversation,
    params: GenerationParams,
    credential: Option<ApiToken>,
    client: LlmClient,
    stream: StreamController,
    state: TurnState,
}

impl ChatSession {
    pub fn new(config: &Config, credential: Option<ApiToken>) -> ChatResult<Self> {
        let session = Self {
            id: Uuid::new_v4(),
            conversation: Conversation::new(),
            params: config.generation,
            credential,
            client: LlmClient::new(config)?,
            stream: StreamController::new(),
            state: TurnState::Idle,
        };
        info!(
            session = %session.id,
            model = %config.model,
            has_credential = session.credential.is_some(),
            "session started"
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut GenerationParams {
        &mut self.params
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Validate and store the API token for the rest of the session
    pub fn set_credential(&mut self, raw: &str) -> ChatResult<()> {
        let token = ApiToken::parse(raw)?;
        self.credential = Some(token);
        info!(session = %self.id, "API token accepted");
        Ok(())
    }

    /// Whether a new message can be submitted right now
    pub fn can_submit(&self) -> bool {
        self.credential.is_some() && self.state == TurnState::Idle
    }

    pub fn is_streaming(&self) -> bool {
        self.state == TurnState::Streaming
    }

    /// Text of the response currently being streamed
    pub fn partial_response(&self) -> Option<&str> {
        self.is_streaming().then(|| self.stream.partial())
    }

    /// Reset the history to the greeting
    pub fn clear_history(&mut self) -> ChatResult<()> {
        if self.turn_in_progress() {
            return Err(ChatError::TurnInProgress);
        }
        self.conversation.reset();
        info!(session = %self.id, "chat history cleared");
        Ok(())
    }

    /// The prompt the current history would be sent as
    pub fn prompt(&self) -> String {
        format_prompt(self.conversation.messages())
    }

    /// Record a user message and start streaming the reply
    pub fn submit(&mut self, content: &str) -> ChatResult<mpsc::Receiver<LlmEvent>> {
        if self.turn_in_progress() {
            return Err(ChatError::TurnInProgress);
        }
        if self.credential.is_none() {
            return Err(ChatError::MissingCredential);
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.conversation.push_user(content);
        self.transition(TurnState::AwaitingUserInput);
        self.start_turn()
    }

    /// Generate a reply to a user message left unanswered by a failed turn
    pub fn retry(&mut self) -> ChatResult<mpsc::Receiver<LlmEvent>> {
        if self.turn_in_progress() {
            return Err(ChatError::TurnInProgress);
        }
        if !self.conversation.awaiting_response() {
            return Err(ChatError::NothingToGenerate);
        }
        self.start_turn()
    }

    fn start_turn(&mut self) -> ChatResult<mpsc::Receiver<LlmEvent>> {
        let Some(token) = self.credential.clone() else {
            self.transition(TurnState::Idle);
            return Err(ChatError::MissingCredential);
        };

        self.transition(TurnState::Formatting);
        let prompt = self.prompt();
        let request = GenerationRequest::new(prompt, self.params);

        self.stream.start_streaming();
        self.transition(TurnState::Streaming);
        info!(
            session = %self.id,
            messages = self.conversation.len(),
            temperature = self.params.temperature,
            top_p = self.params.top_p,
            "turn started"
        );

        Ok(self.client.stream_response(&token, request))
    }

    /// Apply a stream event to the current turn.
    ///
    /// Returns `None` while the turn is still streaming. On completion the
    /// response is appended to the history and returned; on failure nothing
    /// is committed and the error is returned.
    pub fn handle_event(&mut self, event: LlmEvent) -> Option<ChatResult<Message>> {
        if !self.is_streaming() {
            debug!(?event, "dropping event outside of a turn");
            return None;
        }

        match self.stream.process_event(event) {
            StreamStatus::Streaming => None,
            StreamStatus::Complete(text) => {
                self.conversation.push_assistant(text);
                self.transition(TurnState::Committed);
                info!(
                    session = %self.id,
                    fragments = self.stream.fragments(),
                    "turn committed"
                );
                self.transition(TurnState::Idle);
                self.conversation.last().ok().cloned().map(Ok)
            }
            StreamStatus::Failed(error) => {
                warn!(session = %self.id, error = %error, "turn failed, response discarded");
                self.transition(TurnState::Idle);
                Some(Err(error))
            }
        }
    }

    /// Abort the current turn because its event channel closed early
    pub fn stream_closed(&mut self) -> Option<ChatResult<Message>> {
        self.handle_event(LlmEvent::Error(closed_early()))
    }

    /// Run a whole turn, calling `on_fragment` as text arrives
    pub async fn run_turn<F>(&mut self, content: &str, on_fragment: F) -> ChatResult<Message>
    where
        F: FnMut(&str),
    {
        let rx = self.submit(content)?;
        self.drive(rx, on_fragment).await
    }

    async fn drive<F>(&mut self, mut rx: mpsc::Receiver<LlmEvent>, mut on_fragment: F) -> ChatResult<Message>
    where
        F: FnMut(&str),
    {
        while let Some(event) = rx.recv().await {
            if let LlmEvent::TextDelta(delta) = &event {
                on_fragment(delta);
            }
            if let Some(outcome) = self.handle_event(event) {
                return outcome;
            }
        }
        self.stream_closed().unwrap_or_else(|| Err(closed_early()))
    }

    fn turn_in_progress(&self) -> bool {
        matches!(
            self.state,
            TurnState::AwaitingUserInput | TurnState::Formatting | TurnState::Streaming
        )
    }

    fn transition(&mut self, next: TurnState) {
        debug!(session = %self.id, from = %self.state, to = %next, "turn state");
        self.state = next;
    }
}

fn closed_early() -> ChatError {
    ChatError::Stream("stream closed before completion".to_string())
}
