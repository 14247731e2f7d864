use thiserror::Error;

/// Errors produced by the chat core (store, credential, parameters, inference call).
#[derive(Debug, Error)]
pub enum ChatError {
    /// The conversation store holds no messages.
    #[error("conversation is empty")]
    EmptyState,

    /// No API token has been provided yet.
    #[error("no Replicate API token configured")]
    MissingCredential,

    /// The API token failed the shape check.
    #[error("invalid Replicate API token: {0}")]
    InvalidCredential(String),

    /// A generation parameter fell outside its allowed range.
    #[error("{name} must be between {min} and {max}, got {value}")]
    ParameterOutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    /// The submitted message has no content.
    #[error("message is empty")]
    EmptyMessage,

    /// A new turn was requested while another one is still streaming.
    #[error("a response is still being generated")]
    TurnInProgress,

    /// A response was requested but the last message is not from the user.
    #[error("nothing to respond to: the last message is not from the user")]
    NothingToGenerate,

    /// Transport-level failure talking to the inference service.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The inference service answered with a non-success status.
    #[error("Replicate API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The event stream failed or ended before completing.
    #[error("stream failed: {0}")]
    Stream(String),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
