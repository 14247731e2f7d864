//! Conversation UI components for the chat interface

pub mod commands;
pub mod composer;
pub mod history;
pub mod sidebar;

pub use commands::{get_help_text, ParsedCommand, SlashCommand};
pub use composer::{ConversationComposer, ConversationResult, InputMode};
pub use history::{ConversationHistory, Notice};
pub use sidebar::Sidebar;
