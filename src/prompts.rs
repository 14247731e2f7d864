use crate::conversation::{Message, Role};

/// Seed message shown at the start of every session and after a clear
pub const GREETING: &str = "Hi. I'm Arctic, a new, efficient, intelligent, and truly open language model created by Snowflake AI Research. Ask me anything.";

/// Passed as `prompt_template` so the service uses our prompt verbatim
pub const PROMPT_TEMPLATE: &str = "{prompt}";

const TURN_START: &str = "<|im_start|>";
const TURN_END: &str = "<|im_end|>";

/// Opening delimiter for a turn spoken by `role`
pub fn turn_start(role: Role) -> String {
    format!("{}{}\n", TURN_START, role.as_ref())
}

/// Serialize the whole history into Arctic's ChatML-style prompt.
///
/// Every message becomes `<|im_start|>{role}\n{content}<|im_end|>`, entries are
/// joined by newlines and the result ends with an open assistant turn for the
/// model to complete.
pub fn format_prompt(messages: &[Message]) -> String {
    let mut turns: Vec<String> = messages
        .iter()
        .map(|message| format!("{}{}{}", turn_start(message.role()), message.content(), TURN_END))
        .collect();

    turns.push(turn_start(Role::Assistant));
    turns.join("\n")
}
