use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Reset the chat history to the greeting
    Clear,
    /// Generate a response to the last unanswered message
    Retry,
    /// Set the sampling temperature
    Temperature,
    /// Set the nucleus sampling cutoff
    TopP,
    /// Enter a Replicate API token
    Token,
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Numeric argument for `/temperature` and `/top-p`
    pub fn value(&self) -> Option<f32> {
        self.argument()?.trim().parse().ok()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Clear => "clear chat history",
            SlashCommand::Retry => "generate a response to your last message again",
            SlashCommand::Temperature => "set temperature (0.01 - 5.0)",
            SlashCommand::TopP => "set top p (0.01 - 1.0)",
            SlashCommand::Token => "enter your Replicate API token",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether this command can be run while a response is streaming.
    pub fn available_during_streaming(self) -> bool {
        matches!(
            self,
            SlashCommand::Temperature | SlashCommand::TopP | SlashCommand::Help | SlashCommand::Bye
        )
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let args: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(head).ok().or_else(|| match head.to_lowercase().as_str() {
        "q" | "quit" | "exit" => Some(SlashCommand::Bye),
        "c" | "reset" => Some(SlashCommand::Clear),
        "r" | "regenerate" => Some(SlashCommand::Retry),
        "t" | "temp" => Some(SlashCommand::Temperature),
        "p" | "top_p" | "topp" => Some(SlashCommand::TopP),
        "key" => Some(SlashCommand::Token),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }

    help.push_str("\nAliases: /q for /bye, /c for /clear, /r for /retry, /t for /temperature, /p for /top-p");
    help.push_str("\nKeys: F2/F3 temperature -/+, F4/F5 top p -/+ (hold Shift for 0.1 steps), Ctrl+L clear, Ctrl+C quit");

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!(
            parse_slash_command("/temperature 1.2"),
            Some(ParsedCommand {
                command: SlashCommand::Temperature,
                argument: Some("1.2".to_string()),
            })
        );
        assert_eq!(parse_slash_command("/top-p 0.5").unwrap().value(), Some(0.5));
        assert_eq!(parse_slash_command("/clear").unwrap().argument(), None);
    }

    #[test]
    fn resolves_aliases() {
        assert_eq!(parse_slash_command("/q").unwrap().command, SlashCommand::Bye);
        assert_eq!(parse_slash_command("/p 0.3").unwrap().command, SlashCommand::TopP);
        assert_eq!(parse_slash_command("/reset").unwrap().command, SlashCommand::Clear);
    }

    #[test]
    fn plain_text_and_unknown_commands_are_not_commands() {
        assert_eq!(parse_slash_command("What is 2+2?"), None);
        assert_eq!(parse_slash_command("/"), None);
        assert_eq!(parse_slash_command("/frobnicate"), None);
    }

    #[test]
    fn non_numeric_value_is_none() {
        assert_eq!(parse_slash_command("/temperature hot").unwrap().value(), None);
        assert_eq!(parse_slash_command("/temperature").unwrap().value(), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for entry in command_entries() {
            assert!(help.contains(&format!("/{}", entry.keyword)));
        }
        assert!(help.contains("/top-p"));
    }
}
