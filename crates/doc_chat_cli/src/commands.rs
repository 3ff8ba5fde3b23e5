pub const HELP_TEXT: &str = "\
Ask a question about the documentation, or:
  /clear   start a new conversation
  /help    show this help
  /quit    exit
Ctrl-C stops the answer being streamed; press it again to exit.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    Quit,
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let command = trimmed.split_whitespace().next().unwrap_or(trimmed);

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/clear" | "/new" => SlashCommand::Clear,
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::{parse_slash_command, SlashCommand};

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_slash_command("what is /help?"), None);
    }

    #[test]
    fn commands_ignore_arguments_and_whitespace() {
        assert_eq!(parse_slash_command("  /clear now "), Some(SlashCommand::Clear));
        assert_eq!(parse_slash_command("/exit"), Some(SlashCommand::Quit));
        assert_eq!(
            parse_slash_command("/frobnicate x"),
            Some(SlashCommand::Unknown("/frobnicate".to_string()))
        );
    }
}
