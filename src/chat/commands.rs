//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the chat instead of being sent to the server.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Clear the conversation on screen.  Stored history is kept.
    Clear,

    /// Print the conversation so far.
    History,

    /// Change the model.
    Model(String),

    /// Change the server base URL.
    Server(String),

    /// Turn streaming responses on or off.
    Stream(bool),

    /// List the models the server offers.
    Models,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it should be sent as a
/// regular message.
///
/// # Examples
///
/// ```
/// # use talkhand::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/server http://localhost:1337").is_some());
/// assert!(parse_command("Hello there").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "history" => ChatCommand::History,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "server" => match argument {
            Some(url) => ChatCommand::Server(url.to_string()),
            None => ChatCommand::Invalid("/server requires a URL".to_string()),
        },
        "stream" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Stream(value),
            None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
        },
        "models" => ChatCommand::Models,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear the conversation (history on disk is kept)
  /history               Show the conversation so far
  /model <name>          Change the model
  /server <url>          Change the server (e.g., /server http://localhost:1337)
  /stream on|off         Stream responses or wait for the whole reply
  /models                List the models the server offers
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat

Press Ctrl+C while a reply is arriving to stop it."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear_and_history() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model jan-nano"),
            Some(ChatCommand::Model("jan-nano".to_string()))
        );
        assert_eq!(
            parse_command("/model   Menlo:Jan-nano-128k-gguf:jan-nano-128k-Q8_0.gguf  "),
            Some(ChatCommand::Model(
                "Menlo:Jan-nano-128k-gguf:jan-nano-128k-Q8_0.gguf".to_string()
            ))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(
                "/model requires a model name".to_string()
            ))
        );
    }

    #[test]
    fn parse_server() {
        assert_eq!(
            parse_command("/server http://192.168.1.20:1337"),
            Some(ChatCommand::Server("http://192.168.1.20:1337".to_string()))
        );
        assert!(matches!(
            parse_command("/server"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_stream_toggle() {
        assert_eq!(parse_command("/stream on"), Some(ChatCommand::Stream(true)));
        assert_eq!(parse_command("/stream OFF"), Some(ChatCommand::Stream(false)));
        assert!(matches!(
            parse_command("/stream maybe"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("expects")
        ));
        assert!(matches!(
            parse_command("/stream"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_models_and_config() {
        assert_eq!(parse_command("/models"), Some(ChatCommand::Models));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/frobnicate now"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("a/b"), None);
    }

    #[test]
    fn help_text_lists_commands() {
        let help = help_text();
        for command in ["/quit", "/clear", "/history", "/model", "/server", "/stream", "/models"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
