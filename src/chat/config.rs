//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved configuration
//! that decides where settings and history live and which settings the command line
//! overrides.

use std::path::{Path, PathBuf};

use arrrg_derive::CommandLine;

use crate::settings::Settings;

const SETTINGS_FILE: &str = "settings.yaml";
const HISTORY_FILE: &str = "history.json";
const APP_DIR: &str = "talkhand";

/// Command-line arguments for the talkhand-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Server base URL.
    #[arrrg(optional, "Server base URL (e.g. http://localhost:1337)", "URL")]
    pub server: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to request", "MODEL")]
    pub model: Option<String>,

    /// Wait for whole replies instead of streaming them.
    #[arrrg(flag, "Disable streaming responses")]
    pub no_stream: bool,

    /// Settings file location.
    #[arrrg(optional, "Settings file (default: ~/.config/talkhand/settings.yaml)", "PATH")]
    pub settings: Option<String>,

    /// History file location.
    #[arrrg(optional, "History file (default: ~/.local/share/talkhand/history.json)", "PATH")]
    pub history: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log requests and stream deltas to stderr.
    #[arrrg(flag, "Log requests and responses to stderr")]
    pub verbose: bool,
}

/// Configuration for a chat run.
///
/// Overrides given on the command line apply to this run and are also written to the
/// settings file, the same as the equivalent slash commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Where settings are read from and written to.
    pub settings_path: PathBuf,

    /// Where the conversation history is kept.
    pub history_path: PathBuf,

    /// Server URL to use instead of the stored one.
    pub server_url: Option<String>,

    /// Model to use instead of the stored one.
    pub model: Option<String>,

    /// Streaming mode to use instead of the stored one.
    pub streaming: Option<bool>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to log exchanges to stderr.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Settings: `$XDG_CONFIG_HOME/talkhand/settings.yaml` (or `~/.config/...`)
    /// - History: `$XDG_DATA_HOME/talkhand/history.json` (or `~/.local/share/...`)
    /// - No overrides
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            settings_path: default_path("XDG_CONFIG_HOME", &[".config"], SETTINGS_FILE),
            history_path: default_path("XDG_DATA_HOME", &[".local", "share"], HISTORY_FILE),
            server_url: None,
            model: None,
            streaming: None,
            use_color: true,
            verbose: false,
        }
    }

    /// Sets the settings file.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = path.into();
        self
    }

    /// Sets the history file.
    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = path.into();
        self
    }

    /// Overrides the server URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Overrides the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Overrides streaming.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = Some(streaming);
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// True when the command line changes any stored setting.
    pub fn has_overrides(&self) -> bool {
        self.server_url.is_some() || self.model.is_some() || self.streaming.is_some()
    }

    /// `settings` with this configuration's overrides applied.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(url) = &self.server_url {
            settings.server_url = url.clone();
        }
        if let Some(model) = &self.model {
            settings.model_name = model.clone();
        }
        if let Some(streaming) = self.streaming {
            settings.streaming = streaming;
        }
        settings
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            settings_path: args
                .settings
                .map(PathBuf::from)
                .unwrap_or(defaults.settings_path),
            history_path: args
                .history
                .map(PathBuf::from)
                .unwrap_or(defaults.history_path),
            server_url: args.server,
            model: args.model,
            streaming: args.no_stream.then_some(false),
            use_color: !args.no_color,
            verbose: args.verbose,
        }
    }
}

fn default_path(xdg_var: &str, fallback: &[&str], file: &str) -> PathBuf {
    let base = match std::env::var_os(xdg_var).filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => {
            let home = std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| Path::new(".").to_path_buf());
            fallback.iter().fold(home, |path, part| path.join(part))
        }
    };
    base.join(APP_DIR).join(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.settings_path.ends_with("talkhand/settings.yaml"));
        assert!(config.history_path.ends_with("talkhand/history.json"));
        assert!(config.server_url.is_none());
        assert!(config.model.is_none());
        assert!(config.streaming.is_none());
        assert!(config.use_color);
        assert!(!config.verbose);
        assert!(!config.has_overrides());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            server: Some("http://localhost:1337".to_string()),
            model: Some("jan-nano".to_string()),
            no_stream: true,
            settings: Some("/tmp/s.yaml".to_string()),
            history: Some("/tmp/h.json".to_string()),
            no_color: true,
            verbose: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.settings_path, PathBuf::from("/tmp/s.yaml"));
        assert_eq!(config.history_path, PathBuf::from("/tmp/h.json"));
        assert_eq!(config.server_url.as_deref(), Some("http://localhost:1337"));
        assert_eq!(config.model.as_deref(), Some("jan-nano"));
        assert_eq!(config.streaming, Some(false));
        assert!(!config.use_color);
        assert!(config.verbose);
        assert!(config.has_overrides());
    }

    #[test]
    fn overrides_apply_to_settings() {
        let stored = Settings {
            server_url: "http://old:1337".to_string(),
            api_key: "key".to_string(),
            ..Settings::default()
        };

        let untouched = ChatConfig::new().apply(stored.clone());
        assert_eq!(untouched, stored);

        let config = ChatConfig::new()
            .with_server_url("http://new:1337")
            .with_model("qwen3")
            .with_streaming(false)
            .without_color()
            .with_settings_path("settings.yaml")
            .with_history_path("history.json");
        let applied = config.apply(stored);
        assert_eq!(applied.server_url, "http://new:1337");
        assert_eq!(applied.model_name, "qwen3");
        assert_eq!(applied.api_key, "key");
        assert!(!applied.streaming);
        assert_eq!(config.settings_path, PathBuf::from("settings.yaml"));
    }
}
