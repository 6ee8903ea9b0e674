//! Connection settings: which server to talk to, with which key and model.
//!
//! Settings are read far more often than written; both implementations guard them with an
//! [`RwLock`] so concurrent readers never block each other and writes are serialized.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::RequestSpec;

/// Model requested when none has been configured.
pub const DEFAULT_MODEL: &str = "Menlo:Jan-nano-128k-gguf:jan-nano-128k-Q8_0.gguf";

/// Environment variable consulted when no API key is stored.
pub const API_KEY_ENV: &str = "TALKHAND_API_KEY";

/// The values a conversation needs to build a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the inference server.
    pub server_url: String,
    /// Bearer token for the server.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Model identifier to request.
    pub model_name: String,
    /// Whether to request streamed responses.
    pub streaming: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            api_key: String::new(),
            model_name: DEFAULT_MODEL.to_string(),
            streaming: true,
        }
    }
}

impl Settings {
    /// The request for sending `user_text` with these settings.
    pub fn request(&self, user_text: impl Into<String>) -> RequestSpec {
        RequestSpec {
            server_base_url: self.server_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model_name.clone(),
            user_text: user_text.into(),
            streaming: self.streaming,
        }
    }
}

/// Source of the current [`Settings`].
pub trait SettingsStore: Send + Sync {
    /// A snapshot of the current settings.
    fn get(&self) -> Settings;

    /// Replace the current settings.
    fn set(&self, settings: Settings) -> Result<()>;
}

/// Settings held only in memory.
#[derive(Debug, Default)]
pub struct MemorySettings {
    settings: RwLock<Settings>,
}

impl MemorySettings {
    /// Start from `settings`.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, settings: Settings) -> Result<()> {
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
        Ok(())
    }
}

/// Settings persisted as a YAML file.
///
/// When the file holds no API key, the [`API_KEY_ENV`] environment variable supplies one.  A
/// key that came from the environment is never written back to the file.
#[derive(Debug)]
pub struct SettingsFile {
    path: PathBuf,
    api_key_env: String,
    stored: RwLock<Settings>,
}

impl SettingsFile {
    /// Load settings from `path`; a missing file yields the defaults.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stored = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Settings::default(),
            Ok(content) => serde_yaml::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(err) => {
                return Err(Error::io(
                    format!("failed to read settings from {}", path.display()),
                    err,
                ));
            }
        };
        Ok(Self {
            path,
            api_key_env: API_KEY_ENV.to_string(),
            stored: RwLock::new(stored),
        })
    }

    /// Take the fallback API key from `var` instead of [`API_KEY_ENV`].
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = var.into();
        self
    }

    /// Where the settings live.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| {
                Error::io(
                    format!("failed to create settings directory {}", parent.display()),
                    err,
                )
            })?;
        }
        let content = serde_yaml::to_string(settings)?;
        let tmp = self.path.with_extension("yaml.tmp");
        fs::write(&tmp, content)
            .map_err(|err| Error::io(format!("failed to write {}", tmp.display()), err))?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            Error::io(format!("failed to replace {}", self.path.display()), err)
        })
    }
}

impl SettingsStore for SettingsFile {
    fn get(&self) -> Settings {
        let mut settings = self
            .stored
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if settings.api_key.is_empty()
            && let Ok(key) = std::env::var(&self.api_key_env)
        {
            settings.api_key = key;
        }
        settings
    }

    fn set(&self, mut settings: Settings) -> Result<()> {
        let mut stored = self
            .stored
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if stored.api_key.is_empty()
            && std::env::var(&self.api_key_env).is_ok_and(|key| key == settings.api_key)
        {
            settings.api_key.clear();
        }
        self.write(&settings)?;
        *stored = settings;
        Ok(())
    }
}
