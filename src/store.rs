//! Local persistence for conversation history.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::Message;

/// Ordered storage of a conversation's messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// All stored messages, oldest first.
    async fn load(&self) -> Result<Vec<Message>>;

    /// Replace the stored messages with `messages`.
    async fn replace_all(&self, messages: &[Message]) -> Result<()>;
}

/// A store that forgets everything when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: Mutex<Vec<Message>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Message>> {
        Ok(self.messages.lock().await.clone())
    }

    async fn replace_all(&self, messages: &[Message]) -> Result<()> {
        *self.messages.lock().await = messages.to_vec();
        Ok(())
    }
}

const HISTORY_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct HistoryFile {
    version: u8,
    messages: Vec<Message>,
}

/// History kept in a single pretty-printed JSON file.
///
/// Writes go to a sibling temporary file that is renamed over the target, so a crash never
/// leaves a truncated history behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write: Mutex<()>,
}

impl JsonFileStore {
    /// A store backed by `path`.  The file is created on the first write.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write: Mutex::new(()),
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MessageStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Message>> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Error::io("failed to read history file", err)),
        };
        let history: HistoryFile = serde_json::from_slice(&content).map_err(|err| {
            Error::serialization("failed to parse history file", Some(Box::new(err)))
        })?;
        if history.version != HISTORY_VERSION {
            return Err(Error::config(format!(
                "unsupported history version {} in {}",
                history.version,
                self.path.display()
            )));
        }
        let mut messages = history.messages;
        messages.sort_by_key(Message::created_at);
        Ok(messages)
    }

    async fn replace_all(&self, messages: &[Message]) -> Result<()> {
        let _guard = self.write.lock().await;
        let history = HistoryFile {
            version: HISTORY_VERSION,
            messages: messages.to_vec(),
        };
        let content = serde_json::to_vec_pretty(&history).map_err(|err| {
            Error::serialization("failed to serialize history", Some(Box::new(err)))
        })?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| Error::io("failed to create history directory", err))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|err| Error::io("failed to write history file", err))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| Error::io("failed to replace history file", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    fn message(text: &str, user: bool, at: time::OffsetDateTime) -> Message {
        Message::new(Uuid::new_v4(), text, user, at)
    }

    #[tokio::test]
    async fn memory_store_replaces_contents() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_empty());

        let first = vec![Message::user("one"), Message::assistant("two")];
        store.replace_all(&first).await.unwrap();
        assert_eq!(store.load().await.unwrap(), first);

        store.replace_all(&first[..1]).await.unwrap();
        assert_eq!(store.load().await.unwrap(), first[..1].to_vec());
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("history.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn json_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("sub").join("history.json"));
        let messages = vec![
            message("Hello", true, datetime!(2025-03-01 10:00:00 UTC)),
            message("Hi there", false, datetime!(2025-03-01 10:00:02 UTC)),
        ];
        store.replace_all(&messages).await.unwrap();
        assert_eq!(store.load().await.unwrap(), messages);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn load_orders_by_creation_time_stably() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("history.json"));
        let late = message("late", false, datetime!(2025-03-01 10:05:00 UTC));
        let tie_a = message("tie a", true, datetime!(2025-03-01 10:00:00 UTC));
        let tie_b = message("tie b", false, datetime!(2025-03-01 10:00:00 UTC));
        store
            .replace_all(&[late.clone(), tie_a.clone(), tie_b.clone()])
            .await
            .unwrap();
        assert_eq!(store.load().await.unwrap(), vec![tie_a, tie_b, late]);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[tokio::test]
    async fn unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, br#"{"version": 9, "messages": []}"#)
            .await
            .unwrap();
        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
