// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod conversation;
pub mod error;
pub mod observability;
pub mod sanitize;
pub mod session;
pub mod settings;
pub mod sse;
pub mod store;
pub mod types;


// Re-exports
pub use client::{Client, Completions};
pub use client_logger::ClientLogger;
pub use conversation::{
    Canceller, Conversation, ConversationEvent, ConversationState, SendOutcome,
};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use session::{CancelHandle, SessionEvent, SessionOptions, StreamSession};
pub use settings::{MemorySettings, Settings, SettingsFile, SettingsStore};
pub use sse::{StreamDelta, parse_line};
pub use store::{JsonFileStore, MemoryStore, MessageStore};
pub use types::*;
