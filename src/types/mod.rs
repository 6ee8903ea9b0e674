// Public modules
pub mod chat_completion;
pub mod chat_completion_chunk;
pub mod message;
pub mod model_list;
pub mod request_spec;

// Re-exports
pub use chat_completion::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseChoice, Role,
};
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use message::Message;
pub use model_list::{ModelEntry, ModelList};
pub use request_spec::{CHAT_COMPLETIONS_PATH, MODELS_PATH, RequestSpec, endpoint};
