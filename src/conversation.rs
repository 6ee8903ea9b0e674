//! The conversation controller.
//!
//! A [`Conversation`] owns the message list and the transient typing/streaming flags.  Each
//! [`Conversation::send`] drives one [`StreamSession`] to completion, folds its events into
//! the state, publishes every change to subscribers, and persists the result.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::client::Completions;
use crate::error::{Error, Result};
use crate::observability::{CONVERSATION_FAILURES, CONVERSATION_SENDS};
use crate::session::{CancelHandle, NO_RESPONSE, SessionEvent, StreamSession};
use crate::settings::SettingsStore;
use crate::store::MessageStore;
use crate::types::Message;

/// Everything a view needs to draw a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    /// Messages in chronological order.
    pub messages: Vec<Message>,
    /// A send is in progress.
    pub is_sending: bool,
    /// The request is out but no content has arrived yet.
    pub is_awaiting_first_token: bool,
    /// Content is arriving and the active message is being rewritten.
    pub is_streaming: bool,
    /// The assistant message currently being streamed into.
    pub active_streaming_message_id: Option<Uuid>,
}

/// A change to a [`ConversationState`], in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A message was added to the end of the list.
    MessageAppended(Message),
    /// The message with this id was replaced in place.
    MessageUpdated(Message),
    /// One or more of the transient flags changed.
    FlagsChanged {
        is_sending: bool,
        is_awaiting_first_token: bool,
        is_streaming: bool,
        active_streaming_message_id: Option<Uuid>,
    },
    /// All messages were removed.
    Cleared,
    /// The message list was replaced by stored history.
    Loaded(Vec<Message>),
}

/// How a call to [`Conversation::send`] ended.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The text was blank; nothing happened.
    Ignored,
    /// The assistant answered.
    Completed,
    /// The exchange failed; the error text was added to the conversation.
    Failed(Error),
    /// The exchange was cancelled.
    Cancelled,
}

/// Cancels whatever session the conversation currently has in flight.
#[derive(Debug, Clone, Default)]
pub struct Canceller {
    active: Arc<Mutex<Option<CancelHandle>>>,
}

impl Canceller {
    /// Cancel the in-flight session.  Returns false when nothing was in flight.
    pub fn cancel(&self) -> bool {
        match self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    fn install(&self, handle: Option<CancelHandle>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = handle;
    }
}

/// A single conversation with one server.
pub struct Conversation {
    completions: Arc<dyn Completions>,
    settings: Arc<dyn SettingsStore>,
    store: Arc<dyn MessageStore>,
    state: ConversationState,
    subscribers: Vec<mpsc::UnboundedSender<ConversationEvent>>,
    canceller: Canceller,
}

impl Conversation {
    /// An empty conversation.  Call [`Conversation::load_history`] to restore stored messages.
    pub fn new(
        completions: Arc<dyn Completions>,
        settings: Arc<dyn SettingsStore>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            completions,
            settings,
            store,
            state: ConversationState::default(),
            subscribers: Vec::new(),
            canceller: Canceller::default(),
        }
    }

    /// The current state.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// The messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    /// The settings this conversation sends with.
    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    /// Receive every subsequent state change, in order.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConversationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// A handle that cancels the in-flight send from any task.
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Send `user_text` and fold the reply into the conversation.
    ///
    /// Blank text is ignored.  Otherwise the user message is appended at once, the reply is
    /// streamed into an assistant message (or appended whole), and the full list is written
    /// to the store.  Transport failures become an assistant message and
    /// [`SendOutcome::Failed`]; only persistence failures are returned as `Err`.
    pub async fn send(&mut self, user_text: &str) -> Result<SendOutcome> {
        if user_text.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }
        CONVERSATION_SENDS.click();

        self.append(Message::user(user_text));
        self.set_flags(true, true, false, None);

        let spec = self.settings.get().request(user_text);
        let mut session = self.completions.start(spec);
        self.canceller.install(Some(session.cancel_handle()));
        let outcome = self.consume(&mut session).await;
        self.canceller.install(None);
        drop(session);

        self.set_flags(false, false, false, None);
        self.store.replace_all(&self.state.messages).await?;
        Ok(outcome)
    }

    /// Forget every message in memory.  Stored history is left alone.
    pub fn clear(&mut self) {
        self.state = ConversationState::default();
        self.publish(ConversationEvent::Cleared);
    }

    /// Replace the in-memory messages with the stored history.
    pub async fn load_history(&mut self) -> Result<()> {
        let messages = self.store.load().await?;
        self.state = ConversationState {
            messages: messages.clone(),
            ..ConversationState::default()
        };
        self.publish(ConversationEvent::Loaded(messages));
        Ok(())
    }

    async fn consume(&mut self, session: &mut StreamSession) -> SendOutcome {
        let mut outcome = None;
        while let Some(event) = session.next().await {
            match event {
                SessionEvent::FirstToken => {
                    let message = Message::assistant("");
                    let id = message.id();
                    self.append(message);
                    self.set_flags(true, false, true, Some(id));
                }
                SessionEvent::Delta(text) => {
                    self.update_active(text);
                }
                SessionEvent::Finished(text) => {
                    let text = if text.is_empty() {
                        NO_RESPONSE.to_string()
                    } else {
                        text
                    };
                    if self.state.active_streaming_message_id.is_some() {
                        self.update_active(text);
                    } else {
                        self.append(Message::assistant(text));
                    }
                    outcome = Some(SendOutcome::Completed);
                }
                SessionEvent::Settled(text) => {
                    self.append(Message::assistant(text));
                    outcome = Some(SendOutcome::Completed);
                }
                SessionEvent::Failed(err) => {
                    CONVERSATION_FAILURES.click();
                    self.append(Message::assistant(err.user_message()));
                    outcome = Some(SendOutcome::Failed(err));
                }
            }
        }
        outcome.unwrap_or(SendOutcome::Cancelled)
    }

    fn append(&mut self, message: Message) {
        self.state.messages.push(message.clone());
        self.publish(ConversationEvent::MessageAppended(message));
    }

    fn update_active(&mut self, text: String) {
        let Some(id) = self.state.active_streaming_message_id else {
            return;
        };
        let Some(slot) = self.state.messages.iter_mut().find(|m| m.id() == id) else {
            return;
        };
        if slot.text() == text {
            return;
        }
        *slot = slot.with_text(text);
        let updated = slot.clone();
        self.publish(ConversationEvent::MessageUpdated(updated));
    }

    fn set_flags(
        &mut self,
        is_sending: bool,
        is_awaiting_first_token: bool,
        is_streaming: bool,
        active_streaming_message_id: Option<Uuid>,
    ) {
        self.state.is_sending = is_sending;
        self.state.is_awaiting_first_token = is_awaiting_first_token;
        self.state.is_streaming = is_streaming;
        self.state.active_streaming_message_id = active_streaming_message_id;
        self.publish(ConversationEvent::FlagsChanged {
            is_sending,
            is_awaiting_first_token,
            is_streaming,
            active_streaming_message_id,
        });
    }

    fn publish(&mut self, event: ConversationEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
