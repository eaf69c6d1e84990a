//! Live conversation controller. Owns the transcript, the outgoing draft
//! and the polling task that keeps the transcript current; dropping the
//! controller cancels the task.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cambioteca_types::events::ChatEvent;
use cambioteca_types::models::{ConversationSummary, Message};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::ApiError;

/// How often an open conversation asks the backend for news.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Transcript state shared with the poll task. Locked briefly and never
/// across an await.
#[derive(Debug, Default)]
struct ChatShared {
    messages: Vec<Message>,
    last_id: Option<i64>,
    completed: bool,
    draft: String,
    close_reason: Option<String>,
}

pub struct ChatController {
    api: ApiClient,
    conversation_id: i64,
    user_id: i64,
    shared: Arc<Mutex<ChatShared>>,
    events_tx: broadcast::Sender<ChatEvent>,
    poller: Option<JoinHandle<()>>,
}

impl ChatController {
    /// Load the full history and start polling for the rest. Conversations
    /// whose exchange already completed open read-only and never poll.
    pub async fn open(
        api: ApiClient,
        conversation: &ConversationSummary,
    ) -> Result<Self, ApiError> {
        Self::open_with_interval(api, conversation, POLL_INTERVAL).await
    }

    pub async fn open_with_interval(
        api: ApiClient,
        conversation: &ConversationSummary,
        every: Duration,
    ) -> Result<Self, ApiError> {
        let user_id = api.session().user_id().ok_or_else(|| {
            ApiError::validation("No se pudo identificar al usuario. Por favor, inicia sesión.")
        })?;
        let completed = conversation.is_completed();
        let messages = api.messages(conversation.id, None).await?;
        let last_id = messages.last().map(|m| m.id);
        debug!(
            conversation_id = conversation.id,
            count = messages.len(),
            completed,
            "conversation opened"
        );

        if !completed {
            // Seen state is cosmetic; a failure must not keep the chat shut.
            if let Err(err) = api.mark_seen(conversation.id, user_id).await {
                warn!(conversation_id = conversation.id, error = %err, "mark seen failed");
            }
        }

        let (events_tx, _) = broadcast::channel(32);
        let mut controller = Self {
            api,
            conversation_id: conversation.id,
            user_id,
            shared: Arc::new(Mutex::new(ChatShared {
                messages,
                last_id,
                completed,
                draft: String::new(),
                close_reason: None,
            })),
            events_tx,
            poller: None,
        };
        if !completed {
            controller.spawn_poller(every);
        }
        Ok(controller)
    }

    /// Push the draft. Clears it up front and puts it back on failure so
    /// nothing typed is ever lost. A rejection that carries a backend
    /// detail means the exchange completed underneath us: the conversation
    /// flips to read-only and subscribers hear `ConversationClosed`.
    pub async fn send(&self) -> Result<(), ApiError> {
        let body = {
            let mut state = lock(&self.shared);
            if state.completed {
                return Err(ApiError::validation("La conversación ya está cerrada."));
            }
            let body = state.draft.trim().to_owned();
            if body.is_empty() {
                return Ok(());
            }
            state.draft.clear();
            body
        };

        match self
            .api
            .send_message(self.conversation_id, self.user_id, &body)
            .await
        {
            Ok(resp) => {
                {
                    let mut state = lock(&self.shared);
                    state.messages.push(Message {
                        id: resp.message_id,
                        sender_id: self.user_id,
                        body,
                        sent_at: Utc::now(),
                    });
                    state.last_id = Some(resp.message_id);
                }
                let _ = self.events_tx.send(ChatEvent::MessagesAppended {
                    conversation_id: self.conversation_id,
                    count: 1,
                });
                Ok(())
            }
            Err(err) => {
                let closed = err.detail().map(str::to_owned);
                {
                    let mut state = lock(&self.shared);
                    state.draft = body;
                    if let Some(reason) = &closed {
                        state.completed = true;
                        state.close_reason = Some(reason.clone());
                    }
                }
                if let Some(reason) = closed {
                    let _ = self.events_tx.send(ChatEvent::ConversationClosed {
                        conversation_id: self.conversation_id,
                        reason,
                    });
                }
                Err(err)
            }
        }
    }

    fn spawn_poller(&mut self, every: Duration) {
        let api = self.api.clone();
        let shared = Arc::clone(&self.shared);
        let events = self.events_tx.clone();
        let conversation_id = self.conversation_id;
        let user_id = self.user_id;
        let handle = tokio::spawn(async move {
            // The first tick fires immediately, so a message that landed
            // between history fetch and spawn is picked up right away.
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let cursor = lock(&shared).last_id;
                match api.messages(conversation_id, cursor).await {
                    Ok(batch) if !batch.is_empty() => {
                        let count = batch.len();
                        let completed = {
                            let mut state = lock(&shared);
                            if let Some(last) = batch.last() {
                                state.last_id = Some(last.id);
                            }
                            state.messages.extend(batch);
                            state.completed
                        };
                        if !completed {
                            if let Err(err) = api.mark_seen(conversation_id, user_id).await {
                                warn!(conversation_id, error = %err, "mark seen failed");
                            }
                        }
                        let _ = events.send(ChatEvent::MessagesAppended {
                            conversation_id,
                            count,
                        });
                    }
                    Ok(_) => {}
                    Err(err) => {
                        // Transient backend trouble; next tick retries.
                        warn!(conversation_id, error = %err, "message poll failed");
                    }
                }
            }
        });
        self.poller = Some(handle);
    }

    pub fn conversation_id(&self) -> i64 {
        self.conversation_id
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.shared).messages.clone()
    }

    pub fn last_message_id(&self) -> Option<i64> {
        lock(&self.shared).last_id
    }

    pub fn is_completed(&self) -> bool {
        lock(&self.shared).completed
    }

    /// Backend wording from the rejection that closed the conversation.
    pub fn close_reason(&self) -> Option<String> {
        lock(&self.shared).close_reason.clone()
    }

    pub fn draft(&self) -> String {
        lock(&self.shared).draft.clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        lock(&self.shared).draft = text.into();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events_tx.subscribe()
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
    }
}

fn lock(shared: &Mutex<ChatShared>) -> MutexGuard<'_, ChatShared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
