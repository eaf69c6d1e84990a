use crate::models::User;

/// Session lifecycle notifications pushed to whoever subscribed to the
/// session store.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Credentials were accepted and the session persisted.
    LoggedIn(User),

    /// The session was discarded, either on request or after the backend
    /// rejected the token.
    LoggedOut,

    /// The stored account data changed (profile edit, new avatar).
    ProfileUpdated(User),
}

/// Notifications from an open conversation's polling loop.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// New messages were appended to the transcript.
    MessagesAppended {
        conversation_id: i64,
        count: usize,
    },

    /// The backend refused a send because the exchange completed; the
    /// conversation is read-only from here on.
    ConversationClosed {
        conversation_id: i64,
        reason: String,
    },
}
