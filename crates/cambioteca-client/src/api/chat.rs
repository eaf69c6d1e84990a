use cambioteca_types::api::{MarkSeenRequest, SendMessageRequest, SendMessageResponse};
use cambioteca_types::models::{ConversationSummary, Message};

use super::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// GET /chat/{userId}/conversaciones/.
    pub async fn conversations(&self, user_id: i64) -> Result<Vec<ConversationSummary>, ApiError> {
        self.get_json(&format!("/chat/{}/conversaciones/", user_id))
            .await
    }

    /// GET /chat/conversacion/{id}/mensajes/. With `after_id` the backend
    /// only returns messages newer than that id, which is what keeps the
    /// polling loop cheap.
    pub async fn messages(
        &self,
        conversation_id: i64,
        after_id: Option<i64>,
    ) -> Result<Vec<Message>, ApiError> {
        let path = format!("/chat/conversacion/{}/mensajes/", conversation_id);
        match after_id {
            Some(id) => {
                self.get_json_query(&path, &[("after_id", id.to_string())])
                    .await
            }
            None => self.get_json(&path).await,
        }
    }

    /// POST /chat/conversacion/{id}/enviar/. A conversation whose exchange
    /// completed refuses this with a message in `detail`.
    pub async fn send_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        body: &str,
    ) -> Result<SendMessageResponse, ApiError> {
        let req = SendMessageRequest {
            sender_id,
            body: body.to_owned(),
        };
        self.post_json(&format!("/chat/conversacion/{}/enviar/", conversation_id), &req)
            .await
    }

    /// POST /chat/conversacion/{id}/visto/.
    pub async fn mark_seen(&self, conversation_id: i64, user_id: i64) -> Result<(), ApiError> {
        let req = MarkSeenRequest { user_id };
        self.post_unit(&format!("/chat/conversacion/{}/visto/", conversation_id), &req)
            .await
    }
}
