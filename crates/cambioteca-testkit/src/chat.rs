use std::sync::atomic::Ordering;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use cambioteca_types::api::{Claims, MarkSeenRequest, SendMessageRequest, SendMessageResponse};
use cambioteca_types::models::{ConversationSummary, Message};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::middleware::Refusal;
use crate::state::AppState;

/// GET /chat/{user_id}/conversaciones/.
pub async fn conversations(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ConversationSummary>>, Refusal> {
    state.hits.conversation_lists.fetch_add(1, Ordering::Relaxed);
    if user_id != claims.sub {
        return Err(Refusal::forbidden("No puedes ver conversaciones ajenas."));
    }
    Ok(Json(state.market().conversation_summaries(user_id)))
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub after_id: Option<i64>,
}

/// GET /chat/conversacion/{id}/mensajes/, incrementally with `after_id`.
pub async fn messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, Refusal> {
    state.hits.message_lists.fetch_add(1, Ordering::Relaxed);
    let market = state.market();
    let conversation = market
        .conversation(conversation_id)
        .ok_or_else(|| Refusal::not_found("Conversación no encontrada."))?;
    if !conversation.participants.contains(&claims.sub) {
        return Err(Refusal::forbidden("No participas en esta conversación."));
    }
    let cut = query.after_id.unwrap_or(i64::MIN);
    Ok(Json(
        conversation
            .messages
            .iter()
            .filter(|m| m.id > cut)
            .cloned()
            .collect(),
    ))
}

/// POST /chat/conversacion/{id}/enviar/. Once the exchange completed this
/// refuses with a `detail` the client surfaces as the closed banner.
pub async fn send(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, Refusal> {
    if req.sender_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    if req.body.trim().is_empty() {
        return Err(Refusal::bad_request("El mensaje no puede estar vacío."));
    }
    let mut market = state.market();
    let conversation = market
        .conversation(conversation_id)
        .ok_or_else(|| Refusal::not_found("Conversación no encontrada."))?;
    if !conversation.participants.contains(&claims.sub) {
        return Err(Refusal::forbidden("No participas en esta conversación."));
    }
    let completed = market
        .exchange(conversation.exchange_id)
        .is_some_and(|x| x.completed);
    if completed {
        return Err(Refusal::conflict(
            "El intercambio fue completado. La conversación está cerrada.",
        ));
    }
    let message_id = market.next_id();
    let message = Message {
        id: message_id,
        sender_id: req.sender_id,
        body: req.body,
        sent_at: Utc::now(),
    };
    if let Some(conversation) = market.conversation_mut(conversation_id) {
        conversation.messages.push(message);
    }
    Ok(Json(SendMessageResponse { message_id }))
}

/// POST /chat/conversacion/{id}/visto/.
pub async fn mark_seen(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MarkSeenRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    state.hits.seen_marks.fetch_add(1, Ordering::Relaxed);
    if req.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    let mut market = state.market();
    let last = market
        .conversation(conversation_id)
        .ok_or_else(|| Refusal::not_found("Conversación no encontrada."))?
        .messages
        .last()
        .map(|m| m.id);
    if let (Some(last), Some(conversation)) = (last, market.conversation_mut(conversation_id)) {
        conversation.seen.insert(req.user_id, last);
    }
    Ok(Json(json!({})))
}
