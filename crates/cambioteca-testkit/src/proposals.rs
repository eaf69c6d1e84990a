use std::sync::atomic::Ordering;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cambioteca_types::api::{AcceptProposalRequest, ActorRequest, Claims, CreateProposalRequest};
use cambioteca_types::models::{Proposal, ProposalStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::middleware::Refusal;
use crate::state::{
    AppState, ConversationRecord, ExchangeEntry, MeetingState, OfferRecord, ProposalRecord,
};

/// POST /solicitudes/crear/.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateProposalRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), Refusal> {
    if req.requester_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    if req.offered_book_ids.is_empty() {
        return Err(Refusal::bad_request("Debes ofrecer al menos un libro."));
    }
    let mut market = state.market();
    let requested = market
        .book(req.requested_book_id)
        .ok_or_else(|| Refusal::not_found("Libro no encontrado."))?;
    if requested.owner_id == req.requester_id {
        return Err(Refusal::bad_request("No puedes solicitar tu propio libro."));
    }
    if !requested.available {
        return Err(Refusal::conflict("El libro ya no está disponible."));
    }
    let recipient_id = requested.owner_id;
    for book_id in &req.offered_book_ids {
        let offered = market
            .book(*book_id)
            .ok_or_else(|| Refusal::not_found("Libro no encontrado."))?;
        if offered.owner_id != req.requester_id || !offered.available {
            return Err(Refusal::bad_request(
                "Solo puedes ofrecer libros propios y disponibles.",
            ));
        }
    }

    let id = market.next_id();
    let mut offers = Vec::with_capacity(req.offered_book_ids.len());
    for book_id in &req.offered_book_ids {
        offers.push(OfferRecord {
            id: market.next_id(),
            book_id: *book_id,
        });
    }
    market.proposals.push(ProposalRecord {
        id,
        status: ProposalStatus::Pending,
        requester_id: req.requester_id,
        recipient_id,
        requested_book_id: req.requested_book_id,
        offers,
        accepted_book_id: None,
        conversation_id: None,
        exchange_id: None,
    });
    info!(proposal_id = id, requester_id = req.requester_id, "proposal created");
    Ok((StatusCode::CREATED, Json(json!({ "id_solicitud": id }))))
}

#[derive(Debug, Deserialize)]
pub struct MailboxQuery {
    pub user_id: i64,
}

/// GET /solicitudes/enviadas/?user_id=N.
pub async fn sent(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MailboxQuery>,
) -> Result<Json<Vec<Proposal>>, Refusal> {
    state.hits.proposal_lists.fetch_add(1, Ordering::Relaxed);
    if query.user_id != claims.sub {
        return Err(Refusal::forbidden("No puedes ver propuestas ajenas."));
    }
    let market = state.market();
    Ok(Json(
        market
            .proposals
            .iter()
            .filter(|p| p.requester_id == query.user_id)
            .map(|p| market.project_proposal(p))
            .collect(),
    ))
}

/// GET /solicitudes/recibidas/?user_id=N.
pub async fn received(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MailboxQuery>,
) -> Result<Json<Vec<Proposal>>, Refusal> {
    state.hits.proposal_lists.fetch_add(1, Ordering::Relaxed);
    if query.user_id != claims.sub {
        return Err(Refusal::forbidden("No puedes ver propuestas ajenas."));
    }
    let market = state.market();
    Ok(Json(
        market
            .proposals
            .iter()
            .filter(|p| p.recipient_id == query.user_id)
            .map(|p| market.project_proposal(p))
            .collect(),
    ))
}

/// POST /solicitudes/{id}/aceptar/. Only the recipient, only while
/// pending, and the accepted book must be one of the offers. Acceptance
/// reserves both books and opens the conversation and the exchange.
pub async fn accept(
    State(state): State<AppState>,
    Path(proposal_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AcceptProposalRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    if req.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    let mut market = state.market();
    let proposal = market
        .proposal(proposal_id)
        .ok_or_else(|| Refusal::not_found("Propuesta no encontrada."))?;
    if proposal.recipient_id != req.user_id {
        return Err(Refusal::forbidden("Solo el receptor puede aceptar."));
    }
    if proposal.status != ProposalStatus::Pending {
        return Err(Refusal::conflict("La solicitud ya fue gestionada."));
    }
    if !proposal.offers.iter().any(|o| o.book_id == req.accepted_book_id) {
        return Err(Refusal::bad_request(
            "El libro aceptado no forma parte de la oferta.",
        ));
    }

    let requester_id = proposal.requester_id;
    let recipient_id = proposal.recipient_id;
    let requested_book_id = proposal.requested_book_id;

    let conversation_id = market.next_id();
    let exchange_id = market.next_id();
    market.conversations.push(ConversationRecord {
        id: conversation_id,
        exchange_id,
        participants: [requester_id, recipient_id],
        messages: Vec::new(),
        seen: std::collections::HashMap::new(),
    });
    market.exchanges.push(ExchangeEntry {
        id: exchange_id,
        proposal_id,
        offerer_id: recipient_id,
        requester_id,
        requested_book_id,
        offered_book_id: req.accepted_book_id,
        completed: false,
        meeting: MeetingState::default(),
        code: None,
    });
    for book_id in [requested_book_id, req.accepted_book_id] {
        if let Some(book) = market.book_mut(book_id) {
            book.available = false;
        }
    }
    if let Some(proposal) = market.proposal_mut(proposal_id) {
        proposal.status = ProposalStatus::Accepted;
        proposal.accepted_book_id = Some(req.accepted_book_id);
        proposal.conversation_id = Some(conversation_id);
        proposal.exchange_id = Some(exchange_id);
    }
    info!(proposal_id, exchange_id, conversation_id, "proposal accepted");
    Ok(Json(json!({
        "conversacion_id": conversation_id,
        "intercambio_id": exchange_id,
    })))
}

/// POST /solicitudes/{id}/rechazar/: recipient only, terminal.
pub async fn reject(
    State(state): State<AppState>,
    Path(proposal_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    close_pending(
        &state,
        proposal_id,
        claims,
        req,
        ProposalStatus::Rejected,
        Role::Recipient,
    )
}

/// POST /solicitudes/{id}/cancelar/: requester only, terminal.
pub async fn cancel(
    State(state): State<AppState>,
    Path(proposal_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    close_pending(
        &state,
        proposal_id,
        claims,
        req,
        ProposalStatus::Cancelled,
        Role::Requester,
    )
}

enum Role {
    Requester,
    Recipient,
}

fn close_pending(
    state: &AppState,
    proposal_id: i64,
    claims: Claims,
    req: ActorRequest,
    outcome: ProposalStatus,
    who: Role,
) -> Result<Json<serde_json::Value>, Refusal> {
    if req.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    let mut market = state.market();
    let proposal = market
        .proposal_mut(proposal_id)
        .ok_or_else(|| Refusal::not_found("Propuesta no encontrada."))?;
    let allowed = match who {
        Role::Requester => proposal.requester_id == req.user_id,
        Role::Recipient => proposal.recipient_id == req.user_id,
    };
    if !allowed {
        let detail = match who {
            Role::Requester => "Solo el solicitante puede cancelar.",
            Role::Recipient => "Solo el receptor puede rechazar.",
        };
        return Err(Refusal::forbidden(detail));
    }
    if proposal.status != ProposalStatus::Pending {
        return Err(Refusal::conflict("La solicitud ya fue gestionada."));
    }
    proposal.status = outcome;
    Ok(Json(json!({})))
}
