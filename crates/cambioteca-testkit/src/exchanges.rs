use std::sync::atomic::Ordering;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cambioteca_types::api::{
    ActorRequest, Claims, CompleteExchangeRequest, ConfirmMeetingRequest, ProposeMeetingRequest,
    RateExchangeRequest,
};
use cambioteca_types::models::{
    CompletionCode, MeetingProposal, MeetingStatus, MyRating, ProposalStatus,
};
use chrono::{Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::middleware::Refusal;
use crate::state::{AppState, IssuedCode, RatingRecord};

/// Ambiguous glyphs are left out so the code survives being read aloud.
const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;
const CODE_TTL_MINUTES: i64 = 10;

fn mint_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// PATCH /intercambios/{id}/proponer/: the offerer puts a place and time
/// on the table.
pub async fn propose_meeting(
    State(state): State<AppState>,
    Path(exchange_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ProposeMeetingRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    if req.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    if req.place.trim().is_empty() || req.time.trim().is_empty() {
        return Err(Refusal::bad_request("Lugar y fecha son obligatorios."));
    }
    let mut market = state.market();
    let exchange = market
        .exchange_mut(exchange_id)
        .ok_or_else(|| Refusal::not_found("Intercambio no encontrado."))?;
    if exchange.offerer_id != req.user_id {
        return Err(Refusal::forbidden(
            "Solo el ofreciente puede proponer el encuentro.",
        ));
    }
    if exchange.completed {
        return Err(Refusal::conflict("El intercambio ya fue completado."));
    }
    if exchange.meeting.status == MeetingStatus::Accepted {
        return Err(Refusal::conflict("El lugar ya fue confirmado."));
    }
    exchange.meeting.status = MeetingStatus::Pending;
    exchange.meeting.place = Some(req.place);
    exchange.meeting.time = Some(req.time);
    Ok(Json(json!({})))
}

/// PATCH /intercambios/{id}/confirmar/: the requester answers. Declining
/// clears place and time so the offerer can propose again.
pub async fn confirm_meeting(
    State(state): State<AppState>,
    Path(exchange_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConfirmMeetingRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    if req.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    let mut market = state.market();
    let exchange = market
        .exchange_mut(exchange_id)
        .ok_or_else(|| Refusal::not_found("Intercambio no encontrado."))?;
    if exchange.requester_id != req.user_id {
        return Err(Refusal::forbidden(
            "Solo el solicitante puede confirmar el encuentro.",
        ));
    }
    if exchange.completed {
        return Err(Refusal::conflict("El intercambio ya fue completado."));
    }
    if exchange.meeting.place.is_none() || exchange.meeting.status != MeetingStatus::Pending {
        return Err(Refusal::conflict("No hay propuesta de encuentro pendiente."));
    }
    if req.confirm {
        exchange.meeting.status = MeetingStatus::Accepted;
    } else {
        exchange.meeting.status = MeetingStatus::Rejected;
        exchange.meeting.place = None;
        exchange.meeting.time = None;
    }
    Ok(Json(json!({})))
}

/// GET /intercambios/{id}/propuesta/: live meeting state.
pub async fn meeting(
    State(state): State<AppState>,
    Path(exchange_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MeetingProposal>, Refusal> {
    state.hits.meeting_probes.fetch_add(1, Ordering::Relaxed);
    let market = state.market();
    let exchange = market
        .exchange(exchange_id)
        .ok_or_else(|| Refusal::not_found("Intercambio no encontrado."))?;
    if exchange.offerer_id != claims.sub && exchange.requester_id != claims.sub {
        return Err(Refusal::forbidden("No participas en este intercambio."));
    }
    Ok(Json(MeetingProposal {
        status: exchange.meeting.status,
        place: exchange.meeting.place.clone(),
        time: exchange.meeting.time.clone(),
    }))
}

/// POST /intercambios/{id}/codigo/: the offerer gets a short-lived code to
/// read out at the meeting. Asking again mints a fresh one.
pub async fn generate_code(
    State(state): State<AppState>,
    Path(exchange_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<CompletionCode>, Refusal> {
    if req.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    let code = mint_code();
    let mut market = state.market();
    let exchange = market
        .exchange_mut(exchange_id)
        .ok_or_else(|| Refusal::not_found("Intercambio no encontrado."))?;
    if exchange.offerer_id != req.user_id {
        return Err(Refusal::forbidden(
            "Solo el ofreciente puede generar el código.",
        ));
    }
    if exchange.completed {
        return Err(Refusal::conflict("El intercambio ya fue completado."));
    }
    if exchange.meeting.status != MeetingStatus::Accepted {
        return Err(Refusal::conflict(
            "Primero deben acordar un lugar de encuentro.",
        ));
    }
    let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);
    exchange.code = Some(IssuedCode {
        code: code.clone(),
        expires_at,
    });
    info!(exchange_id, "completion code issued");
    Ok(Json(CompletionCode { code, expires_at }))
}

/// POST /intercambios/{id}/completar/: the requester redeems the code.
/// Completion closes the conversation and finishes the proposal.
pub async fn complete(
    State(state): State<AppState>,
    Path(exchange_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CompleteExchangeRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    if req.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    let mut market = state.market();
    let exchange = market
        .exchange_mut(exchange_id)
        .ok_or_else(|| Refusal::not_found("Intercambio no encontrado."))?;
    if exchange.requester_id != req.user_id {
        return Err(Refusal::forbidden(
            "Solo el solicitante puede completar el intercambio.",
        ));
    }
    if exchange.completed {
        return Err(Refusal::conflict("El intercambio ya fue completado."));
    }
    let issued = exchange
        .code
        .as_ref()
        .ok_or_else(|| Refusal::bad_request("Código inválido."))?;
    if issued.expires_at < Utc::now() {
        return Err(Refusal::bad_request("El código ha expirado."));
    }
    if issued.code != req.code {
        return Err(Refusal::bad_request("Código inválido."));
    }
    exchange.completed = true;
    let proposal_id = exchange.proposal_id;
    if let Some(proposal) = market.proposal_mut(proposal_id) {
        proposal.status = ProposalStatus::Completed;
    }
    info!(exchange_id, "exchange completed");
    Ok(Json(json!({})))
}

/// POST /intercambios/{id}/calificar/: once per participant.
pub async fn rate(
    State(state): State<AppState>,
    Path(exchange_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RateExchangeRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), Refusal> {
    if req.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    if !(1..=5).contains(&req.score) {
        return Err(Refusal::bad_request("Puntuación inválida."));
    }
    let mut market = state.market();
    let exchange = market
        .exchange(exchange_id)
        .ok_or_else(|| Refusal::not_found("Intercambio no encontrado."))?;
    if exchange.offerer_id != req.user_id && exchange.requester_id != req.user_id {
        return Err(Refusal::forbidden("No participas en este intercambio."));
    }
    if !exchange.completed {
        return Err(Refusal::conflict(
            "Solo puedes calificar intercambios completados.",
        ));
    }
    let ratee_id = if exchange.offerer_id == req.user_id {
        exchange.requester_id
    } else {
        exchange.offerer_id
    };
    let duplicate = market
        .ratings
        .iter()
        .any(|r| r.exchange_id == exchange_id && r.rater_id == req.user_id);
    if duplicate {
        return Err(Refusal::conflict("Ya calificaste este intercambio."));
    }
    market.ratings.push(RatingRecord {
        exchange_id,
        rater_id: req.user_id,
        ratee_id,
        score: req.score,
        comment: req.comment,
    });
    Ok((StatusCode::CREATED, Json(json!({}))))
}

#[derive(Debug, Deserialize)]
pub struct MyRatingQuery {
    pub user_id: i64,
}

/// GET /intercambios/{id}/mi-calificacion/?user_id=N. An empty object
/// means "not rated yet".
pub async fn my_rating(
    State(state): State<AppState>,
    Path(exchange_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MyRatingQuery>,
) -> Result<Json<MyRating>, Refusal> {
    state.hits.rating_probes.fetch_add(1, Ordering::Relaxed);
    if query.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    let market = state.market();
    let rating = market
        .ratings
        .iter()
        .find(|r| r.exchange_id == exchange_id && r.rater_id == query.user_id)
        .map(|r| MyRating {
            score: Some(r.score),
            comment: Some(r.comment.clone()).filter(|c| !c.is_empty()),
        })
        .unwrap_or_default();
    Ok(Json(rating))
}
