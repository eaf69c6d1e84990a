use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
};
use cambioteca_types::api::{AvatarResponse, Claims, UpdateProfileRequest};
use cambioteca_types::models::{Book, ExchangeRecord, User, UserRating, UserSummary};

use crate::middleware::Refusal;
use crate::state::AppState;

/// GET /users/{id}/summary/: account plus aggregate figures.
pub async fn summary(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserSummary>, Refusal> {
    let market = state.market();
    let user = market
        .user(user_id)
        .map(|r| r.user.clone())
        .ok_or_else(|| Refusal::not_found("Usuario no encontrado."))?;
    let metrics = market.user_metrics(user_id);
    Ok(Json(UserSummary { user, metrics }))
}

pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, Refusal> {
    let market = state.market();
    market
        .user(user_id)
        .map(|r| Json(r.user.clone()))
        .ok_or_else(|| Refusal::not_found("Usuario no encontrado."))
}

/// PATCH /users/{id}/: partial profile update, answering with the whole
/// refreshed account.
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, Refusal> {
    if user_id != claims.sub && !claims.admin {
        return Err(Refusal::forbidden("No puedes editar un perfil ajeno."));
    }
    let mut market = state.market();
    let record = market
        .user_mut(user_id)
        .ok_or_else(|| Refusal::not_found("Usuario no encontrado."))?;
    if let Some(given_names) = req.given_names {
        record.user.given_names = Some(given_names);
    }
    if let Some(paternal) = req.paternal_surname {
        record.user.paternal_surname = Some(paternal);
    }
    if let Some(maternal) = req.maternal_surname {
        record.user.maternal_surname = Some(maternal);
    }
    if let Some(phone) = req.phone {
        record.user.phone = Some(phone);
    }
    if let Some(address) = req.address {
        record.user.address = Some(address);
    }
    Ok(Json(record.user.clone()))
}

/// PATCH /users/{id}/avatar/ as multipart with an `imagen_perfil` part.
pub async fn update_avatar(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>, Refusal> {
    if user_id != claims.sub && !claims.admin {
        return Err(Refusal::forbidden("No puedes editar un perfil ajeno."));
    }
    let mut got_file = false;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| Refusal::bad_request("Formulario inválido."))?
    {
        if field.name() == Some("imagen_perfil") {
            got_file = true;
            let _ = field.bytes().await;
        }
    }
    if !got_file {
        return Err(Refusal::bad_request("Falta el archivo imagen_perfil."));
    }
    let mut market = state.market();
    let record = market
        .user_mut(user_id)
        .ok_or_else(|| Refusal::not_found("Usuario no encontrado."))?;
    let avatar_url = format!("/media/avatars/{}.jpg", user_id);
    record.user.avatar_path = Some(avatar_url.clone());
    Ok(Json(AvatarResponse { avatar_url }))
}

/// GET /users/{id}/books/: the listings shown on a public profile.
pub async fn books(State(state): State<AppState>, Path(user_id): Path<i64>) -> Json<Vec<Book>> {
    let market = state.market();
    Json(
        market
            .books
            .iter()
            .filter(|b| b.owner_id == user_id)
            .cloned()
            .collect(),
    )
}

pub async fn ratings(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Json<Vec<UserRating>> {
    Json(state.market().user_ratings(user_id))
}

/// GET /users/{id}/intercambios/: history rows relative to the path user.
pub async fn exchanges(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ExchangeRecord>>, Refusal> {
    if user_id != claims.sub && !claims.admin {
        return Err(Refusal::forbidden("No puedes ver intercambios ajenos."));
    }
    Ok(Json(state.market().exchange_rows(user_id)))
}
