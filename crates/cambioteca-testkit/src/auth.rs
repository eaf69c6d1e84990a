use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use cambioteca_types::api::{
    ChangePasswordRequest, Claims, ForgotPasswordRequest, LoginRequest, LoginResponse,
    ResetPasswordRequest,
};
use cambioteca_types::models::User;
use serde_json::json;
use tracing::info;

use crate::middleware::{Refusal, issue_token};
use crate::state::{AppState, UserRecord};

/// POST /auth/login/. Failures carry their message in `error`, not
/// `detail`; this is the backend's one deviation and the client knows it.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<serde_json::Value>)> {
    let refuse = |status, msg: &str| (status, Json(json!({ "error": msg })));

    let market = state.market();
    let record = market
        .user_by_email(&req.email)
        .filter(|r| r.password == req.password)
        .ok_or_else(|| refuse(StatusCode::UNAUTHORIZED, "Credenciales inválidas."))?;
    if !record.active {
        return Err(refuse(StatusCode::FORBIDDEN, "Tu cuenta está deshabilitada."));
    }

    let user = record.user.clone();
    let access = issue_token(&user)
        .map_err(|_| refuse(StatusCode::INTERNAL_SERVER_ERROR, "Error interno."))?;
    info!(user_id = user.id, "login accepted");
    Ok(Json(LoginResponse { access, user }))
}

/// POST /auth/register/ as multipart form data, matching the registration
/// form with its optional avatar.
pub async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, Refusal> {
    let mut fields: std::collections::HashMap<String, String> = std::collections::HashMap::new();
    let mut has_avatar = false;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| Refusal::bad_request("Formulario inválido."))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == "imagen_perfil" {
            has_avatar = true;
            let _ = field.bytes().await;
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|_| Refusal::bad_request("Formulario inválido."))?;
        fields.insert(name, value);
    }

    let required = |key: &str| -> Result<String, Refusal> {
        fields
            .get(key)
            .map(String::clone)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Refusal::bad_request("Faltan campos obligatorios."))
    };
    let username = required("nombre_usuario")?;
    let email = required("email")?;
    let password = required("contrasena")?;
    let comuna_id: i64 = required("comuna")?
        .parse()
        .map_err(|_| Refusal::bad_request("Comuna inválida."))?;
    if password.len() < 8 {
        return Err(Refusal::bad_request(
            "La contraseña debe tener al menos 8 caracteres.",
        ));
    }

    let mut market = state.market();
    if market.comunas.iter().all(|c| c.id != comuna_id) {
        return Err(Refusal::bad_request("Comuna inválida."));
    }
    if market.user_by_email(&email).is_some() {
        return Err(Refusal::bad_request("El correo ya está registrado."));
    }
    if market.users.iter().any(|u| u.user.username == username) {
        return Err(Refusal::bad_request("El nombre de usuario ya está en uso."));
    }

    let id = market.next_id();
    let user = User {
        id,
        username,
        email,
        given_names: fields.get("nombres").cloned(),
        paternal_surname: fields.get("apellido_paterno").cloned(),
        maternal_surname: fields.get("apellido_materno").cloned(),
        phone: fields.get("telefono").cloned(),
        address: fields.get("direccion").cloned(),
        avatar_path: has_avatar.then(|| format!("/media/avatars/{}.jpg", id)),
        is_admin: false,
    };
    market.users.push(UserRecord {
        user: user.clone(),
        password,
        active: true,
    });
    info!(user_id = id, "account registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/forgot/. Answers 200 whether or not the address exists, but
/// records a deterministic token for registered ones so tests can follow
/// the reset path.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Json<serde_json::Value> {
    let mut market = state.market();
    if let Some(record) = market.user_by_email(&req.email) {
        let token = format!("reset-{}", record.user.id);
        let user_id = record.user.id;
        market.reset_tokens.insert(token, user_id);
    }
    Json(json!({ "detail": "Si el correo existe, enviamos instrucciones." }))
}

/// POST /auth/reset/ with the token from the recovery email.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    if req.password != req.password2 {
        return Err(Refusal::bad_request("Las contraseñas no coinciden."));
    }
    let mut market = state.market();
    let user_id = market
        .reset_tokens
        .remove(&req.token)
        .ok_or_else(|| Refusal::bad_request("Token inválido o expirado."))?;
    match market.user_mut(user_id) {
        Some(record) => record.password = req.password,
        None => return Err(Refusal::bad_request("Token inválido o expirado.")),
    }
    Ok(Json(json!({ "detail": "Contraseña actualizada." })))
}

/// POST /auth/change-password/ for the logged-in account.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    let mut market = state.market();
    let record = market
        .user_mut(claims.sub)
        .ok_or_else(|| Refusal::not_found("Usuario no encontrado."))?;
    if record.password != req.current {
        return Err(Refusal::bad_request("La contraseña actual es incorrecta."));
    }
    record.password = req.new_password;
    Ok(Json(json!({ "detail": "Contraseña actualizada." })))
}
