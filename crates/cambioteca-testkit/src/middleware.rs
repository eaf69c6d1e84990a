use axum::{
    Json,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cambioteca_types::api::Claims;
use cambioteca_types::models::User;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::json;

/// Fixed signing secret; the stub only ever talks to tests on loopback.
pub const JWT_SECRET: &str = "cambioteca-testkit-secret";

/// A refused request in the backend's dialect: a status plus
/// `{"detail": ...}`. Login is the one endpoint that answers differently
/// and builds its body by hand.
#[derive(Debug)]
pub struct Refusal {
    pub status: StatusCode,
    pub detail: String,
}

impl Refusal {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, detail)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Error interno.")
    }
}

impl IntoResponse for Refusal {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Extract and validate the bearer token, leaving the claims in request
/// extensions for the handlers.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, Refusal> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Refusal::unauthorized("Las credenciales no fueron proveídas."))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| Refusal::unauthorized("Las credenciales no fueron proveídas."))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| Refusal::unauthorized("Token inválido o expirado."))?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Layered after [`require_auth`] on the moderation routes.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, Refusal> {
    let is_admin = req
        .extensions()
        .get::<Claims>()
        .is_some_and(|claims| claims.admin);
    if !is_admin {
        return Err(Refusal::forbidden("No tienes permiso de administrador."));
    }
    Ok(next.run(req).await)
}

/// Mint a token for `user`, valid for a day. Exposed so tests can fabricate
/// a persisted session without going through login.
pub fn issue_token(user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        admin: user.is_admin,
        exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )?;
    Ok(token)
}
