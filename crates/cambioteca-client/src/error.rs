use cambioteca_types::api::ErrorBody;
use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by [`crate::ApiClient`]. The HTTP status decides the
/// variant; `detail` carries whatever message the backend attached.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response, or the body could not be read.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 400: the backend rejected the submitted data.
    #[error("rejected: {}", .detail.as_deref().unwrap_or("datos inválidos"))]
    Validation { detail: Option<String> },

    /// 401: missing, expired or revoked token.
    #[error("unauthorized: {}", .detail.as_deref().unwrap_or("token rechazado"))]
    Unauthorized { detail: Option<String> },

    /// 403: authenticated, but this account may not do that.
    #[error("forbidden: {}", .detail.as_deref().unwrap_or("sin permiso"))]
    Forbidden { detail: Option<String> },

    /// 404.
    #[error("not found: {}", .detail.as_deref().unwrap_or("no existe"))]
    NotFound { detail: Option<String> },

    /// 409: the operation lost a race against a concurrent actor.
    #[error("conflict: {}", .detail.as_deref().unwrap_or("estado cambió"))]
    Conflict { detail: Option<String> },

    /// Any other non-2xx answer.
    #[error("status {status}: {}", .detail.as_deref().unwrap_or("error del servidor"))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
}

impl ApiError {
    /// Client-side validation failure carrying the form's own message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            detail: Some(message.into()),
        }
    }

    pub fn from_status(status: StatusCode, body: ErrorBody) -> Self {
        let detail = body.message().map(str::to_owned);
        match status {
            StatusCode::BAD_REQUEST => Self::Validation { detail },
            StatusCode::UNAUTHORIZED => Self::Unauthorized { detail },
            StatusCode::FORBIDDEN => Self::Forbidden { detail },
            StatusCode::NOT_FOUND => Self::NotFound { detail },
            StatusCode::CONFLICT => Self::Conflict { detail },
            status => Self::Status { status, detail },
        }
    }

    /// Message the backend attached, if any. Views fall back to their own
    /// wording when this is `None`.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Transport(_) => None,
            Self::Validation { detail }
            | Self::Unauthorized { detail }
            | Self::Forbidden { detail }
            | Self::NotFound { detail }
            | Self::Conflict { detail }
            | Self::Status { detail, .. } => detail.as_deref(),
        }
    }

    /// Backend wording when present, the caller's fallback otherwise. This
    /// is what a screen prints next to a failed action.
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.detail().unwrap_or(fallback)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_picks_the_variant() {
        let err = ApiError::from_status(StatusCode::CONFLICT, ErrorBody::default());
        assert!(err.is_conflict());
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, ErrorBody::default());
        assert!(err.is_unauthorized());
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, ErrorBody::default());
        assert!(err.is_validation());
    }

    #[test]
    fn detail_prefers_backend_wording() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": "La solicitud ya fue aceptada."}"#).unwrap();
        let err = ApiError::from_status(StatusCode::CONFLICT, body);
        assert_eq!(err.detail(), Some("La solicitud ya fue aceptada."));
    }

    #[test]
    fn login_error_field_carries_through() {
        let body: ErrorBody = serde_json::from_str(r#"{"error": "Credenciales"}"#).unwrap();
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, body);
        assert_eq!(err.detail(), Some("Credenciales"));
    }

    #[test]
    fn message_falls_back_when_the_body_was_empty() {
        let bare = ApiError::from_status(StatusCode::CONFLICT, ErrorBody::default());
        assert_eq!(bare.message_or("Error al aceptar."), "Error al aceptar.");
        let worded = ApiError::validation("Debes seleccionar un motivo.");
        assert_eq!(worded.message_or("genérico"), "Debes seleccionar un motivo.");
    }
}
