use serde::{Deserialize, Serialize};

use crate::models::ReportStatus;

// -- JWT Claims --

/// JWT claims carried in the bearer token, shared between the client
/// session layer and the stub backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub admin: bool,
    pub exp: usize,
}

// -- Error envelope --

/// Error body the backend sends alongside non-2xx statuses. Every endpoint
/// uses `detail` except login, which answers with `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<&str> {
        self.detail.as_deref().or(self.error.as_deref())
    }
}

// -- Auth --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    #[serde(rename = "contrasena")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub user: crate::models::User,
}

/// A file riding along in a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Registration travels as multipart form data, not JSON, because the
/// avatar may ride along. Field names mirror the backend form.
#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub rut: String,
    pub given_names: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub street_number: String,
    pub comuna_id: i64,
    pub password: String,
    pub avatar: Option<FilePart>,
}

impl RegisterForm {
    /// Text fields in backend naming, ready to append to a multipart form.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rut", self.rut.clone()),
            ("nombres", self.given_names.clone()),
            ("apellido_paterno", self.paternal_surname.clone()),
            ("apellido_materno", self.maternal_surname.clone()),
            ("nombre_usuario", self.username.clone()),
            ("email", self.email.clone()),
            ("telefono", self.phone.clone()),
            ("direccion", self.address.clone()),
            ("numeracion", self.street_number.clone()),
            ("comuna", self.comuna_id.to_string()),
            ("contrasena", self.password.clone()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current: String,
    #[serde(rename = "new")]
    pub new_password: String,
}

// -- Books --

/// Catalog query. Everything unset means "the whole catalog".
#[derive(Debug, Clone, Default)]
pub struct BookFilters {
    pub query: Option<String>,
    pub genre_id: Option<i64>,
}

impl BookFilters {
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            genre_id: None,
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(q) = &self.query {
            let q = q.trim();
            if !q.is_empty() {
                params.push(("query", q.to_owned()));
            }
        }
        if let Some(genre) = self.genre_id {
            params.push(("genero", genre.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookRequest {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "autor")]
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(rename = "anio_publicacion", default)]
    pub year_published: Option<i32>,
    #[serde(rename = "editorial", default)]
    pub publisher: Option<String>,
    #[serde(rename = "id_genero")]
    pub genre_id: i64,
    #[serde(rename = "estado")]
    pub condition: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "id_usuario")]
    pub owner_id: i64,
}

/// Partial update; only the set fields travel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateBookRequest {
    #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "autor", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(rename = "anio_publicacion", skip_serializing_if = "Option::is_none")]
    pub year_published: Option<i32>,
    #[serde(rename = "editorial", skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(rename = "id_genero", skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<i64>,
    #[serde(rename = "estado", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "disponible", skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

/// One image for the upload endpoint. `is_cover` travels as "1"/"0" in the
/// multipart form, matching what the backend form parser expects.
#[derive(Debug, Clone)]
pub struct BookImageUpload {
    pub image: FilePart,
    pub is_cover: bool,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportBookRequest {
    #[serde(rename = "motivo")]
    pub reason: String,
    #[serde(rename = "descripcion")]
    pub description: String,
}

// -- Users --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    #[serde(rename = "nombres", skip_serializing_if = "Option::is_none")]
    pub given_names: Option<String>,
    #[serde(rename = "apellido_paterno", skip_serializing_if = "Option::is_none")]
    pub paternal_surname: Option<String>,
    #[serde(rename = "apellido_materno", skip_serializing_if = "Option::is_none")]
    pub maternal_surname: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "direccion", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Answer of the avatar upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

// -- Favorites --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleFavoriteRequest {
    pub user_id: i64,
}

/// Toggle answer: `favorited` tells the caller which way it went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFavoriteResponse {
    pub favorited: bool,
}

// -- Chat --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(rename = "id_usuario_emisor")]
    pub sender_id: i64,
    #[serde(rename = "cuerpo")]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(rename = "id_mensaje")]
    pub message_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkSeenRequest {
    #[serde(rename = "id_usuario")]
    pub user_id: i64,
}

// -- Proposals --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProposalRequest {
    #[serde(rename = "id_usuario_solicitante")]
    pub requester_id: i64,
    #[serde(rename = "id_libro_deseado")]
    pub requested_book_id: i64,
    #[serde(rename = "id_libros_ofrecidos")]
    pub offered_book_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptProposalRequest {
    pub user_id: i64,
    #[serde(rename = "id_libro_aceptado")]
    pub accepted_book_id: i64,
}

/// Body for the endpoints that only need to know who is acting: reject,
/// cancel and code generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorRequest {
    pub user_id: i64,
}

// -- Exchanges --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposeMeetingRequest {
    pub user_id: i64,
    #[serde(rename = "metodo")]
    pub method: String,
    #[serde(rename = "direccion")]
    pub place: String,
    #[serde(rename = "fecha")]
    pub time: String,
}

impl ProposeMeetingRequest {
    /// The scheduling form only supports manually entered addresses.
    pub fn manual(user_id: i64, place: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            user_id,
            method: "MANUAL".to_owned(),
            place: place.into(),
            time: time.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmMeetingRequest {
    pub user_id: i64,
    #[serde(rename = "confirmar")]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteExchangeRequest {
    pub user_id: i64,
    #[serde(rename = "codigo")]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateExchangeRequest {
    pub user_id: i64,
    #[serde(rename = "puntuacion")]
    pub score: u8,
    #[serde(rename = "comentario")]
    pub comment: String,
}

// -- Admin --

/// Answer of the account toggle: the state the account landed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleUserResponse {
    #[serde(rename = "activo")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveReportRequest {
    #[serde(rename = "estado")]
    pub status: ReportStatus,
    #[serde(rename = "comentario_admin")]
    pub admin_comment: String,
    #[serde(rename = "marcar_baja")]
    pub delist_book: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filters_produce_no_params() {
        assert!(BookFilters::default().to_params().is_empty());
        let blank = BookFilters {
            query: Some("   ".into()),
            genre_id: None,
        };
        assert!(blank.to_params().is_empty());
    }

    #[test]
    fn filters_trim_the_query() {
        let f = BookFilters {
            query: Some("  cortázar ".into()),
            genre_id: Some(3),
        };
        assert_eq!(
            f.to_params(),
            vec![("query", "cortázar".to_owned()), ("genero", "3".to_owned())]
        );
    }

    #[test]
    fn change_password_uses_backend_field_names() {
        let req = ChangePasswordRequest {
            current: "old-secret".into(),
            new_password: "new-secret".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["current"], "old-secret");
        assert_eq!(json["new"], "new-secret");
    }

    #[test]
    fn partial_book_update_skips_unset_fields() {
        let req = UpdateBookRequest {
            available: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"disponible":false}"#);
    }

    #[test]
    fn error_body_prefers_detail() {
        let both: ErrorBody =
            serde_json::from_str(r#"{"detail": "No autorizado.", "error": "otro"}"#).unwrap();
        assert_eq!(both.message(), Some("No autorizado."));
        let login_shape: ErrorBody = serde_json::from_str(r#"{"error": "Credenciales"}"#).unwrap();
        assert_eq!(login_shape.message(), Some("Credenciales"));
        assert_eq!(ErrorBody::default().message(), None);
    }

    #[test]
    fn register_form_excludes_region_and_confirmation() {
        let form = RegisterForm {
            rut: "12.345.678-5".into(),
            given_names: "Marcela".into(),
            paternal_surname: "Soto".into(),
            maternal_surname: "Rojas".into(),
            username: "marcela".into(),
            email: "marcela@example.cl".into(),
            phone: "+56912345678".into(),
            address: "Av. Providencia".into(),
            street_number: "1234".into(),
            comuna_id: 101,
            password: "secretísimo1".into(),
            avatar: None,
        };
        let names: Vec<&str> = form.text_fields().iter().map(|(k, _)| *k).collect();
        assert!(names.contains(&"comuna"));
        assert!(!names.contains(&"region"));
        assert!(!names.contains(&"password2"));
    }
}
