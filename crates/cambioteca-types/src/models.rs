use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder the backend stores in `lugar_intercambio` until both parties
/// agree on a concrete meeting place.
pub const MEETING_PLACE_UNSET: &str = "A coordinar";

/// True when `place` names an actual address rather than the placeholder.
pub fn meeting_place_agreed(place: Option<&str>) -> bool {
    match place {
        Some(p) => !p.trim().is_empty() && p != MEETING_PLACE_UNSET,
        None => false,
    }
}

/// Full account record, as returned by login and the profile endpoints.
/// Field names on the wire are the backend's Spanish ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(rename = "nombre_usuario")]
    pub username: String,
    pub email: String,
    #[serde(rename = "nombres", default)]
    pub given_names: Option<String>,
    #[serde(rename = "apellido_paterno", default)]
    pub paternal_surname: Option<String>,
    #[serde(rename = "apellido_materno", default)]
    pub maternal_surname: Option<String>,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "direccion", default)]
    pub address: Option<String>,
    #[serde(rename = "imagen_perfil", default)]
    pub avatar_path: Option<String>,
    #[serde(rename = "es_admin", default)]
    pub is_admin: bool,
}

/// Shorthand user embedded in proposals and conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "id_usuario")]
    pub id: i64,
    #[serde(rename = "nombre_usuario")]
    pub username: String,
    #[serde(rename = "imagen_perfil", default)]
    pub avatar_path: Option<String>,
}

/// Aggregate figures shown on the profile pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetrics {
    #[serde(rename = "libros_publicados", default)]
    pub books_published: i64,
    #[serde(rename = "intercambios_completados", default)]
    pub exchanges_completed: i64,
    #[serde(rename = "calificacion_promedio", default)]
    pub average_rating: Option<f64>,
    #[serde(rename = "total_calificaciones", default)]
    pub ratings_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub user: User,
    pub metrics: UserMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    #[serde(rename = "id_genero")]
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    #[serde(rename = "id_region")]
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comuna {
    #[serde(rename = "id_comuna")]
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "id_region")]
    pub region_id: i64,
}

/// Listing as it appears in the catalog. `condition` is free text from a
/// fixed set the backend validates ("Nuevo", "Bueno", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
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
    #[serde(rename = "id_genero", default)]
    pub genre_id: Option<i64>,
    #[serde(rename = "estado")]
    pub condition: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "disponible", default)]
    pub available: bool,
    #[serde(rename = "id_usuario")]
    pub owner_id: i64,
    #[serde(default)]
    pub first_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookImage {
    #[serde(rename = "id_imagen")]
    pub id: i64,
    #[serde(rename = "url_imagen")]
    pub url: String,
    #[serde(rename = "is_portada", default)]
    pub is_cover: bool,
    #[serde(rename = "orden", default)]
    pub position: i32,
}

/// Shorthand book embedded in proposals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRef {
    #[serde(rename = "id_libro")]
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "autor", default)]
    pub author: Option<String>,
}

/// Lifecycle of an exchange proposal. The backend spells the terminal
/// "completed" state in the masculine, unlike the other states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "Aceptada")]
    Accepted,
    #[serde(rename = "Rechazada")]
    Rejected,
    #[serde(rename = "Cancelada")]
    Cancelled,
    #[serde(rename = "Completado")]
    Completed,
}

/// One book offered in exchange for the requested one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    #[serde(rename = "id_oferta")]
    pub id: i64,
    #[serde(rename = "libro_ofrecido")]
    pub book: BookRef,
}

/// An exchange proposal as both list endpoints return it. The same record
/// is visible to requester and recipient; who may do what is decided by
/// the capability methods below, never by the caller's own bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(rename = "id_solicitud")]
    pub id: i64,
    #[serde(rename = "estado")]
    pub status: ProposalStatus,
    #[serde(rename = "libro_deseado")]
    pub requested_book: BookRef,
    #[serde(rename = "solicitante")]
    pub requester: UserRef,
    #[serde(rename = "receptor")]
    pub recipient: UserRef,
    #[serde(rename = "ofertas", default)]
    pub offers: Vec<Offer>,
    #[serde(rename = "libro_aceptado", default)]
    pub accepted_book: Option<BookRef>,
    #[serde(rename = "conversacion_id", default)]
    pub conversation_id: Option<i64>,
    #[serde(rename = "intercambio_id", default)]
    pub exchange_id: Option<i64>,
    #[serde(rename = "lugar_intercambio", default)]
    pub meeting_place: Option<String>,
    #[serde(rename = "fecha_intercambio_pactada", default)]
    pub meeting_time: Option<String>,
}

impl Proposal {
    pub fn is_requester(&self, user_id: i64) -> bool {
        self.requester.id == user_id
    }

    pub fn is_recipient(&self, user_id: i64) -> bool {
        self.recipient.id == user_id
    }

    pub fn meeting_place_agreed(&self) -> bool {
        meeting_place_agreed(self.meeting_place.as_deref())
    }

    /// Only the recipient decides on a pending proposal.
    pub fn can_accept_or_reject(&self, user_id: i64) -> bool {
        self.is_recipient(user_id) && self.status == ProposalStatus::Pending
    }

    /// Only the requester may withdraw, and only while still pending.
    pub fn can_cancel(&self, user_id: i64) -> bool {
        self.is_requester(user_id) && self.status == ProposalStatus::Pending
    }

    /// The recipient schedules the meeting once the proposal is accepted
    /// and no place has been agreed yet.
    pub fn can_propose_meeting(&self, user_id: i64) -> bool {
        self.is_recipient(user_id)
            && self.status == ProposalStatus::Accepted
            && !self.meeting_place_agreed()
    }

    /// The requester answers a scheduled meeting.
    pub fn can_confirm_meeting(&self, user_id: i64) -> bool {
        self.is_requester(user_id)
            && self.status == ProposalStatus::Accepted
            && self.meeting_place_agreed()
    }
}

/// Where the meeting negotiation stands. Aliases cover the capitalised
/// spelling some backend serializers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingStatus {
    #[serde(rename = "PENDIENTE", alias = "Pendiente")]
    Pending,
    #[serde(rename = "ACEPTADA", alias = "Aceptada")]
    Accepted,
    #[serde(rename = "RECHAZADA", alias = "Rechazada")]
    Rejected,
}

/// Live meeting state for one exchange, from `GET /intercambios/{id}/propuesta/`.
/// `time` is the datetime-local string exactly as entered in the scheduling
/// form; the backend round-trips it without parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingProposal {
    #[serde(rename = "estado")]
    pub status: MeetingStatus,
    #[serde(rename = "direccion", default)]
    pub place: Option<String>,
    #[serde(rename = "fecha", default)]
    pub time: Option<String>,
}

impl MeetingProposal {
    pub fn place_agreed(&self) -> bool {
        self.status == MeetingStatus::Accepted && meeting_place_agreed(self.place.as_deref())
    }
}

/// Row state in the exchange history. Accepted exchanges spell their state
/// in the masculine here, unlike proposal rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeStatus {
    #[serde(rename = "Aceptado")]
    Accepted,
    #[serde(rename = "Completado")]
    Completed,
}

/// One row of `GET /users/{id}/intercambios/`. `offerer_id` is the user who
/// accepted the proposal (and who generates the completion code);
/// `requester_id` is the user who initiated it (and who redeems the code).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub id: i64,
    #[serde(rename = "estado")]
    pub status: ExchangeStatus,
    #[serde(rename = "ofreciente_id")]
    pub offerer_id: i64,
    #[serde(rename = "solicitante_id")]
    pub requester_id: i64,
    #[serde(default)]
    pub my_book_title: Option<String>,
    #[serde(default)]
    pub counterpart_book_title: Option<String>,
}

impl ExchangeRecord {
    pub fn can_generate_code(&self, user_id: i64) -> bool {
        self.status == ExchangeStatus::Accepted && self.offerer_id == user_id
    }

    pub fn can_complete(&self, user_id: i64) -> bool {
        self.status == ExchangeStatus::Accepted && self.requester_id == user_id
    }
}

/// Completion code handed to the offerer, to be read out loud at the meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionCode {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "expira_en")]
    pub expires_at: DateTime<Utc>,
}

/// Answer of `GET /intercambios/{id}/mi-calificacion/`. All fields are
/// optional: an empty object means the caller has not rated yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MyRating {
    #[serde(rename = "puntuacion", default)]
    pub score: Option<u8>,
    #[serde(rename = "comentario", default)]
    pub comment: Option<String>,
}

impl MyRating {
    pub fn exists(&self) -> bool {
        self.score.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingKind {
    #[serde(rename = "recibida")]
    Received,
    #[serde(rename = "enviada")]
    Given,
}

/// Review shown on a profile page, from `GET /users/{id}/ratings/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRating {
    #[serde(rename = "puntuacion")]
    pub score: u8,
    #[serde(rename = "comentario", default)]
    pub comment: Option<String>,
    #[serde(rename = "tipo")]
    pub kind: RatingKind,
    #[serde(rename = "nombre_usuario", default)]
    pub rater_username: Option<String>,
}

/// Row of the conversation list. Titles are relative to the requesting
/// user, which is why the backend names them in English mine/theirs terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(rename = "id_conversacion")]
    pub id: i64,
    #[serde(rename = "otro_usuario")]
    pub counterpart: UserRef,
    #[serde(default)]
    pub my_book_title: Option<String>,
    #[serde(default)]
    pub counterpart_book_title: Option<String>,
    #[serde(rename = "estado_intercambio", default)]
    pub exchange_status: Option<String>,
}

impl ConversationSummary {
    /// A completed exchange freezes its conversation.
    pub fn is_completed(&self) -> bool {
        self.exchange_status.as_deref() == Some("Completado")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "id_mensaje")]
    pub id: i64,
    #[serde(rename = "emisor_id")]
    pub sender_id: i64,
    #[serde(rename = "cuerpo")]
    pub body: String,
    #[serde(rename = "enviado_en")]
    pub sent_at: DateTime<Utc>,
}

/// Moderation outcome of a listing report. "Upheld" means the report was
/// valid and the listing gets sanctioned; "Dismissed" means false alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "APROBADO")]
    Upheld,
    #[serde(rename = "RECHAZADO")]
    Dismissed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookReport {
    #[serde(rename = "id_reporte")]
    pub id: i64,
    #[serde(rename = "id_libro")]
    pub book_id: i64,
    #[serde(rename = "titulo_libro", default)]
    pub book_title: Option<String>,
    #[serde(rename = "motivo")]
    pub reason: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "estado")]
    pub status: ReportStatus,
    #[serde(rename = "comentario_admin", default)]
    pub admin_comment: Option<String>,
    #[serde(rename = "nombre_usuario", default)]
    pub reporter_username: Option<String>,
}

/// Row of the admin user table. Uses the `id_usuario` spelling, unlike the
/// login payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    #[serde(rename = "id_usuario")]
    pub id: i64,
    #[serde(rename = "nombre_usuario")]
    pub username: String,
    pub email: String,
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "es_admin", default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesStats {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub by_day_last_30: Vec<DailyCount>,
}

/// Leaderboard entries in the admin summary. The aliases absorb the ORM
/// join names the backend leaks on some deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPublisher {
    #[serde(rename = "nombre_usuario", alias = "id_usuario__nombre_usuario")]
    pub username: String,
    #[serde(default)]
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopRatedUser {
    #[serde(
        rename = "nombre_usuario",
        alias = "id_usuario_calificado__nombre_usuario"
    )]
    pub username: String,
    #[serde(rename = "promedio", default)]
    pub average: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopActiveUser {
    #[serde(rename = "nombre_usuario")]
    pub username: String,
    #[serde(default)]
    pub total_completed_exchanges: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreExchanges {
    pub genre: String,
    pub total: i64,
}

/// Everything the admin dashboard renders, in one payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminSummary {
    #[serde(default)]
    pub top_publishers: Vec<TopPublisher>,
    #[serde(default)]
    pub top_rated_users: Vec<TopRatedUser>,
    #[serde(default)]
    pub top_active_users: Vec<TopActiveUser>,
    #[serde(default)]
    pub genres_exchanges: Vec<GenreExchanges>,
    #[serde(default)]
    pub books_stats: SeriesStats,
    #[serde(default)]
    pub exchanges_stats: SeriesStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicConfig {
    #[serde(rename = "mapsApiKey", default)]
    pub maps_api_key: Option<String>,
}

/// What the client persists between runs: the bearer token and the account
/// it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}
