use cambioteca_types::api::{
    ActorRequest, CompleteExchangeRequest, ConfirmMeetingRequest, ProposeMeetingRequest,
    RateExchangeRequest,
};
use cambioteca_types::models::{CompletionCode, MeetingProposal, MyRating};

use super::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// PATCH /intercambios/{id}/proponer/: the recipient suggests a place
    /// and time. `time` is the datetime-local string from the form.
    pub async fn propose_meeting(
        &self,
        exchange_id: i64,
        user_id: i64,
        place: &str,
        time: &str,
    ) -> Result<(), ApiError> {
        let req = ProposeMeetingRequest::manual(user_id, place, time);
        self.patch_unit(&format!("/intercambios/{}/proponer/", exchange_id), &req)
            .await
    }

    /// PATCH /intercambios/{id}/confirmar/. Declining resets the stored
    /// place to the placeholder, which reopens scheduling for the other
    /// side.
    pub async fn confirm_meeting(
        &self,
        exchange_id: i64,
        user_id: i64,
        confirm: bool,
    ) -> Result<(), ApiError> {
        let req = ConfirmMeetingRequest { user_id, confirm };
        self.patch_unit(&format!("/intercambios/{}/confirmar/", exchange_id), &req)
            .await
    }

    /// GET /intercambios/{id}/propuesta/: where the meeting negotiation
    /// stands right now.
    pub async fn meeting_proposal(&self, exchange_id: i64) -> Result<MeetingProposal, ApiError> {
        self.get_json(&format!("/intercambios/{}/propuesta/", exchange_id))
            .await
    }

    /// POST /intercambios/{id}/codigo/: only the offerer gets a code.
    pub async fn generate_code(
        &self,
        exchange_id: i64,
        user_id: i64,
    ) -> Result<CompletionCode, ApiError> {
        let req = ActorRequest { user_id };
        self.post_json(&format!("/intercambios/{}/codigo/", exchange_id), &req)
            .await
    }

    /// POST /intercambios/{id}/completar/. The code is normalized the way
    /// the completion form does: surrounding whitespace dropped, letters
    /// uppercased, so "  ab12cd  " redeems AB12CD.
    pub async fn complete_exchange(
        &self,
        exchange_id: i64,
        user_id: i64,
        code: &str,
    ) -> Result<(), ApiError> {
        let req = CompleteExchangeRequest {
            user_id,
            code: code.trim().to_uppercase(),
        };
        self.post_unit(&format!("/intercambios/{}/completar/", exchange_id), &req)
            .await
    }

    /// POST /intercambios/{id}/calificar/. One per participant; a second
    /// attempt comes back as a conflict.
    pub async fn rate_exchange(
        &self,
        exchange_id: i64,
        user_id: i64,
        score: u8,
        comment: &str,
    ) -> Result<(), ApiError> {
        let req = RateExchangeRequest {
            user_id,
            score,
            comment: comment.to_owned(),
        };
        self.post_unit(&format!("/intercambios/{}/calificar/", exchange_id), &req)
            .await
    }

    /// GET /intercambios/{id}/mi-calificacion/?user_id=N. An empty object
    /// means "not rated yet".
    pub async fn my_rating(&self, exchange_id: i64, user_id: i64) -> Result<MyRating, ApiError> {
        self.get_json_query(
            &format!("/intercambios/{}/mi-calificacion/", exchange_id),
            &[("user_id", user_id.to_string())],
        )
        .await
    }
}
