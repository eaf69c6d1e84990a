use cambioteca_types::api::{AcceptProposalRequest, ActorRequest, CreateProposalRequest};
use cambioteca_types::models::Proposal;

use super::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// POST /solicitudes/crear/. The backend validates that every offered
    /// book is available and belongs to the requester.
    pub async fn create_proposal(&self, req: &CreateProposalRequest) -> Result<(), ApiError> {
        self.post_unit("/solicitudes/crear/", req).await
    }

    /// GET /solicitudes/enviadas/?user_id=N.
    pub async fn sent_proposals(&self, user_id: i64) -> Result<Vec<Proposal>, ApiError> {
        self.get_json_query("/solicitudes/enviadas/", &[("user_id", user_id.to_string())])
            .await
    }

    /// GET /solicitudes/recibidas/?user_id=N.
    pub async fn received_proposals(&self, user_id: i64) -> Result<Vec<Proposal>, ApiError> {
        self.get_json_query("/solicitudes/recibidas/", &[("user_id", user_id.to_string())])
            .await
    }

    /// POST /solicitudes/{id}/aceptar/, naming which offered book seals
    /// the deal. Only the recipient may call this; the backend enforces it
    /// regardless of what the caller believes.
    pub async fn accept_proposal(
        &self,
        proposal_id: i64,
        user_id: i64,
        accepted_book_id: i64,
    ) -> Result<(), ApiError> {
        let req = AcceptProposalRequest {
            user_id,
            accepted_book_id,
        };
        self.post_unit(&format!("/solicitudes/{}/aceptar/", proposal_id), &req)
            .await
    }

    /// POST /solicitudes/{id}/rechazar/.
    pub async fn reject_proposal(&self, proposal_id: i64, user_id: i64) -> Result<(), ApiError> {
        let req = ActorRequest { user_id };
        self.post_unit(&format!("/solicitudes/{}/rechazar/", proposal_id), &req)
            .await
    }

    /// POST /solicitudes/{id}/cancelar/: the requester withdrawing their
    /// own pending proposal.
    pub async fn cancel_proposal(&self, proposal_id: i64, user_id: i64) -> Result<(), ApiError> {
        let req = ActorRequest { user_id };
        self.post_unit(&format!("/solicitudes/{}/cancelar/", proposal_id), &req)
            .await
    }
}
