//! Proposal mailboxes: one controller for both the sent and received
//! lists, since they load the same way and differ only in which actions
//! each row offers.

use cambioteca_types::models::{
    CompletionCode, MeetingProposal, MeetingStatus, Proposal, ProposalStatus,
};
use futures_util::future::join_all;
use tracing::warn;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::views::ViewState;
use crate::views::notice::NoticeBoard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mailbox {
    Sent,
    Received,
}

/// A listing row plus what the enrichment passes found out about it.
#[derive(Debug, Clone)]
pub struct ProposalRow {
    pub proposal: Proposal,
    /// Live meeting negotiation state; only probed for accepted rows, and
    /// left `None` when the probe failed.
    pub meeting: Option<MeetingProposal>,
    /// Whether the viewer already rated the finished exchange.
    pub rated: bool,
}

impl ProposalRow {
    pub fn meeting_status(&self) -> Option<MeetingStatus> {
        self.meeting.as_ref().map(|m| m.status)
    }

    /// The other side accepted the proposed place, so scheduling is done.
    pub fn place_confirmed(&self) -> bool {
        self.meeting_status() == Some(MeetingStatus::Accepted)
    }
}

pub struct ProposalsView {
    api: ApiClient,
    mailbox: Mailbox,
    pub state: ViewState<Vec<ProposalRow>>,
    pub notices: NoticeBoard,
}

impl ProposalsView {
    pub fn sent(api: ApiClient) -> Self {
        Self::new(api, Mailbox::Sent)
    }

    pub fn received(api: ApiClient) -> Self {
        Self::new(api, Mailbox::Received)
    }

    fn new(api: ApiClient, mailbox: Mailbox) -> Self {
        Self {
            api,
            mailbox,
            state: ViewState::Loading,
            notices: NoticeBoard::default(),
        }
    }

    pub fn mailbox(&self) -> Mailbox {
        self.mailbox
    }

    pub fn rows(&self) -> &[ProposalRow] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    /// Fetch the listing, then enrich it in two concurrent passes: live
    /// meeting status for accepted rows, rating presence for completed
    /// ones. Enrichment failures degrade single rows, never the screen.
    pub async fn load(&mut self) {
        let Some(user_id) = self.api.session().user_id() else {
            self.state = ViewState::Failed(
                "No se pudo identificar al usuario. Por favor, inicia sesión.".into(),
            );
            return;
        };
        self.state = ViewState::Loading;
        let listing = match self.mailbox {
            Mailbox::Sent => self.api.sent_proposals(user_id).await,
            Mailbox::Received => self.api.received_proposals(user_id).await,
        };
        let proposals = match listing {
            Ok(proposals) => proposals,
            Err(err) => {
                warn!(mailbox = ?self.mailbox, error = %err, "proposal listing failed");
                let message = match self.mailbox {
                    Mailbox::Sent => "Error al cargar propuestas enviadas.",
                    Mailbox::Received => "Error al cargar propuestas recibidas.",
                };
                self.state = ViewState::Failed(message.into());
                return;
            }
        };
        let mut rows: Vec<ProposalRow> = proposals
            .into_iter()
            .map(|proposal| ProposalRow {
                proposal,
                meeting: None,
                rated: false,
            })
            .collect();
        self.refresh_meetings(&mut rows).await;
        self.refresh_ratings(user_id, &mut rows).await;
        self.state = ViewState::Ready(rows);
    }

    async fn refresh_meetings(&self, rows: &mut [ProposalRow]) {
        let probes: Vec<(usize, i64)> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.proposal.status == ProposalStatus::Accepted)
            .filter_map(|(idx, row)| row.proposal.exchange_id.map(|id| (idx, id)))
            .collect();
        if probes.is_empty() {
            return;
        }
        let fetches = probes.iter().map(|(_, id)| self.api.meeting_proposal(*id));
        for ((idx, exchange_id), result) in probes.iter().copied().zip(join_all(fetches).await) {
            match result {
                Ok(meeting) => {
                    // The live answer supersedes whatever place and time the
                    // listing itself carried.
                    let row = &mut rows[idx];
                    row.proposal.meeting_place = meeting.place.clone();
                    row.proposal.meeting_time = meeting.time.clone();
                    row.meeting = Some(meeting);
                }
                Err(err) => warn!(exchange_id, error = %err, "meeting probe failed"),
            }
        }
    }

    async fn refresh_ratings(&self, user_id: i64, rows: &mut [ProposalRow]) {
        let probes: Vec<(usize, i64)> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.proposal.status == ProposalStatus::Completed)
            .filter_map(|(idx, row)| row.proposal.exchange_id.map(|id| (idx, id)))
            .collect();
        if probes.is_empty() {
            return;
        }
        let fetches = probes.iter().map(|(_, id)| self.api.my_rating(*id, user_id));
        for ((idx, exchange_id), result) in probes.iter().copied().zip(join_all(fetches).await) {
            match result {
                Ok(rating) => rows[idx].rated = rating.exists(),
                Err(err) => warn!(exchange_id, error = %err, "rating probe failed"),
            }
        }
    }

    // -- Requester actions --

    /// Withdraw a pending proposal of mine.
    pub async fn cancel(&mut self, proposal_id: i64) -> Result<(), ApiError> {
        let user_id = self.viewer()?;
        match self.api.cancel_proposal(proposal_id, user_id).await {
            Ok(()) => {
                self.notices.success("Propuesta cancelada.");
                self.load().await;
                Ok(())
            }
            Err(err) => {
                self.notices.error(err.message_or("Error al cancelar.").to_owned());
                Err(err)
            }
        }
    }

    /// Answer the proposed meeting place. Accepting only flips the local
    /// row; declining reloads, because the backend cleared the place and
    /// the other side must now propose again.
    pub async fn confirm_meeting(&mut self, proposal_id: i64, accept: bool) -> Result<(), ApiError> {
        let user_id = self.viewer()?;
        let exchange_id = self.exchange_id_of(proposal_id)?;
        match self.api.confirm_meeting(exchange_id, user_id, accept).await {
            Ok(()) if accept => {
                if let Some(row) = self.row_mut(proposal_id) {
                    match &mut row.meeting {
                        Some(meeting) => meeting.status = MeetingStatus::Accepted,
                        None => {
                            row.meeting = Some(MeetingProposal {
                                status: MeetingStatus::Accepted,
                                place: row.proposal.meeting_place.clone(),
                                time: row.proposal.meeting_time.clone(),
                            })
                        }
                    }
                }
                self.notices.success("¡Lugar confirmado!");
                Ok(())
            }
            Ok(()) => {
                self.notices
                    .success("Lugar rechazado. El receptor debe proponer uno nuevo.");
                self.load().await;
                Ok(())
            }
            Err(err) => {
                self.notices
                    .error(err.message_or("Error al confirmar el lugar.").to_owned());
                Err(err)
            }
        }
    }

    /// Redeem the code the other party read out. The client normalizes the
    /// code; a failure belongs in the completion form, with
    /// "Error al completar. Verifica el código." when the backend sent no
    /// wording of its own.
    pub async fn complete_with_code(
        &mut self,
        proposal_id: i64,
        code: &str,
    ) -> Result<(), ApiError> {
        if code.trim().is_empty() {
            return Err(ApiError::validation("Ingresa el código."));
        }
        let user_id = self.viewer()?;
        let exchange_id = self.exchange_id_of(proposal_id)?;
        self.api
            .complete_exchange(exchange_id, user_id, code)
            .await?;
        self.notices.success("¡Intercambio completado con éxito!");
        self.load().await;
        Ok(())
    }

    // -- Recipient actions --

    /// Accept, sealing the deal on one offered book.
    pub async fn accept(&mut self, proposal_id: i64, accepted_book_id: i64) -> Result<(), ApiError> {
        let user_id = self.viewer()?;
        match self
            .api
            .accept_proposal(proposal_id, user_id, accepted_book_id)
            .await
        {
            Ok(()) => {
                self.notices
                    .success("¡Propuesta aceptada! El chat ha sido habilitado.");
                self.load().await;
                Ok(())
            }
            Err(err) => {
                self.notices.error(err.message_or("Error al aceptar.").to_owned());
                Err(err)
            }
        }
    }

    /// The list shortcut: accept without opening the detail, possible only
    /// when there is exactly one offer to choose from.
    pub async fn accept_single_offer(&mut self, proposal_id: i64) -> Result<(), ApiError> {
        let offered = {
            let row = self.row(proposal_id).ok_or_else(Self::unknown_proposal)?;
            match row.proposal.offers.as_slice() {
                [only] => only.book.id,
                _ => {
                    return Err(ApiError::validation("La propuesta tiene más de una oferta."));
                }
            }
        };
        self.accept(proposal_id, offered).await
    }

    pub fn can_accept_single_offer(&self, proposal_id: i64) -> bool {
        let Some(user_id) = self.api.session().user_id() else {
            return false;
        };
        self.row(proposal_id).is_some_and(|row| {
            row.proposal.can_accept_or_reject(user_id) && row.proposal.offers.len() == 1
        })
    }

    pub async fn reject(&mut self, proposal_id: i64) -> Result<(), ApiError> {
        let user_id = self.viewer()?;
        match self.api.reject_proposal(proposal_id, user_id).await {
            Ok(()) => {
                self.notices.success("Propuesta rechazada.");
                self.load().await;
                Ok(())
            }
            Err(err) => {
                self.notices.error(err.message_or("Error al rechazar.").to_owned());
                Err(err)
            }
        }
    }

    /// Suggest where and when to meet. Validation failures stay in the
    /// scheduling form; the backend's refusals do too.
    pub async fn propose_meeting(
        &mut self,
        proposal_id: i64,
        place: &str,
        time: &str,
    ) -> Result<(), ApiError> {
        if place.trim().is_empty() || time.trim().is_empty() {
            return Err(ApiError::validation("Debes completar el lugar y la fecha."));
        }
        let user_id = self.viewer()?;
        let exchange_id = self.exchange_id_of(proposal_id)?;
        self.api
            .propose_meeting(exchange_id, user_id, place, time)
            .await?;
        self.notices.success("¡Lugar y fecha propuestos!");
        self.load().await;
        Ok(())
    }

    /// Fetch the handover code to read to the requester at the meeting.
    pub async fn generate_code(&mut self, proposal_id: i64) -> Result<CompletionCode, ApiError> {
        let user_id = self.viewer()?;
        let exchange_id = self.exchange_id_of(proposal_id)?;
        match self.api.generate_code(exchange_id, user_id).await {
            Ok(code) => Ok(code),
            Err(err) => {
                self.notices
                    .error(err.message_or("Error al generar el código.").to_owned());
                Err(err)
            }
        }
    }

    // -- Shared actions --

    /// Rate the finished exchange, once. The error return is the rating
    /// modal's message slot.
    pub async fn rate(
        &mut self,
        proposal_id: i64,
        score: u8,
        comment: &str,
    ) -> Result<(), ApiError> {
        if !(1..=5).contains(&score) {
            return Err(ApiError::validation("Selecciona una puntuación."));
        }
        let user_id = self.viewer()?;
        let exchange_id = self.exchange_id_of(proposal_id)?;
        self.api
            .rate_exchange(exchange_id, user_id, score, comment.trim())
            .await?;
        self.notices.success("¡Calificación enviada con éxito!");
        if let Some(row) = self.row_mut(proposal_id) {
            row.rated = true;
        }
        Ok(())
    }

    pub fn can_rate(&self, proposal_id: i64) -> bool {
        self.row(proposal_id).is_some_and(|row| {
            row.proposal.status == ProposalStatus::Completed
                && row.proposal.exchange_id.is_some()
                && !row.rated
        })
    }

    pub fn has_rated(&self, proposal_id: i64) -> bool {
        self.row(proposal_id).is_some_and(|row| {
            row.proposal.status == ProposalStatus::Completed && row.rated
        })
    }

    // -- Internals --

    fn row(&self, proposal_id: i64) -> Option<&ProposalRow> {
        self.rows().iter().find(|row| row.proposal.id == proposal_id)
    }

    fn row_mut(&mut self, proposal_id: i64) -> Option<&mut ProposalRow> {
        self.state
            .ready_mut()?
            .iter_mut()
            .find(|row| row.proposal.id == proposal_id)
    }

    fn viewer(&self) -> Result<i64, ApiError> {
        self.api.session().user_id().ok_or_else(|| {
            ApiError::validation("No se pudo identificar al usuario. Por favor, inicia sesión.")
        })
    }

    fn exchange_id_of(&self, proposal_id: i64) -> Result<i64, ApiError> {
        self.row(proposal_id)
            .and_then(|row| row.proposal.exchange_id)
            .ok_or_else(Self::unknown_proposal)
    }

    fn unknown_proposal() -> ApiError {
        ApiError::validation("No se pudo identificar el intercambio.")
    }
}
