//! Single-proposal screen: the whole negotiation for one request, with
//! the offer picker and the meeting scheduling forms.

use cambioteca_types::models::{self, Proposal, ProposalStatus};
use chrono::{DateTime, NaiveDateTime};
use tracing::warn;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::views::ViewState;
use crate::views::notice::NoticeBoard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MyRole {
    Requester,
    Recipient,
}

pub struct ProposalDetailView {
    api: ApiClient,
    proposal_id: i64,
    pub state: ViewState<Proposal>,
    pub role: Option<MyRole>,
    /// Offer picked in the accept form; prefilled with the accepted book.
    pub selected_offer: Option<i64>,
    /// Scheduling form fields, prefilled from the proposal when a place is
    /// already on the table.
    pub meeting_place: String,
    pub meeting_time: String,
    pub notices: NoticeBoard,
}

impl ProposalDetailView {
    pub fn new(api: ApiClient, proposal_id: i64) -> Self {
        Self {
            api,
            proposal_id,
            state: ViewState::Loading,
            role: None,
            selected_offer: None,
            meeting_place: String::new(),
            meeting_time: String::new(),
            notices: NoticeBoard::default(),
        }
    }

    pub fn proposal_id(&self) -> i64 {
        self.proposal_id
    }

    /// There is no single-proposal endpoint, so both mailboxes are fetched
    /// concurrently and the id is located in the merge.
    pub async fn load(&mut self) {
        let Some(user_id) = self.api.session().user_id() else {
            self.state = ViewState::Failed(
                "No se pudo cargar la propuesta (ID o usuario no encontrado).".into(),
            );
            return;
        };
        self.state = ViewState::Loading;
        let fetched = tokio::try_join!(
            self.api.received_proposals(user_id),
            self.api.sent_proposals(user_id)
        );
        let (received, sent) = match fetched {
            Ok(lists) => lists,
            Err(err) => {
                warn!(proposal_id = self.proposal_id, error = %err, "proposal detail load failed");
                self.state = ViewState::Failed("Error al cargar la propuesta.".into());
                return;
            }
        };
        let Some(proposal) = received
            .into_iter()
            .chain(sent)
            .find(|p| p.id == self.proposal_id)
        else {
            self.state =
                ViewState::Failed("No se encontraron detalles para esta propuesta.".into());
            return;
        };

        self.role = Some(if proposal.recipient.id == user_id {
            MyRole::Recipient
        } else {
            MyRole::Requester
        });
        if proposal.status == ProposalStatus::Accepted {
            if let Some(book) = &proposal.accepted_book {
                self.selected_offer = Some(book.id);
            }
            if models::meeting_place_agreed(proposal.meeting_place.as_deref()) {
                self.meeting_place = proposal.meeting_place.clone().unwrap_or_default();
            }
            if let Some(time) = &proposal.meeting_time {
                self.meeting_time = to_datetime_local(time);
            }
        }
        self.state = ViewState::Ready(proposal);
    }

    pub fn select_offer(&mut self, book_id: i64) {
        self.selected_offer = Some(book_id);
    }

    // -- Proposal actions --

    pub async fn accept(&mut self) -> Result<(), ApiError> {
        let Some(offered) = self.selected_offer else {
            return Err(ApiError::validation("Debes seleccionar una oferta."));
        };
        let user_id = self.viewer()?;
        match self
            .api
            .accept_proposal(self.proposal_id, user_id, offered)
            .await
        {
            Ok(()) => {
                self.notices
                    .success("¡Propuesta aceptada! El chat ha sido habilitado.");
                self.load().await;
                Ok(())
            }
            Err(err) => {
                self.notices
                    .error(err.message_or("Error al aceptar la propuesta.").to_owned());
                Err(err)
            }
        }
    }

    pub async fn reject(&mut self) -> Result<(), ApiError> {
        let user_id = self.viewer()?;
        match self.api.reject_proposal(self.proposal_id, user_id).await {
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

    pub async fn cancel(&mut self) -> Result<(), ApiError> {
        let user_id = self.viewer()?;
        match self.api.cancel_proposal(self.proposal_id, user_id).await {
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

    // -- Meeting actions --

    /// Send the scheduling form, then announce it in the conversation. A
    /// failed announcement does not undo the schedule; the user is told to
    /// pass the word along themselves.
    pub async fn propose_meeting(&mut self) -> Result<(), ApiError> {
        let place = self.meeting_place.trim().to_owned();
        let time = self.meeting_time.trim().to_owned();
        if place.is_empty() || time.is_empty() {
            self.notices.error("Debes completar el lugar y la fecha/hora.");
            return Err(ApiError::validation("Debes completar el lugar y la fecha/hora."));
        }
        let user_id = self.viewer()?;
        let (exchange_id, conversation_id) = self.ids()?;
        match self
            .api
            .propose_meeting(exchange_id, user_id, &place, &time)
            .await
        {
            Ok(()) => {
                let line = format!(
                    "¡Propuesta de encuentro!\nLugar: {}\nFecha: {}",
                    place,
                    format_chat_date(&time)
                );
                match self.api.send_message(conversation_id, user_id, &line).await {
                    Ok(_) => self.notices.success("Propuesta de encuentro enviada."),
                    Err(err) => {
                        warn!(conversation_id, error = %err, "meeting announcement failed");
                        self.notices.error(
                            "Propuesta guardada, pero falló el envío al chat. Por favor, avisa manualmente.",
                        );
                    }
                }
                self.load().await;
                Ok(())
            }
            Err(err) => {
                self.notices
                    .error(err.message_or("Error al proponer el encuentro.").to_owned());
                Err(err)
            }
        }
    }

    /// Answer the proposed place. Either way the conversation gets a line
    /// about it, and the screen re-fetches: declining made the backend
    /// clear the place, reopening scheduling for the recipient.
    pub async fn confirm_meeting(&mut self, accept: bool) -> Result<(), ApiError> {
        let user_id = self.viewer()?;
        let (exchange_id, conversation_id) = self.ids()?;
        let (place, time) = self
            .state
            .ready()
            .map(|p| (p.meeting_place.clone(), p.meeting_time.clone()))
            .unwrap_or_default();
        match self.api.confirm_meeting(exchange_id, user_id, accept).await {
            Ok(()) => {
                let line = if accept {
                    format!(
                        "¡Encuentro confirmado!\nNos vemos en {} el {}.",
                        place.as_deref().unwrap_or(""),
                        time.as_deref().map(format_chat_date).unwrap_or_default()
                    )
                } else {
                    "El usuario ha solicitado cambiar el lugar/fecha propuesto. Por favor, sugiere una nueva alternativa."
                        .to_owned()
                };
                if let Err(err) = self.api.send_message(conversation_id, user_id, &line).await {
                    warn!(conversation_id, error = %err, "confirmation announcement failed");
                }
                self.notices.success(if accept {
                    "Encuentro confirmado."
                } else {
                    "Propuesta rechazada."
                });
                self.load().await;
                Ok(())
            }
            Err(err) => {
                self.notices.error(err.message_or("Error al responder.").to_owned());
                Err(err)
            }
        }
    }

    // -- Capability helpers --

    pub fn can_accept_or_reject(&self) -> bool {
        self.with_viewer(|p, uid| p.can_accept_or_reject(uid))
    }

    pub fn can_cancel(&self) -> bool {
        self.with_viewer(|p, uid| p.can_cancel(uid))
    }

    pub fn can_propose_meeting(&self) -> bool {
        self.with_viewer(|p, uid| p.can_propose_meeting(uid))
    }

    pub fn can_confirm_meeting(&self) -> bool {
        self.with_viewer(|p, uid| p.can_confirm_meeting(uid))
    }

    /// The recipient proposed a place and is waiting for the requester.
    pub fn waiting_for_confirmation(&self) -> bool {
        self.with_viewer(|p, uid| {
            p.is_recipient(uid)
                && p.status == ProposalStatus::Accepted
                && p.meeting_place_agreed()
        })
    }

    fn with_viewer(&self, check: impl Fn(&Proposal, i64) -> bool) -> bool {
        match (self.state.ready(), self.api.session().user_id()) {
            (Some(proposal), Some(user_id)) => check(proposal, user_id),
            _ => false,
        }
    }

    fn viewer(&self) -> Result<i64, ApiError> {
        self.api.session().user_id().ok_or_else(|| {
            ApiError::validation("No se pudo identificar al usuario. Por favor, inicia sesión.")
        })
    }

    fn ids(&self) -> Result<(i64, i64), ApiError> {
        let unknown = || ApiError::validation("No se pudo identificar el intercambio.");
        let proposal = self.state.ready().ok_or_else(unknown)?;
        match (proposal.exchange_id, proposal.conversation_id) {
            (Some(exchange_id), Some(conversation_id)) => Ok((exchange_id, conversation_id)),
            _ => Err(unknown()),
        }
    }
}

/// Backend timestamp to the `datetime-local` shape the form edits.
fn to_datetime_local(value: &str) -> String {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.naive_local().format("%Y-%m-%dT%H:%M").to_string(),
        Err(_) => value.to_owned(),
    }
}

/// The short date used in chat announcements, e.g. "01/06/25, 3:00 PM".
fn format_chat_date(value: &str) -> String {
    let parsed = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.naive_local()));
    match parsed {
        Ok(dt) => dt.format("%d/%m/%y, %-I:%M %p").to_string(),
        Err(_) => value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_date_handles_the_form_shape() {
        assert_eq!(format_chat_date("2025-06-01T15:00"), "01/06/25, 3:00 PM");
        assert_eq!(format_chat_date("2025-06-01T09:05"), "01/06/25, 9:05 AM");
    }

    #[test]
    fn chat_date_passes_garbage_through() {
        assert_eq!(format_chat_date("mañana"), "mañana");
    }

    #[test]
    fn datetime_local_truncates_seconds_and_offset() {
        assert_eq!(
            to_datetime_local("2025-06-01T15:00:00-04:00"),
            "2025-06-01T15:00"
        );
        assert_eq!(to_datetime_local("sin fecha"), "sin fecha");
    }
}
