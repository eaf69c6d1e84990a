//! Exchange history screen: every exchange the user took part in, with
//! code generation and redemption for the ones still open and a one-shot
//! rating form for the finished ones.

use cambioteca_types::models::{CompletionCode, ExchangeRecord, ExchangeStatus};
use futures_util::future::join_all;
use tracing::warn;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::views::ViewState;
use crate::views::notice::NoticeBoard;

#[derive(Debug, Clone)]
pub struct ExchangeRow {
    pub record: ExchangeRecord,
    /// Whether the viewer already rated this exchange.
    pub rated: bool,
}

pub struct ExchangeHistoryView {
    api: ApiClient,
    pub state: ViewState<Vec<ExchangeRow>>,
    pub notices: NoticeBoard,
}

impl ExchangeHistoryView {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ViewState::Loading,
            notices: NoticeBoard::default(),
        }
    }

    pub fn rows(&self) -> &[ExchangeRow] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub async fn load(&mut self) {
        let Some(user_id) = self.api.session().user_id() else {
            self.state = ViewState::Failed(
                "No se pudo identificar al usuario. Por favor, inicia sesión.".into(),
            );
            return;
        };
        self.state = ViewState::Loading;
        let records = match self.api.user_exchanges(user_id).await {
            Ok(records) => records,
            Err(err) => {
                warn!(user_id, error = %err, "exchange history load failed");
                self.state = ViewState::Failed("Error al cargar el historial.".into());
                return;
            }
        };
        let mut rows: Vec<ExchangeRow> = records
            .into_iter()
            .map(|record| ExchangeRow { record, rated: false })
            .collect();

        // The history endpoint does not say who already rated; probe each
        // finished exchange concurrently.
        let probes: Vec<_> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.record.status == ExchangeStatus::Completed)
            .map(|(idx, row)| {
                let api = self.api.clone();
                let exchange_id = row.record.id;
                async move { (idx, api.my_rating(exchange_id, user_id).await) }
            })
            .collect();
        for (idx, outcome) in join_all(probes).await {
            match outcome {
                Ok(rating) => rows[idx].rated = rating.exists(),
                Err(err) => {
                    warn!(exchange_id = rows[idx].record.id, error = %err, "rating probe failed");
                }
            }
        }
        self.state = ViewState::Ready(rows);
    }

    /// Ask for a fresh completion code. Failures stay in the row's error
    /// slot; callers print `err.message_or("Error al generar código.")`.
    pub async fn generate_code(&mut self, exchange_id: i64) -> Result<CompletionCode, ApiError> {
        let user_id = self.viewer()?;
        self.api.generate_code(exchange_id, user_id).await
    }

    /// Redeem the code read out at the meeting. The client normalizes the
    /// casing; the fallback wording for the row's error slot is
    /// "Error al completar.".
    pub async fn complete(&mut self, exchange_id: i64, code: &str) -> Result<(), ApiError> {
        if code.trim().is_empty() {
            return Err(ApiError::validation("Ingresa el código."));
        }
        let user_id = self.viewer()?;
        self.api
            .complete_exchange(exchange_id, user_id, code)
            .await?;
        self.notices.success("¡Intercambio completado con éxito!");
        self.load().await;
        Ok(())
    }

    /// One rating per exchange per user. The row flips to rated locally;
    /// the fallback wording for the form's error slot is "Error al enviar.".
    pub async fn rate(
        &mut self,
        exchange_id: i64,
        score: u8,
        comment: &str,
    ) -> Result<(), ApiError> {
        if !(1..=5).contains(&score) {
            return Err(ApiError::validation("Selecciona una puntuación."));
        }
        let user_id = self.viewer()?;
        self.api
            .rate_exchange(exchange_id, user_id, score, comment.trim())
            .await?;
        self.notices.success("¡Calificación enviada con éxito!");
        if let Some(row) = self.row_mut(exchange_id) {
            row.rated = true;
        }
        Ok(())
    }

    pub fn can_generate_code(&self, exchange_id: i64) -> bool {
        self.with_viewer(exchange_id, |row, uid| row.record.can_generate_code(uid))
    }

    pub fn can_complete(&self, exchange_id: i64) -> bool {
        self.with_viewer(exchange_id, |row, uid| row.record.can_complete(uid))
    }

    pub fn can_rate(&self, exchange_id: i64) -> bool {
        self.with_viewer(exchange_id, |row, _| {
            row.record.status == ExchangeStatus::Completed && !row.rated
        })
    }

    pub fn has_rated(&self, exchange_id: i64) -> bool {
        self.row(exchange_id).is_some_and(|row| row.rated)
    }

    fn with_viewer(&self, exchange_id: i64, check: impl Fn(&ExchangeRow, i64) -> bool) -> bool {
        match (self.row(exchange_id), self.api.session().user_id()) {
            (Some(row), Some(user_id)) => check(row, user_id),
            _ => false,
        }
    }

    fn row(&self, exchange_id: i64) -> Option<&ExchangeRow> {
        self.rows().iter().find(|row| row.record.id == exchange_id)
    }

    fn row_mut(&mut self, exchange_id: i64) -> Option<&mut ExchangeRow> {
        self.state
            .ready_mut()?
            .iter_mut()
            .find(|row| row.record.id == exchange_id)
    }

    fn viewer(&self) -> Result<i64, ApiError> {
        self.api.session().user_id().ok_or_else(|| {
            ApiError::validation("No se pudo identificar al usuario. Por favor, inicia sesión.")
        })
    }
}
