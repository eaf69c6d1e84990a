//! Book page: gallery, favorite toggle, report form and the
//! propose-exchange modal.

use std::collections::HashSet;

use cambioteca_types::api::{CreateProposalRequest, ReportBookRequest};
use cambioteca_types::models::{Book, BookImage};
use tracing::warn;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::views::ViewState;
use crate::views::notice::NoticeBoard;

#[derive(Debug, Clone)]
pub struct BookDetail {
    pub book: Book,
    pub images: Vec<BookImage>,
}

impl BookDetail {
    /// The image the page leads with: the flagged cover, else the first
    /// upload, else nothing and the frontend shows its placeholder.
    pub fn cover(&self) -> Option<&BookImage> {
        self.images
            .iter()
            .find(|img| img.is_cover)
            .or_else(|| self.images.first())
    }
}

/// What came of a favorite toggle. Guests never reach the network; they are
/// redirected to log in instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Added,
    Removed,
    RedirectToLogin,
    Failed,
}

pub struct BookDetailView {
    api: ApiClient,
    book_id: i64,
    pub state: ViewState<BookDetail>,
    favorite_ids: HashSet<i64>,
    pub notices: NoticeBoard,
}

impl BookDetailView {
    pub fn new(api: ApiClient, book_id: i64) -> Self {
        Self {
            api,
            book_id,
            state: ViewState::Loading,
            favorite_ids: HashSet::new(),
            notices: NoticeBoard::default(),
        }
    }

    pub fn book_id(&self) -> i64 {
        self.book_id
    }

    /// Book and gallery land together or the screen fails as one.
    pub async fn load(&mut self) {
        self.state = ViewState::Loading;
        match tokio::try_join!(
            self.api.book(self.book_id),
            self.api.book_images(self.book_id)
        ) {
            Ok((book, images)) => {
                self.state = ViewState::Ready(BookDetail { book, images });
            }
            Err(err) => {
                warn!(book_id = self.book_id, error = %err, "book detail load failed");
                self.state = ViewState::Failed("No se pudo cargar la información.".into());
            }
        }
    }

    /// Pull the viewer's favorite ids; guests just get an empty set. A
    /// failed fetch leaves hearts unfilled rather than failing the screen.
    pub async fn refresh_favorites(&mut self) {
        let Some(user_id) = self.api.session().user_id() else {
            self.favorite_ids.clear();
            return;
        };
        match self.api.favorite_ids(user_id).await {
            Ok(ids) => self.favorite_ids = ids.into_iter().collect(),
            Err(err) => warn!(error = %err, "favorite ids fetch failed"),
        }
    }

    pub fn is_favorite(&self, book_id: i64) -> bool {
        self.favorite_ids.contains(&book_id)
    }

    pub async fn toggle_favorite(&mut self) -> FavoriteOutcome {
        let Some(user_id) = self.api.session().user_id() else {
            return FavoriteOutcome::RedirectToLogin;
        };
        match self.api.toggle_favorite(user_id, self.book_id).await {
            Ok(resp) if resp.favorited => {
                self.favorite_ids.insert(self.book_id);
                self.notices.success("Añadido a favoritos");
                FavoriteOutcome::Added
            }
            Ok(_) => {
                self.favorite_ids.remove(&self.book_id);
                self.notices.success("Eliminado de favoritos");
                FavoriteOutcome::Removed
            }
            Err(err) => {
                warn!(book_id = self.book_id, error = %err, "favorite toggle failed");
                self.notices.error("No se pudo actualizar.");
                FavoriteOutcome::Failed
            }
        }
    }

    /// Report this listing. The reason is mandatory; the error return is the
    /// form's persistent message, success goes to the notice strip.
    pub async fn submit_report(
        &mut self,
        reason: &str,
        description: &str,
    ) -> Result<(), ApiError> {
        if reason.trim().is_empty() {
            return Err(ApiError::validation("Debes seleccionar un motivo."));
        }
        let req = ReportBookRequest {
            reason: reason.to_owned(),
            description: description.to_owned(),
        };
        self.api.report_book(self.book_id, &req).await?;
        self.notices.success(
            "Reporte enviado correctamente. El equipo de administración revisará la publicación.",
        );
        Ok(())
    }

    /// Open the propose-exchange form for this book.
    pub fn propose_exchange(&self) -> ProposeExchangeForm {
        let title = self
            .state
            .ready()
            .map(|d| d.book.title.clone())
            .unwrap_or_else(|| "este libro".to_owned());
        ProposeExchangeForm::new(self.api.clone(), self.book_id, title)
    }
}

/// The propose-exchange modal: pick exactly one of your own available books
/// to offer for the one on screen.
pub struct ProposeExchangeForm {
    api: ApiClient,
    desired_book_id: i64,
    desired_title: String,
    pub offerable: ViewState<Vec<Book>>,
    pub selected: Option<i64>,
}

impl ProposeExchangeForm {
    fn new(api: ApiClient, desired_book_id: i64, desired_title: String) -> Self {
        Self {
            api,
            desired_book_id,
            desired_title,
            offerable: ViewState::Loading,
            selected: None,
        }
    }

    /// Load the caller's books, keeping only the available ones and never
    /// the desired book itself.
    pub async fn load(&mut self) {
        let Some(user_id) = self.api.session().user_id() else {
            self.offerable =
                ViewState::Failed("Error: No se pudo identificar al usuario.".into());
            return;
        };
        self.offerable = ViewState::Loading;
        match self.api.my_books(user_id).await {
            Ok(books) => {
                let offerable: Vec<Book> = books
                    .into_iter()
                    .filter(|b| b.available && b.id != self.desired_book_id)
                    .collect();
                if offerable.is_empty() {
                    self.offerable =
                        ViewState::Failed("No tienes libros disponibles para ofrecer.".into());
                } else {
                    self.offerable = ViewState::Ready(offerable);
                }
            }
            Err(err) => {
                warn!(error = %err, "offerable books fetch failed");
                self.offerable =
                    ViewState::Failed("Error al cargar tus libros disponibles.".into());
            }
        }
    }

    pub fn select(&mut self, book_id: i64) {
        self.selected = Some(book_id);
    }

    /// Submit the proposal. Returns the confirmation line for the notice
    /// strip; failures come back as the modal's persistent message.
    pub async fn submit(&mut self) -> Result<String, ApiError> {
        let Some(offered) = self.selected else {
            return Err(ApiError::validation("Debes seleccionar 1 libro para ofrecer."));
        };
        let Some(user_id) = self.api.session().user_id() else {
            return Err(ApiError::validation("Error: No se pudo identificar al usuario."));
        };
        let req = CreateProposalRequest {
            requester_id: user_id,
            requested_book_id: self.desired_book_id,
            offered_book_ids: vec![offered],
        };
        self.api.create_proposal(&req).await?;
        Ok(format!(
            "¡Propuesta enviada con éxito para \"{}\"!",
            self.desired_title
        ))
    }
}
