//! Moderation screens: the stats dashboard, account and listing
//! management, and the report queue.

use cambioteca_types::api::{BookFilters, ResolveReportRequest};
use cambioteca_types::models::{AdminSummary, AdminUser, Book, BookReport, ReportStatus};
use tracing::warn;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::views::ViewState;
use crate::views::notice::NoticeBoard;

pub struct AdminDashboardView {
    api: ApiClient,
    pub state: ViewState<AdminSummary>,
}

impl AdminDashboardView {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ViewState::Loading,
        }
    }

    pub async fn load(&mut self) {
        self.state = ViewState::Loading;
        match self.api.admin_summary().await {
            Ok(summary) => self.state = ViewState::Ready(summary),
            Err(err) => {
                warn!(error = %err, "admin summary load failed");
                self.state = ViewState::Failed(
                    "No tienes permiso de administrador o ocurrió un error.".into(),
                );
            }
        }
    }
}

pub struct AdminUsersView {
    api: ApiClient,
    pub state: ViewState<Vec<AdminUser>>,
    pub notices: NoticeBoard,
}

impl AdminUsersView {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ViewState::Loading,
            notices: NoticeBoard::default(),
        }
    }

    pub fn rows(&self) -> &[AdminUser] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    /// The signed-in admin is dropped from the listing so they cannot
    /// disable or delete their own account from this screen.
    pub async fn load(&mut self) {
        self.state = ViewState::Loading;
        match self.api.admin_users().await {
            Ok(mut users) => {
                if let Some(me) = self.api.session().user_id() {
                    users.retain(|u| u.id != me);
                }
                self.state = ViewState::Ready(users);
            }
            Err(err) => {
                warn!(error = %err, "admin user listing failed");
                self.state = ViewState::Failed(
                    "Error al cargar usuarios. No tienes permiso o el servidor falló.".into(),
                );
            }
        }
    }

    /// Flip an account between enabled and disabled. The backend answers
    /// with the state it landed in, which is what the row takes on.
    pub async fn toggle(&mut self, user_id: i64) -> Result<(), ApiError> {
        match self.api.admin_toggle_user(user_id).await {
            Ok(resp) => {
                if let Some(row) = self.row_mut(user_id) {
                    row.active = resp.active;
                }
                self.notices.success(if resp.active {
                    "Usuario habilitado correctamente."
                } else {
                    "Usuario deshabilitado correctamente."
                });
                Ok(())
            }
            Err(err) => {
                self.notices.error(
                    err.message_or("No se pudo actualizar el estado del usuario.")
                        .to_owned(),
                );
                Err(err)
            }
        }
    }

    pub async fn delete(&mut self, user_id: i64) -> Result<(), ApiError> {
        match self.api.admin_delete_user(user_id).await {
            Ok(()) => {
                if let Some(rows) = self.state.ready_mut() {
                    rows.retain(|u| u.id != user_id);
                }
                self.notices.success("Usuario eliminado permanentemente.");
                Ok(())
            }
            Err(err) => {
                self.notices
                    .error(err.message_or("No se pudo eliminar al usuario.").to_owned());
                Err(err)
            }
        }
    }

    fn row_mut(&mut self, user_id: i64) -> Option<&mut AdminUser> {
        self.state.ready_mut()?.iter_mut().find(|u| u.id == user_id)
    }
}

pub struct AdminBooksView {
    api: ApiClient,
    pub state: ViewState<Vec<Book>>,
    pub notices: NoticeBoard,
}

impl AdminBooksView {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ViewState::Loading,
            notices: NoticeBoard::default(),
        }
    }

    pub fn rows(&self) -> &[Book] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub async fn load(&mut self) {
        self.state = ViewState::Loading;
        match self.api.books(&BookFilters::default()).await {
            Ok(books) => self.state = ViewState::Ready(books),
            Err(err) => {
                warn!(error = %err, "admin book listing failed");
                self.state = ViewState::Failed("Error al cargar los libros.".into());
            }
        }
    }

    pub async fn delete(&mut self, book_id: i64) -> Result<(), ApiError> {
        match self.api.delete_book(book_id).await {
            Ok(()) => {
                if let Some(rows) = self.state.ready_mut() {
                    rows.retain(|b| b.id != book_id);
                }
                self.notices.success("Libro eliminado correctamente.");
                Ok(())
            }
            Err(err) => {
                self.notices
                    .error(err.message_or("No se pudo eliminar el libro.").to_owned());
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTab {
    Pending,
    Resolved,
}

pub struct AdminReportsView {
    api: ApiClient,
    tab: ReportTab,
    pub state: ViewState<Vec<BookReport>>,
    pub notices: NoticeBoard,
}

impl AdminReportsView {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tab: ReportTab::Pending,
            state: ViewState::Loading,
            notices: NoticeBoard::default(),
        }
    }

    pub fn tab(&self) -> ReportTab {
        self.tab
    }

    pub fn rows(&self) -> &[BookReport] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub async fn select_tab(&mut self, tab: ReportTab) {
        self.tab = tab;
        self.load().await;
    }

    /// The queue filter happens server-side; the resolved tab fetches
    /// everything and keeps whatever is no longer pending, since the
    /// backend only filters on a single status.
    pub async fn load(&mut self) {
        self.state = ViewState::Loading;
        let fetched = match self.tab {
            ReportTab::Pending => self.api.admin_reports(Some(ReportStatus::Pending)).await,
            ReportTab::Resolved => self.api.admin_reports(None).await,
        };
        match fetched {
            Ok(mut reports) => {
                if self.tab == ReportTab::Resolved {
                    reports.retain(|r| r.status != ReportStatus::Pending);
                }
                self.state = ViewState::Ready(reports);
            }
            Err(err) => {
                warn!(tab = ?self.tab, error = %err, "report listing failed");
                self.state = ViewState::Failed("Error al cargar los reportes.".into());
            }
        }
    }

    /// Close a report. Upholding it may also delist the book; dismissing
    /// never does, whatever the checkbox said.
    pub async fn resolve(
        &mut self,
        report_id: i64,
        uphold: bool,
        comment: &str,
        delist: bool,
    ) -> Result<(), ApiError> {
        let request = ResolveReportRequest {
            status: if uphold {
                ReportStatus::Upheld
            } else {
                ReportStatus::Dismissed
            },
            admin_comment: comment.trim().to_owned(),
            delist_book: uphold && delist,
        };
        match self.api.admin_resolve_report(report_id, &request).await {
            Ok(()) => {
                self.notices.success("Reporte gestionado correctamente.");
                self.load().await;
                Ok(())
            }
            Err(err) => {
                self.notices.error("Error al procesar el reporte.");
                Err(err)
            }
        }
    }
}
