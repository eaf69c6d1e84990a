use cambioteca_types::api::{ResolveReportRequest, ToggleUserResponse};
use cambioteca_types::models::{AdminSummary, AdminUser, BookReport, ReportStatus};

use super::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// GET /admin/summary/: the whole dashboard in one payload.
    pub async fn admin_summary(&self) -> Result<AdminSummary, ApiError> {
        self.get_json("/admin/summary/").await
    }

    /// GET /admin/users/.
    pub async fn admin_users(&self) -> Result<Vec<AdminUser>, ApiError> {
        self.get_json("/admin/users/").await
    }

    /// DELETE /admin/users/{id}/delete/.
    pub async fn admin_delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        self.delete_unit(&format!("/admin/users/{}/delete/", user_id))
            .await
    }

    /// POST /admin/users/{id}/toggle/: flips the account between active
    /// and suspended, answering with the state it landed in.
    pub async fn admin_toggle_user(&self, user_id: i64) -> Result<ToggleUserResponse, ApiError> {
        self.post_json(
            &format!("/admin/users/{}/toggle/", user_id),
            &serde_json::json!({}),
        )
        .await
    }

    /// GET /admin/reportes-publicacion/, optionally narrowed by state.
    /// `None` returns everything; resolved tabs filter client side.
    pub async fn admin_reports(
        &self,
        status: Option<ReportStatus>,
    ) -> Result<Vec<BookReport>, ApiError> {
        match status {
            Some(status) => {
                let value = match status {
                    ReportStatus::Pending => "PENDIENTE",
                    ReportStatus::Upheld => "APROBADO",
                    ReportStatus::Dismissed => "RECHAZADO",
                };
                self.get_json_query("/admin/reportes-publicacion/", &[("estado", value.into())])
                    .await
            }
            None => self.get_json("/admin/reportes-publicacion/").await,
        }
    }

    /// PATCH /admin/reportes-publicacion/{id}/resolver/. Upholding with
    /// `delist_book` also takes the listing down.
    pub async fn admin_resolve_report(
        &self,
        report_id: i64,
        req: &ResolveReportRequest,
    ) -> Result<(), ApiError> {
        self.patch_unit(
            &format!("/admin/reportes-publicacion/{}/resolver/", report_id),
            req,
        )
        .await
    }
}
