use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use cambioteca_types::api::ResolveReportRequest;
use cambioteca_types::models::{
    AdminSummary, AdminUser, BookReport, DailyCount, GenreExchanges, ReportStatus, SeriesStats,
    TopActiveUser, TopPublisher, TopRatedUser,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::middleware::Refusal;
use crate::state::AppState;

/// GET /admin/summary/: the dashboard payload, computed from live state.
pub async fn summary(State(state): State<AppState>) -> Json<AdminSummary> {
    let market = state.market();
    let today = Utc::now().format("%Y-%m-%d").to_string();

    let mut publishers: Vec<TopPublisher> = market
        .users
        .iter()
        .map(|u| TopPublisher {
            username: u.user.username.clone(),
            total: market
                .books
                .iter()
                .filter(|b| b.owner_id == u.user.id)
                .count() as i64,
        })
        .filter(|p| p.total > 0)
        .collect();
    publishers.sort_by_key(|p| std::cmp::Reverse(p.total));

    let mut rated: Vec<TopRatedUser> = market
        .users
        .iter()
        .filter_map(|u| {
            market
                .user_metrics(u.user.id)
                .average_rating
                .map(|average| TopRatedUser {
                    username: u.user.username.clone(),
                    average,
                })
        })
        .collect();
    rated.sort_by(|a, b| b.average.total_cmp(&a.average));

    let mut active: Vec<TopActiveUser> = market
        .users
        .iter()
        .map(|u| TopActiveUser {
            username: u.user.username.clone(),
            total_completed_exchanges: market.user_metrics(u.user.id).exchanges_completed,
        })
        .filter(|u| u.total_completed_exchanges > 0)
        .collect();
    active.sort_by_key(|u| std::cmp::Reverse(u.total_completed_exchanges));

    let mut genres: Vec<GenreExchanges> = market
        .genres
        .iter()
        .map(|g| GenreExchanges {
            genre: g.name.clone(),
            total: market
                .exchanges
                .iter()
                .filter(|x| x.completed)
                .filter(|x| {
                    market
                        .book(x.requested_book_id)
                        .is_some_and(|b| b.genre_id == Some(g.id))
                })
                .count() as i64,
        })
        .filter(|g| g.total > 0)
        .collect();
    genres.sort_by_key(|g| std::cmp::Reverse(g.total));

    let completed = market.exchanges.iter().filter(|x| x.completed).count() as i64;
    Json(AdminSummary {
        top_publishers: publishers,
        top_rated_users: rated,
        top_active_users: active,
        genres_exchanges: genres,
        books_stats: SeriesStats {
            total: market.books.len() as i64,
            by_day_last_30: vec![DailyCount {
                date: today.clone(),
                total: market.books.len() as i64,
            }],
        },
        exchanges_stats: SeriesStats {
            total: completed,
            by_day_last_30: vec![DailyCount {
                date: today,
                total: completed,
            }],
        },
    })
}

/// GET /admin/users/: every account, the caller included.
pub async fn users(State(state): State<AppState>) -> Json<Vec<AdminUser>> {
    let market = state.market();
    Json(
        market
            .users
            .iter()
            .map(|u| AdminUser {
                id: u.user.id,
                username: u.user.username.clone(),
                email: u.user.email.clone(),
                active: u.active,
                is_admin: u.user.is_admin,
            })
            .collect(),
    )
}

/// DELETE /admin/users/{id}/delete/: the account and its listings go.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, Refusal> {
    let mut market = state.market();
    if market.user(user_id).is_none() {
        return Err(Refusal::not_found("Usuario no encontrado."));
    }
    market.users.retain(|u| u.user.id != user_id);
    let owned: Vec<i64> = market
        .books
        .iter()
        .filter(|b| b.owner_id == user_id)
        .map(|b| b.id)
        .collect();
    market.books.retain(|b| b.owner_id != user_id);
    for book_id in owned {
        market.images.remove(&book_id);
        for favorites in market.favorites.values_mut() {
            favorites.remove(&book_id);
        }
    }
    market.favorites.remove(&user_id);
    info!(user_id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/users/{id}/toggle/: flip enabled/disabled, answering with
/// the state the account landed in.
pub async fn toggle_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<serde_json::Value>, Refusal> {
    let mut market = state.market();
    let record = market
        .user_mut(user_id)
        .ok_or_else(|| Refusal::not_found("Usuario no encontrado."))?;
    record.active = !record.active;
    Ok(Json(json!({ "activo": record.active })))
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub estado: Option<String>,
}

/// GET /admin/reportes-publicacion/, optionally filtered by `estado`.
pub async fn reports(
    State(state): State<AppState>,
    Query(query): Query<ReportsQuery>,
) -> Json<Vec<BookReport>> {
    let market = state.market();
    let wanted = query.estado.as_deref();
    Json(
        market
            .reports
            .iter()
            .filter(|r| match wanted {
                Some(estado) => report_status_name(r.status) == estado,
                None => true,
            })
            .cloned()
            .collect(),
    )
}

/// PATCH /admin/reportes-publicacion/{id}/resolver/. Upholding a report
/// may also delist the book; dismissal never touches it.
pub async fn resolve_report(
    State(state): State<AppState>,
    Path(report_id): Path<i64>,
    Json(req): Json<ResolveReportRequest>,
) -> Result<Json<serde_json::Value>, Refusal> {
    if req.status == ReportStatus::Pending {
        return Err(Refusal::bad_request("Estado inválido."));
    }
    let mut market = state.market();
    let report = market
        .reports
        .iter_mut()
        .find(|r| r.id == report_id)
        .ok_or_else(|| Refusal::not_found("Reporte no encontrado."))?;
    if report.status != ReportStatus::Pending {
        return Err(Refusal::conflict("El reporte ya fue gestionado."));
    }
    report.status = req.status;
    report.admin_comment = Some(req.admin_comment).filter(|c| !c.trim().is_empty());
    let book_id = report.book_id;
    if req.status == ReportStatus::Upheld && req.delist_book {
        if let Some(book) = market.book_mut(book_id) {
            book.available = false;
        }
    }
    info!(report_id, status = ?req.status, "report resolved");
    Ok(Json(json!({})))
}

fn report_status_name(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Pending => "PENDIENTE",
        ReportStatus::Upheld => "APROBADO",
        ReportStatus::Dismissed => "RECHAZADO",
    }
}
