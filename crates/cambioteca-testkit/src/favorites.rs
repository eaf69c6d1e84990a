use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use cambioteca_types::api::{Claims, ToggleFavoriteRequest, ToggleFavoriteResponse};
use cambioteca_types::models::Book;
use serde::Deserialize;

use crate::middleware::Refusal;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FavoritesQuery {
    pub user_id: i64,
}

/// GET /favoritos/?user_id=N: the favorited books themselves. The client
/// derives the id set from this list.
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FavoritesQuery>,
) -> Result<Json<Vec<Book>>, Refusal> {
    if query.user_id != claims.sub {
        return Err(Refusal::forbidden("No puedes ver favoritos ajenos."));
    }
    let market = state.market();
    let ids = market.favorites.get(&query.user_id);
    Ok(Json(
        market
            .books
            .iter()
            .filter(|b| ids.is_some_and(|set| set.contains(&b.id)))
            .cloned()
            .collect(),
    ))
}

/// POST /favoritos/{book_id}/toggle/. Answers with the side the toggle
/// landed on.
pub async fn toggle(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleFavoriteRequest>,
) -> Result<Json<ToggleFavoriteResponse>, Refusal> {
    if req.user_id != claims.sub {
        return Err(Refusal::forbidden("El usuario no coincide con la sesión."));
    }
    let mut market = state.market();
    if market.book(book_id).is_none() {
        return Err(Refusal::not_found("Libro no encontrado."));
    }
    let set = market.favorites.entry(req.user_id).or_default();
    let favorited = if set.remove(&book_id) {
        false
    } else {
        set.insert(book_id);
        true
    };
    Ok(Json(ToggleFavoriteResponse { favorited }))
}
