use std::sync::atomic::Ordering;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use cambioteca_types::api::{Claims, CreateBookRequest, ReportBookRequest, UpdateBookRequest};
use cambioteca_types::models::{Book, BookImage, BookReport, ReportStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::middleware::Refusal;
use crate::state::AppState;

const CONDITIONS: &[&str] = &["Nuevo", "Como Nuevo", "Bueno", "Aceptable", "Usado"];

const HOME_SHELF: usize = 8;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub query: Option<String>,
    pub genero: Option<i64>,
}

/// GET /libros/. Unavailable listings are included; the catalog screen and
/// the moderation screen both filter on their own terms.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Json<Vec<Book>> {
    state.hits.book_lists.fetch_add(1, Ordering::Relaxed);
    let market = state.market();
    let needle = query
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);
    Json(
        market
            .books
            .iter()
            .filter(|b| match &needle {
                Some(q) => {
                    b.title.to_lowercase().contains(q) || b.author.to_lowercase().contains(q)
                }
                None => true,
            })
            .filter(|b| query.genero.is_none_or(|g| b.genre_id == Some(g)))
            .cloned()
            .collect(),
    )
}

/// GET /libros/latest/: newest available listings.
pub async fn latest(State(state): State<AppState>) -> Json<Vec<Book>> {
    let market = state.market();
    let mut books: Vec<Book> = market.books.iter().filter(|b| b.available).cloned().collect();
    books.sort_by_key(|b| std::cmp::Reverse(b.id));
    books.truncate(HOME_SHELF);
    Json(books)
}

/// GET /libros/populares/: available listings by favorite count.
pub async fn popular(State(state): State<AppState>) -> Json<Vec<Book>> {
    let market = state.market();
    let favored = |book_id: i64| {
        market
            .favorites
            .values()
            .filter(|set| set.contains(&book_id))
            .count()
    };
    let mut books: Vec<Book> = market.books.iter().filter(|b| b.available).cloned().collect();
    books.sort_by_key(|b| (std::cmp::Reverse(favored(b.id)), b.id));
    books.truncate(HOME_SHELF);
    Json(books)
}

pub async fn detail(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> Result<Json<Book>, Refusal> {
    let market = state.market();
    market
        .book(book_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| Refusal::not_found("Libro no encontrado."))
}

pub async fn images(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> Result<Json<Vec<BookImage>>, Refusal> {
    let market = state.market();
    if market.book(book_id).is_none() {
        return Err(Refusal::not_found("Libro no encontrado."));
    }
    Ok(Json(
        market.images.get(&book_id).cloned().unwrap_or_default(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: i64,
}

/// GET /books/mine/?user_id=N, unavailable listings included.
pub async fn mine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Book>>, Refusal> {
    if query.user_id != claims.sub && !claims.admin {
        return Err(Refusal::forbidden("No puedes ver libros ajenos."));
    }
    let market = state.market();
    Ok(Json(
        market
            .books
            .iter()
            .filter(|b| b.owner_id == query.user_id)
            .cloned()
            .collect(),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<Book>), Refusal> {
    if req.owner_id != claims.sub && !claims.admin {
        return Err(Refusal::forbidden(
            "No puedes publicar a nombre de otro usuario.",
        ));
    }
    if req.title.trim().is_empty() || req.author.trim().is_empty() {
        return Err(Refusal::bad_request("El título y el autor son obligatorios."));
    }
    if !CONDITIONS.contains(&req.condition.as_str()) {
        return Err(Refusal::bad_request("Estado inválido."));
    }
    let mut market = state.market();
    if market.genres.iter().all(|g| g.id != req.genre_id) {
        return Err(Refusal::bad_request("Género inválido."));
    }
    let id = market.next_id();
    let book = Book {
        id,
        title: req.title,
        author: req.author,
        isbn: req.isbn,
        year_published: req.year_published,
        publisher: req.publisher,
        genre_id: Some(req.genre_id),
        condition: req.condition,
        description: req.description,
        available: true,
        owner_id: req.owner_id,
        first_image: None,
    };
    market.books.push(book.clone());
    info!(book_id = id, owner_id = book.owner_id, "listing created");
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<Book>, Refusal> {
    let mut market = state.market();
    let book = market
        .book_mut(book_id)
        .ok_or_else(|| Refusal::not_found("Libro no encontrado."))?;
    if book.owner_id != claims.sub && !claims.admin {
        return Err(Refusal::forbidden("No puedes editar un libro ajeno."));
    }
    if let Some(title) = req.title {
        book.title = title;
    }
    if let Some(author) = req.author {
        book.author = author;
    }
    if let Some(isbn) = req.isbn {
        book.isbn = Some(isbn);
    }
    if let Some(year) = req.year_published {
        book.year_published = Some(year);
    }
    if let Some(publisher) = req.publisher {
        book.publisher = Some(publisher);
    }
    if let Some(genre_id) = req.genre_id {
        book.genre_id = Some(genre_id);
    }
    if let Some(condition) = req.condition {
        if !CONDITIONS.contains(&condition.as_str()) {
            return Err(Refusal::bad_request("Estado inválido."));
        }
        book.condition = condition;
    }
    if let Some(description) = req.description {
        book.description = Some(description);
    }
    if let Some(available) = req.available {
        book.available = available;
    }
    Ok(Json(book.clone()))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, Refusal> {
    let mut market = state.market();
    let book = market
        .book(book_id)
        .ok_or_else(|| Refusal::not_found("Libro no encontrado."))?;
    if book.owner_id != claims.sub && !claims.admin {
        return Err(Refusal::forbidden("No puedes eliminar un libro ajeno."));
    }
    market.books.retain(|b| b.id != book_id);
    market.images.remove(&book_id);
    for favorites in market.favorites.values_mut() {
        favorites.remove(&book_id);
    }
    info!(book_id, "listing deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /libros/{id}/images/upload/: parts `image`, `is_portada` ("1"/"0")
/// and `orden`.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<BookImage>), Refusal> {
    let mut got_file = false;
    let mut is_cover = false;
    let mut position = 0i32;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| Refusal::bad_request("Formulario inválido."))?
    {
        match field.name() {
            Some("image") => {
                got_file = true;
                let _ = field.bytes().await;
            }
            Some("is_portada") => {
                is_cover = field
                    .text()
                    .await
                    .map_err(|_| Refusal::bad_request("Formulario inválido."))?
                    == "1";
            }
            Some("orden") => {
                position = field
                    .text()
                    .await
                    .map_err(|_| Refusal::bad_request("Formulario inválido."))?
                    .parse()
                    .unwrap_or(0);
            }
            _ => {}
        }
    }
    if !got_file {
        return Err(Refusal::bad_request("Falta el archivo image."));
    }

    let mut market = state.market();
    let owner_id = market
        .book(book_id)
        .map(|b| b.owner_id)
        .ok_or_else(|| Refusal::not_found("Libro no encontrado."))?;
    if owner_id != claims.sub && !claims.admin {
        return Err(Refusal::forbidden("No puedes editar un libro ajeno."));
    }
    let id = market.next_id();
    let image = BookImage {
        id,
        url: format!("/media/books/{}/{}.jpg", book_id, id),
        is_cover,
        position,
    };
    market.images.entry(book_id).or_default().push(image.clone());
    if is_cover {
        if let Some(book) = market.book_mut(book_id) {
            book.first_image = Some(image.url.clone());
        }
    }
    Ok((StatusCode::CREATED, Json(image)))
}

/// POST /libros/{id}/reportar/.
pub async fn report(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReportBookRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), Refusal> {
    if req.reason.trim().is_empty() {
        return Err(Refusal::bad_request("Debes seleccionar un motivo."));
    }
    let mut market = state.market();
    let title = market
        .book(book_id)
        .map(|b| b.title.clone())
        .ok_or_else(|| Refusal::not_found("Libro no encontrado."))?;
    let id = market.next_id();
    market.reports.push(BookReport {
        id,
        book_id,
        book_title: Some(title),
        reason: req.reason,
        description: Some(req.description).filter(|d| !d.trim().is_empty()),
        status: ReportStatus::Pending,
        admin_comment: None,
        reporter_username: Some(claims.username),
    });
    info!(report_id = id, book_id, "report filed");
    Ok((StatusCode::CREATED, Json(json!({ "detail": "Reporte recibido." }))))
}
