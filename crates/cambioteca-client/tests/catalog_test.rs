//! Catalog browsing: the home shelves, the book page with its gallery,
//! favorites, and the search filters.

mod support;

use cambioteca_client::views::book_detail::{BookDetailView, FavoriteOutcome};
use cambioteca_client::views::home::HomeView;
use cambioteca_types::api::BookFilters;

use support::{ANA, BENJA};

#[tokio::test]
async fn home_shelves_load_together() {
    let server = support::server().await;
    let mut home = HomeView::new(support::client(&server));

    home.load().await;
    let content = home.state.ready().expect("home should be ready");
    // Latest leads with the newest listing; popularity is favorite-driven
    // and nothing has been favorited yet.
    assert_eq!(content.latest.first().map(|b| b.id), Some(43));
    assert_eq!(content.latest.len(), 4);
    assert_eq!(content.popular.first().map(|b| b.id), Some(7));

    let api = support::client(&server);
    support::login(&api, ANA).await;
    api.toggle_favorite(ANA.2, 42).await.expect("toggle");

    home.load().await;
    let content = home.state.ready().expect("home should reload");
    assert_eq!(content.popular.first().map(|b| b.id), Some(42));
}

#[tokio::test]
async fn search_filters_by_title_author_and_genre() {
    let server = support::server().await;
    let api = support::client(&server);

    let hits = api.books(&BookFilters::search("dune")).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 42);

    // Author names match too.
    let hits = api.books(&BookFilters::search("borges")).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "El Aleph");

    let novels = BookFilters {
        query: None,
        genre_id: Some(1),
    };
    let hits = api.books(&novels).await.unwrap();
    let ids: Vec<i64> = hits.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![7, 8]);
}

#[tokio::test]
async fn book_page_loads_book_and_gallery_together() {
    let server = support::server().await;
    let mut view = BookDetailView::new(support::client(&server), 42);

    view.load().await;
    let detail = view.state.ready().expect("book page should be ready");
    assert_eq!(detail.book.title, "Dune");
    assert_eq!(detail.book.owner_id, BENJA.2);
    assert_eq!(
        detail.cover().map(|img| img.url.as_str()),
        Some("/media/books/42/cover.jpg")
    );
}

#[tokio::test]
async fn missing_book_fails_the_whole_page() {
    let server = support::server().await;
    let mut view = BookDetailView::new(support::client(&server), 999);

    view.load().await;
    assert_eq!(
        view.state.failure(),
        Some("No se pudo cargar la información.")
    );
}

#[tokio::test]
async fn guest_favorite_toggle_redirects_without_touching_the_backend() {
    let server = support::server().await;
    let mut view = BookDetailView::new(support::client(&server), 42);
    view.load().await;

    let outcome = view.toggle_favorite().await;
    assert_eq!(outcome, FavoriteOutcome::RedirectToLogin);
    assert!(server.state().market().favorites.is_empty());
}

#[tokio::test]
async fn member_favorite_toggle_round_trip() {
    let server = support::server().await;
    let api = support::client(&server);
    support::login(&api, ANA).await;

    let mut view = BookDetailView::new(api, 42);
    view.load().await;
    view.refresh_favorites().await;
    assert!(!view.is_favorite(42));

    assert_eq!(view.toggle_favorite().await, FavoriteOutcome::Added);
    assert!(view.is_favorite(42));

    assert_eq!(view.toggle_favorite().await, FavoriteOutcome::Removed);
    assert!(!view.is_favorite(42));
    assert!(
        server
            .state()
            .market()
            .favorites
            .get(&ANA.2)
            .is_none_or(|set| set.is_empty())
    );
}

#[tokio::test]
async fn reporting_a_listing_needs_a_reason() {
    let server = support::server().await;
    let api = support::client(&server);
    support::login(&api, ANA).await;

    let mut view = BookDetailView::new(api, 42);
    view.load().await;

    let err = view
        .submit_report("  ", "spam")
        .await
        .expect_err("a blank reason stays in the form");
    assert_eq!(err.detail(), Some("Debes seleccionar un motivo."));
    assert!(server.state().market().reports.is_empty());

    view.submit_report("Contenido inapropiado", "Portada ofensiva")
        .await
        .expect("a reasoned report should land");
    let market = server.state().market();
    assert_eq!(market.reports.len(), 1);
    assert_eq!(market.reports[0].book_id, 42);
    assert_eq!(market.reports[0].reporter_username.as_deref(), Some("ana"));
}

#[tokio::test]
async fn catalog_lookups_are_public() {
    let server = support::server().await;
    let api = support::client(&server);

    let regions = api.regions().await.unwrap();
    assert_eq!(regions.len(), 1);
    let comunas = api.comunas(regions[0].id).await.unwrap();
    assert_eq!(comunas.len(), 2);
    let genres = api.genres().await.unwrap();
    assert_eq!(genres.len(), 3);
    let config = api.public_config().await.unwrap();
    assert_eq!(config.maps_api_key.as_deref(), Some("testkit-maps-key"));
}
