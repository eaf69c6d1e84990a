//! The moderation side: admin-only endpoints, the guard table against
//! real sessions, account toggling and deletion, the report queue with
//! its delist switch, and the dashboard aggregates.

mod support;

use cambioteca_client::ApiError;
use cambioteca_client::guard::{Access, Route};
use cambioteca_client::views::admin::{
    AdminBooksView, AdminDashboardView, AdminReportsView, AdminUsersView, ReportTab,
};
use cambioteca_types::api::{BookFilters, ReportBookRequest};
use cambioteca_types::models::ReportStatus;

use support::{ADMIN, ANA, BENJA};

#[tokio::test]
async fn admin_routes_demand_the_admin_claim() {
    let server = support::server().await;

    let benja = support::client(&server);
    support::login(&benja, BENJA).await;
    let err = benja
        .admin_users()
        .await
        .expect_err("a regular member must not reach the moderation panel");
    assert!(matches!(err, ApiError::Forbidden { .. }));
    assert_eq!(err.detail(), Some("No tienes permiso de administrador."));

    let guest = support::client(&server);
    let err = guest
        .admin_summary()
        .await
        .expect_err("an anonymous caller must be refused outright");
    assert!(err.is_unauthorized());
    assert_eq!(err.detail(), Some("Las credenciales no fueron proveídas."));
}

#[tokio::test]
async fn real_sessions_decide_the_route_guards() {
    let server = support::server().await;

    // The admin account lives on its own panel and is bounced off the
    // public screens.
    let admin = support::client(&server);
    support::login(&admin, ADMIN).await;
    assert!(Route::AdminReports.check(admin.session()).is_granted());
    assert_eq!(
        Route::Home.check(admin.session()),
        Access::Denied {
            redirect: Route::AdminDashboard
        }
    );

    let member = support::client(&server);
    support::login(&member, ANA).await;
    assert!(Route::MyBooks.check(member.session()).is_granted());
    assert_eq!(
        Route::AdminDashboard.check(member.session()),
        Access::Denied {
            redirect: Route::Home
        }
    );

    let guest = support::client(&server);
    assert_eq!(
        Route::ChatList.check(guest.session()),
        Access::Denied {
            redirect: Route::Login
        }
    );
}

#[tokio::test]
async fn toggling_an_account_locks_and_reopens_the_door() {
    let server = support::server().await;
    let admin = support::client(&server);
    support::login(&admin, ADMIN).await;

    let mut panel = AdminUsersView::new(admin.clone());
    panel.load().await;
    let ids: Vec<i64> = panel.rows().iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![ANA.2, BENJA.2], "the signed-in admin is not listed");

    panel.toggle(BENJA.2).await.unwrap();
    let row = panel.rows().iter().find(|u| u.id == BENJA.2).unwrap();
    assert!(!row.active, "the row takes on the state the backend answered");
    assert_eq!(
        panel.notices.current().map(|n| n.message.as_str()),
        Some("Usuario deshabilitado correctamente.")
    );

    let benja = support::client(&server);
    let err = benja
        .login(BENJA.0, BENJA.1)
        .await
        .expect_err("a disabled account must not sign in");
    assert_eq!(err.detail(), Some("Tu cuenta está deshabilitada."));

    panel.toggle(BENJA.2).await.unwrap();
    assert!(panel.rows().iter().find(|u| u.id == BENJA.2).unwrap().active);
    assert_eq!(
        panel.notices.current().map(|n| n.message.as_str()),
        Some("Usuario habilitado correctamente.")
    );
    support::login(&benja, BENJA).await;
}

#[tokio::test]
async fn deleting_an_account_takes_its_listings_along() {
    let server = support::server().await;
    let admin = support::client(&server);
    support::login(&admin, ADMIN).await;

    let mut panel = AdminUsersView::new(admin.clone());
    panel.load().await;
    panel.delete(ANA.2).await.unwrap();
    assert_eq!(
        panel.notices.current().map(|n| n.message.as_str()),
        Some("Usuario eliminado permanentemente.")
    );
    let ids: Vec<i64> = panel.rows().iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![BENJA.2]);

    // Her listings go with her; the catalog only has Benja's books left.
    let guest = support::client(&server);
    let catalog = guest.books(&BookFilters::default()).await.unwrap();
    let mut remaining: Vec<i64> = catalog.iter().map(|b| b.id).collect();
    remaining.sort_unstable();
    assert_eq!(remaining, vec![42, 43]);
    assert!(server.state().market().user(ANA.2).is_none());
}

#[tokio::test]
async fn the_book_panel_removes_foreign_listings() {
    let server = support::server().await;
    let admin = support::client(&server);
    support::login(&admin, ADMIN).await;

    let mut panel = AdminBooksView::new(admin.clone());
    panel.load().await;
    assert_eq!(panel.rows().len(), 4);

    // Dune is Benja's; moderation may remove it anyway, gallery included.
    panel.delete(42).await.unwrap();
    assert_eq!(
        panel.notices.current().map(|n| n.message.as_str()),
        Some("Libro eliminado correctamente.")
    );
    assert!(panel.rows().iter().all(|b| b.id != 42));

    let market = server.state().market();
    assert!(market.book(42).is_none());
    assert!(market.images.get(&42).is_none());
}

#[tokio::test]
async fn an_upheld_report_can_delist_the_listing() {
    let server = support::server().await;
    let ana = support::client(&server);
    support::login(&ana, ANA).await;
    ana.report_book(
        42,
        &ReportBookRequest {
            reason: "Contenido inapropiado".into(),
            description: "La portada no corresponde al libro.".into(),
        },
    )
    .await
    .unwrap();

    let admin = support::client(&server);
    support::login(&admin, ADMIN).await;
    let mut queue = AdminReportsView::new(admin.clone());
    queue.load().await;
    assert_eq!(queue.tab(), ReportTab::Pending);
    assert_eq!(queue.rows().len(), 1);
    let report = &queue.rows()[0];
    assert_eq!(report.book_title.as_deref(), Some("Dune"));
    assert_eq!(report.reporter_username.as_deref(), Some("ana"));
    let report_id = report.id;

    queue
        .resolve(report_id, true, "  Retirado del catálogo  ", true)
        .await
        .unwrap();
    assert_eq!(
        queue.notices.current().map(|n| n.message.as_str()),
        Some("Reporte gestionado correctamente.")
    );
    // The queue reloads itself, so the pending tab empties right away.
    assert!(queue.rows().is_empty());
    assert!(!admin.book(42).await.unwrap().available);

    queue.select_tab(ReportTab::Resolved).await;
    assert_eq!(queue.rows().len(), 1);
    assert_eq!(queue.rows()[0].status, ReportStatus::Upheld);
    assert_eq!(
        queue.rows()[0].admin_comment.as_deref(),
        Some("Retirado del catálogo"),
        "the comment is trimmed before it is sent"
    );

    // Nobody closes a report twice.
    let err = queue
        .resolve(report_id, false, "", false)
        .await
        .expect_err("a settled report must refuse a second resolution");
    assert!(err.is_conflict());
    assert_eq!(err.detail(), Some("El reporte ya fue gestionado."));
    assert_eq!(
        queue.notices.current().map(|n| n.message.as_str()),
        Some("Error al procesar el reporte.")
    );
}

#[tokio::test]
async fn a_dismissed_report_leaves_the_listing_alone() {
    let server = support::server().await;
    let ana = support::client(&server);
    support::login(&ana, ANA).await;
    ana.report_book(
        42,
        &ReportBookRequest {
            reason: "Spam".into(),
            description: String::new(),
        },
    )
    .await
    .unwrap();

    let admin = support::client(&server);
    support::login(&admin, ADMIN).await;
    let mut queue = AdminReportsView::new(admin.clone());
    queue.load().await;
    let report_id = queue.rows()[0].id;

    // The delist checkbox was ticked, but dismissal never touches the book.
    queue
        .resolve(report_id, false, "Sin fundamento", true)
        .await
        .unwrap();
    assert!(admin.book(42).await.unwrap().available);

    queue.select_tab(ReportTab::Resolved).await;
    assert_eq!(queue.rows().len(), 1);
    assert_eq!(queue.rows()[0].status, ReportStatus::Dismissed);
    assert_eq!(queue.rows()[0].admin_comment.as_deref(), Some("Sin fundamento"));
}

#[tokio::test]
async fn the_dashboard_aggregates_the_market() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;
    let (_, exchange_id, _) = support::accepted_exchange(&ana, &benja).await;
    support::complete_exchange(&ana, &benja, exchange_id).await;
    ana.rate_exchange(exchange_id, ANA.2, 5, "Impecable")
        .await
        .unwrap();

    let admin = support::client(&server);
    support::login(&admin, ADMIN).await;
    let mut dashboard = AdminDashboardView::new(admin.clone());
    dashboard.load().await;
    let summary = dashboard.state.ready().expect("the summary should load");

    assert_eq!(summary.books_stats.total, 4);
    assert_eq!(summary.exchanges_stats.total, 1);

    let published = |name: &str| {
        summary
            .top_publishers
            .iter()
            .find(|p| p.username == name)
            .map(|p| p.total)
    };
    assert_eq!(published("ana"), Some(2));
    assert_eq!(published("benja"), Some(2));

    // Ana rated Benja, so he alone appears on the rated board.
    assert_eq!(summary.top_rated_users.len(), 1);
    assert_eq!(summary.top_rated_users[0].username, "benja");
    assert!((summary.top_rated_users[0].average - 5.0).abs() < f64::EPSILON);

    assert_eq!(summary.top_active_users.len(), 2);
    assert!(
        summary
            .top_active_users
            .iter()
            .all(|u| u.total_completed_exchanges == 1)
    );

    // The swap is tallied under the requested book's genre: Dune.
    assert_eq!(summary.genres_exchanges.len(), 1);
    assert_eq!(summary.genres_exchanges[0].genre, "Ciencia Ficción");
    assert_eq!(summary.genres_exchanges[0].total, 1);
}
