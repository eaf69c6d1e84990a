use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get, patch, post},
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::middleware::{require_admin, require_auth};
use crate::state::{AppState, AppStateInner, Hits, MarketState};
use crate::{admin, auth, books, catalog, chat, exchanges, favorites, proposals, users};

/// The stub backend, bound to an ephemeral loopback port. Serves until
/// dropped; the state handle stays available for assertions.
pub struct TestServer {
    addr: SocketAddr,
    state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> anyhow::Result<Self> {
        // First spawn in the process wins; later ones keep its subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "cambioteca=info,tower_http=info".into()),
            )
            .with_test_writer()
            .try_init();

        let state: AppState = Arc::new(AppStateInner {
            market: Mutex::new(MarketState::with_fixtures()),
            hits: Hits::default(),
        });
        let app = router(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!(error = %err, "stub backend stopped");
            }
        });
        info!(%addr, "stub backend listening");
        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Direct access to the world, for seeding extra fixtures or asserting
    /// on what a flow left behind.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn hits(&self) -> &Hits {
        &self.state.hits
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/login/", post(auth::login))
        .route("/auth/register/", post(auth::register))
        .route("/auth/forgot/", post(auth::forgot_password))
        .route("/auth/reset/", post(auth::reset_password))
        .route("/catalog/regiones/", get(catalog::regions))
        .route("/catalog/comunas/", get(catalog::comunas))
        .route("/catalog/generos/", get(catalog::genres))
        .route("/public/config/", get(catalog::public_config))
        .route("/libros/", get(books::list))
        .route("/libros/latest/", get(books::latest))
        .route("/libros/populares/", get(books::popular))
        .route("/libros/{id}/", get(books::detail))
        .route("/libros/{id}/images/", get(books::images));

    let protected = Router::new()
        .route("/auth/change-password/", post(auth::change_password))
        .route("/books/mine/", get(books::mine))
        .route("/libros/create/", post(books::create))
        .route("/libros/{id}/update/", patch(books::update))
        .route("/libros/{id}/delete/", delete(books::delete))
        .route("/libros/{id}/images/upload/", post(books::upload_image))
        .route("/libros/{id}/reportar/", post(books::report))
        .route("/favoritos/", get(favorites::list))
        .route("/favoritos/{id}/toggle/", post(favorites::toggle))
        .route("/users/{id}/summary/", get(users::summary))
        .route("/users/{id}/profile/", get(users::profile))
        .route("/users/{id}/", patch(users::update_profile))
        .route("/users/{id}/avatar/", patch(users::update_avatar))
        .route("/users/{id}/books/", get(users::books))
        .route("/users/{id}/ratings/", get(users::ratings))
        .route("/users/{id}/intercambios/", get(users::exchanges))
        .route("/chat/{id}/conversaciones/", get(chat::conversations))
        .route("/chat/conversacion/{id}/mensajes/", get(chat::messages))
        .route("/chat/conversacion/{id}/enviar/", post(chat::send))
        .route("/chat/conversacion/{id}/visto/", post(chat::mark_seen))
        .route("/solicitudes/crear/", post(proposals::create))
        .route("/solicitudes/enviadas/", get(proposals::sent))
        .route("/solicitudes/recibidas/", get(proposals::received))
        .route("/solicitudes/{id}/aceptar/", post(proposals::accept))
        .route("/solicitudes/{id}/rechazar/", post(proposals::reject))
        .route("/solicitudes/{id}/cancelar/", post(proposals::cancel))
        .route(
            "/intercambios/{id}/proponer/",
            patch(exchanges::propose_meeting),
        )
        .route(
            "/intercambios/{id}/confirmar/",
            patch(exchanges::confirm_meeting),
        )
        .route("/intercambios/{id}/propuesta/", get(exchanges::meeting))
        .route("/intercambios/{id}/codigo/", post(exchanges::generate_code))
        .route("/intercambios/{id}/completar/", post(exchanges::complete))
        .route("/intercambios/{id}/calificar/", post(exchanges::rate))
        .route(
            "/intercambios/{id}/mi-calificacion/",
            get(exchanges::my_rating),
        )
        .layer(from_fn(require_auth));

    let moderation = Router::new()
        .route("/admin/summary/", get(admin::summary))
        .route("/admin/users/", get(admin::users))
        .route("/admin/users/{id}/delete/", delete(admin::delete_user))
        .route("/admin/users/{id}/toggle/", post(admin::toggle_user))
        .route("/admin/reportes-publicacion/", get(admin::reports))
        .route(
            "/admin/reportes-publicacion/{id}/resolver/",
            patch(admin::resolve_report),
        )
        .layer(from_fn(require_admin))
        .layer(from_fn(require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(moderation)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
