//! Landing screen: the two showcase shelves.

use cambioteca_types::models::Book;
use tracing::debug;

use crate::api::ApiClient;
use crate::views::ViewState;

#[derive(Debug, Clone)]
pub struct HomeContent {
    pub latest: Vec<Book>,
    pub popular: Vec<Book>,
}

pub struct HomeView {
    api: ApiClient,
    pub state: ViewState<HomeContent>,
}

impl HomeView {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ViewState::Loading,
        }
    }

    /// Both shelves come down in parallel; either failing fails the screen.
    pub async fn load(&mut self) {
        self.state = ViewState::Loading;
        match tokio::try_join!(self.api.latest_books(), self.api.popular_books()) {
            Ok((latest, popular)) => {
                debug!(latest = latest.len(), popular = popular.len(), "home shelves loaded");
                self.state = ViewState::Ready(HomeContent { latest, popular });
            }
            Err(err) => {
                debug!(error = %err, "home shelves failed to load");
                self.state = ViewState::Failed("Error al cargar los libros.".into());
            }
        }
    }
}
