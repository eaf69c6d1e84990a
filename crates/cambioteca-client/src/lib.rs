pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod session;
pub mod views;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use session::SessionStore;
