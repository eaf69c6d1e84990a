//! In-process stand-in for the Cambioteca backend.
//!
//! Spawns a real axum server on a loopback port, backed by an in-memory
//! market seeded with a few users, books and catalog rows. Handlers mirror
//! the production API surface closely enough for the client crate's
//! integration tests: same routes, same wire shapes, same refusal bodies.
//!
//! Nothing here persists. Every [`TestServer::spawn`] starts from the same
//! fixture state, and the whole world dies with the server.

pub mod admin;
pub mod auth;
pub mod books;
pub mod catalog;
pub mod chat;
pub mod exchanges;
pub mod favorites;
pub mod middleware;
pub mod proposals;
pub mod server;
pub mod state;
pub mod users;

pub use middleware::{JWT_SECRET, issue_token};
pub use server::TestServer;
pub use state::{AppState, Hits, MarketState};
