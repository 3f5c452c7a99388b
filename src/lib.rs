// Library exports for binary tools and tests
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod query;
pub mod repository;
pub mod routes;
pub mod services;

use repository::Repositories;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
}
