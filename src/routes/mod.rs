pub mod categories;
pub mod dashboard;
pub mod events;
pub mod health;
pub mod metrics;
pub mod participants;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// The full route table. Each CRUD path answers GET with the page and POST
/// with the action, redirecting to the list on success.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Events
        .route("/events/", get(events::list_events))
        .route("/events/add/", get(events::add_event_form).post(events::create_event))
        .route("/events/{id}/", get(events::event_detail))
        .route("/events/{id}/edit/", get(events::edit_event_form).post(events::update_event))
        .route("/events/{id}/delete/", get(events::confirm_delete_event).post(events::delete_event))
        // Participants
        .route("/participants/", get(participants::list_participants))
        .route("/participants/add/", get(participants::add_participant_form).post(participants::create_participant))
        .route("/participants/{id}/", get(participants::participant_detail))
        .route("/participants/{id}/edit/", get(participants::edit_participant_form).post(participants::update_participant))
        .route("/participants/{id}/delete/", get(participants::confirm_delete_participant).post(participants::delete_participant))
        // Categories
        .route("/categories/", get(categories::list_categories))
        .route("/categories/add/", get(categories::add_category_form).post(categories::create_category))
        .route("/categories/{id}/", get(categories::category_detail))
        .route("/categories/{id}/edit/", get(categories::edit_category_form).post(categories::update_category))
        .route("/categories/{id}/delete/", get(categories::confirm_delete_category).post(categories::delete_category))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
