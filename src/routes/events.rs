use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use axum_extra::extract::Form;

use crate::{
    error::AppError,
    forms::{EventForm, FormPage},
    middleware::record_id::RecordId,
    models::{
        event::{EventListPage, EventSearchParams, EventView},
        ConfirmDelete,
    },
    services::events::EventService,
    AppState,
};

const LIST: &str = "/events/";

pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventSearchParams>,
) -> Result<Json<EventListPage>, AppError> {
    EventService::list(&state.repos, params).await.map(Json)
}

pub async fn event_detail(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<EventView>, AppError> {
    EventService::get(&state.repos, id).await.map(Json)
}

pub async fn add_event_form(State(state): State<AppState>) -> Result<Json<FormPage>, AppError> {
    EventService::new_form(&state.repos).await.map(Json)
}

pub async fn create_event(
    State(state): State<AppState>,
    Form(form): Form<EventForm>,
) -> Result<Redirect, AppError> {
    EventService::create(&state.repos, form).await?;
    Ok(Redirect::to(LIST))
}

pub async fn edit_event_form(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<FormPage>, AppError> {
    EventService::edit_form(&state.repos, id).await.map(Json)
}

pub async fn update_event(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    Form(form): Form<EventForm>,
) -> Result<Redirect, AppError> {
    EventService::update(&state.repos, id, form).await?;
    Ok(Redirect::to(LIST))
}

pub async fn confirm_delete_event(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<ConfirmDelete<EventView>>, AppError> {
    EventService::confirm_delete(&state.repos, id).await.map(Json)
}

pub async fn delete_event(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Redirect, AppError> {
    EventService::delete(&state.repos, id).await?;
    Ok(Redirect::to(LIST))
}
