use axum::{extract::State, response::Redirect, Json};
use axum_extra::extract::Form;

use crate::{
    error::AppError,
    forms::{FormPage, ParticipantForm},
    middleware::record_id::RecordId,
    models::{participant::ParticipantView, ConfirmDelete},
    services::participants::ParticipantService,
    AppState,
};

const LIST: &str = "/participants/";

pub async fn list_participants(
    State(state): State<AppState>,
) -> Result<Json<Vec<ParticipantView>>, AppError> {
    ParticipantService::list(&state.repos).await.map(Json)
}

pub async fn participant_detail(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<ParticipantView>, AppError> {
    ParticipantService::get(&state.repos, id).await.map(Json)
}

pub async fn add_participant_form(
    State(state): State<AppState>,
) -> Result<Json<FormPage>, AppError> {
    ParticipantService::new_form(&state.repos).await.map(Json)
}

/// `events` arrives as a repeated key, hence the `axum_extra` form extractor.
pub async fn create_participant(
    State(state): State<AppState>,
    Form(form): Form<ParticipantForm>,
) -> Result<Redirect, AppError> {
    ParticipantService::create(&state.repos, form).await?;
    Ok(Redirect::to(LIST))
}

pub async fn edit_participant_form(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<FormPage>, AppError> {
    ParticipantService::edit_form(&state.repos, id).await.map(Json)
}

pub async fn update_participant(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    Form(form): Form<ParticipantForm>,
) -> Result<Redirect, AppError> {
    ParticipantService::update(&state.repos, id, form).await?;
    Ok(Redirect::to(LIST))
}

pub async fn confirm_delete_participant(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<ConfirmDelete<ParticipantView>>, AppError> {
    ParticipantService::confirm_delete(&state.repos, id).await.map(Json)
}

pub async fn delete_participant(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Redirect, AppError> {
    ParticipantService::delete(&state.repos, id).await?;
    Ok(Redirect::to(LIST))
}
