use axum::{extract::State, response::Redirect, Json};
use axum_extra::extract::Form;

use crate::{
    error::AppError,
    forms::{CategoryForm, FormPage},
    middleware::record_id::RecordId,
    models::{
        category::{Category, CategoryDetail, CategoryView},
        ConfirmDelete,
    },
    services::categories::CategoryService,
    AppState,
};

const LIST: &str = "/categories/";

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryView>>, AppError> {
    CategoryService::list(&state.repos).await.map(Json)
}

pub async fn category_detail(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<CategoryDetail>, AppError> {
    CategoryService::detail(&state.repos, id).await.map(Json)
}

pub async fn add_category_form() -> Json<FormPage> {
    Json(CategoryService::new_form())
}

pub async fn create_category(
    State(state): State<AppState>,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect, AppError> {
    CategoryService::create(&state.repos, form).await?;
    Ok(Redirect::to(LIST))
}

pub async fn edit_category_form(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<FormPage>, AppError> {
    CategoryService::edit_form(&state.repos, id).await.map(Json)
}

pub async fn update_category(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect, AppError> {
    CategoryService::update(&state.repos, id, form).await?;
    Ok(Redirect::to(LIST))
}

pub async fn confirm_delete_category(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<ConfirmDelete<Category>>, AppError> {
    CategoryService::confirm_delete(&state.repos, id).await.map(Json)
}

pub async fn delete_category(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Redirect, AppError> {
    CategoryService::delete(&state.repos, id).await?;
    Ok(Redirect::to(LIST))
}
