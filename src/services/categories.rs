use crate::{
    error::AppError,
    forms::{CategoryForm, FieldErrors, FormPage},
    models::{
        category::{Category, CategoryDetail, CategoryView},
        ConfirmDelete,
    },
    query::{EventPredicate, EventQuery},
    repository::Repositories,
    services::metrics,
};

pub struct CategoryService;

impl CategoryService {
    pub async fn list(repos: &Repositories) -> Result<Vec<CategoryView>, AppError> {
        Ok(repos.categories.find_all().await?)
    }

    pub async fn get(repos: &Repositories, id: i64) -> Result<Category, AppError> {
        repos
            .categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Category", id))
    }

    /// The category with every event filed under it.
    pub async fn detail(repos: &Repositories, id: i64) -> Result<CategoryDetail, AppError> {
        let category = Self::get(repos, id).await?;
        let events = repos
            .events
            .find_all(&EventQuery::all().with(EventPredicate::CategoryIs(id)))
            .await?;
        Ok(CategoryDetail { category, events })
    }

    pub fn form_page(form: &CategoryForm, id: Option<i64>, errors: FieldErrors) -> FormPage {
        FormPage::new(CategoryForm::MODEL_NAME, CategoryForm::FIELDS, form)
            .for_object(id)
            .with_errors(errors)
    }

    pub fn new_form() -> FormPage {
        Self::form_page(&CategoryForm::default(), None, FieldErrors::new())
    }

    pub async fn edit_form(repos: &Repositories, id: i64) -> Result<FormPage, AppError> {
        let category = Self::get(repos, id).await?;
        Ok(Self::form_page(
            &CategoryForm::from_category(&category),
            Some(id),
            FieldErrors::new(),
        ))
    }

    pub async fn create(repos: &Repositories, form: CategoryForm) -> Result<Category, AppError> {
        let input = form
            .clean()
            .map_err(|errors| AppError::Validation(Box::new(Self::form_page(&form, None, errors))))?;

        let category = repos.categories.create(input).await?;
        tracing::info!(category_id = category.id, "Created category");
        metrics::record_write("category", "create");
        Ok(category)
    }

    pub async fn update(
        repos: &Repositories,
        id: i64,
        form: CategoryForm,
    ) -> Result<Category, AppError> {
        Self::get(repos, id).await?;
        let input = form.clean().map_err(|errors| {
            AppError::Validation(Box::new(Self::form_page(&form, Some(id), errors)))
        })?;

        let category = repos.categories.update(id, input).await?;
        tracing::info!(category_id = id, "Updated category");
        metrics::record_write("category", "update");
        Ok(category)
    }

    pub async fn confirm_delete(
        repos: &Repositories,
        id: i64,
    ) -> Result<ConfirmDelete<Category>, AppError> {
        let object = Self::get(repos, id).await?;
        Ok(ConfirmDelete {
            model_name: CategoryForm::MODEL_NAME,
            object,
        })
    }

    /// Events in the category are kept and lose their category.
    pub async fn delete(repos: &Repositories, id: i64) -> Result<(), AppError> {
        if !repos.categories.delete(id).await? {
            return Err(AppError::not_found("Category", id));
        }
        tracing::info!(category_id = id, "Deleted category");
        metrics::record_write("category", "delete");
        Ok(())
    }
}
