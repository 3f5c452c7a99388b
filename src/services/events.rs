use crate::{
    error::{AppError, RepoError},
    forms::{add_error, Choice, EventForm, FieldErrors, FormPage, INVALID_CHOICE},
    models::{
        event::{Event, EventInput, EventListPage, EventSearchParams, EventView},
        ConfirmDelete,
    },
    query::EventSearch,
    repository::Repositories,
    services::metrics,
};

pub struct EventService;

impl EventService {
    /// Events matching the list filters, plus the categories for the filter
    /// dropdown. Malformed filter values are a bad request.
    pub async fn list(
        repos: &Repositories,
        params: EventSearchParams,
    ) -> Result<EventListPage, AppError> {
        let search = EventSearch::from_params(&params).map_err(AppError::BadRequest)?;
        let events = repos.events.find_all(&search.to_query()).await?;
        let categories = repos
            .categories
            .find_all()
            .await?
            .into_iter()
            .map(|view| view.category)
            .collect();

        Ok(EventListPage {
            events,
            categories,
            filters: params,
        })
    }

    pub async fn get(repos: &Repositories, id: i64) -> Result<EventView, AppError> {
        repos
            .events
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Event", id))
    }

    pub async fn form_page(
        repos: &Repositories,
        form: &EventForm,
        id: Option<i64>,
        errors: FieldErrors,
    ) -> Result<FormPage, AppError> {
        let choices = repos
            .categories
            .find_all()
            .await?
            .into_iter()
            .map(|view| Choice {
                value: view.category.id,
                label: view.category.name,
            })
            .collect();

        Ok(FormPage::new(EventForm::MODEL_NAME, EventForm::FIELDS, form)
            .for_object(id)
            .with_choices("category", choices)
            .with_errors(errors))
    }

    pub async fn new_form(repos: &Repositories) -> Result<FormPage, AppError> {
        Self::form_page(repos, &EventForm::default(), None, FieldErrors::new()).await
    }

    pub async fn edit_form(repos: &Repositories, id: i64) -> Result<FormPage, AppError> {
        let view = Self::get(repos, id).await?;
        Self::form_page(repos, &EventForm::from_event(&view.event), Some(id), FieldErrors::new()).await
    }

    /// Field cleaning plus the category lookup.
    async fn clean(
        repos: &Repositories,
        form: &EventForm,
        id: Option<i64>,
    ) -> Result<EventInput, AppError> {
        let errors = match form.clean() {
            Ok(input) => {
                let known = match input.category_id {
                    Some(category_id) => repos.categories.find_by_id(category_id).await?.is_some(),
                    None => true,
                };
                if known {
                    return Ok(input);
                }
                let mut errors = FieldErrors::new();
                add_error(&mut errors, "category", INVALID_CHOICE);
                errors
            }
            Err(errors) => errors,
        };
        Err(AppError::Validation(Box::new(
            Self::form_page(repos, form, id, errors).await?,
        )))
    }

    /// Maps a store-level rejection of the category back onto the form.
    async fn write_error(
        repos: &Repositories,
        form: &EventForm,
        id: Option<i64>,
        err: RepoError,
    ) -> AppError {
        match err {
            RepoError::InvalidReference { field } => {
                let mut errors = FieldErrors::new();
                add_error(&mut errors, field, INVALID_CHOICE);
                match Self::form_page(repos, form, id, errors).await {
                    Ok(page) => AppError::Validation(Box::new(page)),
                    Err(e) => e,
                }
            }
            other => other.into(),
        }
    }

    pub async fn create(repos: &Repositories, form: EventForm) -> Result<Event, AppError> {
        let input = Self::clean(repos, &form, None).await?;
        let event = match repos.events.create(input).await {
            Ok(event) => event,
            Err(e) => return Err(Self::write_error(repos, &form, None, e).await),
        };
        tracing::info!(event_id = event.id, "Created event");
        metrics::record_write("event", "create");
        Ok(event)
    }

    pub async fn update(repos: &Repositories, id: i64, form: EventForm) -> Result<Event, AppError> {
        Self::get(repos, id).await?;
        let input = Self::clean(repos, &form, Some(id)).await?;
        let event = match repos.events.update(id, input).await {
            Ok(event) => event,
            Err(e) => return Err(Self::write_error(repos, &form, Some(id), e).await),
        };
        tracing::info!(event_id = id, "Updated event");
        metrics::record_write("event", "update");
        Ok(event)
    }

    pub async fn confirm_delete(
        repos: &Repositories,
        id: i64,
    ) -> Result<ConfirmDelete<EventView>, AppError> {
        let object = Self::get(repos, id).await?;
        Ok(ConfirmDelete {
            model_name: EventForm::MODEL_NAME,
            object,
        })
    }

    pub async fn delete(repos: &Repositories, id: i64) -> Result<(), AppError> {
        if !repos.events.delete(id).await? {
            return Err(AppError::not_found("Event", id));
        }
        tracing::info!(event_id = id, "Deleted event");
        metrics::record_write("event", "delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::CategoryInput;
    use crate::query::EventQuery;
    use crate::services::categories::CategoryService;
    use crate::repository::{InMemoryStore, MockEventRepository};
    use std::sync::Arc;

    fn form(name: &str, location: &str, date: &str, category: &str) -> EventForm {
        EventForm {
            name: name.into(),
            description: String::new(),
            date: date.into(),
            time: "18:00".into(),
            location: location.into(),
            category: category.into(),
        }
    }

    fn params(search: &str, category: &str, start: &str, end: &str) -> EventSearchParams {
        EventSearchParams {
            search: Some(search.into()),
            category: Some(category.into()),
            start_date: Some(start.into()),
            end_date: Some(end.into()),
        }
    }

    fn names(page: &EventListPage) -> Vec<&str> {
        page.events.iter().map(|v| v.event.name.as_str()).collect()
    }

    async fn seeded() -> (Repositories, i64) {
        let store = InMemoryStore::new();
        let repos = Repositories::from_store(store);
        let tech = repos
            .categories
            .create(CategoryInput {
                name: "Tech".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        let tech_id = tech.id.to_string();
        for f in [
            form("TechConf", "Berlin", "2025-03-10", &tech_id),
            form("Jazz night", "Conference hall", "2025-03-12", ""),
            form("RustFest", "Zurich", "2025-04-01", &tech_id),
        ] {
            EventService::create(&repos, f).await.unwrap();
        }
        (repos, tech.id)
    }

    #[tokio::test]
    async fn search_matches_name_or_location_case_insensitively() {
        let (repos, _) = seeded().await;
        let page = EventService::list(&repos, params("conf", "", "", "")).await.unwrap();
        assert_eq!(names(&page), ["TechConf", "Jazz night"]);
    }

    #[tokio::test]
    async fn category_and_full_range_narrow_results() {
        let (repos, tech) = seeded().await;
        let page = EventService::list(&repos, params("", &tech.to_string(), "2025-03-01", "2025-03-31"))
            .await
            .unwrap();
        assert_eq!(names(&page), ["TechConf"]);
        assert_eq!(page.categories.len(), 1);
    }

    #[tokio::test]
    async fn single_date_bound_is_ignored() {
        let (repos, _) = seeded().await;
        let unfiltered = EventService::list(&repos, params("", "", "", "")).await.unwrap();
        let start_only = EventService::list(&repos, params("", "", "2025-04-01", "")).await.unwrap();
        assert_eq!(names(&start_only), names(&unfiltered));
        assert_eq!(names(&unfiltered).len(), 3);
    }

    #[tokio::test]
    async fn malformed_filter_is_a_bad_request() {
        let (repos, _) = seeded().await;
        let result = EventService::list(&repos, params("", "tech", "", "")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn unknown_category_is_a_field_error() {
        let (repos, _) = seeded().await;
        let result = EventService::create(&repos, form("Gig", "Pub", "2025-05-01", "999")).await;
        match result {
            Err(AppError::Validation(page)) => {
                assert_eq!(page.errors["category"], vec![INVALID_CHOICE.to_string()]);
                assert_eq!(page.choices["category"].len(), 1);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        let total = repos.events.count(&EventQuery::all()).await.unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn store_rejection_of_category_is_mapped_to_the_form() {
        let mut events = MockEventRepository::new();
        events
            .expect_create()
            .returning(|_| Err(RepoError::InvalidReference { field: "category" }));
        let mut repos = Repositories::in_memory();
        repos.events = Arc::new(events);

        let result = EventService::create(&repos, form("Gig", "Pub", "2025-05-01", "")).await;
        assert!(matches!(result, Err(AppError::Validation(page)) if page.errors.contains_key("category")));
    }

    #[tokio::test]
    async fn update_of_missing_event_is_not_found() {
        let (repos, _) = seeded().await;
        let result = EventService::update(&repos, 404, form("Gig", "Pub", "2025-05-01", "")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn category_detail_lists_its_events() {
        let (repos, tech) = seeded().await;
        let detail = CategoryService::detail(&repos, tech).await.unwrap();
        let names: Vec<_> = detail.events.iter().map(|v| v.event.name.as_str()).collect();
        assert_eq!(names, ["TechConf", "RustFest"]);
        assert!(detail.events.iter().all(|v| v.category.as_ref() == Some(&detail.category)));
    }
}
