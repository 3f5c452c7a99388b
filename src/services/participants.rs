use crate::{
    error::{AppError, RepoError},
    forms::{add_error, Choice, FieldErrors, FormPage, ParticipantForm, INVALID_CHOICE},
    models::{
        participant::{Participant, ParticipantInput, ParticipantView},
        ConfirmDelete,
    },
    query::EventQuery,
    repository::Repositories,
    services::metrics,
};

const DUPLICATE_EMAIL: &str = "Participant with this Email already exists.";

fn unknown_event(id: i64) -> String {
    format!("Select a valid choice. {id} is not one of the available choices.")
}

pub struct ParticipantService;

impl ParticipantService {
    pub async fn list(repos: &Repositories) -> Result<Vec<ParticipantView>, AppError> {
        Ok(repos.participants.find_all().await?)
    }

    pub async fn get(repos: &Repositories, id: i64) -> Result<ParticipantView, AppError> {
        repos
            .participants
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Participant", id))
    }

    pub async fn form_page(
        repos: &Repositories,
        form: &ParticipantForm,
        id: Option<i64>,
        errors: FieldErrors,
    ) -> Result<FormPage, AppError> {
        let choices = repos
            .events
            .find_all(&EventQuery::all())
            .await?
            .into_iter()
            .map(|view| Choice {
                value: view.event.id,
                label: view.event.name,
            })
            .collect();

        Ok(FormPage::new(ParticipantForm::MODEL_NAME, ParticipantForm::FIELDS, form)
            .for_object(id)
            .with_choices("events", choices)
            .with_errors(errors))
    }

    pub async fn new_form(repos: &Repositories) -> Result<FormPage, AppError> {
        Self::form_page(repos, &ParticipantForm::default(), None, FieldErrors::new()).await
    }

    pub async fn edit_form(repos: &Repositories, id: i64) -> Result<FormPage, AppError> {
        let view = Self::get(repos, id).await?;
        Self::form_page(repos, &ParticipantForm::from_view(&view), Some(id), FieldErrors::new()).await
    }

    /// Store-dependent checks: every selected event exists and no other
    /// participant holds the email.
    async fn check(
        repos: &Repositories,
        input: &ParticipantInput,
        id: Option<i64>,
    ) -> Result<FieldErrors, AppError> {
        let mut errors = FieldErrors::new();
        if !input.event_ids.is_empty() {
            let known = repos.events.existing_ids(&input.event_ids).await?;
            for &event_id in input.event_ids.iter().filter(|id| !known.contains(id)) {
                add_error(&mut errors, "events", unknown_event(event_id));
            }
        }
        if let Some(holder) = repos.participants.find_by_email(&input.email).await? {
            if Some(holder.id) != id {
                add_error(&mut errors, "email", DUPLICATE_EMAIL);
            }
        }
        Ok(errors)
    }

    async fn clean(
        repos: &Repositories,
        form: &ParticipantForm,
        id: Option<i64>,
    ) -> Result<ParticipantInput, AppError> {
        let errors = match form.clean() {
            Ok(input) => {
                let errors = Self::check(repos, &input, id).await?;
                if errors.is_empty() {
                    return Ok(input);
                }
                errors
            }
            Err(errors) => errors,
        };
        Err(AppError::Validation(Box::new(
            Self::form_page(repos, form, id, errors).await?,
        )))
    }

    /// A concurrent write can still trip the store's own email and event
    /// constraints after `check` passed.
    async fn write_error(
        repos: &Repositories,
        form: &ParticipantForm,
        id: Option<i64>,
        err: RepoError,
    ) -> AppError {
        let mut errors = FieldErrors::new();
        match err {
            RepoError::Conflict { field, message } => add_error(&mut errors, field, message),
            RepoError::InvalidReference { field } => add_error(&mut errors, field, INVALID_CHOICE),
            other => return other.into(),
        }
        match Self::form_page(repos, form, id, errors).await {
            Ok(page) => AppError::Validation(Box::new(page)),
            Err(e) => e,
        }
    }

    pub async fn create(
        repos: &Repositories,
        form: ParticipantForm,
    ) -> Result<Participant, AppError> {
        let input = Self::clean(repos, &form, None).await?;
        let participant = match repos.participants.create(input).await {
            Ok(participant) => participant,
            Err(e) => return Err(Self::write_error(repos, &form, None, e).await),
        };
        tracing::info!(participant_id = participant.id, "Created participant");
        metrics::record_write("participant", "create");
        Ok(participant)
    }

    pub async fn update(
        repos: &Repositories,
        id: i64,
        form: ParticipantForm,
    ) -> Result<Participant, AppError> {
        Self::get(repos, id).await?;
        let input = Self::clean(repos, &form, Some(id)).await?;
        let participant = match repos.participants.update(id, input).await {
            Ok(participant) => participant,
            Err(e) => return Err(Self::write_error(repos, &form, Some(id), e).await),
        };
        tracing::info!(participant_id = id, "Updated participant");
        metrics::record_write("participant", "update");
        Ok(participant)
    }

    pub async fn confirm_delete(
        repos: &Repositories,
        id: i64,
    ) -> Result<ConfirmDelete<ParticipantView>, AppError> {
        let object = Self::get(repos, id).await?;
        Ok(ConfirmDelete {
            model_name: ParticipantForm::MODEL_NAME,
            object,
        })
    }

    /// Registrations go with the participant; the events stay.
    pub async fn delete(repos: &Repositories, id: i64) -> Result<(), AppError> {
        if !repos.participants.delete(id).await? {
            return Err(AppError::not_found("Participant", id));
        }
        tracing::info!(participant_id = id, "Deleted participant");
        metrics::record_write("participant", "delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::EventForm;
    use crate::repository::{MockEventRepository, MockParticipantRepository};
    use crate::services::events::EventService;
    use std::sync::Arc;

    fn form(name: &str, email: &str, events: &[i64]) -> ParticipantForm {
        ParticipantForm {
            name: name.into(),
            email: email.into(),
            events: events.iter().map(|id| id.to_string()).collect(),
        }
    }

    async fn with_events(names: &[&str]) -> (Repositories, Vec<i64>) {
        let repos = Repositories::in_memory();
        let mut ids = Vec::new();
        for (day, name) in names.iter().enumerate() {
            let event = EventService::create(
                &repos,
                EventForm {
                    name: name.to_string(),
                    description: String::new(),
                    date: format!("2025-06-{:02}", day + 1),
                    time: "10:00".into(),
                    location: "Hall".into(),
                    category: String::new(),
                },
            )
            .await
            .unwrap();
            ids.push(event.id);
        }
        (repos, ids)
    }

    fn field_errors(result: Result<Participant, AppError>) -> FieldErrors {
        match result {
            Err(AppError::Validation(page)) => page.errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn registration_shows_on_both_sides() {
        let (repos, ids) = with_events(&["Opening", "Closing"]).await;
        let ada = ParticipantService::create(&repos, form("Ada", "ada@example.com", &ids))
            .await
            .unwrap();

        let view = ParticipantService::get(&repos, ada.id).await.unwrap();
        assert_eq!(view.events.len(), 2);
        for id in ids {
            let event = EventService::get(&repos, id).await.unwrap();
            assert_eq!(event.participants, vec![ada.clone()]);
        }
    }

    #[tokio::test]
    async fn email_is_unique_ignoring_case() {
        let (repos, _) = with_events(&[]).await;
        ParticipantService::create(&repos, form("Ada", "ada@example.com", &[]))
            .await
            .unwrap();

        let errors = field_errors(
            ParticipantService::create(&repos, form("Imposter", "ADA@example.com", &[])).await,
        );
        assert_eq!(errors["email"], vec![DUPLICATE_EMAIL.to_string()]);
        assert_eq!(repos.participants.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn keeping_your_own_email_on_update_is_fine() {
        let (repos, ids) = with_events(&["Opening"]).await;
        let ada = ParticipantService::create(&repos, form("Ada", "ada@example.com", &[]))
            .await
            .unwrap();

        let updated = ParticipantService::update(&repos, ada.id, form("Ada L.", "Ada@Example.com", &ids))
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada L.");
        let view = ParticipantService::get(&repos, ada.id).await.unwrap();
        assert_eq!(view.events.len(), 1);
    }

    #[tokio::test]
    async fn unknown_event_is_reported_on_events() {
        let (repos, ids) = with_events(&["Opening"]).await;
        let errors = field_errors(
            ParticipantService::create(&repos, form("Ada", "ada@example.com", &[ids[0], 99])).await,
        );
        assert_eq!(errors["events"], vec![unknown_event(99)]);
        assert!(repos.participants.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_conflict_is_mapped_to_the_form() {
        let mut participants = MockParticipantRepository::new();
        participants.expect_find_by_email().returning(|_| Ok(None));
        participants.expect_create().returning(|_| {
            Err(RepoError::Conflict {
                field: "email",
                message: DUPLICATE_EMAIL.into(),
            })
        });
        let mut repos = Repositories::in_memory();
        repos.participants = Arc::new(participants);

        let errors = field_errors(
            ParticipantService::create(&repos, form("Ada", "ada@example.com", &[])).await,
        );
        assert_eq!(errors["email"], vec![DUPLICATE_EMAIL.to_string()]);
    }

    #[tokio::test]
    async fn deleting_a_participant_keeps_the_events() {
        let (repos, ids) = with_events(&["Opening"]).await;
        let ada = ParticipantService::create(&repos, form("Ada", "ada@example.com", &ids))
            .await
            .unwrap();

        ParticipantService::delete(&repos, ada.id).await.unwrap();
        let event = EventService::get(&repos, ids[0]).await.unwrap();
        assert!(event.participants.is_empty());
        assert!(matches!(
            ParticipantService::delete(&repos, ada.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn selected_events_are_checked_in_one_lookup() {
        let mut events = MockEventRepository::new();
        events.expect_find_by_id().never();
        events
            .expect_existing_ids()
            .times(1)
            .returning(|ids| Ok(ids.iter().copied().filter(|id| *id != 8).collect()));
        events.expect_find_all().returning(|_| Ok(vec![]));
        let mut repos = Repositories::in_memory();
        repos.events = Arc::new(events);

        let errors = field_errors(
            ParticipantService::create(&repos, form("Ada", "ada@example.com", &[3, 8, 5])).await,
        );
        assert_eq!(errors["events"], vec![unknown_event(8)]);
    }
}
