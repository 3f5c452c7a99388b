use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CategoryRepository, EventRepository, ParticipantRepository, StoreHealth};
use crate::error::{RepoError, RepoResult};
use crate::models::{
    category::{Category, CategoryInput, CategoryView},
    event::{list_order, Event, EventInput, EventView},
    participant::{Participant, ParticipantInput, ParticipantView},
};
use crate::query::EventQuery;

#[derive(Debug, Default)]
struct Tables {
    categories: BTreeMap<i64, Category>,
    events: BTreeMap<i64, Event>,
    participants: BTreeMap<i64, Participant>,
    /// `(event_id, participant_id)` pairs.
    registrations: BTreeSet<(i64, i64)>,
    last_category_id: i64,
    last_event_id: i64,
    last_participant_id: i64,
}

impl Tables {
    fn event_view(&self, event: &Event) -> EventView {
        let category = event
            .category_id
            .and_then(|id| self.categories.get(&id))
            .cloned();
        let mut participants: Vec<Participant> = self
            .registrations
            .range((event.id, i64::MIN)..=(event.id, i64::MAX))
            .filter_map(|(_, pid)| self.participants.get(pid))
            .cloned()
            .collect();
        participants.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        EventView {
            event: event.clone(),
            category,
            participants,
        }
    }

    fn participant_view(&self, participant: &Participant) -> ParticipantView {
        let mut events: Vec<Event> = self
            .registrations
            .iter()
            .filter(|(_, pid)| *pid == participant.id)
            .filter_map(|(eid, _)| self.events.get(eid))
            .cloned()
            .collect();
        events.sort_by(list_order);
        ParticipantView {
            participant: participant.clone(),
            events,
        }
    }

    fn check_category(&self, category_id: Option<i64>) -> RepoResult<()> {
        match category_id {
            Some(id) if !self.categories.contains_key(&id) => {
                Err(RepoError::InvalidReference { field: "category" })
            }
            _ => Ok(()),
        }
    }

    fn check_participant(&self, id: Option<i64>, input: &ParticipantInput) -> RepoResult<()> {
        let email = input.email.to_lowercase();
        let taken = self
            .participants
            .values()
            .any(|p| Some(p.id) != id && p.email.to_lowercase() == email);
        if taken {
            return Err(RepoError::Conflict {
                field: "email",
                message: "Participant with this Email already exists.".to_string(),
            });
        }
        if input.event_ids.iter().any(|eid| !self.events.contains_key(eid)) {
            return Err(RepoError::InvalidReference { field: "events" });
        }
        Ok(())
    }

    fn register(&mut self, participant_id: i64, event_ids: &[i64]) {
        self.registrations.retain(|(_, pid)| *pid != participant_id);
        for eid in event_ids {
            self.registrations.insert((*eid, participant_id));
        }
    }
}

/// Store keeping all three tables in process memory, for development and
/// tests. Applies the same integrity rules as the Postgres schema. Each
/// write holds the lock for its whole duration, so writes are atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.get(&id).cloned())
    }

    async fn find_all(&self) -> RepoResult<Vec<CategoryView>> {
        let tables = self.tables.read().await;
        let mut result: Vec<CategoryView> = tables
            .categories
            .values()
            .map(|c| CategoryView {
                category: c.clone(),
                event_count: tables
                    .events
                    .values()
                    .filter(|e| e.category_id == Some(c.id))
                    .count() as i64,
            })
            .collect();
        result.sort_by(|a, b| (&a.category.name, a.category.id).cmp(&(&b.category.name, b.category.id)));
        Ok(result)
    }

    async fn count(&self) -> RepoResult<i64> {
        Ok(self.tables.read().await.categories.len() as i64)
    }

    async fn create(&self, input: CategoryInput) -> RepoResult<Category> {
        let mut tables = self.tables.write().await;
        tables.last_category_id += 1;
        let category = Category {
            id: tables.last_category_id,
            name: input.name,
            description: input.description,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, id: i64, input: CategoryInput) -> RepoResult<Category> {
        let mut tables = self.tables.write().await;
        let category = tables
            .categories
            .get_mut(&id)
            .ok_or(RepoError::NotFound { entity: "Category", id })?;
        category.name = input.name;
        category.description = input.description;
        Ok(category.clone())
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for event in tables.events.values_mut() {
            if event.category_id == Some(id) {
                event.category_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<EventView>> {
        let tables = self.tables.read().await;
        Ok(tables.events.get(&id).map(|e| tables.event_view(e)))
    }

    async fn find_all(&self, query: &EventQuery) -> RepoResult<Vec<EventView>> {
        let tables = self.tables.read().await;
        let mut events: Vec<&Event> = tables.events.values().filter(|e| query.matches(e)).collect();
        events.sort_by(|a, b| list_order(a, b));
        Ok(events.into_iter().map(|e| tables.event_view(e)).collect())
    }

    async fn count(&self, query: &EventQuery) -> RepoResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.events.values().filter(|e| query.matches(e)).count() as i64)
    }

    async fn existing_ids(&self, ids: &[i64]) -> RepoResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().copied().filter(|id| tables.events.contains_key(id)).collect())
    }

    async fn create(&self, input: EventInput) -> RepoResult<Event> {
        let mut tables = self.tables.write().await;
        tables.check_category(input.category_id)?;
        tables.last_event_id += 1;
        let event = Event {
            id: tables.last_event_id,
            name: input.name,
            description: input.description,
            date: input.date,
            time: input.time,
            location: input.location,
            category_id: input.category_id,
        };
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update(&self, id: i64, input: EventInput) -> RepoResult<Event> {
        let mut tables = self.tables.write().await;
        tables.check_category(input.category_id)?;
        let event = tables
            .events
            .get_mut(&id)
            .ok_or(RepoError::NotFound { entity: "Event", id })?;
        event.name = input.name;
        event.description = input.description;
        event.date = input.date;
        event.time = input.time;
        event.location = input.location;
        event.category_id = input.category_id;
        Ok(event.clone())
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.events.remove(&id).is_none() {
            return Ok(false);
        }
        tables.registrations.retain(|(eid, _)| *eid != id);
        Ok(true)
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<ParticipantView>> {
        let tables = self.tables.read().await;
        Ok(tables.participants.get(&id).map(|p| tables.participant_view(p)))
    }

    async fn find_all(&self) -> RepoResult<Vec<ParticipantView>> {
        let tables = self.tables.read().await;
        let mut participants: Vec<&Participant> = tables.participants.values().collect();
        participants.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(participants
            .into_iter()
            .map(|p| tables.participant_view(p))
            .collect())
    }

    async fn count(&self) -> RepoResult<i64> {
        Ok(self.tables.read().await.participants.len() as i64)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<Participant>> {
        let email = email.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .values()
            .find(|p| p.email.to_lowercase() == email)
            .cloned())
    }

    async fn create(&self, input: ParticipantInput) -> RepoResult<Participant> {
        let mut tables = self.tables.write().await;
        tables.check_participant(None, &input)?;
        tables.last_participant_id += 1;
        let participant = Participant {
            id: tables.last_participant_id,
            name: input.name,
            email: input.email,
        };
        tables.participants.insert(participant.id, participant.clone());
        tables.register(participant.id, &input.event_ids);
        Ok(participant)
    }

    async fn update(&self, id: i64, input: ParticipantInput) -> RepoResult<Participant> {
        let mut tables = self.tables.write().await;
        if !tables.participants.contains_key(&id) {
            return Err(RepoError::NotFound { entity: "Participant", id });
        }
        tables.check_participant(Some(id), &input)?;
        let participant = Participant {
            id,
            name: input.name,
            email: input.email,
        };
        tables.participants.insert(id, participant.clone());
        tables.register(id, &input.event_ids);
        Ok(participant)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.participants.remove(&id).is_none() {
            return Ok(false);
        }
        tables.registrations.retain(|(_, pid)| *pid != id);
        Ok(true)
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::EventPredicate;
    use chrono::{NaiveDate, NaiveTime};

    fn event_input(name: &str, date: (i32, u32, u32), category_id: Option<i64>) -> EventInput {
        EventInput {
            name: name.to_string(),
            description: String::new(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            location: "Main hall".to_string(),
            category_id,
        }
    }

    fn participant_input(name: &str, email: &str, event_ids: Vec<i64>) -> ParticipantInput {
        ParticipantInput {
            name: name.to_string(),
            email: email.to_string(),
            event_ids,
        }
    }

    #[tokio::test]
    async fn registrations_are_visible_from_both_sides() {
        let store = InMemoryStore::new();
        let a = EventRepository::create(&store, event_input("A", (2025, 5, 1), None)).await.unwrap();
        let b = EventRepository::create(&store, event_input("B", (2025, 5, 2), None)).await.unwrap();

        let ada = ParticipantRepository::create(&store, participant_input("Ada", "ada@example.com", vec![a.id, b.id]))
            .await
            .unwrap();

        for id in [a.id, b.id] {
            let view = EventRepository::find_by_id(&store, id).await.unwrap().unwrap();
            assert_eq!(view.participants, vec![ada.clone()]);
        }
        let view = ParticipantRepository::find_by_id(&store, ada.id).await.unwrap().unwrap();
        assert_eq!(view.events, vec![a, b]);
    }

    #[tokio::test]
    async fn deleting_a_category_clears_event_references() {
        let store = InMemoryStore::new();
        let music = CategoryRepository::create(
            &store,
            CategoryInput {
                name: "Music".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
        let gig = EventRepository::create(&store, event_input("Gig", (2025, 6, 1), Some(music.id)))
            .await
            .unwrap();

        assert!(CategoryRepository::delete(&store, music.id).await.unwrap());

        let view = EventRepository::find_by_id(&store, gig.id).await.unwrap().unwrap();
        assert_eq!(view.event.category_id, None);
        assert_eq!(view.category, None);
        assert!(!CategoryRepository::delete(&store, music.id).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_category_is_an_invalid_reference() {
        let store = InMemoryStore::new();
        let result = EventRepository::create(&store, event_input("Gig", (2025, 6, 1), Some(42))).await;
        assert!(matches!(result, Err(RepoError::InvalidReference { field: "category" })));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_regardless_of_case() {
        let store = InMemoryStore::new();
        let ada = ParticipantRepository::create(&store, participant_input("Ada", "ada@example.com", vec![]))
            .await
            .unwrap();

        let result =
            ParticipantRepository::create(&store, participant_input("Ada L", "ADA@example.com", vec![])).await;
        assert!(matches!(result, Err(RepoError::Conflict { field: "email", .. })));

        // Keeping one's own email on update is fine.
        let updated = ParticipantRepository::update(&store, ada.id, participant_input("Ada L", "Ada@Example.com", vec![]))
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada L");
    }

    #[tokio::test]
    async fn deleting_an_event_drops_its_registrations() {
        let store = InMemoryStore::new();
        let a = EventRepository::create(&store, event_input("A", (2025, 5, 1), None)).await.unwrap();
        let ada = ParticipantRepository::create(&store, participant_input("Ada", "ada@example.com", vec![a.id]))
            .await
            .unwrap();

        assert!(EventRepository::delete(&store, a.id).await.unwrap());
        let view = ParticipantRepository::find_by_id(&store, ada.id).await.unwrap().unwrap();
        assert!(view.events.is_empty());
    }

    #[tokio::test]
    async fn find_all_filters_and_orders() {
        let store = InMemoryStore::new();
        EventRepository::create(&store, event_input("Late", (2025, 5, 3), None)).await.unwrap();
        EventRepository::create(&store, event_input("Early", (2025, 5, 1), None)).await.unwrap();
        EventRepository::create(&store, event_input("Middle", (2025, 5, 2), None)).await.unwrap();

        let all = EventRepository::find_all(&store, &EventQuery::all()).await.unwrap();
        let names: Vec<_> = all.iter().map(|v| v.event.name.as_str()).collect();
        assert_eq!(names, ["Early", "Middle", "Late"]);

        let since = EventQuery::all().with(EventPredicate::DateOnOrAfter(NaiveDate::from_ymd_opt(2025, 5, 2).unwrap()));
        assert_eq!(EventRepository::count(&store, &since).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn names_sort_byte_wise() {
        let store = InMemoryStore::new();
        for name in ["apple", "Banana", "cherry"] {
            EventRepository::create(&store, event_input(name, (2025, 5, 1), None)).await.unwrap();
            ParticipantRepository::create(&store, participant_input(name, &format!("{name}@example.com"), vec![]))
                .await
                .unwrap();
        }

        let events = EventRepository::find_all(&store, &EventQuery::all()).await.unwrap();
        let names: Vec<_> = events.iter().map(|v| v.event.name.as_str()).collect();
        assert_eq!(names, ["Banana", "apple", "cherry"]);

        let participants = ParticipantRepository::find_all(&store).await.unwrap();
        let names: Vec<_> = participants.iter().map(|v| v.participant.name.as_str()).collect();
        assert_eq!(names, ["Banana", "apple", "cherry"]);
    }
}
