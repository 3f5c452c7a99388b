//! Persistence interface.
//!
//! One trait per entity. Handlers and services only see these traits;
//! [`Repositories`] bundles the trait objects the application runs on,
//! backed either by Postgres ([`crate::db`]) or by [`InMemoryStore`].

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{PgCategoryRepository, PgEventRepository, PgParticipantRepository, PgStoreHealth};
use crate::error::RepoResult;
use crate::models::{
    category::{Category, CategoryInput, CategoryView},
    event::{Event, EventInput, EventView},
    participant::{Participant, ParticipantInput, ParticipantView},
};
use crate::query::EventQuery;

pub use memory::InMemoryStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>>;

    /// All categories ordered by name, each with its event count.
    async fn find_all(&self) -> RepoResult<Vec<CategoryView>>;

    async fn count(&self) -> RepoResult<i64>;

    async fn create(&self, input: CategoryInput) -> RepoResult<Category>;

    /// Fails with `NotFound` when `id` does not exist.
    async fn update(&self, id: i64, input: CategoryInput) -> RepoResult<Category>;

    /// Events filed under the category keep existing with no category.
    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// The event with its category and participants resolved.
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<EventView>>;

    /// Matching events in list order, category and participants resolved.
    async fn find_all(&self, query: &EventQuery) -> RepoResult<Vec<EventView>>;

    async fn count(&self, query: &EventQuery) -> RepoResult<i64>;

    /// The subset of `ids` that name existing events.
    async fn existing_ids(&self, ids: &[i64]) -> RepoResult<Vec<i64>>;

    /// Fails with `InvalidReference { field: "category" }` for an unknown category.
    async fn create(&self, input: EventInput) -> RepoResult<Event>;

    async fn update(&self, id: i64, input: EventInput) -> RepoResult<Event>;

    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// The participant with the events they are registered for.
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<ParticipantView>>;

    /// All participants ordered by name, with their events.
    async fn find_all(&self) -> RepoResult<Vec<ParticipantView>>;

    async fn count(&self) -> RepoResult<i64>;

    /// Case-insensitive email lookup.
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<Participant>>;

    /// Writes the participant and replaces their event registrations.
    /// Fails with `Conflict { field: "email" }` for a duplicate email and
    /// `InvalidReference { field: "events" }` for an unknown event.
    async fn create(&self, input: ParticipantInput) -> RepoResult<Participant>;

    async fn update(&self, id: i64, input: ParticipantInput) -> RepoResult<Participant>;

    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> RepoResult<()>;
}

#[derive(Clone)]
pub struct Repositories {
    pub categories: Arc<dyn CategoryRepository>,
    pub events: Arc<dyn EventRepository>,
    pub participants: Arc<dyn ParticipantRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            categories: Arc::new(PgCategoryRepository::new(pool.clone())),
            events: Arc::new(PgEventRepository::new(pool.clone())),
            participants: Arc::new(PgParticipantRepository::new(pool.clone())),
            health: Arc::new(PgStoreHealth::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(InMemoryStore::new())
    }

    pub fn from_store(store: InMemoryStore) -> Self {
        Self {
            categories: Arc::new(store.clone()),
            events: Arc::new(store.clone()),
            participants: Arc::new(store.clone()),
            health: Arc::new(store),
        }
    }
}
