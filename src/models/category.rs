use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::event::EventView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// Validated category fields, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
}

/// Category row for the list page, with the number of events filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CategoryView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub category: Category,
    pub event_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub events: Vec<EventView>,
}
