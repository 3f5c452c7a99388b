use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{category::Category, participant::Participant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub category_id: Option<i64>,
}

/// Validated event fields, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInput {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub category_id: Option<i64>,
}

/// An event with its category and participants already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub category: Option<Category>,
    pub participants: Vec<Participant>,
}

impl EventView {
    pub fn id(&self) -> i64 {
        self.event.id
    }
}

/// Ordering shared by every event list: date, time, name, then id. Names
/// compare byte-wise, as Postgres does under `COLLATE "C"`.
pub fn list_order(a: &Event, b: &Event) -> std::cmp::Ordering {
    (a.date, a.time, &a.name, a.id).cmp(&(b.date, b.time, &b.name, b.id))
}

/// Raw query string of `GET /events/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSearchParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventListPage {
    pub events: Vec<EventView>,
    pub categories: Vec<Category>,
    pub filters: EventSearchParams,
}
