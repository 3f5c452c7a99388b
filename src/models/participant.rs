use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::event::Event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Validated participant fields. `event_ids` replaces the participant's
/// whole registration set on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInput {
    pub name: String,
    pub email: String,
    pub event_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: Participant,
    pub events: Vec<Event>,
}
