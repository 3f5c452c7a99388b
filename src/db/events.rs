use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::constraint_error;
use crate::{
    error::{RepoError, RepoResult},
    models::{
        category::Category,
        event::{Event, EventInput, EventView},
        participant::Participant,
    },
    query::EventQuery,
    repository::EventRepository,
};

const EVENT_COLUMNS: &str = r#"id, name, description, "date", "time", location, category_id"#;

const SELECT_EVENT_ROWS: &str = r#"SELECT e.id, e.name, e.description, e."date", e."time", e.location, e.category_id,
       c.name AS category_name, c.description AS category_description
FROM events e
LEFT JOIN categories c ON c.id = e.category_id"#;

const ORDER_EVENT_ROWS: &str = r#" ORDER BY e."date", e."time", e.name COLLATE "C", e.id"#;

/// Event joined with its category in the same row.
#[derive(FromRow)]
struct EventRow {
    id: i64,
    name: String,
    description: String,
    date: NaiveDate,
    time: NaiveTime,
    location: String,
    category_id: Option<i64>,
    category_name: Option<String>,
    category_description: Option<String>,
}

impl EventRow {
    fn into_view(self, participants: Vec<Participant>) -> EventView {
        let category = match (self.category_id, self.category_name) {
            (Some(id), Some(name)) => Some(Category {
                id,
                name,
                description: self.category_description.unwrap_or_default(),
            }),
            _ => None,
        };
        EventView {
            event: Event {
                id: self.id,
                name: self.name,
                description: self.description,
                date: self.date,
                time: self.time,
                location: self.location,
                category_id: self.category_id,
            },
            category,
            participants,
        }
    }
}

#[derive(FromRow)]
struct Registration {
    event_id: i64,
    #[sqlx(flatten)]
    participant: Participant,
}

pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the participants of all `rows` in one query and attaches them.
    async fn with_participants(&self, rows: Vec<EventRow>) -> RepoResult<Vec<EventView>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let registrations = sqlx::query_as::<_, Registration>(
            r#"SELECT ep.event_id, p.id, p.name, p.email
             FROM event_participants ep
             JOIN participants p ON p.id = ep.participant_id
             WHERE ep.event_id = ANY($1)
             ORDER BY p.name COLLATE "C", p.id"#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut by_event: HashMap<i64, Vec<Participant>> = HashMap::new();
        for r in registrations {
            by_event.entry(r.event_id).or_default().push(r.participant);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let participants = by_event.remove(&row.id).unwrap_or_default();
                row.into_view(participants)
            })
            .collect())
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<EventView>> {
        let row = sqlx::query_as::<_, EventRow>(&format!("{SELECT_EVENT_ROWS} WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            None => Ok(None),
            Some(row) => Ok(self.with_participants(vec![row]).await?.pop()),
        }
    }

    async fn find_all(&self, query: &EventQuery) -> RepoResult<Vec<EventView>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_EVENT_ROWS);
        query.push_where(&mut qb);
        qb.push(ORDER_EVENT_ROWS);

        let rows = qb.build_query_as::<EventRow>().fetch_all(&self.pool).await?;
        self.with_participants(rows).await
    }

    async fn count(&self, query: &EventQuery) -> RepoResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events e");
        query.push_where(&mut qb);

        let count: i64 = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn existing_ids(&self, ids: &[i64]) -> RepoResult<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM events WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }

    async fn create(&self, input: EventInput) -> RepoResult<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"INSERT INTO events (name, description, "date", "time", location, category_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {EVENT_COLUMNS}"#
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.date)
        .bind(input.time)
        .bind(&input.location)
        .bind(input.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "category"))?;
        Ok(event)
    }

    async fn update(&self, id: i64, input: EventInput) -> RepoResult<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"UPDATE events
               SET name = $1,
                   description = $2,
                   "date" = $3,
                   "time" = $4,
                   location = $5,
                   category_id = $6
               WHERE id = $7
               RETURNING {EVENT_COLUMNS}"#
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.date)
        .bind(input.time)
        .bind(&input.location)
        .bind(input.category_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "category"))?
        .ok_or(RepoError::NotFound { entity: "Event", id })?;
        Ok(event)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        // event_participants rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
