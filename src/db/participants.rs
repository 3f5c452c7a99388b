use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::constraint_error;
use crate::{
    error::{RepoError, RepoResult},
    models::{
        event::Event,
        participant::{Participant, ParticipantInput, ParticipantView},
    },
    repository::ParticipantRepository,
};

#[derive(FromRow)]
struct Registration {
    participant_id: i64,
    #[sqlx(flatten)]
    event: Event,
}

pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_events(&self, participants: Vec<Participant>) -> RepoResult<Vec<ParticipantView>> {
        if participants.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = participants.iter().map(|p| p.id).collect();
        let registrations = sqlx::query_as::<_, Registration>(
            r#"SELECT ep.participant_id, e.id, e.name, e.description, e."date", e."time",
                      e.location, e.category_id
               FROM event_participants ep
               JOIN events e ON e.id = ep.event_id
               WHERE ep.participant_id = ANY($1)
               ORDER BY e."date", e."time", e.name COLLATE "C", e.id"#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut by_participant: HashMap<i64, Vec<Event>> = HashMap::new();
        for r in registrations {
            by_participant.entry(r.participant_id).or_default().push(r.event);
        }

        Ok(participants
            .into_iter()
            .map(|participant| ParticipantView {
                events: by_participant.remove(&participant.id).unwrap_or_default(),
                participant,
            })
            .collect())
    }

    /// Replace the participant's registrations: drop the current set, then
    /// attach the given events.
    async fn register(
        tx: &mut Transaction<'_, Postgres>,
        participant_id: i64,
        event_ids: &[i64],
    ) -> RepoResult<()> {
        sqlx::query("DELETE FROM event_participants WHERE participant_id = $1")
            .bind(participant_id)
            .execute(&mut **tx)
            .await?;
        if !event_ids.is_empty() {
            sqlx::query(
                "INSERT INTO event_participants (event_id, participant_id)
                 SELECT event_id, $2 FROM UNNEST($1::BIGINT[]) AS event_id",
            )
            .bind(event_ids)
            .bind(participant_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| constraint_error(e, "events"))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<ParticipantView>> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT id, name, email FROM participants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match participant {
            None => Ok(None),
            Some(p) => Ok(self.with_events(vec![p]).await?.pop()),
        }
    }

    async fn find_all(&self) -> RepoResult<Vec<ParticipantView>> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT id, name, email FROM participants ORDER BY name COLLATE \"C\", id",
        )
        .fetch_all(&self.pool)
        .await?;
        self.with_events(participants).await
    }

    async fn count(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT id, name, email FROM participants WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(participant)
    }

    async fn create(&self, input: ParticipantInput) -> RepoResult<Participant> {
        let mut tx = self.pool.begin().await?;
        let participant = sqlx::query_as::<_, Participant>(
            "INSERT INTO participants (name, email)
             VALUES ($1, $2)
             RETURNING id, name, email",
        )
        .bind(&input.name)
        .bind(&input.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "email"))?;

        Self::register(&mut tx, participant.id, &input.event_ids).await?;
        tx.commit().await?;
        Ok(participant)
    }

    async fn update(&self, id: i64, input: ParticipantInput) -> RepoResult<Participant> {
        let mut tx = self.pool.begin().await?;
        let participant = sqlx::query_as::<_, Participant>(
            "UPDATE participants
             SET name = $1,
                 email = $2
             WHERE id = $3
             RETURNING id, name, email",
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "email"))?
        .ok_or(RepoError::NotFound { entity: "Participant", id })?;

        Self::register(&mut tx, id, &input.event_ids).await?;
        tx.commit().await?;
        Ok(participant)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
