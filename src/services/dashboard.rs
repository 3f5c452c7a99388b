use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    error::RepoResult,
    models::event::EventView,
    query::{EventPredicate, EventQuery},
    repository::{CategoryRepository, EventRepository, ParticipantRepository},
};

/// Which events the dashboard lists below its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardFilter {
    Total,
    Upcoming,
    Past,
    Today,
}

impl DashboardFilter {
    /// Unknown or missing keywords select `Today`.
    pub fn from_keyword(keyword: Option<&str>) -> Self {
        match keyword {
            Some("total") => DashboardFilter::Total,
            Some("upcoming") => DashboardFilter::Upcoming,
            Some("past") => DashboardFilter::Past,
            _ => DashboardFilter::Today,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardFilter::Total => "total",
            DashboardFilter::Upcoming => "upcoming",
            DashboardFilter::Past => "past",
            DashboardFilter::Today => "today",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_categories: i64,
    pub total_participants: i64,
    pub total_events: i64,
    pub upcoming_events_count: i64,
    pub past_events_count: i64,
    pub events_today: Vec<EventView>,
    pub events_list: Vec<EventView>,
    /// The keyword as requested, `"today"` when none was given.
    pub filter_type: String,
}

fn upcoming(today: NaiveDate) -> EventQuery {
    EventQuery::all().with(EventPredicate::DateOnOrAfter(today))
}

fn past(today: NaiveDate) -> EventQuery {
    EventQuery::all().with(EventPredicate::DateBefore(today))
}

pub struct DashboardService;

impl DashboardService {
    /// Counters and event lists for the organizer dashboard as of `today`.
    /// "Upcoming" includes today's events.
    pub async fn summary(
        categories: &dyn CategoryRepository,
        events: &dyn EventRepository,
        participants: &dyn ParticipantRepository,
        today: NaiveDate,
        keyword: Option<&str>,
    ) -> RepoResult<DashboardSummary> {
        let total_categories = categories.count().await?;
        let total_participants = participants.count().await?;
        let total_events = events.count(&EventQuery::all()).await?;
        let upcoming_events_count = events.count(&upcoming(today)).await?;
        let past_events_count = events.count(&past(today)).await?;

        let events_today = events
            .find_all(&EventQuery::all().with(EventPredicate::DateOn(today)))
            .await?;

        let events_list = match DashboardFilter::from_keyword(keyword) {
            DashboardFilter::Total => events.find_all(&EventQuery::all()).await?,
            DashboardFilter::Upcoming => events.find_all(&upcoming(today)).await?,
            DashboardFilter::Past => events.find_all(&past(today)).await?,
            DashboardFilter::Today => events_today.clone(),
        };

        Ok(DashboardSummary {
            total_categories,
            total_participants,
            total_events,
            upcoming_events_count,
            past_events_count,
            events_today,
            events_list,
            filter_type: keyword.unwrap_or("today").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::Event;
    use crate::repository::{
        InMemoryStore, MockCategoryRepository, MockEventRepository, MockParticipantRepository,
    };
    use chrono::{Duration, NaiveTime};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
    }

    fn view(id: i64, date: NaiveDate) -> EventView {
        EventView {
            event: Event {
                id,
                name: format!("event-{id}"),
                description: String::new(),
                date,
                time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                location: "Hall".into(),
                category_id: None,
            },
            category: None,
            participants: vec![],
        }
    }

    /// Mock store over events dated yesterday, today and tomorrow.
    fn three_day_store() -> (
        MockCategoryRepository,
        MockEventRepository,
        MockParticipantRepository,
    ) {
        let fixtures = vec![
            view(1, today() - Duration::days(1)),
            view(2, today()),
            view(3, today() + Duration::days(1)),
        ];

        let mut events = MockEventRepository::new();
        let for_count = fixtures.clone();
        events
            .expect_count()
            .returning(move |q| Ok(for_count.iter().filter(|v| q.matches(&v.event)).count() as i64));
        events.expect_find_all().returning(move |q| {
            Ok(fixtures.iter().filter(|v| q.matches(&v.event)).cloned().collect())
        });

        let mut participants = MockParticipantRepository::new();
        participants.expect_count().returning(|| Ok(5));

        let mut categories = MockCategoryRepository::new();
        categories.expect_count().returning(|| Ok(2));

        (categories, events, participants)
    }

    fn ids(list: &[EventView]) -> Vec<i64> {
        list.iter().map(|v| v.id()).collect()
    }

    #[tokio::test]
    async fn counts_split_around_today() {
        let (categories, events, participants) = three_day_store();
        let summary = DashboardService::summary(&categories, &events, &participants, today(), None)
            .await
            .unwrap();

        assert_eq!(summary.total_categories, 2);
        assert_eq!(summary.total_participants, 5);
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.upcoming_events_count, 2);
        assert_eq!(summary.past_events_count, 1);
        assert_eq!(ids(&summary.events_today), vec![2]);
        assert_eq!(summary.filter_type, "today");
    }

    #[tokio::test]
    async fn keyword_selects_the_list() {
        let cases = [
            (Some("total"), vec![1, 2, 3]),
            (Some("upcoming"), vec![2, 3]),
            (Some("past"), vec![1]),
            (Some("today"), vec![2]),
        ];
        for (keyword, expected) in cases {
            let (categories, events, participants) = three_day_store();
            let summary = DashboardService::summary(&categories, &events, &participants, today(), keyword)
                .await
                .unwrap();
            assert_eq!(ids(&summary.events_list), expected, "filter {keyword:?}");
        }
    }

    #[tokio::test]
    async fn unknown_keywords_fall_back_to_today() {
        for keyword in [None, Some(""), Some("TOTAL"), Some("yesterday"), Some("past ")] {
            let (categories, events, participants) = three_day_store();
            let summary = DashboardService::summary(&categories, &events, &participants, today(), keyword)
                .await
                .unwrap();
            assert_eq!(summary.events_list, summary.events_today, "filter {keyword:?}");
        }
    }

    #[tokio::test]
    async fn unknown_keyword_is_echoed_back() {
        let (categories, events, participants) = three_day_store();
        let summary = DashboardService::summary(&categories, &events, &participants, today(), Some("weekly"))
            .await
            .unwrap();
        assert_eq!(summary.filter_type, "weekly");
    }

    #[tokio::test]
    async fn empty_store_renders() {
        let store = InMemoryStore::new();
        let summary = DashboardService::summary(&store, &store, &store, today(), Some("total"))
            .await
            .unwrap();
        assert_eq!(summary.total_categories, 0);
        assert_eq!(summary.total_events, 0);
        assert!(summary.events_list.is_empty());
    }
}
