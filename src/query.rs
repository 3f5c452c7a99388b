//! Composable event predicates.
//!
//! An [`EventQuery`] is a list of [`EventPredicate`]s joined with AND. The
//! same query is evaluated in memory by [`EventQuery::matches`] and rendered
//! to parameterized SQL by [`EventQuery::push_where`]; user input only ever
//! reaches Postgres as a bound parameter.

use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};

use crate::models::event::{Event, EventSearchParams};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPredicate {
    /// Case-insensitive substring match on name OR location.
    NameOrLocationContains(String),
    CategoryIs(i64),
    /// Inclusive on both ends.
    DateBetween(NaiveDate, NaiveDate),
    DateOn(NaiveDate),
    DateOnOrAfter(NaiveDate),
    DateBefore(NaiveDate),
}

impl EventPredicate {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            EventPredicate::NameOrLocationContains(text) => {
                let needle = text.to_lowercase();
                event.name.to_lowercase().contains(&needle)
                    || event.location.to_lowercase().contains(&needle)
            }
            EventPredicate::CategoryIs(id) => event.category_id == Some(*id),
            EventPredicate::DateBetween(start, end) => *start <= event.date && event.date <= *end,
            EventPredicate::DateOn(day) => event.date == *day,
            EventPredicate::DateOnOrAfter(day) => event.date >= *day,
            EventPredicate::DateBefore(day) => event.date < *day,
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            EventPredicate::NameOrLocationContains(text) => {
                // strpos keeps `%` and `_` in the search text literal
                qb.push("(strpos(lower(e.name), lower(")
                    .push_bind(text.clone())
                    .push(")) > 0 OR strpos(lower(e.location), lower(")
                    .push_bind(text.clone())
                    .push(")) > 0)");
            }
            EventPredicate::CategoryIs(id) => {
                qb.push("e.category_id = ").push_bind(*id);
            }
            EventPredicate::DateBetween(start, end) => {
                qb.push("e.\"date\" BETWEEN ")
                    .push_bind(*start)
                    .push(" AND ")
                    .push_bind(*end);
            }
            EventPredicate::DateOn(day) => {
                qb.push("e.\"date\" = ").push_bind(*day);
            }
            EventPredicate::DateOnOrAfter(day) => {
                qb.push("e.\"date\" >= ").push_bind(*day);
            }
            EventPredicate::DateBefore(day) => {
                qb.push("e.\"date\" < ").push_bind(*day);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    predicates: Vec<EventPredicate>,
}

impl EventQuery {
    /// Matches every event.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: EventPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[EventPredicate] {
        &self.predicates
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.predicates.iter().all(|p| p.matches(event))
    }

    /// Appends ` WHERE ...` to `qb` for a query aliasing `events` as `e`.
    /// Appends nothing when the query has no predicates.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(qb);
        }
    }
}

/// Typed form of the event list filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSearch {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl EventSearch {
    /// Parses the raw query string. Empty values count as absent; values
    /// that are present but malformed are rejected with a message. The
    /// search text is kept verbatim, surrounding spaces included.
    pub fn from_params(params: &EventSearchParams) -> Result<Self, String> {
        let category_id = match non_empty(&params.category) {
            None => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| format!("Invalid category id: {raw}"))?,
            ),
        };

        Ok(Self {
            search: params.search.clone().filter(|s| !s.is_empty()),
            category_id,
            start_date: parse_date("start_date", &params.start_date)?,
            end_date: parse_date("end_date", &params.end_date)?,
        })
    }

    /// Builds the conjunctive query for these filters. A date range is only
    /// applied when both bounds are present; a single bound is ignored.
    pub fn to_query(&self) -> EventQuery {
        let mut query = EventQuery::all();
        if let Some(text) = &self.search {
            query = query.with(EventPredicate::NameOrLocationContains(text.clone()));
        }
        if let Some(id) = self.category_id {
            query = query.with(EventPredicate::CategoryIs(id));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            query = query.with(EventPredicate::DateBetween(start, end));
        }
        query
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(field: &str, value: &Option<String>) -> Result<Option<NaiveDate>, String> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("Invalid {field}: {raw}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn event(name: &str, location: &str, date: &str, category_id: Option<i64>) -> Event {
        Event {
            id: 1,
            name: name.to_string(),
            description: String::new(),
            date: day(date),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            location: location.to_string(),
            category_id,
        }
    }

    fn params(search: &str, category: &str, start: &str, end: &str) -> EventSearchParams {
        let opt = |s: &str| Some(s.to_string());
        EventSearchParams {
            search: opt(search),
            category: opt(category),
            start_date: opt(start),
            end_date: opt(end),
        }
    }

    #[test]
    fn search_is_case_insensitive_on_name_and_location() {
        let q = EventQuery::all().with(EventPredicate::NameOrLocationContains("conf".into()));
        assert!(q.matches(&event("TechConf", "Berlin", "2025-03-01", None)));
        assert!(q.matches(&event("Meetup", "CONFERENCE hall", "2025-03-01", None)));
        assert!(!q.matches(&event("Meetup", "Berlin", "2025-03-01", None)));
    }

    #[test]
    fn empty_values_build_an_unfiltered_query() {
        let search = EventSearch::from_params(&params("", " ", "", "")).unwrap();
        assert_eq!(search, EventSearch::default());
        assert!(search.to_query().predicates().is_empty());
    }

    #[test]
    fn search_text_is_not_trimmed() {
        let search = EventSearch::from_params(&params("Tech ", "", "", "")).unwrap();
        assert_eq!(search.search.as_deref(), Some("Tech "));
        let q = search.to_query();
        assert!(q.matches(&event("Tech Talk", "Oslo", "2025-03-01", None)));
        assert!(!q.matches(&event("TechConf", "Oslo", "2025-03-01", None)));

        let q = EventSearch::from_params(&params(" ", "", "", "")).unwrap().to_query();
        assert!(q.matches(&event("Tech Talk", "Oslo", "2025-03-01", None)));
        assert!(q.matches(&event("TechConf", "Main hall", "2025-03-01", None)));
        assert!(!q.matches(&event("TechConf", "Oslo", "2025-03-01", None)));
    }

    #[test]
    fn one_sided_date_range_is_ignored() {
        let only_start = EventSearch::from_params(&params("conf", "3", "2025-01-01", "")).unwrap();
        let only_end = EventSearch::from_params(&params("conf", "3", "", "2025-01-31")).unwrap();
        let none = EventSearch::from_params(&params("conf", "3", "", "")).unwrap();

        assert_eq!(only_start.to_query(), none.to_query());
        assert_eq!(only_end.to_query(), none.to_query());
    }

    #[test]
    fn filters_compose_conjunctively() {
        let search =
            EventSearch::from_params(&params("conf", "3", "2025-01-01", "2025-01-31")).unwrap();
        let q = search.to_query();
        assert_eq!(
            q.predicates(),
            &[
                EventPredicate::NameOrLocationContains("conf".into()),
                EventPredicate::CategoryIs(3),
                EventPredicate::DateBetween(day("2025-01-01"), day("2025-01-31")),
            ]
        );

        assert!(q.matches(&event("TechConf", "Oslo", "2025-01-31", Some(3))));
        assert!(!q.matches(&event("TechConf", "Oslo", "2025-02-01", Some(3))));
        assert!(!q.matches(&event("TechConf", "Oslo", "2025-01-15", Some(4))));
        assert!(!q.matches(&event("TechConf", "Oslo", "2025-01-15", None)));
    }

    #[test]
    fn reversed_range_matches_nothing() {
        let q = EventQuery::all().with(EventPredicate::DateBetween(day("2025-02-01"), day("2025-01-01")));
        assert!(!q.matches(&event("a", "b", "2025-01-15", None)));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(EventSearch::from_params(&params("", "music", "", "")).is_err());
        assert!(EventSearch::from_params(&params("", "", "01/02/2025", "")).is_err());
    }

    #[test]
    fn sql_binds_every_value() {
        let q = EventSearch::from_params(&params("50%_off", "2", "2025-01-01", "2025-01-31"))
            .unwrap()
            .to_query();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM events e");
        q.push_where(&mut qb);
        let sql = qb.sql();
        assert!(!sql.contains("50%_off"));
        assert_eq!(
            sql,
            "SELECT 1 FROM events e WHERE (strpos(lower(e.name), lower($1)) > 0 OR \
             strpos(lower(e.location), lower($2)) > 0) AND e.category_id = $3 AND \
             e.\"date\" BETWEEN $4 AND $5"
        );
    }
}
