//! Form definitions for the three entities.
//!
//! Each form mirrors the model's editable fields, describes its widgets for
//! the form page, and `clean()`s the raw submitted strings into a typed input
//! or a map of field-level errors. Checks that need the store (references,
//! email uniqueness) are done by the services.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::models::{
    category::{Category, CategoryInput},
    event::{Event, EventInput},
    participant::{ParticipantInput, ParticipantView},
};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_DATE: &str = "Enter a valid date.";
pub const INVALID_TIME: &str = "Enter a valid time.";

/// `field -> messages`, ordered by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub fn add_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}

/// Merges `validator` output, skipping fields that already failed the
/// required check so an empty field reports a single message.
fn merge(errors: &mut FieldErrors, result: Result<(), ValidationErrors>) {
    let Err(failures) = result else {
        return;
    };
    for (field, field_errors) in failures.field_errors() {
        let field = field.to_string();
        if errors.contains_key(&field) {
            continue;
        }
        for err in field_errors.iter() {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string());
            add_error(errors, &field, message);
        }
    }
}

fn require(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.is_empty() {
        add_error(errors, field, REQUIRED);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Widget {
    TextInput,
    Textarea { rows: u8 },
    EmailInput,
    DateInput,
    TimeInput,
    Select,
    SelectMultiple,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub widget: Widget,
    pub required: bool,
}

const fn field(name: &'static str, label: &'static str, widget: Widget, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        label,
        widget,
        required,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: i64,
    pub label: String,
}

/// Everything a form template needs: which fields to draw, their current
/// values, the options of select widgets, and any errors to show.
#[derive(Debug, Clone, Serialize)]
pub struct FormPage {
    pub model_name: &'static str,
    /// Set when editing an existing record.
    pub object_id: Option<i64>,
    pub fields: Vec<FieldSpec>,
    pub values: serde_json::Value,
    pub choices: BTreeMap<&'static str, Vec<Choice>>,
    pub errors: FieldErrors,
}

impl FormPage {
    pub fn new<F: Serialize>(model_name: &'static str, fields: &[FieldSpec], values: &F) -> Self {
        Self {
            model_name,
            object_id: None,
            fields: fields.to_vec(),
            values: serde_json::to_value(values).unwrap_or_default(),
            choices: BTreeMap::new(),
            errors: FieldErrors::new(),
        }
    }

    pub fn for_object(mut self, id: Option<i64>) -> Self {
        self.object_id = id;
        self
    }

    pub fn with_choices(mut self, field: &'static str, choices: Vec<Choice>) -> Self {
        self.choices.insert(field, choices);
        self
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self
    }
}

// ── Category ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CategoryForm {
    #[serde(default)]
    #[validate(length(max = 100, message = "Ensure this value has at most 100 characters."))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CategoryForm {
    pub const MODEL_NAME: &'static str = "Category";
    pub const FIELDS: &'static [FieldSpec] = &[
        field("name", "Name", Widget::TextInput, true),
        field("description", "Description", Widget::Textarea { rows: 3 }, false),
    ];

    pub fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            description: category.description.clone(),
        }
    }

    pub fn clean(&self) -> Result<CategoryInput, FieldErrors> {
        let cleaned = Self {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
        };

        let mut errors = FieldErrors::new();
        require(&mut errors, "name", &cleaned.name);
        merge(&mut errors, cleaned.validate());
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CategoryInput {
            name: cleaned.name,
            description: cleaned.description,
        })
    }
}

// ── Event ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EventForm {
    #[serde(default)]
    #[validate(length(max = 200, message = "Ensure this value has at most 200 characters."))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this value has at most 255 characters."))]
    pub location: String,
    /// Category id, or empty for none.
    #[serde(default)]
    pub category: String,
}

impl EventForm {
    pub const MODEL_NAME: &'static str = "Event";
    pub const FIELDS: &'static [FieldSpec] = &[
        field("name", "Name", Widget::TextInput, true),
        field("description", "Description", Widget::Textarea { rows: 4 }, false),
        field("date", "Date", Widget::DateInput, true),
        field("time", "Time", Widget::TimeInput, true),
        field("location", "Location", Widget::TextInput, true),
        field("category", "Category", Widget::Select, false),
    ];

    pub fn from_event(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            description: event.description.clone(),
            date: event.date.format("%Y-%m-%d").to_string(),
            time: event.time.format("%H:%M").to_string(),
            location: event.location.clone(),
            category: event.category_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }

    /// Field-level cleaning. Whether the category exists is checked by the caller.
    pub fn clean(&self) -> Result<EventInput, FieldErrors> {
        let cleaned = Self {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            date: self.date.trim().to_string(),
            time: self.time.trim().to_string(),
            location: self.location.trim().to_string(),
            category: self.category.trim().to_string(),
        };

        let mut errors = FieldErrors::new();
        require(&mut errors, "name", &cleaned.name);
        require(&mut errors, "date", &cleaned.date);
        require(&mut errors, "time", &cleaned.time);
        require(&mut errors, "location", &cleaned.location);
        merge(&mut errors, cleaned.validate());

        let date = parse_date(&cleaned.date);
        if date.is_none() && !cleaned.date.is_empty() {
            add_error(&mut errors, "date", INVALID_DATE);
        }
        let time = parse_time(&cleaned.time);
        if time.is_none() && !cleaned.time.is_empty() {
            add_error(&mut errors, "time", INVALID_TIME);
        }
        let category_id = if cleaned.category.is_empty() {
            None
        } else {
            match cleaned.category.parse::<i64>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    add_error(&mut errors, "category", INVALID_CHOICE);
                    None
                }
            }
        };

        match (date, time) {
            (Some(date), Some(time)) if errors.is_empty() => Ok(EventInput {
                name: cleaned.name,
                description: cleaned.description,
                date,
                time,
                location: cleaned.location,
                category_id,
            }),
            _ => Err(errors),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

// ── Participant ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ParticipantForm {
    #[serde(default)]
    #[validate(length(max = 100, message = "Ensure this value has at most 100 characters."))]
    pub name: String,
    #[serde(default)]
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this value has at most 254 characters.")
    )]
    pub email: String,
    /// Event ids, one per repeated `events` key.
    #[serde(default)]
    pub events: Vec<String>,
}

impl ParticipantForm {
    pub const MODEL_NAME: &'static str = "Participant";
    pub const FIELDS: &'static [FieldSpec] = &[
        field("name", "Name", Widget::TextInput, true),
        field("email", "Email", Widget::EmailInput, true),
        field("events", "Events", Widget::SelectMultiple, false),
    ];

    pub fn from_view(view: &ParticipantView) -> Self {
        Self {
            name: view.participant.name.clone(),
            email: view.participant.email.clone(),
            events: view.events.iter().map(|e| e.id.to_string()).collect(),
        }
    }

    /// Field-level cleaning. Event existence and email uniqueness are checked
    /// by the caller.
    pub fn clean(&self) -> Result<ParticipantInput, FieldErrors> {
        let cleaned = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            events: self
                .events
                .iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        };

        let mut errors = FieldErrors::new();
        require(&mut errors, "name", &cleaned.name);
        require(&mut errors, "email", &cleaned.email);
        merge(&mut errors, cleaned.validate());

        let mut event_ids = Vec::with_capacity(cleaned.events.len());
        for raw in &cleaned.events {
            match raw.parse::<i64>() {
                Ok(id) if id > 0 => {
                    if !event_ids.contains(&id) {
                        event_ids.push(id);
                    }
                }
                _ => {
                    add_error(
                        &mut errors,
                        "events",
                        format!("Select a valid choice. {raw} is not one of the available choices."),
                    );
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ParticipantInput {
            name: cleaned.name,
            email: cleaned.email,
            event_ids,
        })
    }
}
