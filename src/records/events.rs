//! Study activity records

use crate::baas::{BaasClient, Category, NewEvent, Query, StudyEvent};
use crate::error::{AppError, StoreError, StoreResult, ValidationError};
use crate::report::Week;
use crate::util::{parse_positive_int, required_text};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument};

const EVENTS: &str = "events";

/// Raw form input for a new activity
#[derive(Debug, Clone, Default)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: Option<NaiveDate>,
    pub minutes: String,
}

impl EventForm {
    /// Validate into an insert payload owned by `owner_id`
    pub fn validate(&self, owner_id: &str) -> Result<NewEvent, ValidationError> {
        let title = required_text("title", &self.title)?;
        let category = Category::try_parse(self.category.trim())
            .ok_or_else(|| ValidationError::UnknownCategory(self.category.clone()))?;
        let date = self.date.ok_or(ValidationError::Empty { field: "date" })?;
        let duration_min = parse_positive_int("duration_min", &self.minutes)?;
        let description = Some(self.description.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(NewEvent {
            owner_id: owner_id.to_string(),
            title,
            description,
            category: category.stored_value().to_string(),
            date,
            duration_min,
        })
    }
}

/// Access to the events table
pub struct EventStore {
    client: Arc<BaasClient>,
}

impl EventStore {
    pub fn new(client: Arc<BaasClient>) -> Self {
        Self { client }
    }

    /// One owner's activities in a week, by date then creation time
    pub async fn list_week(&self, owner_id: &str, week: Week) -> StoreResult<Vec<StudyEvent>> {
        let (start, end) = week.iso_bounds();
        let query = Query::new()
            .select(StudyEvent::COLUMNS)
            .eq("owner_id", owner_id)
            .gte("date", start)
            .lte("date", end)
            .order("date", true)
            .order("created_at", true);

        self.client.select(EVENTS, &query).await
    }

    /// Every owner's activities in an inclusive date range, aggregation columns only
    pub async fn list_range(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<StudyEvent>> {
        let query = Query::new()
            .select(StudyEvent::AUDIT_COLUMNS)
            .gte("date", start.format("%Y-%m-%d"))
            .lte("date", end.format("%Y-%m-%d"));

        self.client.select(EVENTS, &query).await
    }

    /// Validate and store a new activity
    #[instrument(skip(self, form))]
    pub async fn insert(&self, owner_id: &str, form: &EventForm) -> Result<StudyEvent, AppError> {
        let event = form.validate(owner_id)?;
        let stored: Vec<StudyEvent> = self.client.insert(EVENTS, &event).await?;

        let stored = stored
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidResponse("insert returned no row".to_string()))?;

        info!(event = %stored.id, date = %stored.date, "Activity logged");
        Ok(stored)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, event_id: &str) -> StoreResult<()> {
        let filter = Query::new().eq("id", event_id);
        self.client.delete(EVENTS, &filter).await
    }
}
