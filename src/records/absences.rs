//! Absence requests

use crate::baas::{Absence, AbsenceStatus, BaasClient, NameRef, NewAbsence, Query};
use crate::error::{AppError, StoreError, StoreResult};
use crate::util::required_text;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};

const ABSENCES: &str = "absences";
const PROFILES: &str = "profiles";

/// Access to the absences table
pub struct AbsenceStore {
    client: Arc<BaasClient>,
}

impl AbsenceStore {
    pub fn new(client: Arc<BaasClient>) -> Self {
        Self { client }
    }

    /// A student's own requests, newest first
    pub async fn list_mine(&self, student_id: &str) -> StoreResult<Vec<Absence>> {
        let query = Query::new()
            .select(Absence::COLUMNS)
            .eq("student_id", student_id)
            .order("date", false);

        self.client.select(ABSENCES, &query).await
    }

    /// File a request. New requests always start out pending.
    #[instrument(skip(self, reason))]
    pub async fn submit(
        &self,
        student_id: &str,
        date: NaiveDate,
        reason: &str,
    ) -> Result<Absence, AppError> {
        let request = NewAbsence {
            student_id: student_id.to_string(),
            date,
            reason: required_text("reason", reason)?,
            status: AbsenceStatus::Pending,
        };

        let stored: Vec<Absence> = self.client.insert(ABSENCES, &request).await?;
        let stored = stored
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidResponse("insert returned no row".to_string()))?;

        info!(absence = %stored.id, %date, "Absence submitted");
        Ok(stored)
    }

    /// Every request with the student's name attached, newest first
    pub async fn list_all(&self) -> StoreResult<Vec<Absence>> {
        let query = Query::new()
            .select(Absence::COLUMNS)
            .order("created_at", false);
        let mut rows: Vec<Absence> = self.client.select(ABSENCES, &query).await?;

        let student_ids: Vec<String> = rows
            .iter()
            .map(|r| r.student_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        if student_ids.is_empty() {
            return Ok(rows);
        }

        let query = Query::new().select("id, name").is_in("id", &student_ids);
        let names: HashMap<String, Option<String>> = self
            .client
            .select::<NameRef>(PROFILES, &query)
            .await?
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect();

        for row in &mut rows {
            row.student_name = names.get(&row.student_id).cloned().flatten();
        }

        Ok(rows)
    }

    /// Review a request; only the status column is written
    #[instrument(skip(self))]
    pub async fn set_status(&self, absence_id: &str, status: AbsenceStatus) -> StoreResult<Absence> {
        let filter = Query::new().eq("id", absence_id).select(Absence::COLUMNS);
        let updated: Vec<Absence> = self
            .client
            .update(ABSENCES, &filter, &json!({ "status": status }))
            .await?;

        let updated = updated.into_iter().next().ok_or_else(|| StoreError::NotFound {
            resource: format!("absence {}", absence_id),
        })?;

        info!(absence = %absence_id, status = %status, "Absence reviewed");
        Ok(updated)
    }
}
