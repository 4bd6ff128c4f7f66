//! Privileged profile writers
//!
//! Approval and role changes performed by teachers. The client does not check
//! who is calling: the table policies on the backend decide whether a write
//! is allowed, and a refused or failed write is handed back to the caller
//! untouched. Nothing here retries.

use crate::baas::{BaasClient, NameRef, Query, Role, RosterEntry, TeacherEntry};
use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};

const PROFILES: &str = "profiles";

/// `{id, approved}` echo of an approval toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalState {
    pub id: String,
    pub approved: bool,
}

/// Teacher-only profile operations
pub struct ProfileAdmin {
    client: Arc<BaasClient>,
}

impl ProfileAdmin {
    pub fn new(client: Arc<BaasClient>) -> Self {
        Self { client }
    }

    /// Students waiting for approval, by grade, class and number
    pub async fn list_pending_students(&self) -> StoreResult<Vec<RosterEntry>> {
        let query = Query::new()
            .select(RosterEntry::COLUMNS)
            .eq("role", Role::Student)
            .eq("approved", false)
            .order("grade", true)
            .order("class_no", true)
            .order("student_no", true);

        self.client.select(PROFILES, &query).await
    }

    /// Every profile with roster columns; callers filter to what they show
    pub async fn list_profiles(&self) -> StoreResult<Vec<RosterEntry>> {
        let query = Query::new().select(RosterEntry::COLUMNS);
        self.client.select(PROFILES, &query).await
    }

    /// Profiles with role audit columns, newest first, with the name of
    /// whoever last changed each role
    pub async fn list_teachers(&self) -> StoreResult<Vec<TeacherEntry>> {
        let query = Query::new()
            .select(TeacherEntry::COLUMNS)
            .order("created_at", false);
        let mut rows: Vec<TeacherEntry> = self.client.select(PROFILES, &query).await?;

        let actor_ids: Vec<String> = rows
            .iter()
            .filter_map(|r| r.role_updated_by.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        if actor_ids.is_empty() {
            return Ok(rows);
        }

        let query = Query::new().select("id, name").is_in("id", &actor_ids);
        let actors: HashMap<String, Option<String>> = self
            .client
            .select::<NameRef>(PROFILES, &query)
            .await?
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect();

        for row in &mut rows {
            row.actor_name = row
                .role_updated_by
                .as_ref()
                .and_then(|id| actors.get(id).cloned().flatten());
        }

        Ok(rows)
    }

    /// Let a student in
    pub async fn approve(&self, profile_id: &str) -> StoreResult<ApprovalState> {
        self.set_approved(profile_id, true).await
    }

    /// Send a student back to the pending state
    pub async fn revoke(&self, profile_id: &str) -> StoreResult<ApprovalState> {
        self.set_approved(profile_id, false).await
    }

    #[instrument(skip(self))]
    async fn set_approved(&self, profile_id: &str, approved: bool) -> StoreResult<ApprovalState> {
        let filter = Query::new().eq("id", profile_id).select("id, approved");
        let state = single(
            self.client
                .update(PROFILES, &filter, &json!({ "approved": approved }))
                .await?,
            profile_id,
        )?;

        info!(profile = %profile_id, approved, "Approval changed");
        Ok(state)
    }

    /// Approve every listed profile that is still pending and not hidden.
    /// Returns the rows that actually changed.
    #[instrument(skip(self, profile_ids), fields(count = profile_ids.len()))]
    pub async fn approve_all(&self, profile_ids: &[String]) -> StoreResult<Vec<RosterEntry>> {
        if profile_ids.is_empty() {
            return Ok(Vec::new());
        }

        let filter = Query::new()
            .is_in("id", profile_ids)
            .eq("approved", false)
            .eq("is_hidden", false)
            .select(RosterEntry::COLUMNS);

        let updated: Vec<RosterEntry> = self
            .client
            .update(PROFILES, &filter, &json!({ "approved": true }))
            .await?;

        info!(approved = updated.len(), "Bulk approval applied");
        Ok(updated)
    }

    /// Change a profile's role, recording who did it.
    /// Granting the teacher role also approves the profile.
    #[instrument(skip(self))]
    pub async fn grant_role(
        &self,
        profile_id: &str,
        role: Role,
        actor_id: &str,
    ) -> StoreResult<RosterEntry> {
        let mut body = json!({
            "role": role,
            "role_updated_by": actor_id,
            "role_updated_at": Utc::now(),
        });
        if role == Role::Teacher {
            body["approved"] = json!(true);
        }

        let filter = Query::new().eq("id", profile_id).select(RosterEntry::COLUMNS);
        let entry = single(self.client.update(PROFILES, &filter, &body).await?, profile_id)?;

        info!(profile = %profile_id, role = %role, "Role granted");
        Ok(entry)
    }

    /// Demote a teacher back to student
    pub async fn revoke_role(&self, profile_id: &str, actor_id: &str) -> StoreResult<RosterEntry> {
        self.grant_role(profile_id, Role::Student, actor_id).await
    }

    /// Remove a student from the roster views for good
    #[instrument(skip(self))]
    pub async fn hide_student(&self, profile_id: &str) -> StoreResult<RosterEntry> {
        let filter = Query::new().eq("id", profile_id).select(RosterEntry::COLUMNS);
        single(
            self.client
                .update(PROFILES, &filter, &json!({ "is_hidden": true }))
                .await?,
            profile_id,
        )
    }
}

/// A targeted single-row write must have hit exactly that row
fn single<T>(rows: Vec<T>, profile_id: &str) -> StoreResult<T> {
    rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
        resource: format!("profile {}", profile_id),
    })
}
