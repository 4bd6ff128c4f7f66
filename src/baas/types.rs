//! Table row types
//!
//! Rows of the `profiles`, `events` and `absences` tables as the REST
//! endpoints return them. Nullable columns the application treats as having a
//! default (role, approved, is_hidden) are normalized during deserialization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Role of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authorization record of one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub approved: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub grade: Option<u32>,
    #[serde(default)]
    pub class_no: Option<u32>,
    #[serde(default)]
    pub student_no: Option<u32>,
}

impl Profile {
    /// Columns requested for the cached profile
    pub const COLUMNS: &'static str = "id, role, approved, name, grade, class_no, student_no";
}

/// Profile row as shown in the teacher's student roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub grade: Option<u32>,
    #[serde(default)]
    pub class_no: Option<u32>,
    #[serde(default)]
    pub student_no: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub approved: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_hidden: bool,
}

impl RosterEntry {
    pub const COLUMNS: &'static str =
        "id, name, grade, class_no, student_no, approved, role, is_hidden";
}

/// Profile row as shown in the teacher list, with role-change audit columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherEntry {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub approved: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub role_updated_by: Option<String>,
    #[serde(default)]
    pub role_updated_at: Option<DateTime<Utc>>,
    /// Name of the teacher who last changed the role (joined client-side)
    #[serde(skip_deserializing)]
    pub actor_name: Option<String>,
}

impl TeacherEntry {
    pub const COLUMNS: &'static str =
        "id, name, role, approved, created_at, role_updated_by, role_updated_at";

    /// A former teacher: demoted to student with a role change on record
    pub fn is_revoked(&self) -> bool {
        self.role == Role::Student && self.role_updated_at.is_some()
    }
}

/// Activity categories students log time against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    BasicSkills,
    CareerExploration,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::BasicSkills, Category::CareerExploration];

    /// Value stored in the `category` column
    pub const fn stored_value(&self) -> &'static str {
        match self {
            Category::BasicSkills => "기초 역량 강화",
            Category::CareerExploration => "진로 탐색",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.stored_value() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stored_value())
    }
}

/// A logged study activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyEvent {
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(deserialize_with = "id_as_string")]
    pub owner_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub duration_min: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl StudyEvent {
    pub const COLUMNS: &'static str =
        "id, owner_id, title, description, category, date, duration_min, created_at";

    /// Columns needed for aggregation only
    pub const AUDIT_COLUMNS: &'static str = "owner_id, date, category, duration_min";

    /// Logged minutes; missing or negative durations count as zero
    pub fn minutes(&self) -> u64 {
        self.duration_min.map_or(0, |m| m.max(0) as u64)
    }
}

/// Insert payload for a study activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEvent {
    pub owner_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub date: NaiveDate,
    pub duration_min: u32,
}

/// Review state of an absence request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsenceStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl AbsenceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AbsenceStatus::Pending => "pending",
            AbsenceStatus::Approved => "approved",
            AbsenceStatus::Rejected => "rejected",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AbsenceStatus::Pending),
            "approved" => Some(AbsenceStatus::Approved),
            "rejected" => Some(AbsenceStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for AbsenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An absence request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(deserialize_with = "id_as_string")]
    pub student_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub reason: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: AbsenceStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Student's display name (joined client-side for teachers)
    #[serde(skip_deserializing)]
    pub student_name: Option<String>,
}

impl Absence {
    pub const COLUMNS: &'static str = "id, student_id, date, reason, status, created_at";
}

/// Insert payload for an absence request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAbsence {
    pub student_id: String,
    pub date: NaiveDate,
    pub reason: String,
    pub status: AbsenceStatus,
}

/// `{id, name}` projection used for client-side joins
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NameRef {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Treat an explicit `null` the same as a missing column.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row ids are uuids in some tables and bigints in others.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_nulls_normalize() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "u-1",
            "role": null,
            "approved": null,
            "name": "Kim",
            "grade": 2,
            "class_no": null,
            "student_no": 20314
        }))
        .unwrap();

        assert_eq!(profile.role, Role::Student);
        assert!(!profile.approved);
        assert_eq!(profile.class_no, None);
        assert_eq!(profile.student_no, Some(20314));
    }

    #[test]
    fn test_numeric_ids_become_strings() {
        let absence: Absence = serde_json::from_value(json!({
            "id": 42,
            "student_id": "u-1",
            "date": "2025-03-04",
            "reason": "clinic",
            "status": "approved",
            "created_at": "2025-03-01T09:30:00+00:00"
        }))
        .unwrap();

        assert_eq!(absence.id, "42");
        assert_eq!(absence.status, AbsenceStatus::Approved);
        assert!(absence.created_at.is_some());
        assert!(absence.student_name.is_none());
    }

    #[test]
    fn test_event_minutes_clamp() {
        let mut event: StudyEvent = serde_json::from_value(json!({
            "owner_id": "u-1",
            "date": "2025-03-04",
            "category": "진로 탐색",
            "duration_min": 45
        }))
        .unwrap();
        assert_eq!(event.minutes(), 45);

        event.duration_min = Some(-10);
        assert_eq!(event.minutes(), 0);

        event.duration_min = None;
        assert_eq!(event.minutes(), 0);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(
            Category::try_parse("기초 역량 강화"),
            Some(Category::BasicSkills)
        );
        assert_eq!(
            Category::try_parse("진로 탐색"),
            Some(Category::CareerExploration)
        );
        assert_eq!(Category::try_parse("other"), None);
    }

    #[test]
    fn test_revoked_teacher() {
        let entry: TeacherEntry = serde_json::from_value(json!({
            "id": "t-1",
            "name": "Lee",
            "role": "student",
            "approved": true,
            "role_updated_by": "t-2",
            "role_updated_at": "2025-02-01T00:00:00Z"
        }))
        .unwrap();
        assert!(entry.is_revoked());

        let active = TeacherEntry {
            role: Role::Teacher,
            ..entry
        };
        assert!(!active.is_revoked());
    }
}
