//! Filters and orderings for the teacher's list views

use crate::baas::{Absence, AbsenceStatus, Role, RosterEntry, TeacherEntry};
use crate::report::weekly::nulls_last;
use chrono::NaiveDate;
use std::cmp::Ordering;

fn name_matches(name: Option<&str>, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    needle.is_empty() || name.unwrap_or_default().to_lowercase().contains(&needle)
}

fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending { ordering } else { ordering.reverse() }
}

/// Student roster ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudentSort {
    #[default]
    Approved,
    ClassNo,
    StudentNo,
}

/// Visible students matching `search`, ordered by `key`.
/// Missing class or student numbers sort last in ascending order.
pub fn filter_students(
    profiles: &[RosterEntry],
    search: &str,
    key: StudentSort,
    ascending: bool,
) -> Vec<RosterEntry> {
    let mut list: Vec<RosterEntry> = profiles
        .iter()
        .filter(|p| p.role == Role::Student && !p.is_hidden)
        .filter(|p| name_matches(p.name.as_deref(), search))
        .cloned()
        .collect();

    list.sort_by(|a, b| match key {
        StudentSort::Approved => directed(a.approved.cmp(&b.approved), ascending),
        StudentSort::ClassNo => directed(nulls_last(a.class_no, b.class_no), ascending),
        StudentSort::StudentNo => directed(nulls_last(a.student_no, b.student_no), ascending),
    });
    list
}

/// Ids of the unapproved students in a filtered list, for bulk approval
pub fn pending_ids(students: &[RosterEntry]) -> Vec<String> {
    students
        .iter()
        .filter(|s| !s.approved)
        .map(|s| s.id.clone())
        .collect()
}

/// Headcounts for the teacher list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeacherCounts {
    pub total: usize,
    pub approved: usize,
    pub revoked: usize,
}

/// Current teachers, plus former ones when `include_revoked` is set
pub fn teacher_candidates(rows: &[TeacherEntry], include_revoked: bool) -> Vec<TeacherEntry> {
    rows.iter()
        .filter(|t| t.role == Role::Teacher || (include_revoked && t.is_revoked()))
        .cloned()
        .collect()
}

pub fn teacher_counts(candidates: &[TeacherEntry]) -> TeacherCounts {
    TeacherCounts {
        total: candidates.len(),
        approved: candidates.iter().filter(|t| t.approved).count(),
        revoked: candidates.iter().filter(|t| t.is_revoked()).count(),
    }
}

/// Absence list ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbsenceSort {
    #[default]
    Date,
    CreatedAt,
    Status,
    Name,
}

/// Criteria for the teacher's absence list
#[derive(Debug, Clone, Default)]
pub struct AbsenceFilter {
    pub status: Option<AbsenceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: String,
}

impl AbsenceFilter {
    pub fn matches(&self, absence: &Absence) -> bool {
        self.status.is_none_or(|s| s == absence.status)
            && self.from.is_none_or(|from| absence.date >= from)
            && self.to.is_none_or(|to| absence.date <= to)
            && name_matches(absence.student_name.as_deref(), &self.search)
    }
}

pub fn filter_absences(
    rows: &[Absence],
    filter: &AbsenceFilter,
    key: AbsenceSort,
    ascending: bool,
) -> Vec<Absence> {
    let mut list: Vec<Absence> = rows.iter().filter(|a| filter.matches(a)).cloned().collect();

    list.sort_by(|a, b| {
        let ordering = match key {
            AbsenceSort::Date => a.date.cmp(&b.date),
            AbsenceSort::CreatedAt => a.created_at.cmp(&b.created_at),
            AbsenceSort::Status => a.status.as_str().cmp(b.status.as_str()),
            AbsenceSort::Name => a.student_name.cmp(&b.student_name),
        };
        directed(ordering, ascending)
    });
    list
}
