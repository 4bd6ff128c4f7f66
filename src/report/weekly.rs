//! Weekly minute totals and the teacher's audit table

use crate::baas::{Category, Role, RosterEntry, StudyEvent};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Minutes logged, overall and per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinuteTotals {
    pub total: u64,
    pub basic: u64,
    pub career: u64,
}

impl MinuteTotals {
    /// Count one event. Categories other than the two known ones only
    /// contribute to the total.
    pub fn add(&mut self, event: &StudyEvent) {
        let minutes = event.minutes();
        self.total += minutes;
        match Category::try_parse(&event.category) {
            Some(Category::BasicSkills) => self.basic += minutes,
            Some(Category::CareerExploration) => self.career += minutes,
            None => {}
        }
    }

    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a StudyEvent>) -> Self {
        let mut totals = Self::default();
        for event in events {
            totals.add(event);
        }
        totals
    }

    fn get(&self, key: AuditSort) -> u64 {
        match key {
            AuditSort::Total => self.total,
            AuditSort::Basic => self.basic,
            AuditSort::Career => self.career,
        }
    }
}

/// Sum minutes per owner
pub fn aggregate(events: &[StudyEvent]) -> HashMap<String, MinuteTotals> {
    let mut by_owner: HashMap<String, MinuteTotals> = HashMap::new();
    for event in events.iter().filter(|e| !e.owner_id.is_empty()) {
        by_owner.entry(event.owner_id.clone()).or_default().add(event);
    }
    by_owner
}

/// Column the audit table is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditSort {
    #[default]
    Total,
    Basic,
    Career,
}

impl FromStr for AuditSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "total" => Ok(AuditSort::Total),
            "basic" => Ok(AuditSort::Basic),
            "career" => Ok(AuditSort::Career),
            other => Err(format!("unknown sort key '{}' (total, basic, career)", other)),
        }
    }
}

impl fmt::Display for AuditSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuditSort::Total => "total",
            AuditSort::Basic => "basic",
            AuditSort::Career => "career",
        })
    }
}

/// One student's line in the weekly audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub id: String,
    pub name: String,
    pub class_no: Option<u32>,
    pub student_no: Option<u32>,
    pub minutes: MinuteTotals,
}

/// Every student, with their totals for the week (zero if nothing was logged)
pub fn audit_rows(profiles: &[RosterEntry], events: &[StudyEvent]) -> Vec<AuditRow> {
    let by_owner = aggregate(events);

    profiles
        .iter()
        .filter(|p| p.role == Role::Student)
        .map(|p| AuditRow {
            id: p.id.clone(),
            name: p.name.clone().unwrap_or_default(),
            class_no: p.class_no,
            student_no: p.student_no,
            minutes: by_owner.get(&p.id).copied().unwrap_or_default(),
        })
        .collect()
}

/// Order by the chosen column; ties fall back to class, number, then name
/// regardless of direction. A missing class or number counts as 0.
pub fn sort_rows(rows: &mut [AuditRow], key: AuditSort, ascending: bool) {
    rows.sort_by(|a, b| {
        let primary = a.minutes.get(key).cmp(&b.minutes.get(key));
        let primary = if ascending { primary } else { primary.reverse() };

        primary
            .then_with(|| a.class_no.unwrap_or(0).cmp(&b.class_no.unwrap_or(0)))
            .then_with(|| a.student_no.unwrap_or(0).cmp(&b.student_no.unwrap_or(0)))
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub(crate) fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `45m`, `2h`, `1h 30m`
pub fn format_minutes(minutes: u64) -> String {
    let (hours, rest) = (minutes / 60, minutes % 60);
    match (hours, rest) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Decimal hours to one place: `1.5h`, `2h`
pub fn format_hours(minutes: u64) -> String {
    let tenths = (minutes * 10 + 30) / 60;
    if tenths % 10 == 0 {
        format!("{}h", tenths / 10)
    } else {
        format!("{}.{}h", tenths / 10, tenths % 10)
    }
}

/// A week's events grouped by ISO date, in date order
pub fn group_by_date(events: &[StudyEvent]) -> BTreeMap<String, Vec<&StudyEvent>> {
    let mut days: BTreeMap<String, Vec<&StudyEvent>> = BTreeMap::new();
    for event in events {
        days.entry(event.date.format("%Y-%m-%d").to_string())
            .or_default()
            .push(event);
    }
    days
}
