//! Report module
//!
//! Pure computations over rows already fetched: week arithmetic, weekly
//! minute totals and the orderings used by the teacher's list views.

pub mod roster;
pub mod week;
pub mod weekly;

pub use roster::{
    AbsenceFilter, AbsenceSort, StudentSort, TeacherCounts, filter_absences, filter_students,
    pending_ids, teacher_candidates, teacher_counts,
};
pub use week::Week;
pub use weekly::{
    AuditRow, AuditSort, MinuteTotals, aggregate, audit_rows, format_hours, format_minutes,
    group_by_date, sort_rows,
};
