//! Records module
//!
//! Study activities and absence requests. Rows are scoped to their owner by
//! the backend's table policies; nothing here filters by caller.

pub mod absences;
pub mod events;

pub use absences::AbsenceStore;
pub use events::{EventForm, EventStore};
