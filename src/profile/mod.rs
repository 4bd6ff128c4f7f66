//! Profile module
//!
//! Lookup of the signed-in identity's profile, the user's own edits, and the
//! teacher-only approval and role writers.

pub mod admin;
pub mod store;

pub use admin::{ApprovalState, ProfileAdmin};
pub use store::{BaasProfileStore, ProfileEdit, ProfileLookup, ProfileStore};
