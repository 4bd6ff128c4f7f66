//! Access module
//!
//! Decides what a client may see from two facts about the signed-in user:
//! whether a teacher has approved them and which role they hold.
//!
//! ## Decision order
//!
//! ```text
//! no session → login
//! no profile → login
//! not approved → pending
//! wrong role → own role's home
//! otherwise → render
//! ```
//!
//! The gate only reads the cached state; keeping that state current is the
//! job of [`crate::freshness`].

pub mod gate;
pub mod routes;

pub use crate::baas::Role;
pub use gate::{Destination, GateDecision, resolve};
pub use routes::{Navigation, Router, View};
