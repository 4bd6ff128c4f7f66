//! Freshness module
//!
//! Keeps the client's cached session and profile current across three
//! triggers: the initial load, identity change notifications, and the client
//! returning to the foreground.
//!
//! ```text
//! start()                 ──► loud refresh
//! handle_session_change() ──► state updated now, loud refresh if signed in
//! on_foreground()         ──► silent refresh
//! ```
//!
//! Refreshes are single-flight; see [`Freshness::refresh`].

pub mod protocol;
pub mod state;

pub use protocol::{Freshness, RefreshHandle, RefreshMode, RefreshOutcome};
pub use state::{AccessState, FreshnessEvent};
