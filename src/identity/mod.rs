//! Identity module
//!
//! Sessions, session change notifications, and the auth-service backed
//! provider that produces them.

pub mod gotrue;
pub mod provider;
pub mod session;

pub use gotrue::GoTrueIdentity;
pub use provider::IdentityProvider;
pub use session::{AuthChange, Session, SessionEvent, SessionUser};
