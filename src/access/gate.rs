//! Access gate
//!
//! Pure decision over the cached session and profile. Rules are checked in
//! order and the first match wins:
//!
//! 1. no session → login
//! 2. no profile → login
//! 3. profile not approved → pending approval
//! 4. required role differs from the profile's role → that role's home
//! 5. otherwise render

use crate::baas::{Profile, Role};
use crate::identity::Session;
use tracing::trace;

/// Where a refused request is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Login,
    PendingApproval,
    RoleHome(Role),
}

/// Outcome of the gate for one protected view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    Redirect(Destination),
}

impl GateDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, GateDecision::Render)
    }

    pub fn redirect_target(&self) -> Option<Destination> {
        match self {
            GateDecision::Render => None,
            GateDecision::Redirect(destination) => Some(*destination),
        }
    }
}

/// Decide whether a protected view may render
pub fn resolve(
    session: Option<&Session>,
    profile: Option<&Profile>,
    required_role: Option<Role>,
) -> GateDecision {
    let decision = match (session, profile) {
        (None, _) | (Some(_), None) => GateDecision::Redirect(Destination::Login),
        (Some(_), Some(profile)) if !profile.approved => {
            GateDecision::Redirect(Destination::PendingApproval)
        }
        (Some(_), Some(profile)) => match required_role {
            Some(required) if required != profile.role => {
                GateDecision::Redirect(Destination::RoleHome(profile.role))
            }
            _ => GateDecision::Render,
        },
    };

    trace!(
        has_session = session.is_some(),
        has_profile = profile.is_some(),
        required_role = ?required_role,
        decision = ?decision,
        "Gate resolved"
    );

    decision
}
