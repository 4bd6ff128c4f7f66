//! Cached access state and its reducer
//!
//! `AccessState::apply` is the only place the cached session/profile pair
//! changes. Refresh completions carry the epoch they started in; a session
//! change bumps the epoch, so a completion that raced a session change is
//! dropped instead of overwriting the newer state.

use crate::baas::Profile;
use crate::config::FailurePolicy;
use crate::error::{FetchError, FetchStage};
use crate::identity::Session;

/// Snapshot of what the client currently believes about its user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessState {
    /// A blocking refresh is running
    pub loading: bool,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    /// Bumped on every session change
    pub epoch: u64,
}

/// Inputs to the reducer
#[derive(Debug, Clone)]
pub enum FreshnessEvent {
    /// The identity provider reported a new (or no) session
    SessionChanged(Option<Session>),

    /// A refresh cycle is starting
    RefreshRequested { show_loading: bool },

    /// A refresh cycle fetched both values
    RefreshSucceeded {
        epoch: u64,
        session: Option<Session>,
        profile: Option<Profile>,
    },

    /// A refresh cycle failed at one stage. `session` is what the cycle
    /// fetched before failing, if it got that far.
    RefreshFailed {
        epoch: u64,
        session: Option<Session>,
        failure: FetchError,
        policy: FailurePolicy,
    },
}

impl AccessState {
    /// Initial state before the first refresh has completed
    pub fn initial() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Apply one event. Returns `false` when the event was discarded.
    pub fn apply(&mut self, event: FreshnessEvent) -> bool {
        match event {
            FreshnessEvent::SessionChanged(session) => {
                self.epoch = self.epoch.wrapping_add(1);
                match session {
                    None => {
                        self.session = None;
                        self.profile = None;
                        self.loading = false;
                    }
                    Some(session) => {
                        if !self.profile_belongs_to(&session) {
                            self.profile = None;
                        }
                        self.session = Some(session);
                        self.loading = true;
                    }
                }
                true
            }

            FreshnessEvent::RefreshRequested { show_loading } => {
                if show_loading {
                    self.loading = true;
                }
                true
            }

            FreshnessEvent::RefreshSucceeded {
                epoch,
                session,
                profile,
            } => {
                if epoch != self.epoch {
                    return false;
                }
                self.session = session;
                self.profile = profile;
                self.loading = false;
                true
            }

            FreshnessEvent::RefreshFailed {
                epoch,
                session,
                failure,
                policy,
            } => {
                if epoch != self.epoch {
                    return false;
                }
                self.loading = false;

                match (policy, failure.stage()) {
                    (FailurePolicy::FailClosed, FetchStage::Session) => {
                        self.session = None;
                        self.profile = None;
                    }
                    (FailurePolicy::FailClosed, FetchStage::Profile) => {
                        self.session = session;
                        self.profile = None;
                    }
                    (FailurePolicy::KeepCached, FetchStage::Session) => {}
                    (FailurePolicy::KeepCached, FetchStage::Profile) => {
                        if let Some(session) = session {
                            if !self.profile_belongs_to(&session) {
                                self.profile = None;
                            }
                            self.session = Some(session);
                        }
                    }
                }
                true
            }
        }
    }

    fn profile_belongs_to(&self, session: &Session) -> bool {
        self.profile
            .as_ref()
            .is_some_and(|profile| profile.id == session.user_id())
    }
}
