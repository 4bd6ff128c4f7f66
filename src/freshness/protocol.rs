//! Single-flight refresh of the cached session and profile
//!
//! A refresh cycle fetches the session, then the profile keyed by that
//! session's identity. At most one cycle per session epoch runs at a time.
//! Anyone asking for a refresh while such a cycle is running gets a handle
//! to that cycle's result; a cycle overtaken by a session change is left to
//! finish on its own and its result is dropped.

use crate::baas::Profile;
use crate::config::{FailurePolicy, FreshnessConfig};
use crate::error::{FetchError, FetchStage};
use crate::freshness::state::{AccessState, FreshnessEvent};
use crate::identity::{IdentityProvider, Session};
use crate::profile::{ProfileLookup, ProfileStore};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Whether a refresh shows the blocking loading indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Loud,
    Silent,
}

impl RefreshMode {
    fn shows_loading(self) -> bool {
        matches!(self, RefreshMode::Loud)
    }
}

/// How a refresh cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Session and profile both present
    Authenticated(Profile),
    /// No session
    Unauthenticated,
    /// Session present, but no profile row for it
    ProfileMissing,
    /// A fetch failed or timed out; the failure policy was applied
    Failed(FetchError),
    /// A session change arrived while the cycle ran; its result was dropped
    Superseded,
    /// The cycle task panicked or was cancelled
    Aborted,
}

/// Cloneable handle to a running (or finished) refresh cycle
#[derive(Clone)]
pub struct RefreshHandle {
    inner: Shared<BoxFuture<'static, RefreshOutcome>>,
}

impl RefreshHandle {
    fn from_task(task: JoinHandle<RefreshOutcome>) -> Self {
        let inner = async move {
            task.await.unwrap_or_else(|e| {
                warn!(error = %e, "Refresh task did not complete");
                RefreshOutcome::Aborted
            })
        }
        .boxed()
        .shared();
        Self { inner }
    }

    /// Outcome if the cycle already finished
    pub fn peek(&self) -> Option<&RefreshOutcome> {
        self.inner.peek()
    }
}

impl Future for RefreshHandle {
    type Output = RefreshOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl std::fmt::Debug for RefreshHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshHandle")
            .field("finished", &self.peek().is_some())
            .finish()
    }
}

/// Identity of one refresh cycle and the epoch it started in
#[derive(Debug, Clone, Copy)]
struct Cycle {
    id: u64,
    epoch: u64,
}

struct InFlight {
    cycle: Cycle,
    handle: RefreshHandle,
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    state: watch::Sender<AccessState>,
    in_flight: Mutex<Option<InFlight>>,
    next_cycle: AtomicU64,
    fetch_timeout: Duration,
    policy: FailurePolicy,
}

impl Inner {
    fn dispatch(&self, event: FreshnessEvent) {
        self.state.send_if_modified(|state| {
            let before = state.clone();
            state.apply(event) && *state != before
        });
    }

    /// Apply a completion event; `false` when it was stale.
    ///
    /// The slot is vacated under the same lock, so a request never joins a
    /// cycle whose result has already been applied.
    fn complete(&self, cycle: Cycle, event: FreshnessEvent) -> bool {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            let before = state.clone();
            accepted = state.apply(event);
            accepted && *state != before
        });
        if slot.as_ref().is_some_and(|f| f.cycle.id == cycle.id) {
            *slot = None;
        }
        accepted
    }

    fn timeout_error(&self, stage: FetchStage) -> FetchError {
        FetchError::Timeout {
            stage,
            timeout_ms: u64::try_from(self.fetch_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn fail(&self, cycle: Cycle, session: Option<Session>, failure: FetchError) -> RefreshOutcome {
        warn!(stage = %failure.stage(), error = %failure, policy = ?self.policy, "Refresh failed");
        let accepted = self.complete(cycle, FreshnessEvent::RefreshFailed {
            epoch: cycle.epoch,
            session,
            failure: failure.clone(),
            policy: self.policy,
        });
        if accepted {
            RefreshOutcome::Failed(failure)
        } else {
            RefreshOutcome::Superseded
        }
    }

    fn succeed(
        &self,
        cycle: Cycle,
        session: Option<Session>,
        profile: Option<Profile>,
        outcome: RefreshOutcome,
    ) -> RefreshOutcome {
        let event = FreshnessEvent::RefreshSucceeded {
            epoch: cycle.epoch,
            session,
            profile,
        };
        if self.complete(cycle, event) {
            outcome
        } else {
            debug!(epoch = cycle.epoch, "Refresh result superseded by a session change");
            RefreshOutcome::Superseded
        }
    }

    /// Session fetch, then profile fetch keyed by the session's identity
    async fn run_cycle(&self, cycle: Cycle) -> RefreshOutcome {
        let session = match timeout(self.fetch_timeout, self.identity.get_session()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return self.fail(cycle, None, FetchError::Session(e.to_string())),
            Err(_) => return self.fail(cycle, None, self.timeout_error(FetchStage::Session)),
        };

        let Some(session) = session else {
            return self.succeed(cycle, None, None, RefreshOutcome::Unauthenticated);
        };

        let lookup = match timeout(
            self.fetch_timeout,
            self.profiles.get_profile(session.user_id()),
        )
        .await
        {
            Ok(lookup) => lookup,
            Err(_) => {
                return self.fail(
                    cycle,
                    Some(session),
                    self.timeout_error(FetchStage::Profile),
                );
            }
        };

        match lookup {
            ProfileLookup::Found(profile) => {
                let outcome = RefreshOutcome::Authenticated(profile.clone());
                self.succeed(cycle, Some(session), Some(profile), outcome)
            }
            ProfileLookup::NotFound => {
                warn!(user = %session.user_id(), "Signed in without a profile row");
                self.succeed(cycle, Some(session), None, RefreshOutcome::ProfileMissing)
            }
            ProfileLookup::TransientError(message) => {
                self.fail(cycle, Some(session), FetchError::Profile(message))
            }
        }
    }

    fn clear_in_flight(&self, cycle: Cycle) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|f| f.cycle.id == cycle.id) {
            *slot = None;
        }
    }
}

/// Keeps the cached session and profile current
///
/// Cheap to clone; clones share the same state and in-flight slot.
#[derive(Clone)]
pub struct Freshness {
    inner: Arc<Inner>,
}

impl Freshness {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        config: &FreshnessConfig,
    ) -> Self {
        Self::with_timeout(
            identity,
            profiles,
            Duration::from_secs(config.fetch_timeout_secs),
            config.on_fetch_failure,
        )
    }

    /// Build with an explicit per-call fetch timeout
    pub fn with_timeout(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        fetch_timeout: Duration,
        policy: FailurePolicy,
    ) -> Self {
        let (state, _) = watch::channel(AccessState::initial());
        Self {
            inner: Arc::new(Inner {
                identity,
                profiles,
                state,
                in_flight: Mutex::new(None),
                next_cycle: AtomicU64::new(0),
                fetch_timeout,
                policy,
            }),
        }
    }

    /// Current snapshot
    pub fn state(&self) -> AccessState {
        self.inner.state.borrow().clone()
    }

    /// Observe every state change
    pub fn subscribe(&self) -> watch::Receiver<AccessState> {
        self.inner.state.subscribe()
    }

    /// Whether a refresh cycle is currently running
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Initial load, with the loading indicator
    pub fn start(&self) -> RefreshHandle {
        info!("Loading session and profile");
        self.refresh(RefreshMode::Loud)
    }

    /// Start a refresh cycle, or join the one already running.
    ///
    /// Only a cycle started in the current epoch is joined: its completion
    /// is still going to be applied and will clear `loading`. A cycle left
    /// over from before a session change is replaced by a fresh one.
    pub fn refresh(&self, mode: RefreshMode) -> RefreshHandle {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.inner.dispatch(FreshnessEvent::RefreshRequested {
            show_loading: mode.shows_loading(),
        });

        let epoch = self.inner.state.borrow().epoch;
        if let Some(in_flight) = slot.as_ref() {
            if in_flight.cycle.epoch == epoch {
                debug!(cycle = in_flight.cycle.id, ?mode, "Joining in-flight refresh");
                return in_flight.handle.clone();
            }
            debug!(
                cycle = in_flight.cycle.id,
                stale_epoch = in_flight.cycle.epoch,
                "Leaving superseded refresh behind"
            );
        }

        let cycle = Cycle {
            id: self.inner.next_cycle.fetch_add(1, Ordering::Relaxed),
            epoch,
        };
        debug!(cycle = cycle.id, epoch, ?mode, "Starting refresh");

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome = inner.run_cycle(cycle).await;
            inner.clear_in_flight(cycle);
            outcome
        });

        let handle = RefreshHandle::from_task(task);
        *slot = Some(InFlight {
            cycle,
            handle: handle.clone(),
        });
        handle
    }

    /// Background revalidation; never shows the loading indicator
    pub fn refresh_silent(&self) -> RefreshHandle {
        self.refresh(RefreshMode::Silent)
    }

    /// The client came back to the foreground or regained focus
    pub fn on_foreground(&self) -> RefreshHandle {
        debug!("Foreground regained, revalidating");
        self.refresh_silent()
    }

    /// Apply an identity change. The cache is updated before this returns.
    /// A present session also schedules a loud refresh, started once any
    /// running cycle has finished.
    pub fn handle_session_change(&self, session: Option<Session>) -> Option<RefreshHandle> {
        let signed_in = session.is_some();
        let running = {
            // Held across the dispatch so no cycle can start with the old epoch
            let slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.inner.dispatch(FreshnessEvent::SessionChanged(session));
            slot.as_ref().map(|f| f.handle.clone())
        };

        if !signed_in {
            info!("Signed out, profile cleared");
            return None;
        }

        let this = self.clone();
        let task = tokio::spawn(async move {
            if let Some(running) = running {
                running.await;
            }
            this.refresh(RefreshMode::Loud).await
        });
        Some(RefreshHandle::from_task(task))
    }

    /// Forward identity provider notifications until the provider goes away
    pub fn listen(&self) -> JoinHandle<()> {
        let mut events = self.inner.identity.subscribe();
        let this = self.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!(kind = ?event.kind, "Identity change");
                        this.handle_session_change(event.session);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Missed identity changes, revalidating");
                        this.refresh_silent();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Identity provider closed its event stream");
                        break;
                    }
                }
            }
        })
    }

    /// Revalidate silently every `period` until the task is aborted
    pub fn revalidate_every(&self, period: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                this.refresh_silent();
            }
        })
    }
}
