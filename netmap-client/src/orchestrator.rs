//! Scan orchestration: drives a discovery job from submission through
//! completion and makes its state observable.
//!
//! One logical task mutates state at a time. The poll loop is a single
//! spawned task that sleeps, fetches, and decides; a new submission
//! aborts it before touching anything, and a scan-generation counter
//! guards against a stale poll that was already past its sleep when the
//! abort landed.

use crate::api::{ApiClient, SubmitOutcome};
use crate::error::{Result, ScanError};
use netmap_core::model::{GraphSnapshot, ScanSession, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Subscriber callback, invoked on every state transition. Runs on the
/// orchestrator's task while its lock is held, so keep it light.
pub type StateCallback = Arc<dyn Fn(&ScanState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Submitting,
    Polling,
    Ready,
    Failed,
}

/// The single observable state object. Replaced wholesale on reset and
/// scan start; fields are projections the presentation layer shows one
/// of at a time.
#[derive(Debug, Clone)]
pub struct ScanState {
    pub phase: ScanPhase,
    pub snapshot: Option<GraphSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
    pub status_message: String,
    pub session: Option<ScanSession>,
}

impl ScanState {
    fn idle() -> Self {
        Self {
            phase: ScanPhase::Idle,
            snapshot: None,
            loading: false,
            error: None,
            status_message: String::new(),
            session: None,
        }
    }
}

struct Inner {
    state: ScanState,
    /// Bumped on every submission; a poll task only writes while its own
    /// generation is still current.
    generation: u64,
    poll_task: Option<JoinHandle<()>>,
    subscribers: Vec<StateCallback>,
}

impl Inner {
    fn notify(&self) {
        for subscriber in &self.subscribers {
            subscriber(&self.state);
        }
    }
}

pub struct ScanOrchestrator {
    api: Arc<ApiClient>,
    inner: Arc<Mutex<Inner>>,
    poll_interval: Duration,
}

impl ScanOrchestrator {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api: Arc::new(api),
            inner: Arc::new(Mutex::new(Inner {
                state: ScanState::idle(),
                generation: 0,
                poll_task: None,
                subscribers: Vec::new(),
            })),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn subscribe(&self, callback: StateCallback) {
        self.inner.lock().await.subscribers.push(callback);
    }

    pub async fn state(&self) -> ScanState {
        self.inner.lock().await.state.clone()
    }

    /// Drops the current snapshot and returns to `Idle`, aborting any
    /// polling in progress.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(task) = inner.poll_task.take() {
            task.abort();
        }
        inner.generation += 1;
        inner.state = ScanState::idle();
        inner.notify();
    }

    /// Submits a scan for `domain` at `depth` (1..=3). Resolves the
    /// immediate path in place; the asynchronous path leaves a poll task
    /// running and returns right away. A second call supersedes any scan
    /// still in flight.
    pub async fn submit_scan(&self, domain: &str, depth: u8) -> Result<()> {
        if !(1..=3).contains(&depth) {
            return Err(ScanError::InvalidDepth(depth));
        }

        // Cancel the previous scan's poll before any new state exists, so
        // a slow stale poll can never overwrite a fresher session.
        let generation = {
            let mut inner = self.inner.lock().await;
            if let Some(task) = inner.poll_task.take() {
                debug!("superseding in-flight scan, aborting its poll task");
                task.abort();
            }
            inner.generation += 1;
            inner.state = ScanState {
                phase: ScanPhase::Submitting,
                snapshot: None,
                loading: true,
                error: None,
                status_message: "Checking for existing scans...".to_string(),
                session: None,
            };
            inner.notify();
            inner.generation
        };

        match self.api.submit_scan(domain, depth).await {
            Ok(SubmitOutcome::Ready { session_id }) => {
                info!("found completed scan for {} (session {})", domain, session_id);
                set_state(&self.inner, generation, |state| {
                    state.status_message = format!(
                        "Found completed scan (session {session_id}). Loading graph..."
                    );
                    state.session = Some(ScanSession {
                        domain: domain.to_string(),
                        depth,
                        session_id: session_id.clone(),
                        state: SessionState::Submitted,
                    });
                })
                .await;
                match self.api.fetch_graph(domain, &session_id).await {
                    Ok(wire) => {
                        let snapshot = GraphSnapshot::from_wire(wire);
                        settle_ready(&self.inner, generation, snapshot).await;
                        Ok(())
                    }
                    Err(e) => {
                        settle_failed(&self.inner, generation, e.to_string()).await;
                        Err(e)
                    }
                }
            }
            Ok(SubmitOutcome::Accepted { session_id }) => {
                info!("scan scheduled for {} (session {})", domain, session_id);
                set_state(&self.inner, generation, |state| {
                    state.phase = ScanPhase::Polling;
                    state.status_message = format!(
                        "Started new scan (session {session_id}). Waiting for completion..."
                    );
                    state.session = Some(ScanSession {
                        domain: domain.to_string(),
                        depth,
                        session_id: session_id.clone(),
                        state: SessionState::Polling,
                    });
                })
                .await;

                let task = tokio::spawn(poll_loop(
                    self.api.clone(),
                    self.inner.clone(),
                    domain.to_string(),
                    session_id,
                    generation,
                    self.poll_interval,
                ));
                let mut inner = self.inner.lock().await;
                if inner.generation == generation {
                    inner.poll_task = Some(task);
                } else {
                    // Already superseded while spawning.
                    task.abort();
                }
                Ok(())
            }
            Err(e) => {
                warn!("scan submission failed: {}", e);
                settle_failed(&self.inner, generation, e.to_string()).await;
                Err(e)
            }
        }
    }
}

/// Applies `mutate` to the shared state and notifies subscribers, unless
/// a newer scan has taken over in the meantime.
async fn set_state<F>(inner: &Arc<Mutex<Inner>>, generation: u64, mutate: F) -> bool
where
    F: FnOnce(&mut ScanState),
{
    let mut guard = inner.lock().await;
    if guard.generation != generation {
        debug!("dropping stale state write from superseded scan");
        return false;
    }
    mutate(&mut guard.state);
    guard.notify();
    true
}

async fn settle_ready(inner: &Arc<Mutex<Inner>>, generation: u64, snapshot: GraphSnapshot) {
    set_state(inner, generation, |state| {
        state.phase = ScanPhase::Ready;
        state.loading = false;
        state.status_message = "Scan complete. Graph loaded.".to_string();
        state.snapshot = Some(snapshot);
        if let Some(session) = &mut state.session {
            session.state = SessionState::Ready;
        }
    })
    .await;
}

async fn settle_failed(inner: &Arc<Mutex<Inner>>, generation: u64, message: String) {
    set_state(inner, generation, |state| {
        state.phase = ScanPhase::Failed;
        state.loading = false;
        state.status_message = String::new();
        state.error = Some(message);
        if let Some(session) = &mut state.session {
            session.state = SessionState::Failed;
        }
    })
    .await;
}

/// The poll loop: sleep one interval, fetch, decide. Exactly one fetch is
/// ever in flight per session because the next poll is only scheduled
/// after this one finishes. Runs until the graph has at least one node or
/// a transport failure ends the scan; there is deliberately no attempt
/// cap, matching the server contract that an in-progress scan keeps
/// returning an empty graph.
async fn poll_loop(
    api: Arc<ApiClient>,
    inner: Arc<Mutex<Inner>>,
    domain: String,
    session_id: String,
    generation: u64,
    interval: Duration,
) {
    let mut attempt = 0_u64;
    loop {
        tokio::time::sleep(interval).await;
        attempt += 1;
        debug!("poll attempt {} for session {}", attempt, session_id);

        match api.fetch_graph(&domain, &session_id).await {
            Ok(wire) if !wire.nodes.is_empty() => {
                let snapshot = GraphSnapshot::from_wire(wire);
                info!(
                    "scan {} ready after {} poll(s): {} node(s), {} edge(s)",
                    session_id,
                    attempt,
                    snapshot.nodes.len(),
                    snapshot.edges.len()
                );
                settle_ready(&inner, generation, snapshot).await;
                break;
            }
            Ok(_) => {
                debug!("session {} not ready yet, rescheduling", session_id);
            }
            Err(e) => {
                warn!("poll failed for session {}: {}", session_id, e);
                settle_failed(&inner, generation, e.to_string()).await;
                break;
            }
        }
    }
}
