use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::db::filter::JobQuery;
use crate::db::models::{JobRecord, JobStatus};
use crate::triage::store::JobStore;
use crate::triage::sync::{SyncBridge, SyncError};

/// Keyboard command understood by the triage loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageKey {
    Next,
    Previous,
    Reject,
    Accept,
    Apply,
}

impl TriageKey {
    /// Map a key name to a command: `s`/down, `w`/up, `a`/left, `d`/right, `f`
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "s" | "ArrowDown" | "down" => Some(TriageKey::Next),
            "w" | "ArrowUp" | "up" => Some(TriageKey::Previous),
            "a" | "ArrowLeft" | "left" => Some(TriageKey::Reject),
            "d" | "ArrowRight" | "right" => Some(TriageKey::Accept),
            "f" => Some(TriageKey::Apply),
            _ => None,
        }
    }
}

/// Result of one handled event, for the display layer to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Newly active job; the display scrolls its detail and list entry into view
    pub active: i64,
    /// Link to open in a new context (set by Apply)
    pub open_link: Option<String>,
}

/// Keyboard-driven review loop over the current snapshot
///
/// The cursor is a job id. It resolves to a job in the store whenever the
/// store is non-empty and is `None` otherwise. Navigation wraps in both
/// directions, so a one-job snapshot loops onto itself.
pub struct TriageStateMachine {
    store: JobStore,
    cursor: Option<i64>,
    bridge: SyncBridge,
    clock: Arc<dyn Clock>,
    /// Background writes not yet known to be finished
    in_flight: Vec<JoinHandle<()>>,
}

impl TriageStateMachine {
    pub fn new(bridge: SyncBridge, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: JobStore::default(),
            cursor: None,
            bridge,
            clock,
            in_flight: Vec::new(),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn active(&self) -> Option<i64> {
        self.cursor
    }

    pub fn active_job(&self) -> Option<&JobRecord> {
        self.cursor.and_then(|id| self.store.get(id))
    }

    /// Replace the snapshot and put the cursor on its first job
    pub fn load(&mut self, jobs: Vec<JobRecord>) {
        self.store.replace(jobs);
        self.cursor = self.store.first().map(|job| job.id);
        debug!("Triage snapshot loaded: {} jobs", self.store.len());
    }

    /// Fetch a fresh snapshot for `query` and load it
    pub async fn refresh(&mut self, query: &JobQuery) -> Result<(), SyncError> {
        let jobs = self.bridge.fetch(query).await?;
        self.load(jobs);
        Ok(())
    }

    /// Point the cursor at `id`, as a click on a list entry would
    pub fn select(&mut self, id: i64) -> Option<Transition> {
        self.store.get(id)?;
        self.cursor = Some(id);
        Some(Transition {
            active: id,
            open_link: None,
        })
    }

    /// Handle one key event. `None` when the snapshot is empty.
    ///
    /// Status keys patch the store before returning; the remote write is
    /// left running in the background.
    pub fn handle(&mut self, key: TriageKey) -> Option<Transition> {
        let current = self.current_index()?;
        let id = self.store.at(current)?.id;

        let open_link = match key {
            TriageKey::Next | TriageKey::Previous => None,
            TriageKey::Reject => {
                self.set_status(id, JobStatus::Rejected, false);
                None
            }
            TriageKey::Accept => {
                self.set_status(id, JobStatus::Accepted, false);
                None
            }
            TriageKey::Apply => {
                self.set_status(id, JobStatus::Applied, true);
                self.store.get(id).map(JobRecord::link)
            }
        };

        let active = if key == TriageKey::Previous {
            self.step(current, false)
        } else {
            self.step(current, true)
        };

        Some(Transition { active, open_link })
    }

    /// Feed events from a channel through `handle` until the sender closes
    pub async fn drive<F>(&mut self, mut events: mpsc::Receiver<TriageKey>, mut on_transition: F)
    where
        F: FnMut(&Self, &Transition),
    {
        while let Some(key) = events.recv().await {
            if let Some(transition) = self.handle(key) {
                on_transition(self, &transition);
            }
        }
        info!("Triage input closed");
    }

    /// Wait for background writes issued so far, e.g. before the process exits.
    /// Their outcomes are still discarded.
    pub async fn settle(&mut self) {
        for handle in self.in_flight.drain(..) {
            let _ = handle.await;
        }
    }

    fn set_status(&mut self, id: i64, status: JobStatus, stamp_applied: bool) {
        let date_applied = stamp_applied.then(|| self.clock.today());
        let handle = self
            .bridge
            .set_status_optimistic(&mut self.store, id, status, date_applied);
        self.in_flight.retain(|pending| !pending.is_finished());
        self.in_flight.push(handle);
    }

    /// Index of the cursor, falling back to the first job if it went stale
    fn current_index(&self) -> Option<usize> {
        if self.store.is_empty() {
            return None;
        }
        Some(
            self.cursor
                .and_then(|id| self.store.position(id))
                .unwrap_or(0),
        )
    }

    fn step(&mut self, from: usize, forward: bool) -> i64 {
        let len = self.store.len();
        let next = if forward {
            (from + 1) % len
        } else if from == 0 {
            len - 1
        } else {
            from - 1
        };
        // `next < len` and the store is non-empty
        let id = self.store.at(next).map(|job| job.id).unwrap_or_default();
        self.cursor = Some(id);
        id
    }
}
