//! Keyboard-driven triage of the job list: a local snapshot, a cursor over it,
//! and optimistic status changes synced to storage in the background.

pub mod http;
pub mod machine;
pub mod store;
pub mod sync;

pub use http::HttpJobPersistence;
pub use machine::{Transition, TriageKey, TriageStateMachine};
pub use store::JobStore;
pub use sync::{JobPersistence, SyncBridge, SyncError};
