use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::job::models::JobUpdate;
use crate::api::job::{JobService, ServiceError};
use crate::db::filter::JobQuery;
use crate::db::models::{JobRecord, JobStatus};
use crate::triage::store::JobStore;

/// Failure talking to the job backend
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("job server request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Remote side of the triage workflow
#[async_trait]
pub trait JobPersistence: Send + Sync {
    async fn fetch_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>, SyncError>;

    async fn update_job(&self, id: i64, update: &JobUpdate) -> Result<(), SyncError>;
}

/// In-process backend, used when triage runs next to the database
#[async_trait]
impl JobPersistence for JobService {
    async fn fetch_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>, SyncError> {
        Ok(self.list_jobs(query).await?)
    }

    async fn update_job(&self, id: i64, update: &JobUpdate) -> Result<(), SyncError> {
        JobService::update_job(self, id, update).await?;
        Ok(())
    }
}

/// Applies status changes locally right away and persists them in the background
///
/// The remote write is fire-and-forget: its failure is not reported to the
/// caller and never rolls back the local change, so the local view can drift
/// from storage. Overlapping writes for one id land in network order.
#[derive(Clone)]
pub struct SyncBridge {
    persistence: Arc<dyn JobPersistence>,
}

impl SyncBridge {
    pub fn new(persistence: Arc<dyn JobPersistence>) -> Self {
        Self { persistence }
    }

    pub async fn fetch(&self, query: &JobQuery) -> Result<Vec<JobRecord>, SyncError> {
        self.persistence.fetch_jobs(query).await
    }

    /// Set a job's status optimistically
    ///
    /// `store` is patched before this returns (the applied date only when one
    /// is given). The remote update always carries `date_applied`, so a
    /// `None` clears it in storage. Must be called from within a Tokio runtime.
    /// The returned handle may be dropped; the write still runs.
    pub fn set_status_optimistic(
        &self,
        store: &mut JobStore,
        id: i64,
        status: JobStatus,
        date_applied: Option<NaiveDate>,
    ) -> JoinHandle<()> {
        let local = JobUpdate {
            status: Some(status),
            date_applied: date_applied.map(Some),
            ..JobUpdate::default()
        };
        store.patch(id, &local);

        let remote = JobUpdate::status_change(status, date_applied);
        let persistence = Arc::clone(&self.persistence);
        tokio::spawn(async move {
            if let Err(e) = persistence.update_job(id, &remote).await {
                debug!("Discarded failed status sync for job {}: {}", id, e);
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    /// Persistence fake that records every update and can be told to fail
    pub struct RecordingPersistence {
        pub jobs: Mutex<Vec<JobRecord>>,
        pub fail: bool,
        updates: mpsc::UnboundedSender<(i64, JobUpdate)>,
    }

    impl RecordingPersistence {
        pub fn new(
            jobs: Vec<JobRecord>,
            fail: bool,
        ) -> (Arc<Self>, mpsc::UnboundedReceiver<(i64, JobUpdate)>) {
            let (updates, rx) = mpsc::unbounded_channel();
            let persistence = Arc::new(Self {
                jobs: Mutex::new(jobs),
                fail,
                updates,
            });
            (persistence, rx)
        }
    }

    #[async_trait]
    impl JobPersistence for RecordingPersistence {
        async fn fetch_jobs(&self, _query: &JobQuery) -> Result<Vec<JobRecord>, SyncError> {
            Ok(self.jobs.lock().clone())
        }

        async fn update_job(&self, id: i64, update: &JobUpdate) -> Result<(), SyncError> {
            let _ = self.updates.send((id, update.clone()));
            if self.fail {
                return Err(ServiceError::NotFound(id).into());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingPersistence;
    use super::*;
    use crate::api::job::models::NewJob;
    use chrono::NaiveDateTime;

    fn store() -> JobStore {
        JobStore::new(vec![
            NewJob::new("Dev", "Acme").into_record(1, NaiveDateTime::default()),
        ])
    }

    #[tokio::test]
    async fn local_patch_is_visible_before_remote_completes() {
        let (persistence, mut updates) = RecordingPersistence::new(Vec::new(), false);
        let bridge = SyncBridge::new(persistence);
        let mut store = store();

        let handle = bridge.set_status_optimistic(&mut store, 1, JobStatus::Accepted, None);
        assert_eq!(store.get(1).unwrap().status, JobStatus::Accepted);

        handle.await.unwrap();
        let (id, update) = updates.recv().await.unwrap();
        assert_eq!(id, 1);
        assert_eq!(update, JobUpdate::status_change(JobStatus::Accepted, None));
    }

    #[tokio::test]
    async fn remote_failure_keeps_local_change() {
        let (persistence, mut updates) = RecordingPersistence::new(Vec::new(), true);
        let bridge = SyncBridge::new(persistence);
        let mut store = store();
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        bridge
            .set_status_optimistic(&mut store, 1, JobStatus::Applied, Some(today))
            .await
            .unwrap();

        assert!(updates.recv().await.is_some());
        let job = store.get(1).unwrap();
        assert_eq!(job.status, JobStatus::Applied);
        assert_eq!(job.date_applied, Some(today));
    }

    #[tokio::test]
    async fn local_patch_keeps_applied_date_without_one() {
        let (persistence, _updates) = RecordingPersistence::new(Vec::new(), false);
        let bridge = SyncBridge::new(persistence);
        let mut store = store();
        let earlier = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        store.patch(1, &JobUpdate::status_change(JobStatus::Applied, Some(earlier)));

        bridge
            .set_status_optimistic(&mut store, 1, JobStatus::Rejected, None)
            .await
            .unwrap();

        let job = store.get(1).unwrap();
        assert_eq!(job.status, JobStatus::Rejected);
        assert_eq!(job.date_applied, Some(earlier));
    }
}
