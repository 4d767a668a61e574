use crate::api::job::models::JobUpdate;
use crate::db::models::JobRecord;

/// Jobs for the current filter selection, in the order the backend returned them
///
/// Replaced wholesale on every fetch; never merged or re-sorted.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Vec<JobRecord>,
}

impl JobStore {
    pub fn new(jobs: Vec<JobRecord>) -> Self {
        Self { jobs }
    }

    /// Swap in a new snapshot
    pub fn replace(&mut self, jobs: Vec<JobRecord>) {
        self.jobs = jobs;
    }

    /// Update a record in place. Returns `false` (and does nothing) for an unknown id.
    pub fn patch(&mut self, id: i64, update: &JobUpdate) -> bool {
        match self.jobs.iter_mut().find(|job| job.id == id) {
            Some(job) => {
                update.apply_to(job);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: i64) -> Option<&JobRecord> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.jobs.iter().position(|job| job.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&JobRecord> {
        self.jobs.get(index)
    }

    pub fn first(&self) -> Option<&JobRecord> {
        self.jobs.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobRecord> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
