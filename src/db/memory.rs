use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;

use crate::api::job::models::{JobUpdate, NewJob};
use crate::api::stats::StatsAggregator;
use crate::clock::Clock;
use crate::db::filter::JobFilter;
use crate::db::models::{JobRecord, StatusCounts};
use crate::db::repository::{JobRepository, RepositoryError};

#[derive(Default)]
struct Table {
    rows: BTreeMap<i64, JobRecord>,
    /// Last id handed out or supplied, mirroring a serial sequence
    last_id: i64,
}

impl Table {
    fn insert(&mut self, job: &NewJob, created_at: NaiveDateTime) -> Result<i64, RepositoryError> {
        let id = match job.id {
            Some(id) if self.rows.contains_key(&id) => return Err(RepositoryError::DuplicateId(id)),
            Some(id) => id,
            None => {
                let mut next = self.last_id + 1;
                while self.rows.contains_key(&next) {
                    next += 1;
                }
                next
            }
        };
        self.last_id = self.last_id.max(id);
        self.rows.insert(id, job.clone().into_record(id, created_at));
        Ok(id)
    }
}

/// In-process job store with the same semantics as the Postgres repository
///
/// Backs `--memory` mode and the test suite. Rows come back in id order.
#[derive(Clone)]
pub struct MemoryJobRepository {
    table: Arc<Mutex<Table>>,
    clock: Arc<dyn Clock>,
}

impl MemoryJobRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Arc::new(Mutex::new(Table::default())),
            clock,
        }
    }

    /// Insert records exactly as given, including `created_at`
    pub fn seed(&self, jobs: impl IntoIterator<Item = JobRecord>) {
        let mut table = self.table.lock();
        for job in jobs {
            table.last_id = table.last_id.max(job.id);
            table.rows.insert(job.id, job);
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn list(
        &self,
        filter: &JobFilter,
        now: NaiveDateTime,
    ) -> Result<Vec<JobRecord>, RepositoryError> {
        let table = self.table.lock();
        Ok(table
            .rows
            .values()
            .filter(|job| filter.matches(job, now))
            .cloned()
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<JobRecord>, RepositoryError> {
        Ok(self.table.lock().rows.get(&id).cloned())
    }

    async fn insert(&self, job: &NewJob) -> Result<i64, RepositoryError> {
        let created_at = self.clock.now();
        self.table.lock().insert(job, created_at)
    }

    async fn insert_many(&self, jobs: &[NewJob]) -> Result<u64, RepositoryError> {
        let created_at = self.clock.now();
        let mut table = self.table.lock();

        // All or nothing, like the transactional insert
        let mut staged = Table {
            rows: table.rows.clone(),
            last_id: table.last_id,
        };
        for job in jobs {
            staged.insert(job, created_at)?;
        }
        *table = staged;

        Ok(jobs.len() as u64)
    }

    async fn update(&self, id: i64, update: &JobUpdate) -> Result<bool, RepositoryError> {
        let mut table = self.table.lock();
        match table.rows.get_mut(&id) {
            Some(job) => {
                update.apply_to(job);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.table.lock().rows.remove(&id).is_some())
    }

    async fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        let table = self.table.lock();
        Ok(StatsAggregator::count_statuses(table.rows.values()))
    }

    async fn applied_per_day(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, i64)>, RepositoryError> {
        let table = self.table.lock();
        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for day in table.rows.values().filter_map(|job| job.date_applied) {
            if day >= from && day <= to {
                *per_day.entry(day).or_default() += 1;
            }
        }
        Ok(per_day.into_iter().collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
