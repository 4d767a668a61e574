use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::api::job::models::JobUpdate;
use crate::db::filter::JobQuery;
use crate::db::models::JobRecord;
use crate::triage::sync::{JobPersistence, SyncError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Job backend reached over the REST API of a running `serve`
pub struct HttpJobPersistence {
    client: Client,
    base_url: String,
}

impl HttpJobPersistence {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl JobPersistence for HttpJobPersistence {
    async fn fetch_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>, SyncError> {
        let url = format!("{}/jobs", self.base_url);
        debug!("GET {} {:?}", url, query);

        let jobs = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(jobs)
    }

    async fn update_job(&self, id: i64, update: &JobUpdate) -> Result<(), SyncError> {
        let url = format!("{}/jobs/{}", self.base_url, id);
        debug!("PUT {}", url);

        self.client
            .put(url)
            .json(update)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
