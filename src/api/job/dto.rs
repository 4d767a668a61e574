use serde::{Deserialize, Serialize};

/// Acknowledgement returned by create, update and delete
#[derive(Debug, Serialize, Deserialize)]
pub struct JobAck {
    pub message: String,
    #[serde(rename = "jobId")]
    pub job_id: i64,
}

impl JobAck {
    pub fn new(message: &str, job_id: i64) -> Self {
        Self {
            message: message.to_string(),
            job_id,
        }
    }
}

/// Error details for a failed job validation
#[derive(Debug, Serialize, Deserialize)]
pub struct JobError {
    pub name: String,
    pub errors: Vec<String>,
}

/// Response for bulk job creation
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkJobResponse {
    pub message: String,
    pub created: usize,
    pub errors: Vec<JobError>,
}
