//! Wire types for the UltraOCR API.

use std::{collections::BTreeMap, fmt};

use schemars::JsonSchema;

use crate::prelude::*;

/// The status of a job or batch.
///
/// UltraOCR may add new statuses at any time, so anything we don't recognize
/// is kept verbatim in [`Status::Other`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// No status reported yet.
    #[default]
    Unknown,
    /// Waiting to be processed.
    Queued,
    /// Being processed right now.
    Processing,
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Error,
    /// Some status we don't know about.
    Other(String),
}

impl Status {
    /// Will this status never change again?
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Done | Status::Error)
    }

    /// Did processing fail on the server?
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error)
    }

    /// The wire representation of this status.
    pub fn as_str(&self) -> &str {
        match self {
            Status::Unknown => "",
            Status::Queued => "queued",
            Status::Processing => "processing",
            Status::Done => "done",
            Status::Error => "error",
            Status::Other(other) => other,
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" => Status::Unknown,
            "queued" => Status::Queued,
            "processing" => Status::Processing,
            "done" => Status::Done,
            "error" => Status::Error,
            _ => Status::Other(s),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Other(other) => other,
            status => status.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of resource we're creating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A single job.
    Job,
    /// A batch of jobs, usually a multi-page file.
    Batch,
}

impl Resource {
    /// The path segment used for this resource.
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Job => "job",
            Resource::Batch => "batch",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The named upload slots in a [`SignedUrlResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSlot {
    /// The main document.
    Document,
    /// A selfie, used for face matching.
    Selfie,
    /// A second document page.
    ExtraDocument,
}

impl UploadSlot {
    /// The key used for this slot in [`SignedUrlResponse::urls`].
    pub fn as_str(self) -> &'static str {
        match self {
            UploadSlot::Document => "document",
            UploadSlot::Selfie => "selfie",
            UploadSlot::ExtraDocument => "extra_document",
        }
    }
}

/// Returned when a job or batch is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct CreatedResponse {
    /// The job or batch ID.
    #[serde(default)]
    pub id: String,

    /// Where to poll for status.
    #[serde(default)]
    pub status_url: String,
}

/// Returned when we ask for presigned upload URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SignedUrlResponse {
    /// The job or batch ID.
    #[serde(default)]
    pub id: String,

    /// Where to poll for status.
    #[serde(default)]
    pub status_url: String,

    /// When the upload URLs expire.
    #[serde(default, rename = "exp")]
    pub expires: String,

    /// Upload URLs, keyed by slot name.
    #[serde(default)]
    pub urls: BTreeMap<String, String>,
}

impl SignedUrlResponse {
    /// Look up the URL for an upload slot.
    pub fn url_for(&self, slot: UploadSlot) -> Result<&str> {
        self.urls
            .get(slot.as_str())
            .map(String::as_str)
            .ok_or_else(|| Error::MissingUploadSlot(slot.as_str().to_owned()))
    }
}

impl From<SignedUrlResponse> for CreatedResponse {
    fn from(response: SignedUrlResponse) -> Self {
        Self {
            id: response.id,
            status_url: response.status_url,
        }
    }
}

/// The summary of one job inside a [`BatchStatus`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct BatchJob {
    /// The job ID.
    #[serde(default, rename = "job_ksuid")]
    pub job_id: String,

    /// When the job was created.
    #[serde(default)]
    pub created_at: String,

    /// Where to fetch the job result.
    #[serde(default)]
    pub result_url: String,

    /// The job status.
    #[serde(default)]
    #[schemars(with = "String")]
    pub status: Status,

    /// The error message, if the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The status of a batch.
///
/// The batch status is independent of its jobs: a batch may be `done` while
/// some of its jobs are still running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct BatchStatus {
    /// The batch ID.
    #[serde(default, rename = "batch_ksuid")]
    pub batch_id: String,

    /// When the batch was created.
    #[serde(default)]
    pub created_at: String,

    /// The service (document type).
    #[serde(default)]
    pub service: String,

    /// The batch status.
    #[serde(default)]
    #[schemars(with = "String")]
    pub status: Status,

    /// The error message, if the batch failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The jobs in this batch.
    #[serde(default)]
    pub jobs: Vec<BatchJob>,
}

/// The extracted data in a [`JobResult`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct JobOutput {
    /// The structured document data. Its shape depends on the service.
    #[serde(default, rename = "Document", skip_serializing_if = "Value::is_null")]
    pub document: Value,

    /// How many documents were found.
    #[serde(default, rename = "Quantity", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u64>,

    /// Processing time reported by the engine.
    #[serde(default, rename = "Time", skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// The result of a job.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct JobResult {
    /// The job ID.
    #[serde(default, rename = "job_ksuid")]
    pub job_id: String,

    /// When the job was created.
    #[serde(default)]
    pub created_at: String,

    /// The service (document type).
    #[serde(default)]
    pub service: String,

    /// The job status.
    #[serde(default)]
    #[schemars(with = "String")]
    pub status: Status,

    /// The error message, if the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The extracted data, once the job is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutput>,

    /// How long processing took.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_time: Option<String>,

    /// The uploaded file name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Validation status, for services which validate documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<String>,

    /// The metadata sent when the job was created.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub client_data: Value,

    /// Validation details.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub validation: Value,
}

/// One page of results from the job listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct JobsPage {
    /// The jobs on this page.
    #[serde(default)]
    pub jobs: Vec<JobResult>,

    /// Token for the next page. Empty or missing on the last page.
    #[serde(default, rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl JobsPage {
    /// The token for the next page, if there is one.
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_batch_status() {
        let batch: BatchStatus = serde_json::from_value(json!({
            "batch_ksuid": "B1",
            "status": "done",
            "jobs": [{"job_ksuid": "J1", "status": "error", "error": "bad image"}]
        }))
        .unwrap();
        assert_eq!(batch.batch_id, "B1");
        assert_eq!(batch.status, Status::Done);
        assert_eq!(batch.jobs.len(), 1);
        assert_eq!(batch.jobs[0].job_id, "J1");
        assert_eq!(batch.jobs[0].status, Status::Error);
        assert_eq!(batch.jobs[0].error.as_deref(), Some("bad image"));
    }

    #[test]
    fn test_parse_job_result() {
        let result: JobResult = serde_json::from_value(json!({
            "job_ksuid": "J1",
            "created_at": "2024-01-02T03:04:05Z",
            "service": "cnh",
            "status": "done",
            "process_time": "1.2s",
            "validation_status": "valid",
            "result": {
                "Document": [{"Page": 1, "Data": {"Name": "Fulano"}}],
                "Quantity": 1,
                "Time": "1.1"
            }
        }))
        .unwrap();
        assert_eq!(result.status, Status::Done);
        assert!(result.error.is_none());
        let output = result.result.unwrap();
        assert_eq!(output.quantity, Some(1));
        assert_eq!(output.document[0]["Data"]["Name"], "Fulano");
        assert_eq!(result.validation_status.as_deref(), Some("valid"));
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: Status = serde_json::from_value(json!("validating")).unwrap();
        assert_eq!(status, Status::Other("validating".to_owned()));
        assert!(!status.is_terminal());
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("validating"));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(Status::Done.is_terminal());
        assert!(Status::Error.is_terminal());
        assert!(!Status::Queued.is_terminal());
        assert!(!Status::Processing.is_terminal());
        assert!(!Status::Unknown.is_terminal());
    }

    #[test]
    fn test_missing_upload_slot() {
        let response = SignedUrlResponse {
            urls: BTreeMap::from([("document".to_owned(), "https://s3/doc".to_owned())]),
            ..SignedUrlResponse::default()
        };
        assert_eq!(response.url_for(UploadSlot::Document).unwrap(), "https://s3/doc");
        assert!(matches!(
            response.url_for(UploadSlot::Selfie),
            Err(Error::MissingUploadSlot(slot)) if slot == "selfie"
        ));
    }

    #[test]
    fn test_empty_next_page_token_ends_paging() {
        let page: JobsPage =
            serde_json::from_value(json!({"jobs": [], "nextPageToken": ""})).unwrap();
        assert_eq!(page.next_page(), None);
        let page: JobsPage =
            serde_json::from_value(json!({"jobs": [], "nextPageToken": "X"})).unwrap();
        assert_eq!(page.next_page(), Some("X"));
    }
}
