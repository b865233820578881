//! Single-request resource calls.

use chrono::NaiveDate;

use crate::{
    prelude::*,
    types::{BatchStatus, JobResult, JobsPage, Resource, SignedUrlResponse},
};

use super::{Client, request::QueryParams};

/// Date format used by the job listing endpoint.
const DATE_FORMAT: &str = "%Y-%m-%d";

impl Client {
    /// Ask for presigned URLs to upload a document for a new job or batch.
    ///
    /// `params` carries flags such as `facematch=true`, `extra-document=true`
    /// and `base64=true`.
    #[instrument(level = "debug", skip(self, metadata, params))]
    pub async fn generate_signed_url(
        &mut self,
        service: &str,
        resource: Resource,
        metadata: &Map<String, Value>,
        params: &QueryParams,
    ) -> Result<SignedUrlResponse> {
        let url = self.api_url(&["ocr", resource.as_str(), service])?;
        let response: SignedUrlResponse = self.post_json(url, metadata, params).await?;
        debug!(id = %response.id, slots = response.urls.len(), "Got signed URLs");
        Ok(response)
    }

    /// Get the status of a batch.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_batch_status(&mut self, batch_id: &str) -> Result<BatchStatus> {
        let url = self.api_url(&["ocr", "batch", "status", batch_id])?;
        self.get_json(url, &QueryParams::new()).await
    }

    /// Get the result of a job. For a job created on its own, pass its ID as
    /// both `batch_id` and `job_id`.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_job_result(&mut self, batch_id: &str, job_id: &str) -> Result<JobResult> {
        let url = self.api_url(&["ocr", "job", "result", batch_id, job_id])?;
        self.get_json(url, &QueryParams::new()).await
    }

    /// List every job created between `start` and `end`, following
    /// pagination to the last page.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_jobs(&mut self, start: NaiveDate, end: NaiveDate) -> Result<Vec<JobResult>> {
        let url = self.api_url(&["ocr", "job", "results"])?;
        let mut params = QueryParams::from([
            ("startDate".to_owned(), start.format(DATE_FORMAT).to_string()),
            ("endDate".to_owned(), end.format(DATE_FORMAT).to_string()),
        ]);

        let mut jobs = Vec::new();
        loop {
            let page: JobsPage = self.get_json(url.clone(), &params).await?;
            let next_page = page.next_page().map(str::to_owned);
            debug!(count = page.jobs.len(), has_next = next_page.is_some(), "Got page of jobs");
            jobs.extend(page.jobs);
            match next_page {
                Some(token) => {
                    params.insert("nextPageToken".to_owned(), token);
                }
                None => break,
            }
        }
        Ok(jobs)
    }
}
