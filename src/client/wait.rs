//! Polling until a job or batch finishes.
//!
//! Each wait computes a deadline of now + [`ClientConfig::timeout`], then
//! fetches the status every [`ClientConfig::interval`] until it sees `done` or
//! `error`. A terminal `error` status is returned as a normal value. There is
//! no backoff and no jitter.
//!
//! [`ClientConfig::timeout`]: super::ClientConfig::timeout
//! [`ClientConfig::interval`]: super::ClientConfig::interval

use tokio::time::Instant;

use crate::{
    prelude::*,
    types::{BatchStatus, JobResult, Status},
};

use super::{
    Client,
    upload::{FileContent, JobFiles, SendOptions},
};

/// Something whose status we can poll.
trait StatusSource {
    /// The record returned by each poll.
    type Record;

    /// A short description for logs and timeout errors.
    fn describe(&self) -> String;

    /// Fetch the current record.
    async fn fetch(&self, client: &mut Client) -> Result<Self::Record>;

    /// The status inside a record.
    fn status(record: &Self::Record) -> &Status;
}

struct JobSource<'a> {
    batch_id: &'a str,
    job_id: &'a str,
}

impl StatusSource for JobSource<'_> {
    type Record = JobResult;

    fn describe(&self) -> String {
        format!("job {}", self.job_id)
    }

    async fn fetch(&self, client: &mut Client) -> Result<JobResult> {
        client.get_job_result(self.batch_id, self.job_id).await
    }

    fn status(record: &JobResult) -> &Status {
        &record.status
    }
}

struct BatchSource<'a> {
    batch_id: &'a str,
}

impl StatusSource for BatchSource<'_> {
    type Record = BatchStatus;

    fn describe(&self) -> String {
        format!("batch {}", self.batch_id)
    }

    async fn fetch(&self, client: &mut Client) -> Result<BatchStatus> {
        client.get_batch_status(self.batch_id).await
    }

    fn status(record: &BatchStatus) -> &Status {
        &record.status
    }
}

impl Client {
    /// Poll `source` until it reaches a terminal status or our deadline
    /// passes.
    async fn poll_until_terminal<S>(&mut self, source: S) -> Result<S::Record>
    where
        S: StatusSource,
    {
        let timeout = self.config.timeout;
        let interval = self.config.interval;
        // A timeout too large to represent never expires.
        let deadline = Instant::now().checked_add(timeout);
        let mut polls = 0usize;
        loop {
            let record = source.fetch(self).await?;
            polls += 1;

            let status = S::status(&record);
            if status.is_terminal() {
                debug!(what = %source.describe(), %status, polls, "Reached terminal status");
                return Ok(record);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(what = %source.describe(), %status, polls, "Gave up waiting");
                return Err(Error::Timeout {
                    what: source.describe(),
                    timeout,
                });
            }

            trace!(what = %source.describe(), %status, "Still waiting");
            self.cancellable(tokio::time::sleep(interval)).await?;
        }
    }

    /// Wait for a job to finish. For a job created on its own, pass its ID as
    /// both `batch_id` and `job_id`.
    #[instrument(level = "debug", skip(self))]
    pub async fn wait_for_job_done(&mut self, batch_id: &str, job_id: &str) -> Result<JobResult> {
        self.poll_until_terminal(JobSource { batch_id, job_id })
            .await
    }

    /// Wait for a batch to finish.
    ///
    /// With `wait_jobs`, also wait for every job listed in the finished batch,
    /// one after the other. Each job gets a fresh deadline, so the total wait
    /// can reach one timeout per job.
    #[instrument(level = "debug", skip(self))]
    pub async fn wait_for_batch_done(
        &mut self,
        batch_id: &str,
        wait_jobs: bool,
    ) -> Result<BatchStatus> {
        let batch = self.poll_until_terminal(BatchSource { batch_id }).await?;
        if wait_jobs {
            for job in &batch.jobs {
                self.wait_for_job_done(batch_id, &job.job_id).await?;
            }
        }
        Ok(batch)
    }

    /// Create a job with [`Client::send_job`] and wait for it to finish.
    #[instrument(level = "debug", skip(self, files, options))]
    pub async fn create_and_wait_job(
        &mut self,
        service: &str,
        files: JobFiles,
        options: SendOptions,
    ) -> Result<JobResult> {
        let created = self.send_job(service, files, options).await?;
        self.wait_for_job_done(&created.id, &created.id).await
    }

    /// Create a batch with [`Client::send_batch`] and wait for it to finish.
    #[instrument(level = "debug", skip(self, document, options))]
    pub async fn create_and_wait_batch(
        &mut self,
        service: &str,
        document: FileContent,
        options: SendOptions,
        wait_jobs: bool,
    ) -> Result<BatchStatus> {
        let created = self.send_batch(service, document, options).await?;
        self.wait_for_batch_done(&created.id, wait_jobs).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::client::tests::scripted_client;

    fn job(status: &str) -> Value {
        json!({"job_ksuid": "J1", "status": status})
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_done_on_first_poll() {
        let (mut client, transport) = scripted_client();
        transport.push_json(200, job("done"));
        let result = client.wait_for_job_done("J1", "J1").await.unwrap();
        assert_eq!(result.status, Status::Done);
        assert_eq!(transport.paths(), ["/v2/ocr/job/result/J1/J1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_becomes_done_within_timeout() {
        let (mut client, transport) = scripted_client();
        transport.push_json(200, job("queued"));
        transport.push_json(200, job("processing"));
        transport.push_json(200, job("done"));

        let start = Instant::now();
        let result = client.wait_for_job_done("J1", "J1").await.unwrap();
        assert_eq!(result.status, Status::Done);
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_is_a_result_not_an_error() {
        let (mut client, transport) = scripted_client();
        transport.push_json(200, job("processing"));
        transport.push_json(
            200,
            json!({"job_ksuid": "J1", "status": "error", "error": "unreadable"}),
        );
        let result = client.wait_for_job_done("J1", "J1").await.unwrap();
        assert!(result.status.is_error());
        assert_eq!(result.error.as_deref(), Some("unreadable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_never_done_times_out() {
        let (mut client, transport) = scripted_client();
        for _ in 0..10 {
            transport.push_json(200, job("processing"));
        }

        let start = Instant::now();
        let err = client.wait_for_job_done("J1", "J1").await.unwrap_err();
        assert!(matches!(&err, Error::Timeout { what, .. } if what == "job J1"));

        // Timeout 3s, interval 1s: polls at 0, 1, 2 and 3 seconds.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_waits_without_deadline() {
        let (mut client, transport) = scripted_client();
        client.set_timeout(Duration::MAX);
        transport.push_json(200, job("processing"));
        transport.push_json(200, job("done"));

        let result = client.wait_for_job_done("J1", "J1").await.unwrap();
        assert_eq!(result.status, Status::Done);

        client.set_timeout(Duration::from_secs(u64::MAX));
        transport.push_json(200, job("done"));
        let result = client.wait_for_job_done("J1", "J1").await.unwrap();
        assert_eq!(result.status, Status::Done);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_stop_polling() {
        let (mut client, transport) = scripted_client();
        transport.push_json(200, job("processing"));
        transport.push_raw(502, b"bad gateway".to_vec());
        transport.push_json(200, job("done"));
        let err = client.wait_for_job_done("J1", "J1").await.unwrap_err();
        assert!(matches!(err, Error::Status { .. }));
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling_mid_sleep() {
        let (client, transport) = scripted_client();
        let cancel = CancellationToken::new();
        let mut client = client.with_cancellation(cancel.clone());
        client.set_interval(Duration::from_secs(600));
        client.set_timeout(Duration::from_secs(3600));
        transport.push_json(200, job("processing"));
        transport.push_json(200, job("done"));

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let err = client.wait_for_job_done("J1", "J1").await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_wait_jobs_polls_each_job_in_order() {
        let (mut client, transport) = scripted_client();
        transport.push_json(
            200,
            json!({
                "batch_ksuid": "B1",
                "status": "done",
                "jobs": [
                    {"job_ksuid": "J1", "status": "processing"},
                    {"job_ksuid": "J2", "status": "processing"}
                ]
            }),
        );
        transport.push_json(200, json!({"job_ksuid": "J1", "status": "done"}));
        transport.push_json(200, json!({"job_ksuid": "J2", "status": "done"}));

        let batch = client.wait_for_batch_done("B1", true).await.unwrap();
        assert_eq!(batch.batch_id, "B1");
        assert_eq!(batch.status, Status::Done);
        assert_eq!(batch.jobs.len(), 2);
        assert_eq!(
            transport.paths(),
            [
                "/v2/ocr/batch/status/B1",
                "/v2/ocr/job/result/B1/J1",
                "/v2/ocr/job/result/B1/J2",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_without_wait_jobs() {
        let (mut client, transport) = scripted_client();
        transport.push_json(200, json!({"batch_ksuid": "B1", "status": "processing"}));
        transport.push_json(
            200,
            json!({"batch_ksuid": "B1", "status": "done", "jobs": [{"job_ksuid": "J1"}]}),
        );
        let batch = client.wait_for_batch_done("B1", false).await.unwrap();
        assert_eq!(batch.jobs[0].job_id, "J1");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_batch_job_gets_a_fresh_deadline() {
        let (mut client, transport) = scripted_client();
        transport.push_json(
            200,
            json!({
                "batch_ksuid": "B1",
                "status": "done",
                "jobs": [{"job_ksuid": "J1"}, {"job_ksuid": "J2"}]
            }),
        );
        // Each job needs 3 seconds, the whole timeout, to finish.
        for id in ["J1", "J2"] {
            for status in ["queued", "processing", "processing", "done"] {
                transport.push_json(200, json!({"job_ksuid": id, "status": status}));
            }
        }

        let start = Instant::now();
        client.wait_for_batch_done("B1", true).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(6));
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_and_wait_job() {
        let (mut client, transport) = scripted_client();
        transport.push_json(
            200,
            json!({"id": "J7", "status_url": "x", "urls": {"document": "https://s3.test/d"}}),
        );
        transport.push_status(200);
        transport.push_json(200, json!({"job_ksuid": "J7", "status": "done"}));

        let result = client
            .create_and_wait_job("rg", JobFiles::new(b"doc".to_vec()), SendOptions::default())
            .await
            .unwrap();
        assert_eq!(result.job_id, "J7");
        assert_eq!(
            transport.paths(),
            ["/v2/ocr/job/rg", "/d", "/v2/ocr/job/result/J7/J7"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_and_wait_batch() {
        let (mut client, transport) = scripted_client();
        transport.push_json(
            200,
            json!({"id": "B7", "status_url": "x", "urls": {"document": "https://s3.test/d"}}),
        );
        transport.push_status(200);
        transport.push_json(200, json!({"batch_ksuid": "B7", "status": "error", "error": "bad pdf"}));

        let batch = client
            .create_and_wait_batch(
                "rg",
                FileContent::Bytes(b"%PDF".to_vec()),
                SendOptions::default(),
                true,
            )
            .await
            .unwrap();
        assert!(batch.status.is_error());
        assert_eq!(
            transport.paths(),
            ["/v2/ocr/batch/rg", "/d", "/v2/ocr/batch/status/B7"]
        );
    }
}
