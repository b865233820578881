//! A client for the UltraOCR document extraction API.
//!
//! The usual flow is: authenticate, upload a document to a presigned URL, then
//! poll until the job finishes.
//!
//! ```no_run
//! use ultraocr::{Client, JobFiles, SendOptions};
//!
//! # async fn example() -> ultraocr::Result<()> {
//! let mut client = Client::new()?;
//! client.authenticate("my-client-id", "my-client-secret", 60).await?;
//!
//! let files = JobFiles::new(std::path::PathBuf::from("cnh.pdf"));
//! let result = client
//!     .create_and_wait_job("cnh", files, SendOptions::default())
//!     .await?;
//! println!("{}: {}", result.job_id, result.status);
//! # Ok(())
//! # }
//! ```
//!
//! Long-lived programs can call [`Client::enable_auto_refresh`] instead, which
//! authenticates again whenever the token expires.

pub mod client;
pub mod error;
mod prelude;
pub mod transport;
pub mod types;

pub use self::{
    client::{
        Client, ClientConfig, QueryParams,
        upload::{FileContent, JobFiles, SendOptions},
    },
    error::{Error, Result},
    transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport},
    types::{
        BatchJob, BatchStatus, CreatedResponse, JobOutput, JobResult, JobsPage, Resource,
        SignedUrlResponse, Status, UploadSlot,
    },
};
