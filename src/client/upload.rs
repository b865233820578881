//! Submitting jobs and batches.
//!
//! The usual flow has three steps:
//!
//! 1. Ask UltraOCR for a set of presigned upload URLs.
//! 2. PUT the document to the `document` slot.
//! 3. PUT the optional selfie and extra page to the `selfie` and
//!    `extra_document` slots.
//!
//! Each step stops the sequence on failure. Nothing is rolled back, so a
//! caller that sees an error may already have uploaded the main document.
//!
//! [`Client::send_job_single_step`] skips the presigned URLs and sends
//! everything in one JSON body, which limits the total size to about 6MB.

use base64::{Engine as _, prelude::BASE64_STANDARD};
use reqwest::{Method, StatusCode, Url};

use crate::{
    prelude::*,
    transport::HttpRequest,
    types::{CreatedResponse, Resource, SignedUrlResponse, UploadSlot},
};

use super::{Client, request::QueryParams};

/// Query flag asking for a `selfie` upload slot.
pub const KEY_FACEMATCH: &str = "facematch";

/// Query flag asking for an `extra_document` upload slot.
pub const KEY_EXTRA: &str = "extra-document";

/// Query flag announcing that uploads are Base64 text.
pub const KEY_BASE64: &str = "base64";

/// The value we use for a set flag.
const FLAG_TRUE: &str = "true";

/// Where a file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Read the file from disk when it's needed.
    Path(PathBuf),
    /// Raw file contents.
    Bytes(Vec<u8>),
    /// File contents already encoded as Base64 text.
    Base64(String),
}

impl FileContent {
    /// Is this already Base64 text?
    pub fn is_base64(&self) -> bool {
        matches!(self, FileContent::Base64(_))
    }

    /// The contents exactly as given. Base64 text stays Base64 text.
    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            FileContent::Path(path) => read_file(&path).await,
            FileContent::Bytes(bytes) => Ok(bytes),
            FileContent::Base64(text) => Ok(text.into_bytes()),
        }
    }

    /// The contents as Base64 text.
    pub async fn into_base64(self) -> Result<String> {
        match self {
            FileContent::Path(path) => Ok(BASE64_STANDARD.encode(read_file(&path).await?)),
            FileContent::Bytes(bytes) => Ok(BASE64_STANDARD.encode(bytes)),
            FileContent::Base64(text) => Ok(text),
        }
    }

    /// The decoded file contents.
    pub async fn into_raw(self) -> Result<Vec<u8>> {
        match self {
            FileContent::Base64(text) => BASE64_STANDARD
                .decode(text.trim())
                .map_err(|err| Error::Mount(format!("invalid Base64 file content: {err}"))),
            other => other.into_bytes().await,
        }
    }

    /// The upload body, either Base64 text or raw bytes.
    async fn into_upload_body(self, base64: bool) -> Result<Vec<u8>> {
        if base64 {
            Ok(self.into_base64().await?.into_bytes())
        } else {
            self.into_raw().await
        }
    }
}

impl From<PathBuf> for FileContent {
    fn from(path: PathBuf) -> Self {
        FileContent::Path(path)
    }
}

impl From<&Path> for FileContent {
    fn from(path: &Path) -> Self {
        FileContent::Path(path.to_owned())
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(bytes: Vec<u8>) -> Self {
        FileContent::Bytes(bytes)
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| Error::FileRead {
        path: path.to_owned(),
        source,
    })
}

/// The files that make up one job.
///
/// The `facematch` and `extra-document` flags are derived from which optional
/// files are present: a facematch file goes to the `selfie` slot, and an extra
/// file goes to the `extra_document` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFiles {
    /// The main document.
    pub document: FileContent,

    /// A selfie to match against the document photo.
    pub facematch: Option<FileContent>,

    /// A second page, such as the back of an ID card.
    pub extra_document: Option<FileContent>,
}

impl JobFiles {
    /// A job with just a document.
    pub fn new(document: impl Into<FileContent>) -> Self {
        Self {
            document: document.into(),
            facematch: None,
            extra_document: None,
        }
    }

    /// Add a selfie for face matching.
    pub fn with_facematch(mut self, file: impl Into<FileContent>) -> Self {
        self.facematch = Some(file.into());
        self
    }

    /// Add an extra document page.
    pub fn with_extra_document(mut self, file: impl Into<FileContent>) -> Self {
        self.extra_document = Some(file.into());
        self
    }

    /// Set or clear the slot flags in `params` to match our files.
    fn apply_flags(&self, params: &mut QueryParams) {
        for (key, present) in [
            (KEY_FACEMATCH, self.facematch.is_some()),
            (KEY_EXTRA, self.extra_document.is_some()),
        ] {
            if present {
                params.insert(key.to_owned(), FLAG_TRUE.to_owned());
            } else if params.remove(key).is_some() {
                warn!(flag = key, "Ignoring flag with no matching file");
            }
        }
    }
}

/// Metadata and extra query parameters for a new job or batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    /// Arbitrary metadata, returned later as `client_data`.
    pub metadata: Map<String, Value>,

    /// Extra query parameters.
    pub params: QueryParams,
}

impl SendOptions {
    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Are uploads Base64 text? Defaults to the form of the main document, unless
/// the caller set the flag explicitly.
fn resolve_base64_mode(document: &FileContent, params: &mut QueryParams) -> bool {
    if document.is_base64() {
        params
            .entry(KEY_BASE64.to_owned())
            .or_insert_with(|| FLAG_TRUE.to_owned());
    }
    params.get(KEY_BASE64).is_some_and(|v| v == FLAG_TRUE)
}

/// Body of the single-step job endpoint.
#[derive(Serialize)]
struct SingleStepBody<'a> {
    data: String,
    metadata: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    facematch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<String>,
}

impl Client {
    /// PUT a file to a presigned URL. The content is sent exactly as given.
    #[instrument(level = "debug", skip_all)]
    pub async fn upload_file(&self, url: &str, content: FileContent) -> Result<()> {
        let body = self.cancellable(content.into_bytes()).await??;
        self.put_presigned(url, body).await
    }

    /// PUT a body to a presigned URL. These URLs carry their own credentials,
    /// so we don't send our bearer token.
    async fn put_presigned(&self, url: &str, body: Vec<u8>) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|err| Error::Mount(format!("invalid upload URL {url:?}: {err}")))?;
        let mut request = HttpRequest::new(Method::PUT, parsed);
        let size = body.len();
        request.body = Some(body);

        let response = self.send(request).await?;
        if response.status != StatusCode::OK {
            return Err(Error::Status {
                url: url.to_owned(),
                status: response.status,
                body: response.body_text(),
            });
        }
        debug!(size, "Uploaded file");
        Ok(())
    }

    /// Upload `content` to one slot of a signed-URL response.
    async fn upload_to_slot(
        &self,
        signed: &SignedUrlResponse,
        slot: UploadSlot,
        content: FileContent,
        base64: bool,
    ) -> Result<()> {
        let url = signed.url_for(slot)?;
        debug!(slot = slot.as_str(), base64, "Uploading to slot");
        let body = self
            .cancellable(content.into_upload_body(base64))
            .await??;
        self.put_presigned(url, body).await
    }

    /// Create a job and upload its files through presigned URLs.
    ///
    /// If the main document is [`FileContent::Base64`], the `base64=true`
    /// flag is set and every file is uploaded as Base64 text.
    #[instrument(level = "debug", skip(self, files, options))]
    pub async fn send_job(
        &mut self,
        service: &str,
        files: JobFiles,
        options: SendOptions,
    ) -> Result<CreatedResponse> {
        let SendOptions {
            metadata,
            mut params,
        } = options;
        files.apply_flags(&mut params);
        let base64 = resolve_base64_mode(&files.document, &mut params);

        let signed = self
            .generate_signed_url(service, Resource::Job, &metadata, &params)
            .await?;

        let JobFiles {
            document,
            facematch,
            extra_document,
        } = files;
        self.upload_to_slot(&signed, UploadSlot::Document, document, base64)
            .await?;
        if let Some(facematch) = facematch {
            self.upload_to_slot(&signed, UploadSlot::Selfie, facematch, base64)
                .await?;
        }
        if let Some(extra_document) = extra_document {
            self.upload_to_slot(&signed, UploadSlot::ExtraDocument, extra_document, base64)
                .await?;
        }

        info!(id = %signed.id, "Created job");
        Ok(signed.into())
    }

    /// Create a batch and upload its document through a presigned URL.
    #[instrument(level = "debug", skip(self, document, options))]
    pub async fn send_batch(
        &mut self,
        service: &str,
        document: FileContent,
        options: SendOptions,
    ) -> Result<CreatedResponse> {
        let SendOptions {
            metadata,
            mut params,
        } = options;
        let base64 = resolve_base64_mode(&document, &mut params);

        let signed = self
            .generate_signed_url(service, Resource::Batch, &metadata, &params)
            .await?;
        self.upload_to_slot(&signed, UploadSlot::Document, document, base64)
            .await?;

        info!(id = %signed.id, "Created batch");
        Ok(signed.into())
    }

    /// Create a job with a single request, embedding every file as Base64.
    ///
    /// The request body is limited to about 6MB. Use [`Client::send_job`] for
    /// anything larger.
    #[instrument(level = "debug", skip(self, files, options))]
    pub async fn send_job_single_step(
        &mut self,
        service: &str,
        files: JobFiles,
        options: SendOptions,
    ) -> Result<CreatedResponse> {
        let SendOptions {
            metadata,
            mut params,
        } = options;
        files.apply_flags(&mut params);

        let JobFiles {
            document,
            facematch,
            extra_document,
        } = files;
        let body = SingleStepBody {
            data: self.cancellable(document.into_base64()).await??,
            metadata: &metadata,
            facematch: match facematch {
                Some(file) => Some(self.cancellable(file.into_base64()).await??),
                None => None,
            },
            extra: match extra_document {
                Some(file) => Some(self.cancellable(file.into_base64()).await??),
                None => None,
            },
        };

        let url = self.api_url(&["ocr", "job", "send", service])?;
        let created: CreatedResponse = self.post_json(url, &body, &params).await?;
        info!(id = %created.id, "Created job in a single step");
        Ok(created)
    }
}
