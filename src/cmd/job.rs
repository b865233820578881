//! The `job` subcommand.

use clap::Args;
use serde_json::{Map, Value};
use ultraocr::{Client, FileContent, JobFiles, JobResult, SendOptions};

use super::{ClientOpts, with_spinner, write_json};
use crate::{
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// Options shared by `job` and `batch`.
#[derive(Debug, Clone, Args)]
pub struct SubmitOpts {
    /// Metadata to attach, as a JSON object. Returned later as `client_data`.
    #[clap(long, value_parser = parse_metadata, value_name = "JSON")]
    metadata: Option<Map<String, Value>>,

    /// Extra query parameters, such as `--param language=pt`.
    #[clap(long = "param", value_parser = parse_param, value_name = "KEY=VALUE")]
    params: Vec<(String, String)>,

    /// Upload files as Base64 text instead of raw bytes.
    #[clap(long)]
    base64: bool,
}

impl SubmitOpts {
    /// Convert to library options.
    pub fn to_send_options(&self) -> SendOptions {
        let mut options = SendOptions {
            metadata: self.metadata.clone().unwrap_or_default(),
            params: self.params.iter().cloned().collect(),
        };
        if self.base64 {
            options = options.with_param("base64", "true");
        }
        options
    }
}

/// Parse `--metadata`.
fn parse_metadata(s: &str) -> Result<Map<String, Value>, String> {
    serde_json::from_str(s).map_err(|err| format!("expected a JSON object: {err}"))
}

/// Parse `--param KEY=VALUE`.
fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))
}

/// Job command line arguments.
#[derive(Debug, Args)]
pub struct JobOpts {
    /// The document type, such as `cnh` or `rg`.
    service: String,

    /// The document to process.
    file: PathBuf,

    /// A selfie to compare against the photo on the document.
    #[clap(long, value_name = "FILE")]
    facematch: Option<PathBuf>,

    /// An extra page, such as the back of an ID card.
    #[clap(long, value_name = "FILE")]
    extra: Option<PathBuf>,

    /// Send the document inline in one request, instead of uploading it to a
    /// presigned URL. Only for small files.
    #[clap(long)]
    single_step: bool,

    /// Wait for the job to finish and print its result.
    #[clap(long)]
    wait: bool,

    #[clap(flatten)]
    submit: SubmitOpts,

    /// Where to write the output. Defaults to stdout.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `job` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_job(ui: Ui, client_opts: &ClientOpts, opts: &JobOpts) -> Result<()> {
    let mut client = client_opts.build_client()?;

    let mut files = JobFiles::new(FileContent::Path(opts.file.clone()));
    if let Some(path) = &opts.facematch {
        files = files.with_facematch(FileContent::Path(path.clone()));
    }
    if let Some(path) = &opts.extra {
        files = files.with_extra_document(FileContent::Path(path.clone()));
    }
    let options = opts.submit.to_send_options();

    let created = if opts.single_step {
        client
            .send_job_single_step(&opts.service, files, options)
            .await
    } else {
        client.send_job(&opts.service, files, options).await
    }
    .with_context(|| format!("failed to create {} job", opts.service))?;

    if opts.wait {
        let result = wait_for_job(&ui, &mut client, &created.id, &created.id).await?;
        write_json(opts.output_path.as_deref(), &result).await
    } else {
        write_json(opts.output_path.as_deref(), &created).await
    }
}

/// Wait for a job with a spinner.
pub async fn wait_for_job(
    ui: &Ui,
    client: &mut Client,
    batch_id: &str,
    job_id: &str,
) -> Result<JobResult> {
    let msg = format!("Waiting for job {job_id}");
    let result = with_spinner(
        ui,
        &ProgressConfig {
            emoji: "📄",
            msg: &msg,
            done_msg: "Job finished",
        },
        client.wait_for_job_done(batch_id, job_id),
    )
    .await
    .with_context(|| format!("failed waiting for job {job_id}"))?;
    info!(id = %result.job_id, status = %result.status, "Job finished");
    Ok(result)
}
