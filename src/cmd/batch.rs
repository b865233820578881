//! The `batch` subcommand.

use clap::Args;
use ultraocr::{BatchStatus, Client, FileContent};

use super::{ClientOpts, job::SubmitOpts, with_spinner, write_json};
use crate::{
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// Batch command line arguments.
#[derive(Debug, Args)]
pub struct BatchOpts {
    /// The document type, such as `cnh` or `rg`.
    service: String,

    /// A file holding many documents, such as a multi-page PDF.
    file: PathBuf,

    /// Wait for the batch to finish and print its status.
    #[clap(long)]
    wait: bool,

    /// Also wait for every job in the batch. Implies `--wait`.
    #[clap(long)]
    wait_jobs: bool,

    #[clap(flatten)]
    submit: SubmitOpts,

    /// Where to write the output. Defaults to stdout.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `batch` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_batch(ui: Ui, client_opts: &ClientOpts, opts: &BatchOpts) -> Result<()> {
    let mut client = client_opts.build_client()?;

    let created = client
        .send_batch(
            &opts.service,
            FileContent::Path(opts.file.clone()),
            opts.submit.to_send_options(),
        )
        .await
        .with_context(|| format!("failed to create {} batch", opts.service))?;

    if opts.wait || opts.wait_jobs {
        let status = wait_for_batch(&ui, &mut client, &created.id, opts.wait_jobs).await?;
        write_json(opts.output_path.as_deref(), &status).await
    } else {
        write_json(opts.output_path.as_deref(), &created).await
    }
}

/// Wait for a batch with a spinner.
pub async fn wait_for_batch(
    ui: &Ui,
    client: &mut Client,
    batch_id: &str,
    wait_jobs: bool,
) -> Result<BatchStatus> {
    let msg = format!("Waiting for batch {batch_id}");
    let status = with_spinner(
        ui,
        &ProgressConfig {
            emoji: "📚",
            msg: &msg,
            done_msg: "Batch finished",
        },
        client.wait_for_batch_done(batch_id, wait_jobs),
    )
    .await
    .with_context(|| format!("failed waiting for batch {batch_id}"))?;
    info!(
        id = %status.batch_id,
        status = %status.status,
        jobs = status.jobs.len(),
        "Batch finished"
    );
    Ok(status)
}
