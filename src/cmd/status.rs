//! The `status` subcommand.

use clap::{Args, Subcommand};

use super::{ClientOpts, batch::wait_for_batch, job::wait_for_job, write_json};
use crate::{prelude::*, ui::Ui};

/// What to look up.
#[derive(Debug, Subcommand)]
pub enum StatusTarget {
    /// The result of a job.
    Job {
        /// The batch the job belongs to. For a job created on its own, this is
        /// the job ID.
        batch_id: String,

        /// The job ID. Defaults to the batch ID.
        job_id: Option<String>,
    },
    /// The status of a batch.
    Batch {
        /// The batch ID.
        batch_id: String,

        /// Also wait for every job in the batch. Implies `--wait`.
        #[clap(long)]
        wait_jobs: bool,
    },
}

/// Status command line arguments.
#[derive(Debug, Args)]
pub struct StatusOpts {
    #[clap(subcommand)]
    target: StatusTarget,

    /// Keep polling until the job or batch finishes.
    #[clap(long, global = true)]
    wait: bool,

    /// Where to write the output. Defaults to stdout.
    #[clap(short = 'o', long = "out", global = true)]
    pub output_path: Option<PathBuf>,
}

/// The `status` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_status(ui: Ui, client_opts: &ClientOpts, opts: &StatusOpts) -> Result<()> {
    let mut client = client_opts.build_client()?;
    let output_path = opts.output_path.as_deref();

    match &opts.target {
        StatusTarget::Job { batch_id, job_id } => {
            let job_id = job_id.as_deref().unwrap_or(batch_id);
            let result = if opts.wait {
                wait_for_job(&ui, &mut client, batch_id, job_id).await?
            } else {
                client
                    .get_job_result(batch_id, job_id)
                    .await
                    .with_context(|| format!("failed to get job {job_id}"))?
            };
            write_json(output_path, &result).await
        }
        StatusTarget::Batch {
            batch_id,
            wait_jobs,
        } => {
            let status = if opts.wait || *wait_jobs {
                wait_for_batch(&ui, &mut client, batch_id, *wait_jobs).await?
            } else {
                client
                    .get_batch_status(batch_id)
                    .await
                    .with_context(|| format!("failed to get batch {batch_id}"))?
            };
            write_json(output_path, &status).await
        }
    }
}
