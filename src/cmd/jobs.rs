//! The `jobs` subcommand.

use anyhow::ensure;
use chrono::NaiveDate;
use clap::Args;

use super::{ClientOpts, write_json};
use crate::prelude::*;

/// Jobs command line arguments.
#[derive(Debug, Args)]
pub struct JobsOpts {
    /// First day to list, as YYYY-MM-DD.
    start: NaiveDate,

    /// Last day to list, as YYYY-MM-DD.
    end: NaiveDate,

    /// Where to write the output. Defaults to stdout.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `jobs` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_jobs(client_opts: &ClientOpts, opts: &JobsOpts) -> Result<()> {
    ensure!(
        opts.start <= opts.end,
        "start date {} is after end date {}",
        opts.start,
        opts.end
    );
    let mut client = client_opts.build_client()?;
    let jobs = client
        .get_jobs(opts.start, opts.end)
        .await
        .context("failed to list jobs")?;
    info!(count = jobs.len(), "Listed jobs");
    write_json(opts.output_path.as_deref(), &jobs).await
}
