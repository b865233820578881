use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, ui::Ui};

mod cmd;
mod ui;

/// Standard APIs we use everywhere.
#[allow(unused_imports)]
mod prelude {
    pub use std::path::{Path, PathBuf};

    pub use anyhow::{Context as _, Result};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

/// Extract data from documents with UltraOCR.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - ULTRAOCR_CLIENT_ID: Your UltraOCR client ID.
  - ULTRAOCR_CLIENT_SECRET: Your UltraOCR client secret.
  - ULTRAOCR_BASE_URL (optional): Override the API server URL.
  - ULTRAOCR_AUTH_BASE_URL (optional): Override the authentication server URL.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(flatten)]
    client_opts: cmd::ClientOpts,

    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Create a job for a single document.
    Job(cmd::job::JobOpts),
    /// Create a batch from a file holding many documents.
    Batch(cmd::batch::BatchOpts),
    /// Look up (or wait for) a job or batch.
    Status(cmd::status::StatusOpts),
    /// List all jobs created between two dates.
    Jobs(cmd::jobs::JobsOpts),
    /// Print schemas for our output formats.
    Schema(cmd::schema::SchemaOpts),
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);

    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    let client_opts = &opts.client_opts;
    match &opts.subcmd {
        Cmd::Job(job_opts) => cmd::job::cmd_job(ui, client_opts, job_opts).await,
        Cmd::Batch(batch_opts) => cmd::batch::cmd_batch(ui, client_opts, batch_opts).await,
        Cmd::Status(status_opts) => {
            cmd::status::cmd_status(ui, client_opts, status_opts).await
        }
        Cmd::Jobs(jobs_opts) => cmd::jobs::cmd_jobs(client_opts, jobs_opts).await,
        Cmd::Schema(schema_opts) => cmd::schema::cmd_schema(schema_opts).await,
    }
}
