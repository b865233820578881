//! Command-line entry points.

use std::{env, time::Duration};

use clap::Args;
use serde::Serialize;
use tokio::{
    fs::File,
    io::{AsyncWrite, AsyncWriteExt as _},
};
use tokio_util::sync::CancellationToken;
use ultraocr::{Client, ClientConfig, client::DEFAULT_EXPIRATION_MINUTES};

use crate::{
    prelude::*,
    ui::{ProgressConfig, Ui},
};

pub mod batch;
pub mod job;
pub mod jobs;
pub mod schema;
pub mod status;

/// Client ID environment variable.
const CLIENT_ID_VAR: &str = "ULTRAOCR_CLIENT_ID";
/// Client secret environment variable.
const CLIENT_SECRET_VAR: &str = "ULTRAOCR_CLIENT_SECRET";
/// API base URL override.
const BASE_URL_VAR: &str = "ULTRAOCR_BASE_URL";
/// Auth API base URL override.
const AUTH_BASE_URL_VAR: &str = "ULTRAOCR_AUTH_BASE_URL";

/// Options shared by every subcommand which talks to UltraOCR.
#[derive(Debug, Clone, Args)]
pub struct ClientOpts {
    /// How many seconds to wait for a job or batch before giving up.
    #[clap(long, global = true, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// How many seconds to sleep between status checks.
    #[clap(long, global = true, default_value = "1", value_name = "SECS")]
    interval: u64,

    /// Token lifetime in minutes (1 to 1440).
    #[clap(long, global = true, default_value_t = DEFAULT_EXPIRATION_MINUTES, value_name = "MINUTES")]
    expires: u32,
}

impl ClientOpts {
    /// Build a client from our options and the environment. The client
    /// authenticates on its first request, and again whenever its token
    /// expires. Ctrl-C cancels any request or wait in progress.
    pub fn build_client(&self) -> Result<Client> {
        let client_id = required_var(CLIENT_ID_VAR)?;
        let client_secret = required_var(CLIENT_SECRET_VAR)?;

        let mut config = ClientConfig {
            timeout: Duration::from_secs(self.timeout),
            interval: Duration::from_secs(self.interval),
            ..ClientConfig::default()
        };
        if let Ok(url) = env::var(BASE_URL_VAR) {
            config.base_url = url;
        }
        if let Ok(url) = env::var(AUTH_BASE_URL_VAR) {
            config.auth_base_url = url;
        }
        debug!(?config, "Building client");

        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                on_ctrl_c.cancel();
            }
        });

        let mut client = Client::with_config(config)
            .context("failed to create UltraOCR client")?
            .with_cancellation(cancel);
        client
            .enable_auto_refresh(client_id, client_secret, self.expires)
            .context("invalid --expires")?;
        Ok(client)
    }
}

/// Look up an environment variable we can't run without.
fn required_var(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set (a .env file works too)"))
}

/// Run `future` while showing a spinner.
pub async fn with_spinner<F, T>(ui: &Ui, config: &ProgressConfig<'_>, future: F) -> T
where
    F: Future<Output = T>,
{
    let spinner = ui.new_spinner(config);
    let output = future.await;
    spinner.finish();
    output
}

/// Open either `path` or standard output for writing.
async fn create_writer(
    path: Option<&Path>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create file at path: {:?}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write `value` as pretty-printed JSON to `path` or standard output.
pub async fn write_json<T>(path: Option<&Path>, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let mut json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    json.push('\n');
    let mut wtr = create_writer(path).await?;
    wtr.write_all(json.as_bytes())
        .await
        .context("failed to write output")?;
    wtr.flush().await.context("failed to flush output")?;
    Ok(())
}
