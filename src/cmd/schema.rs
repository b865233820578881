//! The `schema` subcommand.

use clap::{Args, ValueEnum};
use schemars::schema_for;
use ultraocr::{BatchStatus, CreatedResponse, JobResult, SignedUrlResponse};

use super::write_json;
use crate::prelude::*;

/// The different schema types we support.
///
/// We parse these as PascalCase, because they represent type names.
#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "PascalCase")]
pub enum SchemaType {
    /// Output of `job` and `batch` without `--wait`.
    CreatedResponse,
    /// Presigned upload URLs.
    SignedUrlResponse,
    /// Output of `batch --wait` and `status batch`.
    BatchStatus,
    /// Output of `job --wait` and `status job`. `jobs` prints a list of these.
    JobResult,
}

/// Schema command line arguments.
#[derive(Debug, Args)]
pub struct SchemaOpts {
    /// The schema type to generate.
    #[clap(value_enum, value_name = "TYPE")]
    pub schema_type: SchemaType,

    /// The output path to write the schema to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `schema` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_schema(schema_opts: &SchemaOpts) -> Result<()> {
    let schema = match schema_opts.schema_type {
        SchemaType::CreatedResponse => schema_for!(CreatedResponse),
        SchemaType::SignedUrlResponse => schema_for!(SignedUrlResponse),
        SchemaType::BatchStatus => schema_for!(BatchStatus),
        SchemaType::JobResult => schema_for!(JobResult),
    };
    write_json(schema_opts.output_path.as_deref(), &schema).await
}
