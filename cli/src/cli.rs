use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "azrest", version, about = "Builds and queries an Azure REST API operation index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk a spec tree and write the resulting operation index as JSON.
    Build(BuildArgs),
    /// Resolve a method + URL to the operation reference that serves it.
    Lookup(LookupArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Root directory containing the `specification/` tree.
    #[arg(long = "spec-dir", value_name = "DIR")]
    pub spec_dir: PathBuf,

    /// Where to write the pretty-printed index JSON; stdout if omitted.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// JSON file of deduplication rules, evaluated against build-time collisions.
    #[arg(long, value_name = "FILE")]
    pub dedup: Option<PathBuf>,

    /// JSON file overriding the built-in enum-parameter expansion table.
    #[arg(long = "param-table", value_name = "FILE")]
    pub param_table: Option<PathBuf>,

    /// Restrict the build to these resource-provider directory names (comma-separated).
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub services: Vec<String>,

    /// Commit hash to stamp into the index's `commit` field.
    #[arg(long)]
    pub commit: Option<String>,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Path to a previously built index JSON file.
    #[arg(long, value_name = "FILE")]
    pub index: PathBuf,

    /// HTTP method of the request to resolve, e.g. GET.
    #[arg(long, value_name = "METHOD")]
    pub method: String,

    /// Request URL, including its `api-version` query parameter.
    #[arg(long, value_name = "URL")]
    pub url: String,

    /// Root directory of the spec tree; enables a GitHub permalink in the output.
    #[arg(long = "spec-dir", value_name = "DIR")]
    pub spec_dir: Option<PathBuf>,
}
