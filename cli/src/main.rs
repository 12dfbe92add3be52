mod cli;

use azrest_index::dedup::{Deduplicator, RuleRecord};
use azrest_index::path_pattern::{self, ParamTableRecord};
use azrest_index::{github_link, index, persist};
use clap::Parser;
use cli::{BuildArgs, Cli, Command, LookupArgs};
use std::io::Write;
use std::path::Path;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Lookup(args) => run_lookup(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_build(args: BuildArgs) -> Result<(), BoxError> {
    let param_table = match &args.param_table {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let records: Vec<ParamTableRecord> = serde_json::from_str(&raw)?;
            path_pattern::param_table_from_records(records)
        }
        None => path_pattern::default_param_table(),
    };

    let dedup = match &args.dedup {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let records: Vec<RuleRecord> = serde_json::from_str(&raw)?;
            Deduplicator::compile(&records)?
        }
        None => Deduplicator { rules: vec![] },
    };

    let mut built = index::build_index(&args.spec_dir, &param_table, &dedup)?;

    if !args.services.is_empty() {
        let wanted: std::collections::HashSet<String> = args.services.iter().map(|s| s.to_ascii_uppercase()).collect();
        built.resource_providers.retain(|rp, _| {
            let rp_upper = rp.to_ascii_uppercase();
            wanted.iter().any(|w| rp_upper.contains(w.as_str()))
        });
    }

    built.specdir = args.spec_dir.display().to_string();
    if let Some(commit) = args.commit {
        built.commit = commit;
    } else if let Some(commit) = head_commit(&args.spec_dir) {
        built.commit = commit;
    }

    let json = persist::to_json(&built)?;
    match args.output {
        Some(path) => std::fs::write(&path, json)?,
        None => {
            let mut stdout = std::io::stdout();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn run_lookup(args: LookupArgs) -> Result<(), BoxError> {
    let loaded = persist::read_from_path(&args.index)?;
    let url = url::Url::parse(&args.url)?;
    let op_ref = loaded.lookup(&args.method, &url)?;

    println!("{}#{}", op_ref.spec_file.display(), op_ref.pointer);

    if let Some(spec_dir) = &args.spec_dir {
        if !loaded.commit.is_empty() {
            // `op_ref.spec_file` is already the full path used while building the
            // index (it was discovered under `--spec-dir`), so it's directly
            // readable; the permalink only wants the part relative to `spec_dir`.
            let rel_file = op_ref.spec_file.strip_prefix(spec_dir).unwrap_or(&op_ref.spec_file);
            let contents = std::fs::read_to_string(&op_ref.spec_file)?;
            let link = github_link::permalink(&loaded.commit, &rel_file.to_string_lossy(), &op_ref.pointer, &contents)?;
            println!("{link}");
        }
    }
    Ok(())
}

/// Reads the checked-out HEAD commit of `dir`'s git repository, if any.
fn head_commit(dir: &Path) -> Option<String> {
    let repo = git2::Repository::discover(dir).ok()?;
    let head = repo.head().ok()?;
    let commit = head.peel_to_commit().ok()?;
    Some(commit.id().to_string())
}
