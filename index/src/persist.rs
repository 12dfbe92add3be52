//! Component H — persistence.
//!
//! The `Index` type (in [`crate::index`]) already derives `Serialize`/
//! `Deserialize` over `BTreeMap`s, which gives byte-stable, lexicographically
//! sorted JSON for free (invariant 4 in spec.md §3). This module is the thin
//! read/write wrapper plus the round-trip property test.

use crate::index::Index;
use snafu::{ResultExt, Snafu};
use std::io::Write;
use std::path::Path;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("reading index file {}: {}", path.display(), source))]
    Read { path: std::path::PathBuf, source: std::io::Error },
    #[snafu(display("writing index file {}: {}", path.display(), source))]
    Write { path: std::path::PathBuf, source: std::io::Error },
    #[snafu(display("deserializing index: {}", source))]
    Deserialize { source: serde_json::Error },
    #[snafu(display("serializing index: {}", source))]
    Serialize { source: serde_json::Error },
}

/// Pretty-printed, sorted-key JSON, per spec.md §4.H / §6.
pub fn to_json(index: &Index) -> Result<String> {
    serde_json::to_string_pretty(index).context(SerializeSnafu)
}

pub fn from_json(raw: &str) -> Result<Index> {
    serde_json::from_str(raw).context(DeserializeSnafu)
}

pub fn write_to_path(index: &Index, path: &Path) -> Result<()> {
    let json = to_json(index)?;
    let mut file = std::fs::File::create(path).context(WriteSnafu { path: path.to_owned() })?;
    file.write_all(json.as_bytes()).context(WriteSnafu { path: path.to_owned() })
}

pub fn read_from_path(path: &Path) -> Result<Index> {
    let raw = std::fs::read_to_string(path).context(ReadSnafu { path: path.to_owned() })?;
    from_json(&raw)
}
