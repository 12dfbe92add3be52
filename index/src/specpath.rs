//! Component B — spec-path classifier.
//!
//! Recognizes the canonical ARM spec directory layout:
//! `<rp>/resource-manager[/<subservice>]/<providerMS>/{stable|preview}/<version>/<file>.json`
//! and decomposes a path into its fields, reversibly.

use snafu::Snafu;
use std::path::{Path, PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("path {} is not under root {}", path.display(), root.display()))]
    NotUnderRoot { root: PathBuf, path: PathBuf },
    #[snafu(display("path {} does not end in .json", path.display()))]
    NotJson { path: PathBuf },
    #[snafu(display("path {} has an unrecognized segment shape (expected <rp>/resource-manager[/<subservice>]/<providerMS>/(stable|preview)/<version>/<file>.json)", path.display()))]
    WrongShape { path: PathBuf },
}

/// The decomposed fields of a recognized spec file path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Info {
    pub resource_provider: String,
    pub resource_provider_ms: String,
    pub is_preview: bool,
    pub version: String,
    pub spec_name: String,
    subservice: Option<String>,
}

impl Info {
    /// Reconstructs the relative path this `Info` was parsed from.
    pub fn to_path(&self) -> PathBuf {
        let stage = if self.is_preview { "preview" } else { "stable" };
        let mut p = PathBuf::new();
        p.push(&self.resource_provider);
        p.push("resource-manager");
        p.push(&self.resource_provider_ms);
        if let Some(sub) = &self.subservice {
            p.push(sub);
        }
        p.push(stage);
        p.push(&self.version);
        p.push(&self.spec_name);
        p
    }
}

/// Decomposes `path` (which must live under `root_dir`) into its spec-path fields.
pub fn spec_path_info<P: AsRef<Path>, Q: AsRef<Path>>(root_dir: P, path: Q) -> Result<Info> {
    let root_dir = root_dir.as_ref();
    let path = path.as_ref();

    let rel = path.strip_prefix(root_dir).map_err(|_| Error::NotUnderRoot {
        root: root_dir.to_owned(),
        path: path.to_owned(),
    })?;

    if rel.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(Error::NotJson { path: path.to_owned() });
    }

    let segments: Vec<&str> = rel.iter().map(|s| s.to_str().unwrap_or_default()).collect();

    // <rp> / resource-manager / <subservice>? / <providerMS> / stable|preview / <version> / <file>.json
    let (resource_provider, providerms_idx) = match segments.as_slice() {
        [rp, rm, ..] if rm.eq_ignore_ascii_case("resource-manager") => (rp.to_string(), 2),
        _ => return Err(Error::WrongShape { path: path.to_owned() }),
    };

    // From providerms_idx, the remaining shape is either:
    //   <providerMS> / stage / version / file   (4 segments)
    //   <providerMS> / <subservice> / stage / version / file   (5 segments)
    let remaining = &segments[providerms_idx..];
    let (resource_provider_ms, subservice, stage, version, spec_name) = match remaining {
        [ms, stage, version, file] => (ms.to_string(), None, *stage, *version, *file),
        [ms, sub, stage, version, file] => (ms.to_string(), Some(sub.to_string()), *stage, *version, *file),
        _ => return Err(Error::WrongShape { path: path.to_owned() }),
    };

    let is_preview = if stage.eq_ignore_ascii_case("preview") {
        true
    } else if stage.eq_ignore_ascii_case("stable") {
        false
    } else {
        return Err(Error::WrongShape { path: path.to_owned() });
    };

    Ok(Info {
        resource_provider,
        resource_provider_ms,
        is_preview,
        version: version.to_string(),
        spec_name: spec_name.to_string(),
        subservice,
    })
}
