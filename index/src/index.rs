//! Component E — the index builder and its persisted data model.

use crate::dedup::Deduplicator;
use crate::locator::{derive, HttpMethod, OperationLocator, Rp};
use crate::manifest::spec_list_from_readme;
use crate::opref::OperationRef;
use crate::path_pattern::{self, ParamTable};
use crate::specpath::spec_path_info;
use crate::swagger::Spec;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("reading readme {}: {}", path.display(), source))]
    ReadReadme { path: PathBuf, source: std::io::Error },
    #[snafu(display("parsing readme {}: {}", path.display(), source))]
    Manifest { path: PathBuf, source: crate::manifest::Error },
    #[snafu(display("loading spec {}: {}", path.display(), source))]
    SpecLoad { path: PathBuf, source: crate::swagger::Error },
    #[snafu(display("spec {} has no info.version", path.display()))]
    MissingVersion { path: PathBuf },
    #[snafu(display("classifying spec path {}: {}", path.display(), source))]
    SpecPath { path: PathBuf, source: crate::specpath::Error },
    #[snafu(display("parsing path pattern for {} {} in {}: {}", method, path_key, path.display(), source))]
    ParsePattern {
        path: PathBuf,
        path_key: String,
        method: String,
        source: path_pattern::Error,
    },
    #[snafu(display(
        "duplicate operation at locator {:?} pattern {} within spec {}",
        locator,
        pattern,
        path.display()
    ))]
    DuplicateWithinSpec { path: PathBuf, locator: String, pattern: String },
    #[snafu(display("deduplicating collision: {}", source))]
    Dedup { source: crate::dedup::Error },
}

pub type OperationRefs = BTreeMap<String, OperationRef>;
pub type Actions = BTreeMap<String, OperationRefs>;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationInfo {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub operation_refs: OperationRefs,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: Actions,
}

pub type ResourceTypes = BTreeMap<String, OperationInfo>;
pub type ApiMethods = BTreeMap<String, ResourceTypes>;
pub type ApiVersions = BTreeMap<String, ApiMethods>;
pub type ResourceProviders = BTreeMap<String, ApiVersions>;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Index {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub specdir: String,
    pub resource_providers: ResourceProviders,
}

impl Index {
    /// Inserts one `(locator, pattern, ref)` triple, returning the prior
    /// value if the slot was already occupied (a same-spec duplicate is the
    /// caller's responsibility to reject; cross-spec collisions are
    /// resolved later by [`Deduplicator`]).
    fn insert(&mut self, locator: &OperationLocator, pattern_key: &str, op_ref: OperationRef) -> Option<OperationRef> {
        let info = self
            .resource_providers
            .entry(locator.rp.as_key().to_owned())
            .or_default()
            .entry(locator.version.clone())
            .or_default()
            .entry(locator.method.as_str().to_owned())
            .or_default()
            .entry(locator.resource_type.clone())
            .or_default();

        let map = if locator.action.is_empty() {
            &mut info.operation_refs
        } else {
            info.actions.entry(locator.action.clone()).or_default()
        };
        map.insert(pattern_key.to_owned(), op_ref)
    }

    fn remove_empty(&mut self, locator: &OperationLocator, pattern_key: &str) {
        if let Some(versions) = self.resource_providers.get_mut(locator.rp.as_key()) {
            if let Some(methods) = versions.get_mut(&locator.version) {
                if let Some(types) = methods.get_mut(locator.method.as_str()) {
                    if let Some(info) = types.get_mut(&locator.resource_type) {
                        if locator.action.is_empty() {
                            info.operation_refs.remove(pattern_key);
                        } else if let Some(acts) = info.actions.get_mut(&locator.action) {
                            acts.remove(pattern_key);
                            if acts.is_empty() {
                                info.actions.remove(&locator.action);
                            }
                        }
                        if info.operation_refs.is_empty() && info.actions.is_empty() {
                            types.remove(&locator.resource_type);
                        }
                    }
                    if types.is_empty() {
                        methods.remove(locator.method.as_str());
                    }
                }
                if methods.is_empty() {
                    versions.remove(&locator.version);
                }
            }
            if versions.is_empty() {
                self.resource_providers.remove(locator.rp.as_key());
            }
        }
    }
}

/// The per-spec parse output before collision resolution: a flat list of
/// `(locator, pattern-key, ref)` triples, parsed independently of every
/// other spec so it can run in parallel.
struct SpecPartial {
    path: PathBuf,
    entries: Vec<(OperationLocator, String, OperationRef)>,
}

fn parse_spec(root_dir: &Path, spec_file: &Path, param_table: &ParamTable) -> Result<SpecPartial> {
    let info = spec_path_info(root_dir, spec_file).context(SpecPathSnafu { path: spec_file.to_owned() })?;
    let spec = Spec::load(spec_file).context(SpecLoadSnafu { path: spec_file.to_owned() })?;
    let doc = spec.root_doc();

    let version = doc.info.version.clone();
    if version.trim().is_empty() {
        return Err(Error::MissingVersion { path: spec_file.to_owned() });
    }

    let mut entries = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (path_key, item) in &doc.paths {
        let item = match item {
            autorust_openapi::ReferenceOr::Item(item) => item,
            autorust_openapi::ReferenceOr::Reference { .. } => continue,
        };
        for (method_str, op) in operations(item) {
            let method = match HttpMethod::parse(method_str) {
                Some(m) => m,
                None => continue,
            };

            let patterns = match path_pattern::parse(&spec, spec_file, path_key, item, op, &info.resource_provider_ms, param_table) {
                Ok(p) => p,
                Err(source) => {
                    return Err(Error::ParsePattern {
                        path: spec_file.to_owned(),
                        path_key: path_key.clone(),
                        method: method_str.to_owned(),
                        source,
                    })
                }
            };

            for pattern in patterns {
                let locator = match derive(&pattern, &version, method) {
                    Ok(l) => l,
                    Err(source) => {
                        tracing::warn!(path = %spec_file.display(), path_key, %source, "skipping path with malformed ARM shape");
                        continue;
                    }
                };
                let pattern_key = pattern.to_pattern_key();
                let key = (locator.clone(), pattern_key.clone());
                if !seen.insert(key) {
                    return Err(Error::DuplicateWithinSpec {
                        path: spec_file.to_owned(),
                        locator: format!("{:?}", locator),
                        pattern: pattern_key,
                    });
                }
                let op_ref = OperationRef::new(spec_file, path_key, method_str);
                entries.push((locator, pattern_key, op_ref));
            }
        }
    }

    Ok(SpecPartial { path: spec_file.to_owned(), entries })
}

fn operations(item: &autorust_openapi::PathItem) -> Vec<(&'static str, &autorust_openapi::Operation)> {
    let mut ops = Vec::new();
    macro_rules! push {
        ($field:ident, $name:literal) => {
            if let Some(op) = &item.$field {
                ops.push(($name, op));
            }
        };
    }
    push!(get, "get");
    push!(put, "put");
    push!(post, "post");
    push!(delete, "delete");
    push!(options, "options");
    push!(head, "head");
    push!(patch, "patch");
    ops
}

/// Walks `root_dir` for `readme.md` files, skipping `data-plane`/`examples`
/// subtrees, resolving each to its spec file list (component A), and
/// returns the combined, sorted, deduplicated absolute path list.
pub fn discover_spec_files(root_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = std::collections::BTreeSet::new();
    let mut it = WalkDir::new(root_dir).into_iter();
    while let Some(entry) = it.next() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy();
            if name.eq_ignore_ascii_case("data-plane") || name.eq_ignore_ascii_case("examples") {
                it.skip_current_dir();
            }
            continue;
        }
        if !entry.file_name().to_string_lossy().eq_ignore_ascii_case("readme.md") {
            continue;
        }
        let readme_path = entry.path();
        let markdown = std::fs::read(readme_path).context(ReadReadmeSnafu { path: readme_path.to_owned() })?;
        let rel_files = spec_list_from_readme(&markdown, None).context(ManifestSnafu { path: readme_path.to_owned() })?;
        let dir = readme_path.parent().unwrap_or(root_dir);
        for rel in rel_files {
            files.insert(dir.join(rel));
        }
    }
    Ok(files.into_iter().collect())
}

/// Builds the full index from `root_dir`'s spec tree, parsing specs in
/// parallel and merging in sorted spec-list order (single-writer,
/// deterministic "first-inserted" ties) as spec.md §5 requires.
pub fn build_index(root_dir: &Path, param_table: &ParamTable, dedup: &Deduplicator) -> Result<Index> {
    let spec_files = discover_spec_files(root_dir)?;

    let partials: Result<Vec<SpecPartial>> = spec_files.par_iter().map(|f| parse_spec(root_dir, f, param_table)).collect();
    let partials = partials?;

    let mut index = Index::default();
    let mut collisions: BTreeMap<(String, String, String, String, String), Vec<OperationRef>> = BTreeMap::new();
    let mut locators: BTreeMap<(String, String, String, String, String), (OperationLocator, String)> = BTreeMap::new();

    for partial in partials {
        let _ = &partial.path;
        for (locator, pattern_key, op_ref) in partial.entries {
            let collision_key = (
                locator.rp.as_key().to_owned(),
                locator.version.clone(),
                locator.method.as_str().to_owned(),
                locator.resource_type.clone(),
                format!("{}\u{0}{}", locator.action, pattern_key),
            );
            if let Some(prior) = index.insert(&locator, &pattern_key, op_ref.clone()) {
                collisions.entry(collision_key.clone()).or_insert_with(|| vec![prior]).push(op_ref);
                locators.entry(collision_key).or_insert((locator, pattern_key));
            } else {
                locators.insert(collision_key, (locator, pattern_key));
            }
        }
    }

    for (key, candidates) in collisions {
        let (locator, pattern_key) = locators.get(&key).expect("locator recorded alongside collision").clone();
        let resolved = dedup.resolve(&locator, &pattern_key, &candidates).context(DedupSnafu)?;
        index.remove_empty(&locator, &pattern_key);
        if let Some(keep) = resolved {
            index.insert(&locator, &pattern_key, keep);
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_info_omits_empty_maps_when_serialized() {
        let info = OperationInfo::default();
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v, serde_json::json!({}));
    }

    #[test]
    fn index_omits_empty_commit_and_specdir() {
        let index = Index::default();
        let v = serde_json::to_value(&index).unwrap();
        assert_eq!(v, serde_json::json!({ "resource_providers": {} }));
    }

    #[test]
    fn insert_then_remove_empty_prunes_all_parent_maps() {
        let mut index = Index::default();
        let locator = OperationLocator {
            rp: Rp::Named("MICROSOFT.DUMMY".into()),
            version: "2020-01-01".into(),
            resource_type: "/FOOS".into(),
            action: String::new(),
            method: HttpMethod::Get,
        };
        let op_ref = OperationRef::new(Path::new("foo.json"), "/providers/Microsoft.Dummy/foos", "GET");
        index.insert(&locator, "/PROVIDERS/MICROSOFT.DUMMY/FOOS", op_ref);
        assert!(!index.resource_providers.is_empty());
        index.remove_empty(&locator, "/PROVIDERS/MICROSOFT.DUMMY/FOOS");
        assert!(index.resource_providers.is_empty());
    }
}
