//! A thin loader/resolver over `autorust_openapi`'s Swagger 2.0 document
//! model. Mirrors the teacher crate's own `Spec`/`RefKey` shape
//! (`codegen/src/spec.rs`), trimmed to what path-pattern parsing needs:
//! reading a document tree and resolving `$ref`s on parameters.
//!
//! Swagger parsing and `$ref` syntax itself are not this module's concern —
//! that's `autorust_openapi` and `path_abs`'s job; this module only knows
//! how to walk the small subset of the document this tool cares about.

use autorust_openapi::{OpenAPI, Parameter, PathItem, ReferenceOr};
use indexmap::IndexMap;
use path_abs::PathMut;
use snafu::{OptionExt, ResultExt, Snafu};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("reading spec file {}: {}", path.display(), source))]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[snafu(display("parsing spec file {}: {}", path.display(), source))]
    Deserialize { path: PathBuf, source: serde_json::Error },
    #[snafu(display("joining path {} against {}: {}", base.display(), rel, source))]
    JoinPath { base: PathBuf, rel: String, source: path_abs::Error },
    #[snafu(display("reference {} has no name component", reference))]
    NoNameInReference { reference: String },
    #[snafu(display("parameter {} not found (file {})", name, file.display()))]
    ParameterNotFound { file: PathBuf, name: String },
}

/// Joins a `$ref` style relative file reference against the document that
/// contains it, the way the teacher's `path::join` does (drop the file
/// component of `base` before resolving `rel`).
pub fn join<P: AsRef<Path>>(base: P, rel: &str) -> Result<PathBuf> {
    let base = base.as_ref();
    let mut joined = PathBuf::from(base);
    if joined.extension().is_some() {
        joined.pop_up().context(JoinPathSnafu {
            base: base.to_owned(),
            rel: rel.to_owned(),
        })?;
    }
    joined.append(rel).context(JoinPathSnafu {
        base: base.to_owned(),
        rel: rel.to_owned(),
    })?;
    Ok(joined)
}

pub fn read_doc<P: AsRef<Path>>(path: P) -> Result<OpenAPI> {
    let path = path.as_ref();
    let bytes = fs::read(path).context(ReadFileSnafu { path })?;
    serde_json::from_slice(&bytes).context(DeserializeSnafu { path })
}

/// A loaded Swagger document plus any document it `$ref`s into, indexed by
/// absolute file path. The first entry is always the root document.
#[derive(Debug)]
pub struct Spec {
    pub root: PathBuf,
    pub docs: IndexMap<PathBuf, OpenAPI>,
}

impl Spec {
    /// Loads `root` and every document it references (one level: parameter
    /// and schema `$ref`s into sibling files), matching the teacher's own
    /// `Spec::read_files`.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_owned();
        let root_doc = read_doc(&root)?;
        let mut docs = IndexMap::new();
        for file in ref_files(&root_doc) {
            let doc_path = join(&root, &file)?;
            if !docs.contains_key(&doc_path) {
                let doc = read_doc(&doc_path)?;
                docs.insert(doc_path, doc);
            }
        }
        docs.insert(root.clone(), root_doc);
        docs.swap_indices(0, docs.len() - 1);
        Ok(Self { root, docs })
    }

    pub fn root_doc(&self) -> &OpenAPI {
        self.docs.get(&self.root).expect("root doc always present")
    }

    /// Resolves a `ReferenceOr<Parameter>` against the document that contains it.
    pub fn resolve_parameter(&self, doc_file: &Path, parameter: &ReferenceOr<Parameter>) -> Result<Parameter> {
        match parameter {
            ReferenceOr::Item(p) => Ok(p.clone()),
            ReferenceOr::Reference { reference, .. } => {
                let file = match &reference.file {
                    None => doc_file.to_owned(),
                    Some(f) => join(doc_file, f)?,
                };
                let name = reference.name.clone().context(NoNameInReferenceSnafu {
                    reference: format!("{:?}", reference),
                })?;
                let doc = self.docs.get(&file).or_else(|| self.docs.get(doc_file));
                let found = doc.and_then(|d| d.parameters.get(&name)).and_then(|p| match p {
                    ReferenceOr::Item(p) => Some(p.clone()),
                    ReferenceOr::Reference { .. } => None,
                });
                found.context(ParameterNotFoundSnafu { file, name })
            }
        }
    }
}

/// The `$ref`'d file paths (relative strings, as written in the document) a
/// document's parameters and schemas point into. Example refs are excluded.
fn ref_files(doc: &OpenAPI) -> Vec<String> {
    let mut files = Vec::new();
    for (_name, param) in &doc.parameters {
        if let ReferenceOr::Reference { reference, .. } = param {
            if let Some(f) = &reference.file {
                files.push(f.clone());
            }
        }
    }
    for (_path, item) in &doc.paths {
        if let ReferenceOr::Item(item) = item {
            for param in path_item_parameters(item) {
                if let ReferenceOr::Reference { reference, .. } = param {
                    if let Some(f) = &reference.file {
                        files.push(f.clone());
                    }
                }
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

fn path_item_parameters(item: &PathItem) -> impl Iterator<Item = &ReferenceOr<Parameter>> {
    item.parameters.iter()
}

/// Best-effort read of a boolean vendor extension (e.g. `x-ms-skip-url-encoding`)
/// off a resolved parameter, without depending on `autorust_openapi` naming its
/// extensions-capture field a particular way: round-trips the parameter through
/// `serde_json::Value` and looks the key up there.
pub fn vendor_extension_bool(parameter: &Parameter, key: &str) -> bool {
    serde_json::to_value(parameter)
        .ok()
        .and_then(|v| v.get(key).cloned())
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}
