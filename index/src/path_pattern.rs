//! Component C — path-pattern parser.
//!
//! Turns one `(path key, method)` entry from a Swagger `paths` map into one
//! or more [`PathPattern`]s, resolving `{name}` placeholders against the
//! path-item's and operation's parameter lists.

use crate::swagger::{self, Spec};
use autorust_openapi::{Operation, Parameter, PathItem};
use serde::Deserialize;
use snafu::{OptionExt, Snafu};
use std::collections::HashMap;
use std::path::Path;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{{{}}} in path {:?} has no matching parameter definition", name, path_key))]
    UndefinedParameter { path_key: String, name: String },
    #[snafu(display("resolving parameter: {}", source))]
    Swagger { source: swagger::Error },
}

impl From<swagger::Error> for Error {
    fn from(source: swagger::Error) -> Self {
        Error::Swagger { source }
    }
}

/// One segment of a path pattern. Fixed-name comparisons elsewhere in the
/// crate are case-insensitive, but the original casing is kept here for
/// canonical-string rendering.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Fixed(String),
    Parameter,
    MultiParameter,
}

/// An ordered sequence of [`PathSegment`]s.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct PathPattern {
    pub segments: Vec<PathSegment>,
}

impl PathPattern {
    pub fn parse_from_string(s: &str) -> Self {
        let segments = s
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|seg| match seg {
                "{}" => PathSegment::Parameter,
                "{*}" => PathSegment::MultiParameter,
                fixed => PathSegment::Fixed(fixed.to_owned()),
            })
            .collect();
        Self { segments }
    }

    /// Case-preserving canonical string form: leading `/`, `/`-joined,
    /// parameters as `{}`, multi-parameters as `{*}`.
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push('/');
            match seg {
                PathSegment::Fixed(name) => out.push_str(name),
                PathSegment::Parameter => out.push_str("{}"),
                PathSegment::MultiParameter => out.push_str("{*}"),
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }

    /// The `PathPatternStr` used as an index map key and as matcher input:
    /// the canonical string with fixed names upper-cased.
    pub fn to_pattern_key(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push('/');
            match seg {
                PathSegment::Fixed(name) => out.push_str(&name.to_ascii_uppercase()),
                PathSegment::Parameter => out.push_str("{}"),
                PathSegment::MultiParameter => out.push_str("{*}"),
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }
}

/// `(resource_provider_ms, parameter_name) -> concrete values`, the
/// CostManagement-style enum-parameter expansion table.
pub type ParamTable = HashMap<(String, String), Vec<String>>;

pub fn default_param_table() -> ParamTable {
    let mut table = ParamTable::new();
    table.insert(
        ("Microsoft.CostManagement".to_owned(), "externalCloudProviderType".to_owned()),
        vec!["externalBillingAccounts".to_owned(), "externalSubscriptions".to_owned()],
    );
    table
}

/// On-disk shape of one `--param-table FILE` entry. `ParamTable`'s own key is
/// a tuple, which has no direct JSON map representation, so the file is a
/// flat array of records instead.
#[derive(Debug, Deserialize)]
pub struct ParamTableRecord {
    pub resource_provider_ms: String,
    pub parameter_name: String,
    pub values: Vec<String>,
}

/// Builds a [`ParamTable`] starting from [`default_param_table`] and
/// overlaying `records` on top, so a `--param-table FILE` only needs to
/// specify the entries it wants to add or override.
pub fn param_table_from_records(records: Vec<ParamTableRecord>) -> ParamTable {
    let mut table = default_param_table();
    for record in records {
        table.insert((record.resource_provider_ms, record.parameter_name), record.values);
    }
    table
}

/// Parses one `(path_key, method)` entry of `item`/`op` into one or more patterns.
///
/// `resource_provider_ms` is the owning spec's Microsoft-namespace folder
/// name (from [`crate::specpath::Info`]), used to key the enum-expansion table.
pub fn parse(
    spec: &Spec,
    doc_file: &Path,
    path_key: &str,
    item: &PathItem,
    op: &Operation,
    resource_provider_ms: &str,
    param_table: &ParamTable,
) -> Result<Vec<PathPattern>> {
    let mut by_name: HashMap<String, Parameter> = HashMap::new();
    for p in &item.parameters {
        let resolved = spec.resolve_parameter(doc_file, p)?;
        by_name.insert(resolved.name.clone(), resolved);
    }
    for p in &op.parameters {
        let resolved = spec.resolve_parameter(doc_file, p)?;
        by_name.insert(resolved.name.clone(), resolved);
    }

    let raw_segments: Vec<&str> = path_key.trim_start_matches('/').split('/').filter(|s| !s.is_empty()).collect();

    // Build the base segment list, remembering which indices are expandable
    // Fixed-via-enum-table parameters (by their parameter name).
    let mut base: Vec<PathSegment> = Vec::with_capacity(raw_segments.len());
    let mut expansions: Vec<(usize, Vec<String>)> = Vec::new();

    for seg in &raw_segments {
        if let Some(name) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let param = by_name.get(name).with_context(|| UndefinedParameterSnafu {
                path_key: path_key.to_owned(),
                name: name.to_owned(),
            })?;
            if let Some(values) = param_table.get(&(resource_provider_ms.to_owned(), name.to_owned())) {
                expansions.push((base.len(), values.clone()));
                base.push(PathSegment::Fixed(String::new())); // placeholder, replaced below
            } else if swagger::vendor_extension_bool(param, "x-ms-skip-url-encoding") {
                base.push(PathSegment::MultiParameter);
            } else {
                base.push(PathSegment::Parameter);
            }
        } else {
            base.push(PathSegment::Fixed((*seg).to_owned()));
        }
    }

    if expansions.is_empty() {
        return Ok(vec![PathPattern { segments: base }]);
    }

    // Only one expansion point is expected in practice; fan out the cartesian
    // product in the (rare) case of more than one.
    let mut patterns = vec![base];
    for (idx, values) in expansions {
        let mut next = Vec::with_capacity(patterns.len() * values.len());
        for pattern in &patterns {
            for value in &values {
                let mut p = pattern.clone();
                p[idx] = PathSegment::Fixed(value.clone());
                next.push(p);
            }
        }
        patterns = next;
    }

    Ok(patterns.into_iter().map(|segments| PathPattern { segments }).collect())
}
