//! Component G — the lookup engine.

use crate::index::Index;
use crate::locator::HttpMethod;
use crate::matcher::{self, Matcher};
use crate::opref::OperationRef;
use snafu::Snafu;
use url::Url;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("url has no api-version query parameter"))]
    ApiVersionMissing,
    #[snafu(display("method {:?} is not a recognized HTTP verb", method))]
    UnknownMethod { method: String },
    #[snafu(display("no path pattern in the index matches {}", path))]
    MatchesNothing { path: String },
    #[snafu(display("action {:?} is unknown and there is no '*' action key", action))]
    UnknownAction { action: String },
}

/// A URL decomposed the way component D derives locators, but over literal
/// path segments rather than a `PathPattern`.
struct DecomposedUrl<'a> {
    path: &'a str,
    rp_candidate: Option<String>,
    resource_type: String,
    action: String,
}

fn decompose(url: &Url) -> DecomposedUrl<'_> {
    let path = url.path();
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').filter(|s| !s.is_empty()).collect();

    let providers_idx = segments.iter().rposition(|s| s.eq_ignore_ascii_case("providers"));

    let Some(i) = providers_idx else {
        return DecomposedUrl { path, rp_candidate: None, resource_type: "/".to_owned(), action: String::new() };
    };

    let rp_candidate = segments.get(i + 1).map(|s| s.to_string());
    let rest = &segments[(i + 2).min(segments.len())..];

    let action = if rest.len() % 2 == 1 { rest.last().map(|s| s.to_ascii_uppercase()).unwrap_or_default() } else { String::new() };

    let type_count = if rest.len() % 2 == 1 { rest.len() - 1 } else { rest.len() };
    let mut types = Vec::new();
    let mut idx = 0;
    while idx < type_count {
        types.push(rest[idx].to_ascii_uppercase());
        idx += 2;
    }
    let resource_type = if types.is_empty() { "/".to_owned() } else { format!("/{}", types.join("/")) };

    DecomposedUrl { path, rp_candidate, resource_type, action }
}

fn api_version(url: &Url) -> Option<String> {
    url.query_pairs().find(|(k, _)| k == "api-version").map(|(_, v)| v.into_owned())
}

impl Index {
    /// Resolves `method` + `url` to the single best-matching operation
    /// reference, per spec §4.G.
    pub fn lookup(&self, method: &str, url: &Url) -> Result<OperationRef> {
        let method = HttpMethod::parse(method).ok_or_else(|| Error::UnknownMethod { method: method.to_owned() })?;
        let version = api_version(url).ok_or(Error::ApiVersionMissing)?;
        let decomposed = decompose(url);

        let attempts: Vec<String> = match &decomposed.rp_candidate {
            Some(candidate) => vec![candidate.to_ascii_uppercase(), "*".to_owned()],
            None => vec![String::new(), "*".to_owned()],
        };

        for rp_key in attempts {
            if let Some(result) = self.try_rp(&rp_key, &version, method, &decomposed) {
                return result;
            }
        }

        Err(Error::MatchesNothing { path: decomposed.path.to_owned() })
    }

    /// Attempts resolution for one `RP` candidate. Returns `None` when
    /// `Version`/`Method`/`ResourceType` is absent (caller should try the
    /// next RP attempt); `Some(Err(_))` once a `ResourceType` is found but
    /// action or final-pattern resolution then fails (terminal, no fallback).
    fn try_rp(&self, rp_key: &str, version: &str, method: HttpMethod, decomposed: &DecomposedUrl<'_>) -> Option<Result<OperationRef>> {
        let methods = self.resource_providers.get(rp_key)?.get(version)?;
        let types = methods.get(method.as_str())?;

        let candidates = resource_type_candidates(types, &decomposed.resource_type);
        for resource_type_key in candidates {
            let info = types.get(&resource_type_key)?;

            // A resource type with no actions defined at all doesn't support
            // action-style requests here; treat it like a resource type that
            // wasn't found rather than a hard "unknown action" failure, so
            // lookup keeps trying other resource-type/RP candidates instead
            // of aborting on a type that was never a candidate for this
            // action to begin with.
            if !decomposed.action.is_empty() && info.actions.is_empty() {
                continue;
            }

            let map = if decomposed.action.is_empty() {
                &info.operation_refs
            } else {
                match info.actions.get(&decomposed.action).or_else(|| info.actions.get("*")) {
                    Some(m) => m,
                    None => return Some(Err(Error::UnknownAction { action: decomposed.action.clone() })),
                }
            };

            if let Some(result) = final_match(map, decomposed.path) {
                return Some(Ok(result));
            }
        }

        None
    }
}

/// Candidate `ResourceType` keys to try, most specific first: the exact key
/// (if present), then wildcard-RT keys whose matcher accepts `resource_type`,
/// ordered by §4.F specificity.
fn resource_type_candidates(types: &crate::index::ResourceTypes, resource_type: &str) -> Vec<String> {
    if types.contains_key(resource_type) {
        return vec![resource_type.to_owned()];
    }

    let mut wildcard_matches: Vec<(Matcher, String)> = types
        .keys()
        .filter(|k| k.contains('*'))
        .filter_map(|k| {
            let m = Matcher::from_resource_type_key(k);
            m.is_match(resource_type).then(|| (m, k.clone()))
        })
        .collect();
    matcher::sort_by_specificity(&mut wildcard_matches);
    wildcard_matches.into_iter().map(|(_, k)| k).collect()
}

/// Builds matchers from the map's `PathPatternStr` keys, sorts them by
/// §4.F specificity, and returns the ref of the first (most specific) one
/// that matches `path`.
fn final_match(map: &crate::index::OperationRefs, path: &str) -> Option<OperationRef> {
    let mut matchers: Vec<(Matcher, &OperationRef)> = map.iter().map(|(k, v)| (Matcher::from_pattern_key(k), v)).collect();
    matchers.sort_by(|(a, _), (b, _)| matcher::specificity_cmp(a, b));
    matchers.into_iter().find(|(m, _)| m.is_match(path)).map(|(_, r)| r.clone())
}
