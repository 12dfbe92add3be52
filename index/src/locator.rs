//! Component D — operation-locator deriver.

use crate::path_pattern::{PathPattern, PathSegment};
use snafu::Snafu;
use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("trailing action segment is parameterized, not fixed"))]
    ParameterizedAction,
    #[snafu(display("resource-type segment at even offset is parameterized, not fixed"))]
    ParameterizedResourceType,
}

/// The provider namespace half of a locator: a concrete name, or the glob
/// sentinel for a templated `providers/{p}` segment.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rp {
    Named(String),
    Any,
}

impl Rp {
    /// The literal index/persistence key (`"*"` for [`Rp::Any`]).
    pub fn as_key(&self) -> &str {
        match self {
            Rp::Named(s) => s.as_str(),
            Rp::Any => "*",
        }
    }
}

impl fmt::Display for Rp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "PUT" => Some(HttpMethod::Put),
            "POST" => Some(HttpMethod::Post),
            "DELETE" => Some(HttpMethod::Delete),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            "PATCH" => Some(HttpMethod::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationLocator {
    pub rp: Rp,
    pub version: String,
    pub resource_type: String,
    pub action: String,
    pub method: HttpMethod,
}

/// Derives the locator for `pattern`. `version` and `method` are threaded in
/// from the caller (the spec's `info.version` and the Swagger method key);
/// everything else is computed from the pattern's segments per spec §4.D.
pub fn derive(pattern: &PathPattern, version: &str, method: HttpMethod) -> Result<OperationLocator> {
    let segments = &pattern.segments;

    let providers_idx = segments.iter().rposition(|seg| matches!(seg, PathSegment::Fixed(name) if name.eq_ignore_ascii_case("providers")));

    let Some(i) = providers_idx else {
        tracing::warn!(pattern = %pattern.to_canonical_string(), "path has no providers segment");
        return Ok(OperationLocator {
            rp: Rp::Named(String::new()),
            version: version.to_owned(),
            resource_type: "/".to_owned(),
            action: String::new(),
            method,
        });
    };

    let rp = match segments.get(i + 1) {
        Some(PathSegment::Fixed(name)) => Rp::Named(name.to_ascii_uppercase()),
        Some(PathSegment::Parameter) | Some(PathSegment::MultiParameter) => Rp::Any,
        None => Rp::Named(String::new()),
    };

    let rest = &segments[(i + 2).min(segments.len())..];

    let action = if rest.len() % 2 == 1 {
        match rest.last() {
            Some(PathSegment::Fixed(name)) => name.to_ascii_uppercase(),
            _ => return Err(Error::ParameterizedAction),
        }
    } else {
        String::new()
    };

    let type_count = if rest.len() % 2 == 1 { rest.len() - 1 } else { rest.len() };
    let mut type_names = Vec::new();
    let mut idx = 0;
    while idx < type_count {
        match &rest[idx] {
            PathSegment::Fixed(name) => type_names.push(name.to_ascii_uppercase()),
            _ => return Err(Error::ParameterizedResourceType),
        }
        idx += 2;
    }

    let resource_type = if type_names.is_empty() { "/".to_owned() } else { format!("/{}", type_names.join("/")) };

    Ok(OperationLocator {
        rp,
        version: version.to_owned(),
        resource_type,
        action,
        method,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(s: &str) -> PathPattern {
        PathPattern::parse_from_string(s)
    }

    #[test]
    fn collection_level_locator() {
        let loc = derive(&pattern("/subscriptions/{}/providers/Microsoft.Dummy/foos"), "2020-01-01", HttpMethod::Get).unwrap();
        assert_eq!(loc.rp, Rp::Named("MICROSOFT.DUMMY".into()));
        assert_eq!(loc.resource_type, "/FOOS");
        assert_eq!(loc.action, "");
    }

    #[test]
    fn instance_level_locator_has_no_action() {
        let loc = derive(&pattern("/subscriptions/{}/providers/Microsoft.Dummy/foos/{}"), "2020-01-01", HttpMethod::Get).unwrap();
        assert_eq!(loc.resource_type, "/FOOS");
        assert_eq!(loc.action, "");
    }

    #[test]
    fn trailing_odd_segment_is_an_action() {
        let loc = derive(&pattern("/subscriptions/{}/providers/Microsoft.Dummy/foos/{}/restart"), "2020-01-01", HttpMethod::Post).unwrap();
        assert_eq!(loc.resource_type, "/FOOS");
        assert_eq!(loc.action, "RESTART");
    }

    #[test]
    fn parameterized_trailing_action_is_an_error() {
        let err = derive(&pattern("/subscriptions/{}/providers/Microsoft.Dummy/foos/{}/{}"), "2020-01-01", HttpMethod::Post).unwrap_err();
        assert_eq!(err, Error::ParameterizedAction);
    }

    #[test]
    fn parameterized_resource_type_is_an_error() {
        let err = derive(&pattern("/subscriptions/{}/providers/Microsoft.Dummy/{}/{}"), "2020-01-01", HttpMethod::Get).unwrap_err();
        assert_eq!(err, Error::ParameterizedResourceType);
    }

    #[test]
    fn templated_provider_is_glob_rp() {
        let loc = derive(&pattern("/providers/{}/foos"), "2020-01-01", HttpMethod::Get).unwrap();
        assert_eq!(loc.rp, Rp::Any);
    }

    #[test]
    fn no_providers_segment_falls_back_to_empty_rp_and_root_type() {
        let loc = derive(&pattern("/subscriptions/{}/resourceGroups/{}"), "2020-01-01", HttpMethod::Get).unwrap();
        assert_eq!(loc.rp, Rp::Named(String::new()));
        assert_eq!(loc.resource_type, "/");
        assert_eq!(loc.action, "");
    }

    #[test]
    fn nested_resource_types_join_with_slash() {
        let loc = derive(
            &pattern("/subscriptions/{}/providers/Microsoft.Dummy/foos/{}/bars/{}"),
            "2020-01-01",
            HttpMethod::Get,
        )
        .unwrap();
        assert_eq!(loc.resource_type, "/FOOS/BARS");
    }
}
