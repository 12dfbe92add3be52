//! The "operation reference" value stored at the leaves of the index: an
//! absolute spec file path plus a JSON-pointer into it, persisted as the
//! single string `<path>#<pointer>` (spec.md §6).

use crate::jsonptr;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationRef {
    pub spec_file: PathBuf,
    pub pointer: String,
}

impl OperationRef {
    /// Builds the reference for `(path_key, method)` inside `spec_file`:
    /// `#/paths/<escaped path_key>/<lower-cased method>`.
    pub fn new(spec_file: &Path, path_key: &str, method: &str) -> Self {
        Self {
            spec_file: spec_file.to_owned(),
            pointer: format!("/paths/{}/{}", jsonptr::escape(path_key), method.to_ascii_lowercase()),
        }
    }
}

impl fmt::Display for OperationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.spec_file.display(), self.pointer)
    }
}

impl Serialize for OperationRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OperationRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let (path, pointer) = raw.split_once('#').ok_or_else(|| D::Error::custom(format!("operation reference {raw:?} has no '#' separator")))?;
        Ok(Self { spec_file: PathBuf::from(path), pointer: pointer.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_pointer_from_path_key_and_method() {
        let r = OperationRef::new(Path::new("foo.json"), "/providers/Microsoft.Dummy/foos/{fooName}", "GET");
        assert_eq!(r.pointer, "/paths/~1providers~1Microsoft.Dummy~1foos~1{fooName}/get");
    }

    #[test]
    fn serializes_as_path_hash_pointer() {
        let r = OperationRef { spec_file: PathBuf::from("foo.json"), pointer: "/paths/~1foos/get".into() };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, serde_json::json!("foo.json#/paths/~1foos/get"));
    }

    #[test]
    fn round_trips_through_json() {
        let r = OperationRef { spec_file: PathBuf::from("foo.json"), pointer: "/paths/~1foos/get".into() };
        let v = serde_json::to_value(&r).unwrap();
        let back: OperationRef = serde_json::from_value(v).unwrap();
        assert_eq!(back, r);
    }
}
