//! Component A — manifest reader.
//!
//! Extracts the list of active "input-file" entries from a resource
//! provider's README, scoped to the *effective* AutoRest tag: the single
//! fenced `yaml $(tag) == '<value>'` code block whose `<value>` wins
//! selection (see [`effective_tag`]).

use comrak::nodes::NodeValue;
use comrak::{parse_document, Arena, ComrakOptions};
use regex::Regex;
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, Snafu};
use std::collections::BTreeSet;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("malformed yaml in tagged code block {:?}: {}", tag, source))]
    Yaml { tag: String, source: serde_yaml::Error },
    #[snafu(display("tag expression regex did not compile"))]
    BadTagRegex { source: regex::Error },
    #[snafu(display("requested tag {:?} has no matching code block in the readme", tag))]
    TagNotFound { tag: String },
}

const THIS_FOLDER: &str = "$(this-folder)/";

#[derive(Deserialize)]
struct TaggedConfig {
    #[serde(rename = "input-file", default)]
    input_file: Vec<String>,
}

/// One fenced `yaml $(tag) == '<value>'` block found in a readme.
struct TagBlock {
    tag: String,
    yaml: String,
}

/// Parses `markdown` and returns the sorted, deduplicated list of input-file
/// paths (relative to the readme's directory) under the effective tag.
///
/// `requested_tag`, when given, forces tag selection (spec.md §4.A's
/// "single top-level directive ... selecting a tag"); otherwise the
/// effective tag is chosen automatically.
pub fn spec_list_from_readme(markdown: &[u8], requested_tag: Option<&str>) -> Result<Vec<String>> {
    let blocks = tag_blocks(markdown)?;
    if blocks.is_empty() {
        return Ok(Vec::new());
    }

    let tag = match requested_tag {
        Some(t) => t.to_owned(),
        None => effective_tag(&blocks),
    };
    tracing::debug!(tag = %tag, "selected effective readme tag");

    let block = blocks
        .iter()
        .find(|b| b.tag == tag)
        .with_context(|| TagNotFoundSnafu { tag: tag.clone() })?;

    let config: TaggedConfig = serde_yaml::from_str(&block.yaml).context(YamlSnafu { tag: tag.clone() })?;

    let mut files: BTreeSet<String> = BTreeSet::new();
    for entry in config.input_file {
        files.insert(entry.replace(THIS_FOLDER, ""));
    }
    Ok(files.into_iter().collect())
}

/// (a) n/a here (caller-supplied override), (b) greatest non-preview tag,
/// (c) else greatest preview tag.
fn effective_tag(blocks: &[TagBlock]) -> String {
    let mut non_preview: Vec<&str> = blocks.iter().map(|b| b.tag.as_str()).filter(|t| !is_preview_tag(t)).collect();
    non_preview.sort_unstable();
    if let Some(best) = non_preview.last() {
        return (*best).to_owned();
    }
    let mut preview: Vec<&str> = blocks.iter().map(|b| b.tag.as_str()).collect();
    preview.sort_unstable();
    preview.last().map(|s| (*s).to_owned()).unwrap_or_default()
}

fn is_preview_tag(tag: &str) -> bool {
    tag.to_ascii_lowercase().contains("preview")
}

fn tag_blocks(markdown: &[u8]) -> Result<Vec<TagBlock>> {
    let tag_expr = Regex::new(r"\$\(tag\)\s*==\s*'([^']+)'").context(BadTagRegexSnafu)?;

    let arena = Arena::new();
    let text = String::from_utf8_lossy(markdown);
    let root = parse_document(&arena, &text, &ComrakOptions::default());

    let mut blocks = Vec::new();
    for node in root.descendants() {
        let data = node.data.borrow();
        if let NodeValue::CodeBlock(cb) = &data.value {
            let info = String::from_utf8_lossy(&cb.info);
            let info = info.trim();
            let Some(rest) = info.strip_prefix("yaml") else {
                continue;
            };
            let rest = rest.trim_start();
            let Some(caps) = tag_expr.captures(rest) else {
                continue;
            };
            let tag = caps[1].to_owned();
            let yaml = String::from_utf8_lossy(&cb.literal).into_owned();
            blocks.push(TagBlock { tag, yaml });
        }
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const README: &str = r#"
### Tag: package-preview-2023-04

These settings apply only when `--tag=package-preview-2023-04` is specified on the command line.

```yaml $(tag) == 'package-preview-2023-04'
input-file:
  - x.json
```
### Tag: package-preview-2023-01

These settings apply only when `--tag=package-preview-2023-01` is specified on the command line.

```yaml $(tag) == 'package-preview-2023-01'
input-file:
  - c.json
  - d.json
```


### Tag: package-2023-03

These settings apply only when `--tag=package-2023-03` is specified on the command line.

```yaml $(tag) == 'package-2023-03'
input-file:
  - b.json
  - a.json
```
### Tag: package-2021-08

These settings apply only when `--tag=package-2021-08` is specified on the command line.

``` yaml $(tag) == 'package-2021-08'
input-file:
  - e.json
  - c.json
  - foo/$(this-folder)/z.json
```
"#;

    #[test]
    fn picks_the_greatest_non_preview_tag_by_default() {
        let files = spec_list_from_readme(README.as_bytes(), None).unwrap();
        assert_eq!(files, vec!["a.json", "b.json"]);
    }

    #[test]
    fn honors_a_requested_tag_and_strips_this_folder() {
        let files = spec_list_from_readme(README.as_bytes(), Some("package-2021-08")).unwrap();
        assert_eq!(files, vec!["c.json", "e.json", "foo/z.json"]);
    }

    #[test]
    fn picks_the_greatest_preview_tag_when_no_stable_tag_exists() {
        let only_preview = r#"
```yaml $(tag) == 'package-preview-2023-04'
input-file:
  - x.json
```
```yaml $(tag) == 'package-preview-2023-01'
input-file:
  - y.json
```
"#;
        let files = spec_list_from_readme(only_preview.as_bytes(), None).unwrap();
        assert_eq!(files, vec!["x.json"]);
    }

    #[test]
    fn empty_when_no_tagged_block_present() {
        let files = spec_list_from_readme(b"# just a readme\nno yaml here\n", None).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn requesting_an_absent_tag_is_an_error() {
        let err = spec_list_from_readme(README.as_bytes(), Some("nonexistent")).unwrap_err();
        assert!(matches!(err, Error::TagNotFound { .. }));
    }
}
