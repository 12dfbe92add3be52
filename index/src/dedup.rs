//! Deduplication rules evaluated against build-time collisions: more than
//! one operation reference landing at the same `(locator, path-pattern)`
//! index position.
//!
//! Grounded on `examples/original_source/dedup.go`'s `DedupMatcher` /
//! `DedupPicker` / `ToDeduplicator`. That source has a field-binding bug —
//! `m.Method = regexp.MustCompile(matcher.PathPatternStr)` clobbers `Method`
//! instead of setting `PathPatternStr` — called out in spec.md §9 as
//! something to fix, not carry forward; [`Rule::compile`] binds each regex
//! to its own field and a test below pins that down.

use crate::locator::OperationLocator;
use crate::opref::OperationRef;
use regex::Regex;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("compiling dedup rule regex {:?}: {}", pattern, source))]
    BadRegex { pattern: String, source: regex::Error },
    #[snafu(display("more than one dedup rule matches the same collision"))]
    AmbiguousRuleMatch,
    #[snafu(display("dedup picker matched zero of {} candidate references", candidates))]
    PickerMatchedNothing { candidates: usize },
    #[snafu(display("dedup picker matched {} of {} candidate references, still ambiguous", matched, candidates))]
    PickerStillAmbiguous { matched: usize, candidates: usize },
}

/// On-disk shape of one rule, as read from a `--dedup FILE` JSON document.
#[derive(Debug, Deserialize)]
pub struct RuleRecord {
    pub matcher: MatcherRecord,
    pub action: ActionRecord,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatcherRecord {
    #[serde(default)]
    pub rp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub rt: Option<String>,
    #[serde(default)]
    pub act: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path_pattern_str: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRecord {
    Ignore,
    Pick { spec_path: Option<String>, pointer: Option<String> },
}

/// A compiled locator-matching predicate: regex constraints on any subset
/// of `{RP, Version, ResourceType, Action, Method, PathPatternStr}`. A
/// `None` field always matches.
#[derive(Debug)]
pub struct Matcher {
    pub rp: Option<Regex>,
    pub version: Option<Regex>,
    pub resource_type: Option<Regex>,
    pub action: Option<Regex>,
    pub method: Option<Regex>,
    pub path_pattern_str: Option<Regex>,
}

impl Matcher {
    fn compile(record: &MatcherRecord) -> Result<Self> {
        let compile = |field: &Option<String>| -> Result<Option<Regex>> {
            field
                .as_deref()
                .map(|pattern| Regex::new(pattern).context(BadRegexSnafu { pattern: pattern.to_owned() }))
                .transpose()
        };
        Ok(Self {
            rp: compile(&record.rp)?,
            version: compile(&record.version)?,
            resource_type: compile(&record.rt)?,
            action: compile(&record.act)?,
            method: compile(&record.method)?,
            path_pattern_str: compile(&record.path_pattern_str)?,
        })
    }

    pub fn matches(&self, loc: &OperationLocator, path_pattern_str: &str) -> bool {
        let check = |re: &Option<Regex>, s: &str| re.as_ref().map_or(true, |re| re.is_match(s));
        check(&self.rp, loc.rp.as_key())
            && check(&self.version, &loc.version)
            && check(&self.resource_type, &loc.resource_type)
            && check(&self.action, &loc.action)
            && check(&self.method, loc.method.as_str())
            && check(&self.path_pattern_str, path_pattern_str)
    }
}

/// A regex predicate over a candidate reference's spec path / JSON pointer.
#[derive(Debug)]
pub struct Picker {
    pub spec_path: Option<Regex>,
    pub pointer: Option<Regex>,
}

impl Picker {
    fn compile(spec_path: &Option<String>, pointer: &Option<String>) -> Result<Self> {
        let compile = |field: &Option<String>| -> Result<Option<Regex>> {
            field
                .as_deref()
                .map(|pattern| Regex::new(pattern).context(BadRegexSnafu { pattern: pattern.to_owned() }))
                .transpose()
        };
        Ok(Self { spec_path: compile(spec_path)?, pointer: compile(pointer)? })
    }

    pub fn matches(&self, candidate: &OperationRef) -> bool {
        let spec_path = candidate.spec_file.to_string_lossy();
        let check = |re: &Option<Regex>, s: &str| re.as_ref().map_or(true, |re| re.is_match(s));
        check(&self.spec_path, &spec_path) && check(&self.pointer, &candidate.pointer)
    }
}

pub enum Action {
    Ignore,
    Pick(Picker),
}

pub struct Rule {
    pub matcher: Matcher,
    pub action: Action,
}

impl Rule {
    pub fn compile(record: &RuleRecord) -> Result<Self> {
        let matcher = Matcher::compile(&record.matcher)?;
        let action = match &record.action {
            ActionRecord::Ignore => Action::Ignore,
            ActionRecord::Pick { spec_path, pointer } => Action::Pick(Picker::compile(spec_path, pointer)?),
        };
        Ok(Self { matcher, action })
    }
}

/// The ordered rule list evaluated against each build-time collision.
pub struct Deduplicator {
    pub rules: Vec<Rule>,
}

impl Deduplicator {
    pub fn compile(records: &[RuleRecord]) -> Result<Self> {
        let rules = records.iter().map(Rule::compile).collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// The outcome of resolving one collision: the single reference to
    /// keep, or `None` if the rule says to drop the entry entirely.
    pub fn resolve(&self, loc: &OperationLocator, path_pattern_str: &str, candidates: &[OperationRef]) -> Result<Option<OperationRef>> {
        let matches: Vec<&Rule> = self.rules.iter().filter(|r| r.matcher.matches(loc, path_pattern_str)).collect();

        if matches.len() > 1 {
            return Err(Error::AmbiguousRuleMatch);
        }

        let Some(rule) = matches.first() else {
            tracing::warn!(
                rp = %loc.rp, resource_type = %loc.resource_type, path_pattern = %path_pattern_str,
                "no dedup rule matched a duplicate entry; keeping first-inserted reference"
            );
            return Ok(candidates.first().cloned());
        };

        match &rule.action {
            Action::Ignore => Ok(None),
            Action::Pick(picker) => {
                let picked: Vec<&OperationRef> = candidates.iter().filter(|c| picker.matches(c)).collect();
                match picked.len() {
                    0 => Err(Error::PickerMatchedNothing { candidates: candidates.len() }),
                    1 => Ok(Some(picked[0].clone())),
                    n => Err(Error::PickerStillAmbiguous { matched: n, candidates: candidates.len() }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::{HttpMethod, Rp};
    use std::path::PathBuf;

    fn loc() -> OperationLocator {
        OperationLocator {
            rp: Rp::Named("MICROSOFT.DUMMY".into()),
            version: "2020-01-01".into(),
            resource_type: "/FOOS".into(),
            action: String::new(),
            method: HttpMethod::Get,
        }
    }

    #[test]
    fn path_pattern_str_constraint_binds_its_own_field_not_method() {
        // Regression test for the upstream field-binding bug: a rule that only
        // constrains `path_pattern_str` must not also end up constraining `method`.
        let record = RuleRecord {
            matcher: MatcherRecord { path_pattern_str: Some(r"^/FOOS/\{\}$".to_owned()), ..Default::default() },
            action: ActionRecord::Ignore,
        };
        let rule = Rule::compile(&record).unwrap();
        assert!(rule.matcher.method.is_none());
        assert!(rule.matcher.path_pattern_str.is_some());
        assert!(rule.matcher.matches(&loc(), "/FOOS/{}"));
        assert!(!rule.matcher.matches(&loc(), "/BARS/{}"));
    }

    #[test]
    fn ignore_action_drops_the_entry() {
        let dedup = Deduplicator::compile(&[RuleRecord {
            matcher: MatcherRecord::default(),
            action: ActionRecord::Ignore,
        }])
        .unwrap();
        let candidates = vec![OperationRef { spec_file: PathBuf::from("a.json"), pointer: "/paths/~1foos/get".into() }];
        assert_eq!(dedup.resolve(&loc(), "/FOOS/{}", &candidates).unwrap(), None);
    }

    #[test]
    fn picker_selects_the_single_matching_reference() {
        let dedup = Deduplicator::compile(&[RuleRecord {
            matcher: MatcherRecord::default(),
            action: ActionRecord::Pick { spec_path: Some("keep".into()), pointer: None },
        }])
        .unwrap();
        let candidates = vec![
            OperationRef { spec_file: PathBuf::from("drop.json"), pointer: "/paths/~1foos/get".into() },
            OperationRef { spec_file: PathBuf::from("keep.json"), pointer: "/paths/~1foos/get".into() },
        ];
        let picked = dedup.resolve(&loc(), "/FOOS/{}", &candidates).unwrap().unwrap();
        assert_eq!(picked.spec_file, PathBuf::from("keep.json"));
    }

    #[test]
    fn picker_matching_nothing_is_an_error() {
        let dedup = Deduplicator::compile(&[RuleRecord {
            matcher: MatcherRecord::default(),
            action: ActionRecord::Pick { spec_path: Some("nowhere".into()), pointer: None },
        }])
        .unwrap();
        let candidates = vec![OperationRef { spec_file: PathBuf::from("a.json"), pointer: "/paths/~1foos/get".into() }];
        let err = dedup.resolve(&loc(), "/FOOS/{}", &candidates).unwrap_err();
        assert!(matches!(err, Error::PickerMatchedNothing { .. }));
    }

    #[test]
    fn more_than_one_rule_matching_is_an_error() {
        let dedup = Deduplicator::compile(&[
            RuleRecord { matcher: MatcherRecord::default(), action: ActionRecord::Ignore },
            RuleRecord { matcher: MatcherRecord::default(), action: ActionRecord::Ignore },
        ])
        .unwrap();
        let candidates = vec![OperationRef { spec_file: PathBuf::from("a.json"), pointer: "/paths/~1foos/get".into() }];
        let err = dedup.resolve(&loc(), "/FOOS/{}", &candidates).unwrap_err();
        assert!(matches!(err, Error::AmbiguousRuleMatch));
    }

    #[test]
    fn no_rule_matching_keeps_first_inserted() {
        let dedup = Deduplicator { rules: vec![] };
        let candidates = vec![
            OperationRef { spec_file: PathBuf::from("first.json"), pointer: "/paths/~1foos/get".into() },
            OperationRef { spec_file: PathBuf::from("second.json"), pointer: "/paths/~1foos/get".into() },
        ];
        let kept = dedup.resolve(&loc(), "/FOOS/{}", &candidates).unwrap().unwrap();
        assert_eq!(kept.spec_file, PathBuf::from("first.json"));
    }
}
