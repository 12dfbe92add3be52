//! End-to-end smoke test against a real clone of `Azure/azure-rest-api-specs`.
//!
//! Gated behind two environment variables (grounded on
//! `examples/original_source/specpath/specpath_test.go`'s `Test_E2E_SpecPathInfo` /
//! `tests.E2EPrecheck`): `AZURE_REST_API_INDEX_E2E` must be set to opt into the
//! `#[ignore]`-gated test at all, and `AZURE_REST_API_INDEX_E2E_SPEC_REPO` must
//! point at the clone's root. Neither is set in CI by default.

use azrest_index::index::discover_spec_files;
use azrest_index::path_pattern::default_param_table;
use std::path::Path;

#[test]
#[ignore]
fn discovers_and_classifies_every_spec_file_under_a_real_repo_clone() {
    if std::env::var("AZURE_REST_API_INDEX_E2E").is_err() {
        eprintln!("skipping: AZURE_REST_API_INDEX_E2E not set");
        return;
    }
    let Ok(repo_dir) = std::env::var("AZURE_REST_API_INDEX_E2E_SPEC_REPO") else {
        eprintln!("skipping: AZURE_REST_API_INDEX_E2E_SPEC_REPO not set");
        return;
    };

    let spec_root = Path::new(&repo_dir).join("specification");
    let files = discover_spec_files(&spec_root).expect("walking the spec tree should not fail outright");
    assert!(!files.is_empty(), "expected at least one spec file under {}", spec_root.display());

    let param_table = default_param_table();
    let mut parse_errors = 0usize;
    for file in &files {
        if let Err(err) = azrest_index::swagger::Spec::load(file) {
            eprintln!("{}: {}", file.display(), err);
            parse_errors += 1;
        }
    }
    let _ = param_table;
    // A handful of malformed/unreachable $refs in a live clone is expected;
    // this is a smoke test, not a strict validation pass.
    assert!(parse_errors < files.len(), "every discovered spec file failed to load");
}
