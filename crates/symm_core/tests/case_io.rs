use std::{env, fs, path::PathBuf};

use symm_core::case_io::{default_cases, export_cases_to_json, import_cases_from_json, CaseSet};

#[test]
fn case_sets_round_trip_json() {
    let sets = default_cases();
    let path = temp_file_path("round_trip");
    export_cases_to_json(&sets, &path).expect("failed to export case sets");
    let loaded = import_cases_from_json(&path).expect("failed to import case sets");
    fs::remove_file(&path).ok();

    assert_eq!(sets, loaded);
}

#[test]
fn import_rejects_short_leading_dimension() {
    let json = r#"[
      {"label": "broken", "cases": [
        {"order": "column_major", "side": "right", "uplo": "upper",
         "m": 8, "n": 4, "lda": 3, "ldb": 8, "ldc": 8,
         "alpha": {"re": 1.0}, "beta": {"re": 1.0}}
      ]}
    ]"#;
    let path = temp_file_path("invalid");
    fs::write(&path, json).unwrap();
    let err = import_cases_from_json(&path).expect_err("lda < N must be rejected");
    fs::remove_file(&path).ok();
    assert!(format!("{err:#}").contains("set 'broken'"));
}

#[test]
fn hand_written_set_parses() {
    let json = r#"[{"label": "single", "cases": [
        {"order": "row_major", "side": "left", "uplo": "lower",
         "m": 5, "n": 9, "lda": 5, "ldb": 9, "ldc": 11, "offc": 2,
         "alpha": {"re": 1.0, "im": 0.5}, "beta": {"re": 0.0}}
    ]}]"#;
    let path = temp_file_path("hand_written");
    fs::write(&path, json).unwrap();
    let loaded: Vec<CaseSet> = import_cases_from_json(&path).expect("parse failed");
    fs::remove_file(&path).ok();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].cases[0].ldc, 11);
    assert_eq!(loaded[0].cases[0].offc, 2);
    assert_eq!(loaded[0].cases[0].alpha.im, 0.5);
}

fn temp_file_path(tag: &str) -> PathBuf {
    let mut path = env::temp_dir();
    let unique = format!(
        "symm_perf_cases_{tag}_{}_{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    );
    path.push(unique);
    path
}
