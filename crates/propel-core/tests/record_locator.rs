use std::fs;

use tempfile::TempDir;

use propel_core::environment::Environment;
use propel_core::error::PropagateError;
use propel_core::record::{RecordLayout, locate};

#[test]
fn locates_existing_record() {
    let temp = TempDir::new().unwrap();
    let record_dir = temp.path().join("environments/production");
    fs::create_dir_all(&record_dir).unwrap();
    fs::write(record_dir.join("deployment.yaml"), "image:\n  repository: a\n  tag: b\n").unwrap();

    let record = locate(
        &Environment::new("production"),
        temp.path(),
        &RecordLayout::default(),
    )
    .unwrap();

    assert_eq!(record.environment.as_str(), "production");
    assert_eq!(
        record.path,
        temp.path().join("environments/production/deployment.yaml")
    );
    assert_eq!(
        record.rel_path.to_str().unwrap(),
        "environments/production/deployment.yaml"
    );
}

#[test]
fn missing_environment_is_record_not_found() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("environments/dev")).unwrap();

    let err = locate(
        &Environment::new("production"),
        temp.path(),
        &RecordLayout::default(),
    )
    .unwrap_err();

    match err {
        PropagateError::RecordNotFound { environment, path } => {
            assert_eq!(environment, "production");
            assert!(path.ends_with("environments/production/deployment.yaml"));
        }
        other => panic!("expected RecordNotFound, got {other:?}"),
    }
}

#[test]
fn environment_directory_without_record_is_not_found() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("environments/production")).unwrap();

    let err = locate(
        &Environment::new("production"),
        temp.path(),
        &RecordLayout::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PropagateError::RecordNotFound { .. }));
}

#[test]
fn environment_name_cannot_escape_the_repo() {
    let temp = TempDir::new().unwrap();
    for name in ["../../etc", "..", ".", "a/b", "a\\b", ""] {
        let err = locate(
            &Environment::new(name),
            temp.path(),
            &RecordLayout::default(),
        )
        .unwrap_err();
        assert!(
            matches!(err, PropagateError::RecordNotFound { .. }),
            "name {name:?} should be rejected"
        );
    }
}

#[test]
fn custom_layout_is_respected() {
    let temp = TempDir::new().unwrap();
    let record_dir = temp.path().join("deploy/staging");
    fs::create_dir_all(&record_dir).unwrap();
    fs::write(record_dir.join("values.yaml"), "image:\n  repository: a\n  tag: b\n").unwrap();

    let layout = RecordLayout {
        environments_dir: "deploy".to_string(),
        record_file: "values.yaml".to_string(),
    };
    let record = locate(&Environment::new("staging"), temp.path(), &layout).unwrap();
    assert_eq!(record.rel_path.to_str().unwrap(), "deploy/staging/values.yaml");
}
