use propel_core::artifact::ArtifactDescriptor;
use propel_core::error::PropagateError;
use propel_core::record::mutate;

const RECORD: &str = "\
# Deployment parameters for svc.
# The image block is owned by the promotion pipeline.
replicas: 3  # keep in sync with the HPA minimum
image:
  repository: ghcr.io/org/svc
  tag: old999
resources:
  limits:
    memory: 256Mi
ingress:
  host: svc.example.com
";

fn artifact(tag: &str) -> ArtifactDescriptor {
    ArtifactDescriptor::new("ghcr.io/org/svc", tag)
}

#[test]
fn updates_tag_and_nothing_else() {
    let result = mutate(RECORD, &artifact("abc123")).unwrap();

    assert!(result.changed);
    assert_eq!(result.new_content, RECORD.replace("tag: old999", "tag: abc123"));
}

#[test]
fn updates_repository_and_tag_together() {
    let moved = ArtifactDescriptor::new("ghcr.io/org/svc-v2", "abc123");
    let result = mutate(RECORD, &moved).unwrap();

    assert!(result.changed);
    assert!(result.new_content.contains("  repository: ghcr.io/org/svc-v2\n"));
    assert!(result.new_content.contains("  tag: abc123\n"));
}

#[test]
fn noop_when_identity_already_current() {
    let result = mutate(RECORD, &artifact("old999")).unwrap();

    assert!(!result.changed);
    assert_eq!(result.new_content, RECORD);
}

#[test]
fn unrelated_lines_survive_byte_for_byte() {
    let result = mutate(RECORD, &artifact("abc123")).unwrap();

    let before: Vec<&str> = RECORD.lines().collect();
    let after: Vec<&str> = result.new_content.lines().collect();
    assert_eq!(before.len(), after.len());
    for (old, new) in before.iter().zip(&after) {
        if old.trim_start().starts_with("tag:") {
            continue;
        }
        assert_eq!(old, new);
    }
}

#[test]
fn preserves_trailing_comment_on_mutated_line() {
    let record = "image:\n  repository: ghcr.io/org/svc\n  tag: old999 # pinned by release\n";
    let result = mutate(record, &artifact("abc123")).unwrap();

    assert_eq!(
        result.new_content,
        "image:\n  repository: ghcr.io/org/svc\n  tag: abc123 # pinned by release\n"
    );
}

#[test]
fn preserves_quoting_style() {
    let record = "image:\n  repository: \"ghcr.io/org/svc\"\n  tag: 'old999'\n";
    let result = mutate(record, &artifact("abc123")).unwrap();

    assert_eq!(
        result.new_content,
        "image:\n  repository: \"ghcr.io/org/svc\"\n  tag: 'abc123'\n"
    );
}

#[test]
fn flow_style_image_block_is_supported() {
    let record = "replicas: 2\nimage: {repository: ghcr.io/org/svc, tag: old999}\n";
    let result = mutate(record, &artifact("abc123")).unwrap();

    assert!(result.changed);
    assert_eq!(
        result.new_content,
        "replicas: 2\nimage: {repository: ghcr.io/org/svc, tag: abc123}\n"
    );
}

#[test]
fn missing_image_block_fails() {
    let err = mutate("replicas: 3\n", &artifact("abc123")).unwrap_err();
    assert!(matches!(err, PropagateError::MissingField { field: "image" }));
}

#[test]
fn missing_tag_field_fails() {
    let record = "image:\n  repository: ghcr.io/org/svc\n";
    let err = mutate(record, &artifact("abc123")).unwrap_err();
    assert!(matches!(
        err,
        PropagateError::MissingField { field: "image.tag" }
    ));
}

#[test]
fn null_tag_value_is_reported_as_unusable() {
    // The key is present but carries no value; the diagnostic must not claim
    // the field is absent outright.
    let record = "image:\n  repository: ghcr.io/org/svc\n  tag:\n";
    let err = mutate(record, &artifact("abc123")).unwrap_err();

    assert!(matches!(
        err,
        PropagateError::MissingField { field: "image.tag" }
    ));
    assert!(err.to_string().contains("missing, empty, or not a scalar"));
}

#[test]
fn missing_repository_field_fails() {
    let record = "image:\n  tag: old999\n";
    let err = mutate(record, &artifact("abc123")).unwrap_err();
    assert!(matches!(
        err,
        PropagateError::MissingField {
            field: "image.repository"
        }
    ));
}

#[test]
fn fields_are_never_inserted() {
    // A record with an image block that carries neither owned field must
    // fail, not gain new keys.
    let record = "image:\n  pullPolicy: Always\n";
    let err = mutate(record, &artifact("abc123")).unwrap_err();
    assert!(matches!(err, PropagateError::MissingField { .. }));
}

#[test]
fn invalid_yaml_is_a_malformed_record() {
    let err = mutate("image: [unclosed\n", &artifact("abc123")).unwrap_err();
    assert!(matches!(err, PropagateError::MalformedRecord(_)));
}

#[test]
fn nested_image_key_elsewhere_is_not_confused() {
    // A sibling block with its own "tag" key must stay untouched.
    let record = "\
image:
  repository: ghcr.io/org/svc
  tag: old999
sidecar:
  image:
    repository: ghcr.io/org/sidecar
    tag: stable
";
    let result = mutate(record, &artifact("abc123")).unwrap();

    assert!(result.new_content.contains("  tag: abc123\n"));
    assert!(result.new_content.contains("    tag: stable\n"));
    assert!(result.new_content.contains("    repository: ghcr.io/org/sidecar\n"));
}

#[test]
fn worked_example_from_promotion_pipeline() {
    // main -> production promotion of ghcr.io/org/svc at commit abc123.
    let record = "image:\n  repository: ghcr.io/org/svc\n  tag: old999\n";
    let result = mutate(record, &artifact("abc123")).unwrap();

    assert!(result.changed);
    assert_eq!(
        result.new_content,
        "image:\n  repository: ghcr.io/org/svc\n  tag: abc123\n"
    );

    // Re-running with the same artifact is byte-identical and a no-op.
    let rerun = mutate(&result.new_content, &artifact("abc123")).unwrap();
    assert!(!rerun.changed);
    assert_eq!(rerun.new_content, result.new_content);
}
