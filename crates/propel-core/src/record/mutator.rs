//! Structural, format-preserving mutation of a configuration record.
//!
//! The record is YAML owned by the environment's authors; this module may
//! change the values of `image.repository` and `image.tag` and nothing else.
//! The fields are resolved structurally (parsed document, not text patterns),
//! then rewritten in place in the original text so that key order, comments,
//! quoting, and indentation all survive. A re-parse verifies that the rewrite
//! touched only the two owned fields before the result is accepted.

use serde_yaml::Value;

use crate::artifact::ArtifactDescriptor;
use crate::error::PropagateError;

/// Result of applying an artifact to a record's content.
#[derive(Debug, Clone)]
pub struct MutationResult {
    /// False when the record already carries the artifact identity; the
    /// caller must not stage or publish anything in that case.
    pub changed: bool,
    /// Full record content after mutation (the original bytes when unchanged)
    pub new_content: String,
}

/// Apply an artifact's identity to a record.
///
/// Fails with [`PropagateError::MissingField`] when either owned field is
/// absent: the core never inserts structure, because new keys could violate
/// the reconciliation agent's schema expectations.
pub fn mutate(
    existing: &str,
    artifact: &ArtifactDescriptor,
) -> Result<MutationResult, PropagateError> {
    let doc: Value = serde_yaml::from_str(existing)?;

    let image = doc
        .get("image")
        .ok_or(PropagateError::MissingField { field: "image" })?;
    let current_repository = image
        .get("repository")
        .and_then(scalar_text)
        .ok_or(PropagateError::MissingField {
            field: "image.repository",
        })?;
    let current_tag = image
        .get("tag")
        .and_then(scalar_text)
        .ok_or(PropagateError::MissingField { field: "image.tag" })?;

    if current_repository == artifact.repository && current_tag == artifact.tag {
        return Ok(MutationResult {
            changed: false,
            new_content: existing.to_string(),
        });
    }

    let rewritten = rewrite(existing, artifact)?;
    verify_rewrite(&doc, &rewritten, artifact)?;

    let changed = rewritten != existing;
    Ok(MutationResult {
        changed,
        new_content: rewritten,
    })
}

/// Render a scalar value as text, if the node is a scalar.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Rewrite the two owned value spans in the original text.
///
/// Walks the document line by line, tracking the block-mapping path from
/// indentation, and replaces the values of `repository:` and `tag:` directly
/// under a top-level `image:` key. The single-line flow form
/// `image: {repository: ..., tag: ...}` is handled on the `image:` line
/// itself. Every untouched line is carried over byte for byte, line endings
/// included.
fn rewrite(existing: &str, artifact: &ArtifactDescriptor) -> Result<String, PropagateError> {
    let mut out = String::with_capacity(existing.len() + 16);
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut wrote_repository = false;
    let mut wrote_tag = false;

    for raw in existing.split_inclusive('\n') {
        let (body, eol) = split_eol(raw);
        let trimmed = body.trim_start();

        // Blank lines, comments, and sequence items never carry the owned
        // fields and do not affect the mapping path.
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('-') {
            out.push_str(raw);
            continue;
        }

        let indent = body.len() - trimmed.len();
        while stack.last().is_some_and(|(depth, _)| *depth >= indent) {
            stack.pop();
        }

        let Some((key_part, _)) = trimmed.split_once(':') else {
            out.push_str(raw);
            continue;
        };
        let key = key_part.trim();
        let colon_idx = indent + key_part.len();
        let after = &body[colon_idx + 1..];
        let (value_start, value_end) = split_value(after);
        let value = &after[value_start..value_end];

        if stack.is_empty() && key == "image" && value.starts_with('{') {
            // Flow form: both entries live on this line.
            let Some(new_after) = rewrite_flow(after, artifact) else {
                return Err(PropagateError::RewriteVerification);
            };
            out.push_str(&body[..colon_idx + 1]);
            out.push_str(&new_after);
            out.push_str(eol);
            wrote_repository = true;
            wrote_tag = true;
            continue;
        }

        let in_image = stack.len() == 1 && stack[0].1 == "image";
        if in_image && (key == "repository" || key == "tag") && !value.is_empty() {
            let new_text = if key == "repository" {
                &artifact.repository
            } else {
                &artifact.tag
            };
            out.push_str(&body[..colon_idx + 1]);
            out.push_str(&after[..value_start]);
            out.push_str(&render_value(value, new_text));
            out.push_str(&after[value_end..]);
            out.push_str(eol);
            if key == "repository" {
                wrote_repository = true;
            } else {
                wrote_tag = true;
            }
            continue;
        }

        if value.is_empty() {
            // Block-mapping header: descend.
            stack.push((indent, key.to_string()));
        }
        out.push_str(raw);
    }

    if !(wrote_repository && wrote_tag) {
        // The parse found the fields but the text walk did not (anchors,
        // multi-line scalars, exotic layout). Refuse rather than guess.
        return Err(PropagateError::RewriteVerification);
    }

    Ok(out)
}

/// Split a raw line into its body and line terminator.
fn split_eol(raw: &str) -> (&str, &str) {
    if let Some(body) = raw.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = raw.strip_suffix('\n') {
        (body, "\n")
    } else {
        (raw, "")
    }
}

/// Locate the value span inside the text following a `key:`.
///
/// Returns byte offsets `(start, end)` such that `after[start..end]` is the
/// scalar value with surrounding whitespace and any trailing `# comment`
/// excluded. Quoted values keep their quotes inside the span.
fn split_value(after: &str) -> (usize, usize) {
    let start = after.len() - after.trim_start().len();
    let rest = &after[start..];
    if rest.is_empty() || rest.starts_with('#') {
        return (start, start);
    }

    let len = if let Some(inner) = rest.strip_prefix('"') {
        match find_unescaped(inner, '"') {
            Some(close) => close + 2,
            None => rest.trim_end().len(),
        }
    } else if let Some(inner) = rest.strip_prefix('\'') {
        match inner.find('\'') {
            Some(close) => close + 2,
            None => rest.trim_end().len(),
        }
    } else {
        match rest.find(" #").or_else(|| rest.find("\t#")) {
            Some(comment) => rest[..comment].trim_end().len(),
            None => rest.trim_end().len(),
        }
    };

    (start, start + len)
}

/// Find the first unescaped occurrence of `quote`.
fn find_unescaped(s: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(i);
        }
    }
    None
}

/// Render a replacement value, preserving the old value's quoting style.
fn render_value(old_value: &str, new_text: &str) -> String {
    if old_value.len() >= 2 && old_value.starts_with('"') && old_value.ends_with('"') {
        format!("\"{new_text}\"")
    } else if old_value.len() >= 2 && old_value.starts_with('\'') && old_value.ends_with('\'') {
        format!("'{new_text}'")
    } else {
        new_text.to_string()
    }
}

/// Rewrite both entries of a flow mapping `{repository: ..., tag: ...}`.
fn rewrite_flow(after: &str, artifact: &ArtifactDescriptor) -> Option<String> {
    let updated = rewrite_flow_entry(after, "repository", &artifact.repository)?;
    rewrite_flow_entry(&updated, "tag", &artifact.tag)
}

/// Replace the value of one `key:` entry inside a flow mapping.
fn rewrite_flow_entry(segment: &str, key: &str, new_text: &str) -> Option<String> {
    let needle = format!("{key}:");
    let mut search_from = 0;

    while let Some(pos) = segment[search_from..].find(&needle) {
        let abs = search_from + pos;
        // The key must sit at an entry boundary, not inside another token.
        let at_boundary = matches!(
            segment[..abs].chars().next_back(),
            None | Some('{' | ',' | ' ' | '\t')
        );
        if !at_boundary {
            search_from = abs + needle.len();
            continue;
        }

        let value_at = abs + needle.len();
        let rest = &segment[value_at..];
        let ws = rest.len() - rest.trim_start().len();
        let value_rest = &rest[ws..];
        let end = value_rest.find([',', '}']).unwrap_or(value_rest.len());
        let old_value = value_rest[..end].trim_end();

        let mut out = String::new();
        out.push_str(&segment[..value_at + ws]);
        out.push_str(&render_value(old_value, new_text));
        out.push_str(&value_rest[old_value.len()..]);
        return Some(out);
    }

    None
}

/// Verify that a rewrite changed the owned fields and nothing else.
fn verify_rewrite(
    original: &Value,
    rewritten: &str,
    artifact: &ArtifactDescriptor,
) -> Result<(), PropagateError> {
    let new_doc: Value =
        serde_yaml::from_str(rewritten).map_err(|_| PropagateError::RewriteVerification)?;

    let field = |doc: &Value, key: &str| -> Option<String> {
        doc.get("image").and_then(|image| image.get(key)).and_then(scalar_text)
    };
    if field(&new_doc, "repository").as_deref() != Some(artifact.repository.as_str())
        || field(&new_doc, "tag").as_deref() != Some(artifact.tag.as_str())
    {
        return Err(PropagateError::RewriteVerification);
    }

    if neutralized(original.clone()) != neutralized(new_doc) {
        return Err(PropagateError::RewriteVerification);
    }

    Ok(())
}

/// Blank out the owned fields so that documents can be compared on
/// everything else.
fn neutralized(mut doc: Value) -> Value {
    if let Some(image) = doc.get_mut("image")
        && let Some(map) = image.as_mapping_mut()
    {
        map.insert(Value::from("repository"), Value::Null);
        map.insert(Value::from("tag"), Value::Null);
    }
    doc
}
