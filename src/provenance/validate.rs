//! Provenance validation
//!
//! Five independent sub-checks run over the statement and every defect is
//! reported. A sixth pass cross-references the CI context and only produces
//! warnings.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::{Predicate, ProvenanceStatement, Section};
use crate::config::CiContext;

/// Required statement type
pub const STATEMENT_TYPE: &str = "https://in-toto.io/Statement/v0.1";

/// Environment keys naming a runtime version
pub const RUNTIME_KEYS: &[&str] = &["electron", "node", "runtime"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvenanceReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProvenanceReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_statement(stmt: &ProvenanceStatement, ci: &CiContext) -> ProvenanceReport {
    let mut errors = Vec::new();
    errors.extend(check_structure(stmt));
    errors.extend(check_build_metadata(stmt));
    errors.extend(check_materials(stmt));
    errors.extend(check_environment(stmt));
    errors.extend(check_source(stmt));

    let mut warnings = cross_reference(stmt, ci);
    warnings.extend(check_build_order(stmt));

    ProvenanceReport { errors, warnings }
}

/// A leaf value read as text
enum Text<'a> {
    Missing,
    Present(&'a str),
    WrongType,
}

fn text(value: &Option<Value>) -> Text<'_> {
    match value {
        None | Some(Value::Null) => Text::Missing,
        Some(Value::String(s)) if s.trim().is_empty() => Text::Missing,
        Some(Value::String(s)) => Text::Present(s),
        Some(_) => Text::WrongType,
    }
}

/// Push a defect for a missing or non-string field and return the text
fn require_text<'a>(errors: &mut Vec<String>, field: &str, value: &'a Option<Value>) -> Option<&'a str> {
    match text(value) {
        Text::Present(s) => Some(s),
        Text::Missing => {
            errors.push(format!("Missing {}", field));
            None
        }
        Text::WrongType => {
            errors.push(format!("{} must be a string", field));
            None
        }
    }
}

/// The expected shape of a section, or a defect naming it
fn require_section<'a, T>(
    errors: &mut Vec<String>,
    field: &str,
    shape: &str,
    section: &'a Option<Section<T>>,
) -> Option<&'a T> {
    match section {
        None => errors.push(format!("Missing {}", field)),
        Some(Section::Other(Value::Null)) => errors.push(format!("Missing {}", field)),
        Some(Section::Other(_)) => errors.push(format!("{} must be {}", field, shape)),
        Some(Section::Expected(inner)) => return Some(inner),
    }
    None
}

fn predicate(stmt: &ProvenanceStatement) -> Option<&Predicate> {
    stmt.predicate.as_ref().and_then(Section::expected)
}

fn check_structure(stmt: &ProvenanceStatement) -> Vec<String> {
    let mut errors = Vec::new();

    match text(&stmt.statement_type) {
        Text::Missing => errors.push("Missing required field: _type".to_string()),
        Text::Present(STATEMENT_TYPE) => {}
        Text::Present(other) => errors.push(format!(
            "Invalid _type: expected {}, got {}",
            STATEMENT_TYPE, other
        )),
        Text::WrongType => errors.push("_type must be a string".to_string()),
    }

    match &stmt.subject {
        None => errors.push("Missing required field: subject".to_string()),
        Some(Section::Expected(_)) => {}
        Some(Section::Other(_)) => {
            errors.push("subject must be a list of artifact references".to_string())
        }
    }

    match text(&stmt.predicate_type) {
        Text::Missing => errors.push("Missing required field: predicateType".to_string()),
        Text::Present(t) if t.to_ascii_lowercase().contains("provenance") => {}
        Text::Present(t) => errors.push(format!("predicateType is not a provenance type: {}", t)),
        Text::WrongType => errors.push("predicateType must be a string".to_string()),
    }

    match &stmt.predicate {
        None | Some(Section::Other(Value::Null)) => {
            errors.push("Missing required field: predicate".to_string())
        }
        Some(Section::Other(_)) => errors.push("predicate must be an object".to_string()),
        Some(Section::Expected(_)) => {}
    }

    errors
}

fn check_build_metadata(stmt: &ProvenanceStatement) -> Vec<String> {
    let Some(predicate) = predicate(stmt) else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    let Some(meta) = require_section(
        &mut errors,
        "predicate.buildMetadata",
        "an object",
        &predicate.build_metadata,
    ) else {
        return errors;
    };

    if let Some(builder) =
        require_section(&mut errors, "buildMetadata.builder", "an object", &meta.builder)
    {
        require_text(&mut errors, "buildMetadata.builder.id", &builder.id);
        require_text(&mut errors, "buildMetadata.builder.version", &builder.version);
    }

    require_text(&mut errors, "buildMetadata.buildInvocationId", &meta.build_invocation_id);

    for (field, value) in [
        ("buildStartedOn", &meta.build_started_on),
        ("buildFinishedOn", &meta.build_finished_on),
    ] {
        let name = format!("buildMetadata.{}", field);
        if let Some(ts) = require_text(&mut errors, &name, value) {
            if parse_timestamp(ts).is_none() {
                errors.push(format!("Invalid timestamp in {}: {}", name, ts));
            }
        }
    }

    match &meta.reproducible {
        None | Some(Value::Null) => errors.push("Missing buildMetadata.reproducible".to_string()),
        Some(Value::Bool(_)) => {}
        Some(_) => errors.push("buildMetadata.reproducible must be a boolean".to_string()),
    }

    errors
}

fn check_materials(stmt: &ProvenanceStatement) -> Vec<String> {
    let Some(predicate) = predicate(stmt) else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    let Some(materials) =
        require_section(&mut errors, "predicate.materials", "a list", &predicate.materials)
    else {
        return errors;
    };

    for (i, material) in materials.iter().enumerate() {
        let Section::Expected(material) = material else {
            errors.push(format!("Material {} must be an object", i));
            continue;
        };
        match text(&material.uri) {
            Text::Present(_) => {}
            Text::Missing => errors.push(format!("Material {} is missing uri", i)),
            Text::WrongType => errors.push(format!("Material {} uri must be a string", i)),
        }
        match &material.digest {
            Some(Value::Object(digest)) if !digest.is_empty() => {
                for (algorithm, hash) in digest {
                    if hash.as_str().map(str::is_empty).unwrap_or(true) {
                        errors.push(format!("Material {} has invalid {} digest", i, algorithm));
                    }
                }
            }
            None | Some(Value::Null) | Some(Value::Object(_)) => {
                errors.push(format!("Material {} is missing digest", i))
            }
            Some(_) => errors.push(format!("Material {} digest must be an object", i)),
        }
    }
    errors
}

fn check_environment(stmt: &ProvenanceStatement) -> Vec<String> {
    let Some(predicate) = predicate(stmt) else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    let Some(env) = require_section(
        &mut errors,
        "predicate.environment",
        "an object",
        &predicate.environment,
    ) else {
        return errors;
    };

    if env.runtimes().is_empty() {
        errors.push(format!(
            "Environment is missing a runtime version ({})",
            RUNTIME_KEYS.join(", ")
        ));
    }
    require_text(&mut errors, "environment.platform", &env.platform);
    if env.native_abi().is_none() {
        errors.push("Missing environment ABI (nodePtyAbi or abi)".to_string());
    }
    errors
}

fn check_source(stmt: &ProvenanceStatement) -> Vec<String> {
    let Some(predicate) = predicate(stmt) else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    let Some(source) =
        require_section(&mut errors, "predicate.source", "an object", &predicate.source)
    else {
        return errors;
    };
    let Some(git) = require_section(&mut errors, "predicate.source.git", "an object", &source.git)
    else {
        return errors;
    };

    require_text(&mut errors, "source.git.url", &git.url);
    if let Some(commit) = require_text(&mut errors, "source.git.commit", &git.commit) {
        if !is_commit_sha(commit) {
            errors.push(format!("Invalid git commit SHA: {}", commit));
        }
    }
    require_text(&mut errors, "source.git.branch", &git.branch);
    errors
}

/// First seven characters of a CI commit, when it looks like a hex SHA
fn short_commit(sha: &str) -> Option<&str> {
    let short = sha.trim().get(..7)?;
    short.bytes().all(|b| b.is_ascii_hexdigit()).then_some(short)
}

fn cross_reference(stmt: &ProvenanceStatement, ci: &CiContext) -> Vec<String> {
    let mut warnings = Vec::new();
    let Some(predicate) = predicate(stmt) else {
        return warnings;
    };

    if let Some(short) = ci.commit_sha.as_deref().and_then(short_commit) {
        if let Some(id) = predicate
            .build_metadata()
            .and_then(|m| m.build_invocation_id.as_ref())
            .and_then(Value::as_str)
        {
            if !id.contains(short) {
                warnings.push(format!(
                    "buildInvocationId {} does not reference commit {}",
                    id, short
                ));
            }
        }
    }

    if let Some(runtime) = ci.runtime_version.as_deref() {
        if let Some(env) = predicate.environment() {
            let runtimes = env.runtimes();
            if !runtimes.is_empty() && !runtimes.iter().any(|(_, v)| v.contains(runtime)) {
                warnings.push(format!(
                    "Runtime version {} not found in provenance environment",
                    runtime
                ));
            }
        }
    }

    warnings
}

fn check_build_order(stmt: &ProvenanceStatement) -> Vec<String> {
    let Some(meta) = predicate(stmt).and_then(Predicate::build_metadata) else {
        return Vec::new();
    };
    let timestamp = |value: &Option<Value>| value.as_ref()?.as_str().and_then(parse_timestamp);
    let started = timestamp(&meta.build_started_on);
    let finished = timestamp(&meta.build_finished_on);
    match (started, finished) {
        (Some(s), Some(f)) if f < s => vec!["buildFinishedOn precedes buildStartedOn".to_string()],
        _ => Vec::new(),
    }
}

/// 40 hex characters
pub fn is_commit_sha(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// RFC 3339, or a naive date-time / date taken as UTC
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    let utc = FixedOffset::east_opt(0)?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_local_timezone(utc).single();
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?
        .and_local_timezone(utc)
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const COMMIT: &str = "0123456789abcdef0123456789abcdef01234567";

    fn complete() -> Value {
        json!({
            "_type": STATEMENT_TYPE,
            "subject": [{"name": "App-Setup-1.2.0.exe", "digest": {"sha256": "abc"}}],
            "predicateType": "https://slsa.dev/provenance/v0.2",
            "predicate": {
                "buildMetadata": {
                    "builder": {"id": "https://github.com/actions", "version": "2.3"},
                    "buildInvocationId": "release-0123456-42",
                    "buildStartedOn": "2024-05-01T10:00:00Z",
                    "buildFinishedOn": "2024-05-01T10:20:00.123Z",
                    "reproducible": false
                },
                "materials": [
                    {"uri": "git+https://github.com/acme/app", "digest": {"sha1": COMMIT}}
                ],
                "environment": {"electron": "30.0.1", "node": "20.11.1", "platform": "linux", "nodePtyAbi": "123"},
                "source": {"git": {"url": "https://github.com/acme/app", "commit": COMMIT, "branch": "main"}}
            }
        })
    }

    fn run(doc: Value, ci: &CiContext) -> ProvenanceReport {
        let stmt: ProvenanceStatement = serde_json::from_value(doc).unwrap();
        validate_statement(&stmt, ci)
    }

    #[test]
    fn test_complete_statement_valid() {
        let report = run(complete(), &CiContext::default());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_empty_statement_reports_every_top_level_gap() {
        let report = run(json!({}), &CiContext::default());
        assert_eq!(report.errors.len(), 4, "{:?}", report.errors);
    }

    #[test]
    fn test_wrong_type_and_predicate_type() {
        let mut doc = complete();
        doc["_type"] = json!("https://in-toto.io/Statement/v9");
        doc["predicateType"] = json!("https://example.com/sbom");
        doc["subject"] = json!("App.exe");
        let report = run(doc, &CiContext::default());
        assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
    }

    #[test]
    fn test_independent_sections_all_reported() {
        let mut doc = complete();
        doc["predicate"]["buildMetadata"]
            .as_object_mut()
            .unwrap()
            .remove("reproducible");
        doc["predicate"]["materials"] = json!([{"uri": "x", "digest": {}}]);
        doc["predicate"]["environment"] = json!({"platform": "linux"});
        doc["predicate"]["source"]["git"]["commit"] = json!("abc123");

        let report = run(doc, &CiContext::default());
        let errors = report.errors.join("\n");
        assert!(errors.contains("reproducible"));
        assert!(errors.contains("Material 0 is missing digest"));
        assert!(errors.contains("runtime version"));
        assert!(errors.contains("ABI"));
        assert!(errors.contains("Invalid git commit SHA: abc123"));
    }

    #[test]
    fn test_reproducible_false_is_present() {
        let report = run(complete(), &CiContext::default());
        assert!(!report.errors.iter().any(|e| e.contains("reproducible")));
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut doc = complete();
        doc["predicate"]["buildMetadata"]["buildStartedOn"] = json!("yesterday");
        let report = run(doc, &CiContext::default());
        assert_eq!(
            report.errors,
            vec!["Invalid timestamp in buildMetadata.buildStartedOn: yesterday".to_string()]
        );
    }

    #[test]
    fn test_abi_alias() {
        let mut doc = complete();
        doc["predicate"]["environment"] = json!({"node": "20.11.1", "platform": "darwin", "abi": 115});
        assert!(run(doc, &CiContext::default()).is_valid());
    }

    #[test]
    fn test_cross_reference_warnings() {
        let ci = CiContext {
            commit_sha: Some("fedcba9876543210fedcba9876543210fedcba98".to_string()),
            runtime_version: Some("18.0.0".to_string()),
        };
        let report = run(complete(), &ci);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2, "{:?}", report.warnings);
    }

    #[test]
    fn test_cross_reference_matches() {
        let ci = CiContext {
            commit_sha: Some(COMMIT.to_string()),
            runtime_version: Some("20.11.1".to_string()),
        };
        let report = run(complete(), &ci);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_build_order_warning() {
        let mut doc = complete();
        doc["predicate"]["buildMetadata"]["buildFinishedOn"] = json!("2024-04-30T10:00:00Z");
        let report = run(doc, &CiContext::default());
        assert!(report.is_valid());
        assert_eq!(report.warnings, vec!["buildFinishedOn precedes buildStartedOn".to_string()]);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert!(parse_timestamp("2024-05-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00").is_some());
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("May 1st").is_none());
    }

    #[test]
    fn test_wrong_typed_field_does_not_hide_other_defects() {
        let mut doc = complete();
        doc["predicate"]["buildMetadata"]["reproducible"] = json!("yes");
        doc["predicate"]["buildMetadata"]["builder"]["id"] = json!(1);
        doc["predicate"]["source"]["git"]["commit"] = json!("xyz");

        let report = run(doc, &CiContext::default());
        assert_eq!(
            report.errors,
            vec![
                "buildMetadata.builder.id must be a string".to_string(),
                "buildMetadata.reproducible must be a boolean".to_string(),
                "Invalid git commit SHA: xyz".to_string(),
            ]
        );
    }

    #[test]
    fn test_wrong_shaped_sections_reported() {
        let mut doc = complete();
        doc["predicate"]["buildMetadata"] = json!("ci");
        doc["predicate"]["materials"] = json!([42, {"uri": "x", "digest": "sha1"}]);
        doc["predicate"]["source"] = json!({"git": "main"});

        let report = run(doc, &CiContext::default());
        assert_eq!(
            report.errors,
            vec![
                "predicate.buildMetadata must be an object".to_string(),
                "Material 0 must be an object".to_string(),
                "Material 1 digest must be an object".to_string(),
                "predicate.source.git must be an object".to_string(),
            ]
        );
    }

    #[test]
    fn test_non_hex_ci_commit_skips_cross_reference() {
        for sha in ["ééééé", "éééééééééé", "main", "not-a-sha-at-all"] {
            let ci = CiContext {
                commit_sha: Some(sha.to_string()),
                runtime_version: None,
            };
            let report = run(complete(), &ci);
            assert!(report.warnings.is_empty(), "{}: {:?}", sha, report.warnings);
        }
    }

    #[test]
    fn test_is_commit_sha() {
        assert!(is_commit_sha(COMMIT));
        assert!(is_commit_sha(&COMMIT.to_ascii_uppercase()));
        assert!(!is_commit_sha("abc123"));
        assert!(!is_commit_sha(&"g".repeat(40)));
    }
}
