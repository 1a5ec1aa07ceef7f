//! End-to-end gate runs against an in-memory release
//!
//! A Windows release (installer, blockmap, manifest, SBOM, live feed) is
//! served from `MockFetcher`; each test breaks one thing and checks how the
//! matrix reports it.

use std::collections::BTreeMap;
use std::io::Write;

use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use flate2::write::GzEncoder;
use flate2::Compression;
use release_gate::artifact::sha256_hex;
use release_gate::config::load_config;
use release_gate::artifact::Platform;
use release_gate::mock::{
    FailureConfig, MockFetcher, MockResolver, MockResource, ScriptedCodeSigningTool, ScriptedSignatureTool,
};
use release_gate::signing::SigningVerdict;
use release_gate::{CheckContext, CheckName, ErrorKind, Gate, GateConfig, StepStatus, VerificationMatrix};
use serde_json::{json, Value};

const ORIGIN: &str = "https://updates.example.com";
const HOST: &str = "updates.example.com";
const EXE: &str = "App-Setup-1.2.0.exe";
const BLOCKMAP: &str = "App-Setup-1.2.0.exe.blockmap";
const IMMUTABLE: &str = "public, max-age=31536000, immutable";

fn config(overrides: Value) -> GateConfig {
    let base = json!({
        "version": "1.2.0",
        "product": "App",
        "required_platforms": ["win"],
        "origins": {"feeds": ORIGIN},
        "retry": {"max_attempts": 2, "base_delay_ms": 0}
    });
    let merged = release_gate::config::deep_merge(base, overrides);
    load_config(None, false, &BTreeMap::new(), Some(merged))
        .unwrap()
        .config
}

fn release_url(origin: &str, file: &str) -> String {
    format!("{}/releases/1.2.0/{}", origin, file)
}

fn feed_url(origin: &str) -> String {
    format!("{}/stable/latest.yml", origin)
}

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// The files of a well-formed 1.2.0 Windows release
struct Release {
    exe: Vec<u8>,
    blockmap: Vec<u8>,
    live_version: String,
}

impl Release {
    fn new() -> Self {
        let exe = b"MZ\x90\x00 installer payload".repeat(64);
        let blockmap = gzip(
            &json!({"version": "2", "files": [{"name": EXE, "offset": 0, "size": exe.len()}]})
                .to_string(),
        );
        Self {
            exe,
            blockmap,
            live_version: "1.2.0".to_string(),
        }
    }

    fn manifest(&self) -> String {
        format!(
            "{}  {}\n{}  {}\n",
            sha256_hex(&self.exe),
            EXE,
            sha256_hex(&self.blockmap),
            BLOCKMAP
        )
    }

    fn serve(&self, fetcher: &MockFetcher, origin: &str) {
        let binary = |body: &[u8]| {
            MockResource::new(body.to_vec())
                .with_header("Content-Type", "application/octet-stream")
                .with_header("Cache-Control", IMMUTABLE)
        };
        fetcher.insert(&release_url(origin, EXE), binary(&self.exe));
        fetcher.insert(&release_url(origin, BLOCKMAP), binary(&self.blockmap));
        fetcher.insert(
            &release_url(origin, "SHA256SUMS"),
            MockResource::new(self.manifest()).with_header("Content-Type", "text/plain"),
        );
        fetcher.insert(
            &release_url(origin, "sbom-1.2.0.spdx.json"),
            MockResource::new("{}"),
        );
        fetcher.insert(
            &feed_url(origin),
            MockResource::new(format!(
                "version: {}\nurl: {}\nsha512: abc==\n",
                self.live_version,
                release_url(origin, EXE)
            ))
            .with_header("Cache-Control", "no-store")
            .with_header("X-Content-Type-Options", "nosniff"),
        );
    }
}

struct World {
    config: GateConfig,
    fetcher: MockFetcher,
    resolver: MockResolver,
    tool: ScriptedSignatureTool,
    code_signing: ScriptedCodeSigningTool,
}

impl World {
    fn new(config: GateConfig) -> Self {
        Self {
            config,
            fetcher: MockFetcher::new(),
            resolver: MockResolver::new().with_host(HOST),
            tool: ScriptedSignatureTool::new(vec![]),
            code_signing: ScriptedCodeSigningTool::new(),
        }
    }

    fn ctx(&self) -> CheckContext<'_> {
        CheckContext {
            config: &self.config,
            fetcher: &self.fetcher,
            resolver: &self.resolver,
            signature_tool: &self.tool,
            code_signing: &self.code_signing,
        }
    }

    fn run(&self) -> VerificationMatrix {
        Gate::new(self.ctx()).run()
    }

    fn run_check(&self, check: CheckName) -> VerificationMatrix {
        Gate::new(self.ctx()).run_check(check)
    }
}

fn status_of(matrix: &VerificationMatrix, check: CheckName) -> StepStatus {
    matrix.step(check.display_name()).unwrap().status
}

// =============================================================================
// Full pipeline
// =============================================================================

#[test]
fn test_complete_release_passes() {
    let world = World::new(config(json!({})));
    Release::new().serve(&world.fetcher, ORIGIN);

    let matrix = world.run();
    assert!(matrix.passed, "{}", matrix.render());
    assert_eq!(matrix.steps.len(), 8);
    assert_eq!(matrix.required_total, 5);
    assert_eq!(status_of(&matrix, CheckName::Artifacts), StepStatus::Passed);
    assert_eq!(status_of(&matrix, CheckName::Hashes), StepStatus::Passed);
    assert_eq!(status_of(&matrix, CheckName::Feeds), StepStatus::Passed);
    assert_eq!(status_of(&matrix, CheckName::Blockmap), StepStatus::Passed);
    assert_eq!(status_of(&matrix, CheckName::PlatformSigning), StepStatus::Skipped);
    assert_eq!(status_of(&matrix, CheckName::Provenance), StepStatus::Skipped);
}

#[test]
fn test_redeploy_passes_with_warning() {
    let world = World::new(config(json!({})));
    Release::new().serve(&world.fetcher, ORIGIN);

    let matrix = world.run_check(CheckName::Monotonic);
    let step = matrix.step(CheckName::Monotonic.display_name()).unwrap();
    assert!(matrix.passed);
    assert_eq!(step.status, StepStatus::PassedWithWarnings);
    assert!(step.warnings[0].contains("re-deployment"));
}

#[test]
fn test_no_public_key_skips_signature_without_blocking() {
    let world = World::new(config(json!({})));
    Release::new().serve(&world.fetcher, ORIGIN);

    let matrix = world.run();
    let step = matrix.step(CheckName::Signature.display_name()).unwrap();
    assert_eq!(step.status, StepStatus::Skipped);
    assert!(!step.required);
    assert!(matrix.passed);
}

// =============================================================================
// Version guard
// =============================================================================

#[test]
fn test_downgrade_blocks_promotion() {
    let world = World::new(config(json!({"version": "1.1.9"})));
    world.fetcher.insert(
        &feed_url(ORIGIN),
        MockResource::new("version: 1.2.0\n"),
    );

    let matrix = world.run_check(CheckName::Monotonic);
    assert!(!matrix.passed);
    let step = &matrix.steps[0];
    assert_eq!(step.error_kind, Some(ErrorKind::IntegrityMismatch));
    let error = step.error.as_deref().unwrap();
    assert!(error.contains("1.1.9"));
    assert!(error.contains("1.2.0"));
}

#[test]
fn test_first_deployment_passes() {
    let world = World::new(config(json!({})));
    let matrix = world.run_check(CheckName::Monotonic);
    assert!(matrix.passed);
    assert_eq!(matrix.steps[0].status, StepStatus::Passed);
}

// =============================================================================
// Integrity
// =============================================================================

#[test]
fn test_single_byte_mutation_fails_hashes() {
    let world = World::new(config(json!({})));
    let release = Release::new();
    release.serve(&world.fetcher, ORIGIN);

    let mut tampered = release.exe.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0xff;
    world.fetcher.insert(
        &release_url(ORIGIN, EXE),
        MockResource::new(tampered.clone())
            .with_header("Content-Type", "application/octet-stream")
            .with_header("Cache-Control", IMMUTABLE),
    );

    let matrix = world.run();
    assert!(!matrix.passed);
    let hashes = matrix.step(CheckName::Hashes.display_name()).unwrap();
    assert_eq!(
        hashes.error.as_deref(),
        Some(
            format!(
                "Hash mismatch for {}: expected {} got {}",
                EXE,
                sha256_hex(&release.exe),
                sha256_hex(&tampered)
            )
            .as_str()
        )
    );
    // Same length, so the blockmap still agrees
    assert_eq!(status_of(&matrix, CheckName::Blockmap), StepStatus::Passed);
}

#[test]
fn test_blockmap_size_mismatch_names_both_sizes() {
    let world = World::new(config(json!({})));
    world.fetcher.insert(
        &release_url(ORIGIN, EXE),
        MockResource::new(Vec::<u8>::new()).with_header("Content-Length", "1048577"),
    );
    world.fetcher.insert(
        &release_url(ORIGIN, BLOCKMAP),
        MockResource::new(gzip(r#"{"files":[{"name":"App-Setup-1.2.0.exe","size":1048576}]}"#)),
    );

    let matrix = world.run_check(CheckName::Blockmap);
    let error = matrix.steps[0].error.as_deref().unwrap();
    assert!(error.contains("1048576"));
    assert!(error.contains("1048577"));
    assert!(!matrix.passed);
}

// =============================================================================
// Feeds
// =============================================================================

#[test]
fn test_feed_without_version_field() {
    let world = World::new(config(json!({})));
    world.fetcher.insert(
        &feed_url(ORIGIN),
        MockResource::new("path: App-Setup-1.2.0.exe\n"),
    );

    let matrix = world.run_check(CheckName::Feeds);
    let error = matrix.steps[0].error.as_deref().unwrap();
    assert!(error.contains("Missing required field: version"));
}

// =============================================================================
// Orchestration
// =============================================================================

#[test]
fn test_every_step_runs_when_origin_is_down() {
    let mut world = World::new(config(json!({})));
    world.resolver = MockResolver::new();

    let matrix = world.run();
    assert_eq!(matrix.steps.len(), 8);
    assert!(!matrix.passed);
    // Signature has nothing to fetch without a key
    assert_eq!(status_of(&matrix, CheckName::Signature), StepStatus::Skipped);
    for check in [CheckName::Artifacts, CheckName::Hashes, CheckName::Feeds] {
        let step = matrix.step(check.display_name()).unwrap();
        assert_eq!(step.error_kind, Some(ErrorKind::Transport));
    }
}

#[test]
fn test_fallback_origin_used_when_primary_unresolvable() {
    let fallback = "https://app.pages.dev";
    let mut world = World::new(config(json!({"origins": {"fallback": fallback}})));
    world.resolver = MockResolver::new().with_host("app.pages.dev");
    Release::new().serve(&world.fetcher, fallback);

    let matrix = world.run();
    assert!(matrix.passed, "{}", matrix.render());
}

#[test]
fn test_optional_failure_does_not_block() {
    let world = World::new(config(json!({})));
    Release::new().serve(&world.fetcher, ORIGIN);
    world.fetcher.insert(
        &release_url(ORIGIN, "provenance.json"),
        MockResource::new(r#"{"_type": "https://in-toto.io/Statement/v0.1"}"#),
    );

    let matrix = world.run();
    assert_eq!(status_of(&matrix, CheckName::Provenance), StepStatus::Failed);
    assert!(matrix.passed);
    assert_eq!(matrix.optional_passed, 2);
}

#[test]
fn test_transient_failures_are_retried() {
    let world = World::new(config(json!({})));
    Release::new().serve(&world.fetcher, ORIGIN);
    world.fetcher.inject_failure(
        &release_url(ORIGIN, EXE),
        FailureConfig::status(503).with_fail_count(1),
    );

    let matrix = world.run_check(CheckName::Hashes);
    assert!(matrix.passed, "{}", matrix.render());
}

// =============================================================================
// Signature
// =============================================================================

#[test]
fn test_signed_manifest_verifies() {
    let key = SigningKey::from_bytes(&[9u8; 32]);
    let public = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().as_bytes());
    let world = World::new(config(json!({"public_key": public})));
    let release = Release::new();
    release.serve(&world.fetcher, ORIGIN);
    world.fetcher.insert(
        &release_url(ORIGIN, "SHA256SUMS.sig"),
        MockResource::new(key.sign(release.manifest().as_bytes()).to_bytes().to_vec()),
    );

    let matrix = world.run();
    assert_eq!(status_of(&matrix, CheckName::Signature), StepStatus::Passed);
    assert!(matrix.passed);
}

#[test]
fn test_missing_signature_file_fails_optional_step() {
    let key = SigningKey::from_bytes(&[9u8; 32]);
    let public = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().as_bytes());
    let world = World::new(config(json!({"public_key": public})));
    Release::new().serve(&world.fetcher, ORIGIN);

    let matrix = world.run();
    let step = matrix.step(CheckName::Signature.display_name()).unwrap();
    assert_eq!(step.error_kind, Some(ErrorKind::NotFound));
    assert!(matrix.passed);
}

#[test]
fn test_signed_installer_inspected_after_download() {
    let mut world = World::new(config(json!({})));
    let release = Release::new();
    release.serve(&world.fetcher, ORIGIN);
    world.code_signing = ScriptedCodeSigningTool::new()
        .with_verdict(Platform::Win, SigningVerdict::Verified("Successfully verified".into()));

    let matrix = world.run();
    assert_eq!(status_of(&matrix, CheckName::PlatformSigning), StepStatus::Passed);
    assert_eq!(world.code_signing.inspected(), vec![(Platform::Win, release.exe.clone())]);
}

#[test]
fn test_unsigned_installer_fails_optional_step() {
    let mut world = World::new(config(json!({})));
    Release::new().serve(&world.fetcher, ORIGIN);
    world.code_signing = ScriptedCodeSigningTool::new()
        .with_verdict(Platform::Win, SigningVerdict::Rejected("No signature found".into()));

    let matrix = world.run();
    let step = matrix.step(CheckName::PlatformSigning.display_name()).unwrap();
    assert_eq!(step.error_kind, Some(ErrorKind::Signature));
    assert!(matrix.passed);
}

// =============================================================================
// Report
// =============================================================================

#[test]
fn test_matrix_json() {
    let world = World::new(config(json!({})));
    Release::new().serve(&world.fetcher, ORIGIN);

    let json: Value = serde_json::from_str(&world.run().to_json().unwrap()).unwrap();
    assert_eq!(json["schema_id"], "release-gate/verification_matrix@1");
    assert_eq!(json["release_version"], "1.2.0");
    assert_eq!(json["passed"], true);
    assert_eq!(json["steps"].as_array().unwrap().len(), 8);
    assert_eq!(json["steps"][5]["name"], "Platform Signing Checks");
    assert_eq!(json["steps"][6]["status"], "skipped");
}
