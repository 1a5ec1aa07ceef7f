//! Environment layer (layer 3)
//!
//! The environment is read once at startup into a snapshot; nothing else in
//! the crate looks at process environment variables.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

/// Variables the gate understands
pub const ENV_KEYS: &[&str] = &[
    "VERSION",
    "UPDATES_ORIGIN",
    "FEEDS_ORIGIN",
    "ARTIFACTS_ORIGIN",
    "UPDATES_FALLBACK",
    "PAGES_DOMAIN",
    "REQUIRED_PLATFORMS",
    "RELEASE_PUBKEY",
    "PRE_DEPLOY_VALIDATION",
    "GITHUB_SHA",
    "RUNTIME_VERSION",
];

/// Capture the recognized variables from the process environment
pub fn snapshot_env() -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| ENV_KEYS.contains(&k.as_str()))
        .collect()
}

fn lookup<'a>(env: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Build the environment overlay. Returns the overlay and the variable names
/// that contributed to it.
pub fn env_layer(env: &BTreeMap<String, String>) -> (Value, Vec<String>) {
    let mut layer = Map::new();
    let mut origins = Map::new();
    let mut ci = Map::new();
    let mut used = Vec::new();

    let mut take = |key: &str| {
        let value = lookup(env, key)?;
        used.push(key.to_string());
        Some(value.to_string())
    };

    if let Some(version) = take("VERSION") {
        layer.insert("version".to_string(), json!(version));
    }

    // FEEDS_ORIGIN wins over the legacy UPDATES_ORIGIN
    if let Some(feeds) = take("FEEDS_ORIGIN").or_else(|| take("UPDATES_ORIGIN")) {
        origins.insert("feeds".to_string(), json!(feeds));
    }
    if let Some(artifacts) = take("ARTIFACTS_ORIGIN") {
        origins.insert("artifacts".to_string(), json!(artifacts));
    }
    let fallback = take("UPDATES_FALLBACK").or_else(|| {
        take("PAGES_DOMAIN").map(|domain| {
            if domain.contains("://") {
                domain
            } else {
                format!("https://{}", domain)
            }
        })
    });
    if let Some(fallback) = fallback {
        origins.insert("fallback".to_string(), json!(fallback));
    }

    if let Some(platforms) = take("REQUIRED_PLATFORMS") {
        let list: Vec<String> = platforms
            .split(',')
            .map(|p| p.trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        layer.insert("required_platforms".to_string(), json!(list));
    }

    if let Some(key) = take("RELEASE_PUBKEY") {
        layer.insert("public_key".to_string(), json!(key));
    }

    if let Some(flag) = take("PRE_DEPLOY_VALIDATION") {
        let enabled = matches!(flag.to_ascii_lowercase().as_str(), "true" | "1");
        layer.insert("pre_deploy".to_string(), json!(enabled));
    }

    if let Some(sha) = take("GITHUB_SHA") {
        ci.insert("commit_sha".to_string(), json!(sha));
    }
    if let Some(runtime) = take("RUNTIME_VERSION") {
        ci.insert("runtime_version".to_string(), json!(runtime));
    }

    if !origins.is_empty() {
        layer.insert("origins".to_string(), Value::Object(origins));
    }
    if !ci.is_empty() {
        layer.insert("ci".to_string(), Value::Object(ci));
    }

    (Value::Object(layer), used)
}
