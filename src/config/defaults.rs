//! Built-in defaults (layer 1)

use serde_json::{json, Value};

use crate::retry::RetryPolicy;
use crate::timeout::TimeoutConfig;

/// Cache-Control expected on immutable release files
const IMMUTABLE_CACHE: &str = r"max-age=\d+|immutable";

/// Built-in default configuration values
#[derive(Debug, Clone)]
pub struct BuiltinDefaults {
    /// Product name substituted into filename templates (default: "App")
    pub product: String,

    /// Primary feed origin (default: "https://updates.example.com")
    pub feeds_origin: String,

    /// Live-feed directory read in pre-deploy mode
    pub local_feed_dir: String,

    /// Version source when none is configured
    pub package_manifest: String,

    pub retry: RetryPolicy,

    pub timeouts: TimeoutConfig,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            product: "App".to_string(),
            feeds_origin: "https://updates.example.com".to_string(),
            local_feed_dir: "dist/updates/stable".to_string(),
            package_manifest: "package.json".to_string(),
            retry: RetryPolicy::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> Value {
        json!({
            "product": self.product,
            "package_manifest": self.package_manifest,
            "origins": {
                "feeds": self.feeds_origin,
                "artifacts": null,
                "fallback": null
            },
            "required_platforms": ["win", "mac", "linux"],
            "public_key": null,
            "pre_deploy": false,
            "local_feed_dir": self.local_feed_dir,
            "allowed_origin_patterns": ["https://*.pages.dev", "https://*.cf-pages.net"],
            "retry": self.retry,
            "timeouts": self.timeouts,
            "ci": {
                "commit_sha": null,
                "runtime_version": null
            },
            "layout": {
                "releases_dir": "releases",
                "stable_dir": "stable",
                "manifest": "SHA256SUMS",
                "signature": "SHA256SUMS.sig",
                "provenance": "provenance.json",
                "common_files": ["SHA256SUMS", "sbom-{version}.spdx.json"],
                "platforms": {
                    "win": {
                        "feed": "latest.yml",
                        "artifacts": [
                            "{product}-Setup-{version}.exe",
                            "{product}-Setup-{version}.exe.blockmap"
                        ],
                        "binary_extensions": ["exe", "blockmap"],
                        "signed_extensions": ["exe"],
                        "headers": [
                            {
                                "file": "{product}-Setup-{version}.exe",
                                "content_type": "octet-stream|application/x-msdownload",
                                "cache_control": IMMUTABLE_CACHE
                            },
                            {
                                "file": "{product}-Setup-{version}.exe.blockmap",
                                "content_type": "application/octet-stream",
                                "cache_control": IMMUTABLE_CACHE
                            }
                        ]
                    },
                    "mac": {
                        "feed": "latest-mac.yml",
                        "artifacts": ["{product}-{version}-mac.zip"],
                        "binary_extensions": ["zip"],
                        "signed_extensions": ["dmg", "pkg"],
                        "headers": [
                            {
                                "file": "{product}-{version}-mac.zip",
                                "content_type": "application/zip",
                                "cache_control": IMMUTABLE_CACHE
                            }
                        ]
                    },
                    "linux": {
                        "feed": "latest-linux.yml",
                        "artifacts": ["{product}-{version}.AppImage"],
                        "binary_extensions": ["AppImage"],
                        "signed_extensions": ["AppImage"],
                        "headers": [
                            {
                                "file": "{product}-{version}.AppImage",
                                "content_type": r"octet-stream|application/vnd\.appimage",
                                "cache_control": IMMUTABLE_CACHE
                            }
                        ]
                    }
                }
            }
        })
    }
}
