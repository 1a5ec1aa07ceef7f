//! Scripted stand-in for the platform code-signing verifiers

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::artifact::Platform;
use crate::signing::{CodeSigningTool, SigningError, SigningVerdict};

/// Answers per platform; platforms without an answer have no verifier
#[derive(Debug, Default)]
pub struct ScriptedCodeSigningTool {
    verdicts: BTreeMap<Platform, Result<SigningVerdict, String>>,
    inspected: Mutex<Vec<(Platform, Vec<u8>)>>,
}

impl ScriptedCodeSigningTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verdict(mut self, platform: Platform, verdict: SigningVerdict) -> Self {
        self.verdicts.insert(platform, Ok(verdict));
        self
    }

    /// The verifier for `platform` fails to run
    pub fn with_error(mut self, platform: Platform, message: &str) -> Self {
        self.verdicts.insert(platform, Err(message.to_string()));
        self
    }

    /// Platform and file contents of every inspection, in order
    pub fn inspected(&self) -> Vec<(Platform, Vec<u8>)> {
        self.inspected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CodeSigningTool for ScriptedCodeSigningTool {
    fn supports(&self, platform: Platform) -> bool {
        self.verdicts.contains_key(&platform)
    }

    fn inspect(&self, platform: Platform, path: &Path) -> Option<Result<SigningVerdict, SigningError>> {
        let verdict = self.verdicts.get(&platform)?;
        let contents = fs::read(path).unwrap_or_default();
        self.inspected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((platform, contents));
        Some(verdict.clone().map_err(SigningError::Tool))
    }
}
