//! Build provenance statements (in-toto / SLSA style)
//!
//! Every field is optional at the type level so that a structurally
//! incomplete document still deserializes and the validator can report all
//! of its gaps at once.

mod validate;

pub use validate::{validate_statement, ProvenanceReport, RUNTIME_KEYS, STATEMENT_TYPE};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvenanceStatement {
    #[serde(rename = "_type", default)]
    pub statement_type: Option<Value>,

    #[serde(default)]
    pub subject: Option<Section<Vec<Value>>>,

    #[serde(rename = "predicateType", default)]
    pub predicate_type: Option<Value>,

    #[serde(default)]
    pub predicate: Option<Section<Predicate>>,
}

impl ProvenanceStatement {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// A nested section as published: the expected shape, or any other value.
///
/// Leaf fields stay untyped so one wrong-typed value is reported by its
/// sub-check instead of failing the whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Section<T> {
    Expected(T),
    Other(Value),
}

impl<T> Section<T> {
    pub fn expected(&self) -> Option<&T> {
        match self {
            Section::Expected(inner) => Some(inner),
            Section::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    #[serde(default)]
    pub build_metadata: Option<Section<BuildMetadata>>,
    #[serde(default)]
    pub materials: Option<Section<Vec<Section<Material>>>>,
    #[serde(default)]
    pub environment: Option<Section<BuildEnvironment>>,
    #[serde(default)]
    pub source: Option<Section<SourceInfo>>,
}

impl Predicate {
    pub fn build_metadata(&self) -> Option<&BuildMetadata> {
        self.build_metadata.as_ref().and_then(Section::expected)
    }

    pub fn environment(&self) -> Option<&BuildEnvironment> {
        self.environment.as_ref().and_then(Section::expected)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetadata {
    #[serde(default)]
    pub builder: Option<Section<Builder>>,
    #[serde(default)]
    pub build_invocation_id: Option<Value>,
    #[serde(default)]
    pub build_started_on: Option<Value>,
    #[serde(default)]
    pub build_finished_on: Option<Value>,
    #[serde(default)]
    pub reproducible: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Builder {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub version: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Material {
    #[serde(default)]
    pub uri: Option<Value>,
    /// Algorithm → hex digest
    #[serde(default)]
    pub digest: Option<Value>,
}

/// Build host environment. Runtime versions (`electron`, `node`, ...) are
/// collected from the remaining keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEnvironment {
    #[serde(default)]
    pub platform: Option<Value>,
    #[serde(default)]
    pub abi: Option<Value>,
    #[serde(default)]
    pub node_pty_abi: Option<Value>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl BuildEnvironment {
    /// Runtime name → version string for every recognized runtime key
    pub fn runtimes(&self) -> Vec<(&str, &str)> {
        RUNTIME_KEYS
            .iter()
            .filter_map(|key| {
                let version = self.other.get(*key)?.as_str()?;
                (!version.is_empty()).then_some((*key, version))
            })
            .collect()
    }

    /// Native module ABI, from `nodePtyAbi` or `abi`
    pub fn native_abi(&self) -> Option<&Value> {
        [self.node_pty_abi.as_ref(), self.abi.as_ref()]
            .into_iter()
            .flatten()
            .find(|v| !v.is_null() && v.as_str() != Some(""))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(default)]
    pub git: Option<Section<GitSource>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitSource {
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub commit: Option<Value>,
    #[serde(default)]
    pub branch: Option<Value>,
}
