//! Test doubles for the gate's external seams
//!
//! - `MockFetcher`: serves registered URLs from memory, with per-URL failure
//!   injection and request recording
//! - `MockResolver`: answers DNS lookups from a fixed host list
//! - `ScriptedSignatureTool`: replays canned `gpg` outputs
//! - `ScriptedCodeSigningTool`: fixed per-platform code-signing verdicts

mod code_signing;
mod failure;
mod fetcher;
mod resolver;
mod signature;

pub use code_signing::ScriptedCodeSigningTool;
pub use failure::{FailureConfig, FailureInjector, FailureMode};
pub use fetcher::{Method, MockFetcher, MockResource};
pub use resolver::MockResolver;
pub use signature::{ScriptedSignatureTool, ToolCall};
