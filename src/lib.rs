//! Release Gate - release verification and promotion gate
//!
//! Decides whether a built release may be promoted to the public update
//! feed. Artifacts, hashes, feeds, blockmaps, signatures and provenance are
//! checked in a fixed order; promotion is allowed only when every required
//! check passes.

pub mod artifact;
pub mod checks;
pub mod config;
pub mod error;
pub mod feed;
pub mod mock;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod provenance;
pub mod retry;
pub mod signing;
pub mod summary;
pub mod timeout;

pub use checks::{CheckContext, CheckName, CheckOutcome, CheckResult};
pub use config::{load_config, GateConfig, LoadedConfig};
pub use error::{ErrorKind, GateError};
pub use pipeline::{run_steps, standard_steps, Gate, Step};
pub use summary::{ExitCode, StepRecord, StepStatus, VerificationMatrix};
