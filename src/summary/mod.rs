//! Verification matrix and exit codes

mod matrix;
mod status;

pub use matrix::{StepRecord, VerificationMatrix, MATRIX_SCHEMA_ID, MATRIX_SCHEMA_VERSION};
pub use status::{ExitCode, StepStatus};
