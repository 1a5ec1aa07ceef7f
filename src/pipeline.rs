//! Step orchestration
//!
//! Steps run strictly in order and a failing step never stops the ones after
//! it, so the matrix always holds one record per step. The gate decision
//! only looks at required steps.

use std::time::Instant;

use chrono::Utc;

use crate::checks::{CheckContext, CheckName, CheckResult};
use crate::summary::{StepRecord, VerificationMatrix};

/// A named unit of verification
pub struct Step<'a> {
    pub name: String,
    pub required: bool,
    handler: Box<dyn FnOnce() -> CheckResult + 'a>,
}

impl<'a> Step<'a> {
    pub fn new(
        name: impl Into<String>,
        required: bool,
        handler: impl FnOnce() -> CheckResult + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            required,
            handler: Box::new(handler),
        }
    }

    /// Step running one standard check against `ctx`
    pub fn for_check(check: CheckName, ctx: CheckContext<'a>) -> Self {
        Self::new(check.display_name(), check.is_required(), move || {
            check.run(&ctx)
        })
    }
}

/// Run every step and collect the matrix
pub fn run_steps(steps: Vec<Step<'_>>) -> VerificationMatrix {
    let started_at = Utc::now();
    let total = steps.len();
    let mut records = Vec::with_capacity(total);

    for (index, step) in steps.into_iter().enumerate() {
        tracing::info!(
            "[{}/{}] {}{}",
            index + 1,
            total,
            step.name,
            if step.required { "" } else { " (optional)" }
        );
        let start = Instant::now();
        let result = (step.handler)();
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::debug!("{} finished in {} ms", step.name, duration_ms),
            Err(err) if step.required => tracing::error!("{} failed: {}", step.name, err),
            Err(err) => tracing::warn!("{} failed (optional): {}", step.name, err),
        }
        records.push(StepRecord::from_result(step.name, step.required, result, duration_ms));
    }

    VerificationMatrix::new(records, started_at)
}

/// The standard ordered step list
pub fn standard_steps(ctx: CheckContext<'_>) -> Vec<Step<'_>> {
    CheckName::ALL
        .into_iter()
        .map(|check| Step::for_check(check, ctx))
        .collect()
}

/// Promotion gate over one configuration
pub struct Gate<'a> {
    ctx: CheckContext<'a>,
}

impl<'a> Gate<'a> {
    pub fn new(ctx: CheckContext<'a>) -> Self {
        Self { ctx }
    }

    /// Run every standard check
    pub fn run(&self) -> VerificationMatrix {
        self.warn_on_shared_host();
        run_steps(standard_steps(self.ctx)).with_release_version(&self.ctx.config.version)
    }

    /// Run a single check in isolation
    pub fn run_check(&self, check: CheckName) -> VerificationMatrix {
        run_steps(vec![Step::for_check(check, self.ctx)])
            .with_release_version(&self.ctx.config.version)
    }

    fn warn_on_shared_host(&self) {
        let config = self.ctx.config;
        if config.shares_host() {
            tracing::warn!(
                "Feeds and artifacts are both served from {}; their caching policies must differ",
                config.feeds_origin().host_str().unwrap_or_default()
            );
        }
    }
}
