// Step sequencing
//
// Steps run strictly in order, one at a time. A FATAL failure halts the run and leaves every later
// step NOT_RUN; a WARN failure is recorded and the run moves on. Each step owns its own
// probe-then-mutate logic so a second run against converged state issues no mutations.

use async_trait::async_trait;
use std::io;
use std::time::Instant;
use thiserror::Error;

use crate::installation::{CommandOutput, CommandRunner, CommandSpec};
use crate::models::report::{Criticality, RunReport};
use crate::models::state::ExecutionContext;

/// Why a step did not reach its desired state.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StepError {
    message: String,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The command could not be started or awaited.
    pub fn launch(spec: &CommandSpec, err: io::Error) -> Self {
        Self::new(format!(
            "failed to launch [{}] `{}`: {}",
            spec.operation,
            spec.describe(),
            err
        ))
    }

    /// The command ran and reported failure.
    pub fn command(what: &str, out: &CommandOutput) -> Self {
        let code = out
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        Self::new(format!(
            "{} failed (exit_code={}): {}",
            what,
            code,
            out.failure_detail()
        ))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Run `spec` once; a launch error or non-zero exit becomes a `StepError` naming `what`.
pub async fn run_checked(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    what: &str,
) -> Result<CommandOutput, StepError> {
    let out = runner
        .run(spec)
        .await
        .map_err(|e| StepError::launch(spec, e))?;
    if !out.success() {
        return Err(StepError::command(what, &out));
    }
    Ok(out)
}

/// One idempotent unit of host configuration.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &'static str;

    fn criticality(&self) -> Criticality;

    /// Drive the host to this step's desired state.
    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError>;
}

/// Run `steps` in order against the selected instance.
pub async fn run(
    steps: &[Box<dyn Step>],
    ctx: &ExecutionContext,
    runner: &dyn CommandRunner,
) -> RunReport {
    let mut report = RunReport::pending(
        ctx.instance(),
        ctx.connection_target(),
        steps
            .iter()
            .map(|s| (s.name().to_string(), s.criticality())),
    );
    report.start();

    let total = steps.len();
    for (index, step) in steps.iter().enumerate() {
        let ordinal = index + 1;
        let started = Instant::now();
        let result = step.apply(ctx, runner).await;
        let elapsed = started.elapsed().as_millis();

        match result {
            Ok(()) => {
                report.record_ok(index, elapsed);
                ctx.log().info(format!(
                    "Step {}/{} '{}' completed ({} ms)",
                    ordinal,
                    total,
                    step.name(),
                    elapsed
                ));
            }
            Err(err) => {
                let message = ctx.credential().redact(err.message());
                report.record_failure(index, message.clone(), elapsed);
                match step.criticality() {
                    Criticality::Fatal => {
                        ctx.log().error(format!(
                            "Step {}/{} '{}' failed: {}",
                            ordinal,
                            total,
                            step.name(),
                            message
                        ));
                        ctx.log().info(format!(
                            "Provisioning halted; {} remaining step(s) not attempted",
                            total - ordinal
                        ));
                        report.halt();
                        return report;
                    }
                    Criticality::Warn => {
                        ctx.log().warning(format!(
                            "Step {}/{} '{}' failed (continuing): {}",
                            ordinal,
                            total,
                            step.name(),
                            message
                        ));
                    }
                }
            }
        }
    }

    report.complete();
    report
}
