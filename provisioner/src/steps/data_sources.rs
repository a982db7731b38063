// ODBC data sources
//
// Every entry is attempted even after one fails; failures are reported together.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::database::odbc::{register_dsn_script, DSN_SECRET_ENV};
use crate::installation::CommandRunner;
use crate::models::catalog::{DATA_SOURCES, LOGIN_NAME};
use crate::models::report::Criticality;
use crate::models::state::ExecutionContext;
use crate::orchestrator::{run_checked, Step, StepError};
use crate::steps::powershell;

pub struct RegisterDataSources;

#[async_trait]
impl Step for RegisterDataSources {
    fn name(&self) -> &'static str {
        "register_data_sources"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warn
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        let mut failures = Vec::new();

        for entry in &DATA_SOURCES {
            let script = register_dsn_script(entry, ctx.connection_target(), LOGIN_NAME);
            let spec = powershell(ctx, &script, "register_dsn").with_secret_env(
                DSN_SECRET_ENV,
                SecretString::from(ctx.credential().reveal().to_string()),
            );
            match run_checked(runner, &spec, &format!("DSN '{}'", entry.logical_name)).await {
                Ok(_) => ctx
                    .log()
                    .debug(format!("Registered DSN '{}'", entry.logical_name)),
                Err(err) => failures.push(err.to_string()),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(StepError::new(format!(
                "{} of {} data sources failed: {}",
                failures.len(),
                DATA_SOURCES.len(),
                failures.join("; ")
            )))
        }
    }
}
