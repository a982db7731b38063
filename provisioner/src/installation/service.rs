// Service management helpers

use crate::installation::windows::{powershell_spec, ps_quote};
use crate::installation::{CommandRunner, Tools};
use crate::orchestrator::{run_checked, StepError};

/// Windows service name hosting the named `instance`.
///
/// Discovery only yields `HOST\INSTANCE` rows, so a default (unnamed) instance never gets here.
pub fn service_name_for_instance(instance: &str) -> String {
    format!("MSSQL${}", instance)
}

/// Restart a service and fail unless it comes back `Running`.
pub fn restart_service_script(service_name: &str) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
Restart-Service -Name {name} -Force
$status = (Get-Service -Name {name}).Status
if ($status -ne 'Running') {{ throw ('Service ' + {name} + ' is ' + $status + ' after restart') }}
"#,
        name = ps_quote(service_name),
    )
}

/// Restart the SQL Server service hosting `instance`.
pub async fn restart_sql_service(
    runner: &dyn CommandRunner,
    tools: &Tools,
    instance: &str,
) -> Result<(), StepError> {
    let service = service_name_for_instance(instance);
    let spec = powershell_spec(tools, &restart_service_script(&service), "restart_service");
    run_checked(runner, &spec, &format!("restart of service '{}'", service)).await?;
    Ok(())
}
