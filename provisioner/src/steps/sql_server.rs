// Instance-level configuration: network protocol, service, firewall, authentication mode

use async_trait::async_trait;

use crate::database::provisioning::{login_mode_query, parse_scalar, set_login_mode_stmt};
use crate::installation::service::restart_sql_service;
use crate::installation::windows::{
    enable_tcp_script, firewall_add_script, firewall_probe_script, parse_presence,
};
use crate::installation::CommandRunner;
use crate::models::catalog::{FIREWALL_RULE_NAME, MIXED_MODE_LOGIN, SQL_TCP_PORT};
use crate::models::report::Criticality;
use crate::models::state::ExecutionContext;
use crate::orchestrator::{run_checked, Step, StepError};
use crate::steps::{powershell, sql};

/// Enable TCP/IP on the instance and pin it to the fixed port.
pub struct EnableTcpProtocol;

#[async_trait]
impl Step for EnableTcpProtocol {
    fn name(&self) -> &'static str {
        "enable_tcp_protocol"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        let spec = powershell(
            ctx,
            &enable_tcp_script(ctx.instance(), SQL_TCP_PORT),
            "enable_tcp",
        );
        run_checked(runner, &spec, "enabling TCP/IP").await?;
        Ok(())
    }
}

/// Restart the instance so the protocol change takes effect.
pub struct RestartSqlService;

#[async_trait]
impl Step for RestartSqlService {
    fn name(&self) -> &'static str {
        "restart_sql_service"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        restart_sql_service(runner, ctx.tools(), ctx.instance()).await
    }
}

pub struct AddFirewallRule;

#[async_trait]
impl Step for AddFirewallRule {
    fn name(&self) -> &'static str {
        "add_firewall_rule"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warn
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        let probe = powershell(ctx, &firewall_probe_script(FIREWALL_RULE_NAME), "firewall_probe");
        let out = run_checked(runner, &probe, "firewall rule lookup").await?;

        match parse_presence(&out.stdout) {
            Some(true) => {
                ctx.log()
                    .debug(format!("Firewall rule '{}' already present", FIREWALL_RULE_NAME));
                Ok(())
            }
            Some(false) => {
                let add = powershell(
                    ctx,
                    &firewall_add_script(FIREWALL_RULE_NAME, SQL_TCP_PORT),
                    "firewall_add",
                );
                run_checked(runner, &add, "adding firewall rule").await?;
                Ok(())
            }
            None => Err(StepError::new(format!(
                "firewall rule lookup returned unexpected output: {}",
                out.failure_detail()
            ))),
        }
    }
}

/// Switch the instance to SQL Server and Windows authentication.
///
/// The service is restarted only when the mode actually changed.
pub struct EnableMixedModeAuth;

#[async_trait]
impl Step for EnableMixedModeAuth {
    fn name(&self) -> &'static str {
        "enable_mixed_mode_auth"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        let read = sql(ctx, login_mode_query(), "login_mode_read");
        let out = run_checked(runner, &read, "reading authentication mode").await?;
        let current = parse_scalar(&out.stdout).ok_or_else(|| {
            StepError::new(format!(
                "authentication mode query returned no value: {}",
                out.failure_detail()
            ))
        })?;

        if current == MIXED_MODE_LOGIN {
            ctx.log().debug("Mixed-mode authentication already enabled");
            return Ok(());
        }

        let write = sql(ctx, &set_login_mode_stmt(MIXED_MODE_LOGIN), "login_mode_write");
        run_checked(runner, &write, "setting authentication mode").await?;
        ctx.log().debug(format!(
            "Authentication mode changed from {} to {}; restarting instance",
            current, MIXED_MODE_LOGIN
        ));
        restart_sql_service(runner, ctx.tools(), ctx.instance()).await
    }
}
