// Step library
//
// The ten provisioning steps in their fixed order. Ordering carries the dependencies:
// TCP before the restart that activates it, auth mode before the login, databases before grants,
// login before the data sources that store its credential.

pub mod accounts;
pub mod data_sources;
pub mod sql_server;
pub mod web;

#[cfg(test)]
pub(crate) mod fake_host;

use crate::database::sqlcmd::sqlcmd_spec;
use crate::installation::windows::powershell_spec;
use crate::installation::CommandSpec;
use crate::models::state::ExecutionContext;
use crate::orchestrator::Step;

/// Every step, in execution order.
pub fn standard_library() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(sql_server::EnableTcpProtocol),
        Box::new(sql_server::RestartSqlService),
        Box::new(sql_server::AddFirewallRule),
        Box::new(sql_server::EnableMixedModeAuth),
        Box::new(accounts::CreateLogin),
        Box::new(accounts::CreateDatabases),
        Box::new(accounts::GrantDatabaseUsers),
        Box::new(web::InstallWebFeatures),
        Box::new(web::BindCertificate),
        Box::new(data_sources::RegisterDataSources),
    ]
}

/// sqlcmd invocation against the context's connection target.
fn sql(ctx: &ExecutionContext, query: &str, operation: &'static str) -> CommandSpec {
    sqlcmd_spec(ctx.tools(), ctx.connection_target(), query, operation)
}

fn powershell(ctx: &ExecutionContext, script: &str, operation: &'static str) -> CommandSpec {
    powershell_spec(ctx.tools(), script, operation)
}

#[cfg(test)]
mod tests {
    use super::fake_host::{context, FakeHost};
    use super::*;
    use crate::models::catalog::{IIS_FEATURES, LOGIN_NAME};
    use crate::models::report::{Criticality, RunState, StepStatus};
    use crate::orchestrator;

    #[test]
    fn library_order_and_criticality() {
        let steps = standard_library();
        let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "enable_tcp_protocol",
                "restart_sql_service",
                "add_firewall_rule",
                "enable_mixed_mode_auth",
                "create_login",
                "create_databases",
                "grant_database_users",
                "install_web_features",
                "bind_certificate",
                "register_data_sources",
            ]
        );
        let warn: Vec<&str> = steps
            .iter()
            .filter(|s| s.criticality() == Criticality::Warn)
            .map(|s| s.name())
            .collect();
        assert_eq!(
            warn,
            vec![
                "add_firewall_rule",
                "install_web_features",
                "bind_certificate",
                "register_data_sources",
            ]
        );
    }

    #[tokio::test]
    async fn fresh_host_converges() {
        let host = FakeHost::fresh(&["SQLEXPRESS"]);
        let (ctx, _log) = context("SQLEXPRESS");

        let report = orchestrator::run(&standard_library(), &ctx, &host).await;

        assert_eq!(report.state, RunState::Completed);
        assert!(report.steps.iter().all(|s| s.status == StepStatus::Ok));

        let state = host.state();
        assert!(state.tcp_enabled);
        assert!(state.firewall_rule);
        assert_eq!(state.login_mode, 2);
        assert!(state.logins.contains(LOGIN_NAME));
        assert_eq!(state.databases.len(), 5);
        assert_eq!(state.database_users.len(), 5);
        assert_eq!(state.features.len(), IIS_FEATURES.len());
        assert!(state.bound_thumbprint.is_some());
        assert_eq!(state.data_sources.len(), 5);
        // protocol restart plus the auth-mode restart
        assert_eq!(host.count("restart_service"), 2);
    }

    #[tokio::test]
    async fn second_run_against_converged_host_changes_nothing() {
        let host = FakeHost::fresh(&["SAGE300"]);
        let (ctx, _log) = context("SAGE300");

        orchestrator::run(&standard_library(), &ctx, &host).await;
        let converged = host.state();
        host.clear_calls();

        let report = orchestrator::run(&standard_library(), &ctx, &host).await;

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(host.state(), converged);
        for op in ["firewall_add", "login_mode_write", "features_enable", "certificate_mint"] {
            assert_eq!(host.count(op), 0, "{} issued on converged host", op);
        }
        assert_eq!(host.count("restart_service"), 1);
        assert_eq!(host.state().certificates_minted, 1);
    }

    #[tokio::test]
    async fn fatal_login_failure_leaves_databases_untouched() {
        let host = FakeHost::fresh(&["SQLEXPRESS"]).failing("create_login", "");
        let (ctx, _log) = context("SQLEXPRESS");

        let report = orchestrator::run(&standard_library(), &ctx, &host).await;

        assert_eq!(report.state, RunState::Halted);
        assert_eq!(report.fatal_step().map(|s| s.name.as_str()), Some("create_login"));
        assert!(report.steps[5..].iter().all(|s| s.status == StepStatus::NotRun));
        assert_eq!(host.count("create_database"), 0);
        assert!(host.state().databases.is_empty());
    }

    #[tokio::test]
    async fn firewall_failure_does_not_block_later_steps() {
        let host = FakeHost::fresh(&["SQLEXPRESS"]).failing("firewall_add", "");
        let (ctx, _log) = context("SQLEXPRESS");

        let report = orchestrator::run(&standard_library(), &ctx, &host).await;

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.steps[2].status, StepStatus::Failed);
        assert_eq!(report.steps[3].status, StepStatus::Ok);
        assert_eq!(report.warning_count(), 1);
        assert!(!host.state().firewall_rule);
    }
}
