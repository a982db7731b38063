// SQL Server host provisioning for Sage 300
// Main library entry point

pub mod cli;
pub mod database;
pub mod installation;
pub mod models;
pub mod orchestrator;
pub mod security;
pub mod steps;
pub mod utils;

use anyhow::Result;
use chrono::Local;
use std::collections::BTreeSet;

use cli::prompt::{Prompter, TerminalPrompter};
use cli::selection::{select, select_by_name};
use cli::Cli;
use database::discovery::discover;
use installation::{CommandRunner, ProcessRunner, Tools};
use models::catalog::{connection_target, LOGIN_NAME};
use models::report::{Criticality, RunState, EXIT_OK};
use models::settings::Settings;
use models::state::ExecutionContext;
use security::secret::OpaqueSecret;
use utils::logging::Logger;
use utils::path_resolver::{report_path_for_log, resolve_log_folder};

/// Discovery failed: tool missing, nothing found, or the probe errored.
pub const EXIT_DISCOVERY: i32 = 2;
/// The operator's selection or credential was rejected.
pub const EXIT_SELECTION: i32 = 3;
/// Settings, log folder or runtime could not be set up.
pub const EXIT_STARTUP: i32 = 4;

/// Ordered step list as printed by `--plan`.
pub fn plan_lines() -> Vec<String> {
    steps::standard_library()
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let criticality = match step.criticality() {
                Criticality::Fatal => "FATAL",
                Criticality::Warn => "WARN",
            };
            format!("{:>2}. {} [{}]", i + 1, step.name(), criticality)
        })
        .collect()
}

/// Binary entry: settings, logging, then one interactive provisioning run.
pub async fn run(cli: Cli) -> i32 {
    if cli.plan {
        for line in plan_lines() {
            println!("{}", line);
        }
        return EXIT_OK;
    }

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Startup failed: {:#}", e);
            return EXIT_STARTUP;
        }
    };

    let configured_dir = cli.log_dir.as_deref().or(settings.log_dir.as_deref());
    let logger = match resolve_log_folder(configured_dir)
        .and_then(|dir| Logger::initialize(&dir, &Local::now()))
    {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Startup failed: {:#}", e);
            return EXIT_STARTUP;
        }
    };

    provision(
        &logger,
        &ProcessRunner,
        &TerminalPrompter,
        settings.tools(),
        cli.instance.as_deref(),
    )
    .await
}

/// Discover, select, collect the credential and run the step library.
///
/// Returns the process exit code.
pub async fn provision(
    log: &Logger,
    runner: &dyn CommandRunner,
    prompter: &dyn Prompter,
    tools: Tools,
    preselected: Option<&str>,
) -> i32 {
    log.info(format!(
        "sqlhost-provision {} starting",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(path) = log.log_file() {
        log.info(format!("Session log: {}", path.display()));
    }

    let candidates = match discover(runner, &tools).await {
        Ok(candidates) => candidates,
        Err(e) => {
            log.error(format!("Instance discovery failed: {}", e));
            log.flush();
            return EXIT_DISCOVERY;
        }
    };
    log.info(format!(
        "Discovered {} instance(s): {}",
        candidates.len(),
        candidates.iter().cloned().collect::<Vec<_>>().join(", ")
    ));

    let instance = match choose_instance(prompter, &candidates, preselected) {
        Ok(instance) => instance,
        Err(e) => {
            log.error(format!("Instance selection failed: {:#}", e));
            log.flush();
            return EXIT_SELECTION;
        }
    };
    log.info(format!(
        "Selected instance '{}' ({})",
        instance,
        connection_target(&instance)
    ));

    let credential = match prompter
        .credential(LOGIN_NAME)
        .and_then(OpaqueSecret::new)
    {
        Ok(credential) => credential,
        Err(e) => {
            log.error(format!("Credential rejected: {:#}", e));
            log.flush();
            return EXIT_SELECTION;
        }
    };

    let ctx = ExecutionContext::new(instance, credential, tools, log.clone());
    let library = steps::standard_library();
    log.info(format!(
        "Provisioning {} with {} step(s)",
        ctx.connection_target(),
        library.len()
    ));

    let report = orchestrator::run(&library, &ctx, runner).await;

    match report.state {
        RunState::Completed => log.info(format!(
            "Provisioning completed: {} step(s), {} warning(s)",
            report.steps.len(),
            report.warning_count()
        )),
        _ => log.info(format!(
            "Provisioning stopped at '{}'; re-run after fixing the cause",
            report
                .fatal_step()
                .map(|s| s.name.as_str())
                .unwrap_or("unknown")
        )),
    }

    if let Some(log_file) = log.log_file() {
        let path = report_path_for_log(log_file);
        match report.write_json(&path) {
            Ok(()) => log.info(format!("Run report: {}", path.display())),
            Err(e) => log.warning(format!("Run report not written: {:#}", e)),
        }
    }

    log.flush();
    report.exit_code()
}

fn choose_instance(
    prompter: &dyn Prompter,
    candidates: &BTreeSet<String>,
    preselected: Option<&str>,
) -> Result<String> {
    match preselected {
        Some(name) => Ok(select_by_name(candidates, name)?),
        None => {
            let raw = prompter.choose_instance(candidates)?;
            Ok(select(candidates, &raw)?)
        }
    }
}
