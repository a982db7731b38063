// Instance discovery
//
// `sqlcmd -L` lists the SQL Server instances advertised on the local network. Rows look like
// `    HOST\INSTANCE`; anything without a host separator (headers, default instances) is ignored.

use std::collections::BTreeSet;
use std::io;
use thiserror::Error;

use crate::installation::{CommandRunner, CommandSpec, Tools};
use crate::utils::validation::is_valid_instance_name;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("'{tool}' was not found on this host; install the SQL Server command-line utilities")]
    ToolMissing { tool: String },
    #[error("no SQL Server instances were discovered on this host")]
    NoneFound,
    #[error("instance discovery failed (exit_code={exit_code:?}): {detail}")]
    ProbeFailed {
        exit_code: Option<i32>,
        detail: String,
    },
}

/// Parse `sqlcmd -L` output into a sorted, deduplicated set of instance names.
pub fn parse_instance_list(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.split_once('\\'))
        .map(|(_, instance)| instance.trim())
        .filter(|instance| is_valid_instance_name(instance))
        .map(str::to_string)
        .collect()
}

/// Enumerate instances via the engine's discovery capability.
pub async fn discover(
    runner: &dyn CommandRunner,
    tools: &Tools,
) -> Result<BTreeSet<String>, DiscoveryError> {
    let tool_missing = || DiscoveryError::ToolMissing {
        tool: tools.sqlcmd.clone(),
    };

    let program = runner.locate(&tools.sqlcmd).ok_or_else(tool_missing)?;
    let spec = CommandSpec::new(
        &program.to_string_lossy(),
        vec!["-L".to_string()],
        "discover_instances",
    );

    let out = runner.run(&spec).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => tool_missing(),
        _ => DiscoveryError::ProbeFailed {
            exit_code: None,
            detail: e.to_string(),
        },
    })?;

    if !out.success() {
        return Err(DiscoveryError::ProbeFailed {
            exit_code: out.exit_code,
            detail: out.failure_detail(),
        });
    }

    let candidates = parse_instance_list(&out.stdout);
    if candidates.is_empty() {
        return Err(DiscoveryError::NoneFound);
    }
    Ok(candidates)
}
