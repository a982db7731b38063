use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const DEFAULT_LOG_FOLDER: &str = "Provision_Log";

/// Resolve deployment folder (absolute path)
pub fn resolve_deployment_folder() -> PathBuf {
    // Prefer the folder where the EXE is running from (works in dev and deployed)
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return dir.to_path_buf();
        }
    }

    // Fallback: current working directory
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve the log folder and make sure it exists.
///
/// An explicitly configured folder wins; otherwise logs go next to the executable.
pub fn resolve_log_folder(configured: Option<&Path>) -> Result<PathBuf> {
    let log_dir = match configured {
        Some(dir) => dir.to_path_buf(),
        None => resolve_deployment_folder().join(DEFAULT_LOG_FOLDER),
    };

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log folder: {:?}", log_dir))?;
    Ok(log_dir)
}

/// Path of the JSON run report written beside a session log file.
pub fn report_path_for_log(log_file: &Path) -> PathBuf {
    log_file.with_extension("report.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_log_folder_creates_configured_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let wanted = tmp.path().join("nested").join("logs");
        let resolved = resolve_log_folder(Some(&wanted)).unwrap();
        assert_eq!(resolved, wanted);
        assert!(wanted.is_dir());
    }

    #[test]
    fn report_path_sits_beside_log_file() {
        let log = PathBuf::from("/var/log/provision-20261019-090601.log");
        assert_eq!(
            report_path_for_log(&log),
            PathBuf::from("/var/log/provision-20261019-090601.report.json")
        );
    }
}
