// Runtime settings
//
// Layering (later wins): built-in defaults -> optional TOML file -> SQLHOST_PROVISION_* env vars.
// Only environment-specific knobs live here; the naming contract in `catalog` is fixed.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::installation::Tools;
use crate::utils::path_resolver::resolve_deployment_folder;

pub const ENV_PREFIX: &str = "SQLHOST_PROVISION";
pub const DEFAULT_CONFIG_FILE: &str = "provision.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Folder for session logs and run reports.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    pub sqlcmd_path: String,
    pub powershell_path: String,
}

impl Settings {
    /// Load settings; `config_file` must exist when given explicitly.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let (file, required) = match config_file {
            Some(path) => (path.to_path_buf(), true),
            None => (resolve_deployment_folder().join(DEFAULT_CONFIG_FILE), false),
        };
        Self::load_from(&file, required, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(file: &Path, required: bool, env: Environment) -> Result<Self> {
        let defaults = Tools::default();
        let settings = Config::builder()
            .set_default("sqlcmd_path", defaults.sqlcmd)?
            .set_default("powershell_path", defaults.powershell)?
            .add_source(File::from(file).required(required))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to load settings (file={:?})", file))?;

        settings
            .try_deserialize::<Settings>()
            .context("Invalid provisioning settings")
    }

    pub fn tools(&self) -> Tools {
        Tools {
            sqlcmd: self.sqlcmd_path.clone(),
            powershell: self.powershell_path.clone(),
        }
    }
}
