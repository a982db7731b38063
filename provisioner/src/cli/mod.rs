//! Operator-facing surface: command line, instance selection and prompts.

pub mod prompt;
pub mod selection;

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sqlhost-provision")]
#[command(version)]
#[command(
    about = "Provision a local SQL Server instance, IIS and ODBC data sources for Sage 300",
    long_about = None
)]
pub struct Cli {
    /// Settings file (defaults to provision.toml beside the executable, if present)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Folder for the session log and run report
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Instance to provision; must be one of the discovered instances
    #[arg(short = 'i', long, value_name = "NAME")]
    pub instance: Option<String>,

    /// Print the ordered step list and exit without touching the host
    #[arg(long)]
    pub plan: bool,
}
