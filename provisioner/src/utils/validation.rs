// Input validation utilities

use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

fn instance_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_#][A-Za-z0-9_#$]{0,15}$").expect("static instance-name regex")
    })
}

/// Validate a SQL Server instance name.
///
/// Instance names are at most 16 characters, start with a letter, `_` or `#`, and contain only
/// letters, digits, `_`, `#` and `$`. Anything else in discovery output is noise.
pub fn is_valid_instance_name(name: &str) -> bool {
    instance_name_regex().is_match(name)
}

/// Validate a credential before it is accepted for the run.
pub fn validate_credential(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(anyhow::anyhow!("Password cannot be empty"));
    }

    if value.chars().any(|c| c == '\0' || c == '\r' || c == '\n') {
        return Err(anyhow::anyhow!(
            "Password cannot contain NUL or line-break characters"
        ));
    }

    if value.chars().count() > 128 {
        return Err(anyhow::anyhow!("Password cannot exceed 128 characters"));
    }

    Ok(())
}
