// ODBC system data-source registration
//
// One script per DSN: update the entry when it exists, add it otherwise. The password is read
// from the child environment (`$env:SQLHOST_PROVISION_SECRET`), never embedded in the script.

use crate::installation::windows::ps_quote;
use crate::models::catalog::{self, DataSourceEntry};

/// Environment entry carrying the login password to the DSN script.
pub const DSN_SECRET_ENV: &str = "SQLHOST_PROVISION_SECRET";

/// Register (or overwrite) `entry` as a system DSN pointing at `connection_target`.
pub fn register_dsn_script(entry: &DataSourceEntry, connection_target: &str, login: &str) -> String {
    let name = ps_quote(entry.logical_name);
    let platform = ps_quote(catalog::ODBC_PLATFORM);
    format!(
        r#"$ErrorActionPreference = 'Stop'
$props = @({server}, {database}, 'Trusted_Connection=No', {user}, ('PWD=' + $env:{secret_env}))
if (Get-OdbcDsn -Name {name} -DsnType 'System' -Platform {platform} -ErrorAction SilentlyContinue) {{ Set-OdbcDsn -Name {name} -DsnType 'System' -Platform {platform} -SetPropertyValue $props }} else {{ Add-OdbcDsn -Name {name} -DriverName {driver} -DsnType 'System' -Platform {platform} -SetPropertyValue $props }}
"#,
        server = ps_quote(&format!("Server={}", connection_target)),
        database = ps_quote(&format!("Database={}", entry.target.database_name())),
        user = ps_quote(&format!("LastUser={}", login)),
        secret_env = DSN_SECRET_ENV,
        name = name,
        platform = platform,
        driver = ps_quote(catalog::ODBC_DRIVER),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::DATA_SOURCES;

    #[test]
    fn script_points_dsn_at_target_database() {
        let script = register_dsn_script(&DATA_SOURCES[0], "localhost\\SQLEXPRESS", "sage300");
        assert!(script.contains("'Server=localhost\\SQLEXPRESS'"));
        assert!(script.contains("'Database=VAULT'"));
        assert!(script.contains("'LastUser=sage300'"));
        assert!(script.contains("-DriverName 'SQL Server'"));
        assert!(script.contains("-Platform '32-bit'"));
    }

    #[test]
    fn script_overwrites_existing_entry() {
        let script = register_dsn_script(&DATA_SOURCES[4], "localhost\\SAGE300", "sage300");
        assert!(script.contains("Get-OdbcDsn -Name 'PORTAL'"));
        assert!(script.contains("Set-OdbcDsn -Name 'PORTAL'"));
        assert!(script.contains("Add-OdbcDsn -Name 'PORTAL'"));
    }

    #[test]
    fn script_reads_password_from_environment() {
        let script = register_dsn_script(&DATA_SOURCES[1], "localhost\\X", "sage300");
        assert!(script.contains("('PWD=' + $env:SQLHOST_PROVISION_SECRET)"));
    }
}
