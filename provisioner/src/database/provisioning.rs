// SQL Server provisioning statements
//
// Every statement is guarded so re-running it against converged state is a no-op:
// - logins, users and databases are created only when missing
// - role memberships are added only when absent
// Identifiers are bracket-quoted, literals use doubled single quotes. The login password is never
// embedded: statements reference a sqlcmd scripting variable filled from the child environment.

// =============================================================================
// Quoting
// =============================================================================

/// Bracket-quote a SQL Server identifier
fn bracket_quote(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// N'...' Unicode string literal
fn unicode_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// Escape a value that sqlcmd will substitute inside an N'...' literal.
pub fn escape_for_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// sqlcmd variable reference, e.g. `$(SQLHOST_PROVISION_SECRET)`.
fn sqlcmd_variable(name: &str) -> String {
    format!("$({})", name)
}

// =============================================================================
// Authentication mode
// =============================================================================

/// Prints the instance's `LoginMode` (1 = Windows only, 2 = mixed).
pub fn login_mode_query() -> &'static str {
    r#"SET NOCOUNT ON;
DECLARE @mode INT;
EXEC master.dbo.xp_instance_regread N'HKEY_LOCAL_MACHINE', N'Software\Microsoft\MSSQLServer\MSSQLServer', N'LoginMode', @mode OUTPUT;
SELECT ISNULL(@mode, 0);"#
}

pub fn set_login_mode_stmt(mode: i32) -> String {
    format!(
        "EXEC master.dbo.xp_instance_regwrite N'HKEY_LOCAL_MACHINE', N'Software\\Microsoft\\MSSQLServer\\MSSQLServer', N'LoginMode', REG_DWORD, {};",
        mode
    )
}

/// Last integer line of a `-h -1` result set.
pub fn parse_scalar(stdout: &str) -> Option<i32> {
    stdout
        .lines()
        .map(str::trim)
        .rev()
        .find_map(|line| line.parse::<i32>().ok())
}

// =============================================================================
// Login / databases / users
// =============================================================================

/// Create the login (or reset its password to the collected one) and grant the server role.
pub fn create_login_stmt(login: &str, password_variable: &str, server_role: &str) -> String {
    let name = unicode_literal(login);
    let ident = bracket_quote(login);
    let password = format!("N'{}'", sqlcmd_variable(password_variable));
    format!(
        r#"SET NOCOUNT ON;
IF NOT EXISTS (SELECT 1 FROM sys.server_principals WHERE name = {name})
    CREATE LOGIN {ident} WITH PASSWORD = {password}, CHECK_POLICY = OFF, CHECK_EXPIRATION = OFF;
ELSE
    ALTER LOGIN {ident} WITH PASSWORD = {password};
IF IS_SRVROLEMEMBER({role_name}, {name}) <> 1
    ALTER SERVER ROLE {role} ADD MEMBER {ident};"#,
        name = name,
        ident = ident,
        password = password,
        role_name = unicode_literal(server_role),
        role = bracket_quote(server_role),
    )
}

/// SQL to check if database exists (SQL Server)
pub fn db_exists_query(db_name: &str) -> String {
    format!(
        "SELECT CASE WHEN DB_ID({}) IS NOT NULL THEN 1 ELSE 0 END AS db_exists;",
        unicode_literal(db_name)
    )
}

/// Create `db_name` with `collation` unless it already exists.
pub fn create_database_stmt(db_name: &str, collation: &str) -> String {
    format!(
        "IF DB_ID({}) IS NULL CREATE DATABASE {} COLLATE {};",
        unicode_literal(db_name),
        bracket_quote(db_name),
        collation
    )
}

/// Map `login` into `db_name` and add it to `role`.
pub fn grant_database_role_stmt(db_name: &str, login: &str, role: &str) -> String {
    let name = unicode_literal(login);
    let ident = bracket_quote(login);
    format!(
        r#"SET NOCOUNT ON;
USE {db};
IF NOT EXISTS (SELECT 1 FROM sys.database_principals WHERE name = {name})
    CREATE USER {ident} FOR LOGIN {ident};
IF IS_ROLEMEMBER({role_name}, {name}) <> 1
    ALTER ROLE {role} ADD MEMBER {ident};"#,
        db = bracket_quote(db_name),
        name = name,
        ident = ident,
        role_name = unicode_literal(role),
        role = bracket_quote(role),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_quote_escaping() {
        assert_eq!(bracket_quote("Test]DB"), "[Test]]DB]");
        assert_eq!(bracket_quote("VAULT"), "[VAULT]");
    }

    #[test]
    fn test_unicode_literal_escaping() {
        assert_eq!(unicode_literal("O'Neil"), "N'O''Neil'");
        assert_eq!(escape_for_literal("a'b''c"), "a''b''''c");
    }

    #[test]
    fn test_create_database_stmt_is_guarded_and_collated() {
        let stmt = create_database_stmt("VAULT", "Latin1_General_BIN");
        assert_eq!(
            stmt,
            "IF DB_ID(N'VAULT') IS NULL CREATE DATABASE [VAULT] COLLATE Latin1_General_BIN;"
        );
    }

    #[test]
    fn test_create_database_stmt_injection() {
        let stmt = create_database_stmt("Te'st]DB", "Latin1_General_BIN");
        assert!(stmt.contains("DB_ID(N'Te''st]DB')"));
        assert!(stmt.contains("CREATE DATABASE [Te'st]]DB]"));
    }

    #[test]
    fn test_db_exists_query() {
        let q = db_exists_query("COMP01");
        assert!(q.contains("DB_ID(N'COMP01')"));
    }

    #[test]
    fn test_create_login_stmt_guards_and_references_variable() {
        let stmt = create_login_stmt("sage300", "SQLHOST_PROVISION_SECRET", "sysadmin");
        assert!(stmt.contains("IF NOT EXISTS (SELECT 1 FROM sys.server_principals WHERE name = N'sage300')"));
        assert!(stmt.contains("CREATE LOGIN [sage300] WITH PASSWORD = N'$(SQLHOST_PROVISION_SECRET)'"));
        assert!(stmt.contains("ALTER LOGIN [sage300] WITH PASSWORD = N'$(SQLHOST_PROVISION_SECRET)'"));
        assert!(stmt.contains("IF IS_SRVROLEMEMBER(N'sysadmin', N'sage300') <> 1"));
        assert!(stmt.contains("ALTER SERVER ROLE [sysadmin] ADD MEMBER [sage300];"));
    }

    #[test]
    fn test_grant_stmt_switches_database_and_guards() {
        let stmt = grant_database_role_stmt("PORTAL", "sage300", "db_owner");
        assert!(stmt.contains("USE [PORTAL];"));
        assert!(stmt.contains("IF NOT EXISTS (SELECT 1 FROM sys.database_principals WHERE name = N'sage300')"));
        assert!(stmt.contains("CREATE USER [sage300] FOR LOGIN [sage300];"));
        assert!(stmt.contains("IF IS_ROLEMEMBER(N'db_owner', N'sage300') <> 1"));
        assert!(stmt.contains("ALTER ROLE [db_owner] ADD MEMBER [sage300];"));
    }

    #[test]
    fn test_login_mode_statements() {
        assert!(login_mode_query().contains("xp_instance_regread"));
        let write = set_login_mode_stmt(2);
        assert!(write.contains("xp_instance_regwrite"));
        assert!(write.ends_with("REG_DWORD, 2;"));
    }

    #[test]
    fn test_parse_scalar_takes_last_integer_line() {
        assert_eq!(parse_scalar("2\r\n"), Some(2));
        assert_eq!(parse_scalar("Changed database context to 'master'.\n1\n"), Some(1));
        assert_eq!(parse_scalar("no rows"), None);
    }
}
