// sqlcmd query execution
//
// Queries run with Windows integrated authentication (-E) against the connection target.
// `-b` turns SQL errors into a non-zero exit code; `-h -1 -W` strips headers and padding so
// scalar results can be parsed.

use secrecy::SecretString;

use crate::database::provisioning::escape_for_literal;
use crate::installation::{CommandSpec, Tools};
use crate::security::secret::OpaqueSecret;

/// sqlcmd scripting variable (and child environment entry) carrying the login password.
pub const SECRET_VARIABLE: &str = "SQLHOST_PROVISION_SECRET";

pub fn sqlcmd_spec(
    tools: &Tools,
    connection_target: &str,
    query: &str,
    operation: &'static str,
) -> CommandSpec {
    CommandSpec::new(
        &tools.sqlcmd,
        vec![
            "-S".to_string(),
            connection_target.to_string(),
            "-E".to_string(),
            "-b".to_string(),
            "-h".to_string(),
            "-1".to_string(),
            "-W".to_string(),
            "-Q".to_string(),
            query.to_string(),
        ],
        operation,
    )
}

/// Attach the credential so `$(SQLHOST_PROVISION_SECRET)` resolves inside an N'...' literal.
pub fn with_password_variable(spec: CommandSpec, credential: &OpaqueSecret) -> CommandSpec {
    let escaped = SecretString::from(escape_for_literal(credential.reveal()));
    spec.with_secret_env(SECRET_VARIABLE, escaped)
}
