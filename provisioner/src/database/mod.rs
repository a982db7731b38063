pub mod discovery;
pub mod odbc;
pub mod provisioning;
pub mod sqlcmd;
