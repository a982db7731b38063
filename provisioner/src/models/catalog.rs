// Fixed naming contract
//
// Every literal the downstream application depends on lives here. None of these values is
// configurable: the Sage 300 installation expects exactly these names and ports.

use serde::Serialize;

/// Host part of every connection target.
pub const HOST: &str = "localhost";

/// Fixed TCP port the instance listens on once provisioned.
pub const SQL_TCP_PORT: u16 = 1433;

/// HTTPS port bound on the IIS site.
pub const SECURE_WEB_PORT: u16 = 443;

/// The single SQL login provisioned for the application.
pub const LOGIN_NAME: &str = "sage300";

/// Server role granted to the provisioned login.
pub const LOGIN_SERVER_ROLE: &str = "sysadmin";

/// Database role granted to the provisioned login's user in each database.
pub const DATABASE_ROLE: &str = "db_owner";

/// Collation applied when a database is created.
pub const COLLATION: &str = "Latin1_General_BIN";

/// `LoginMode` registry value meaning SQL Server and Windows authentication.
pub const MIXED_MODE_LOGIN: i32 = 2;

/// Inbound firewall rule display name.
pub const FIREWALL_RULE_NAME: &str = "SQL Server TCP 1433";

/// ODBC driver used for the registered data sources.
pub const ODBC_DRIVER: &str = "SQL Server";

/// The application is 32-bit, so its DSNs live in the 32-bit registry view.
pub const ODBC_PLATFORM: &str = "32-bit";

/// Friendly name used to find (and mint) the web server certificate.
pub const CERTIFICATE_FRIENDLY_NAME: &str = "Sage 300 Web Portal";

/// A certificate expiring sooner than this is replaced.
pub const CERTIFICATE_MIN_VALID_DAYS: u32 = 30;

/// Lifetime of a freshly minted self-signed certificate.
pub const CERTIFICATE_LIFETIME_YEARS: u32 = 5;

/// IIS site that receives the HTTPS binding.
pub const IIS_SITE_NAME: &str = "Default Web Site";

/// Windows optional features required by the web portal.
pub const IIS_FEATURES: &[&str] = &[
    "IIS-WebServerRole",
    "IIS-WebServer",
    "IIS-CommonHttpFeatures",
    "IIS-DefaultDocument",
    "IIS-StaticContent",
    "IIS-HttpErrors",
    "IIS-RequestFiltering",
    "IIS-ApplicationDevelopment",
    "IIS-NetFxExtensibility45",
    "IIS-ISAPIExtensions",
    "IIS-ISAPIFilter",
    "IIS-ASPNET45",
    "IIS-ManagementConsole",
    "NetFx4Extended-ASPNET45",
];

/// The five databases the application expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ProvisioningTarget {
    Vault,
    Store,
    Syscmp,
    Comp01,
    Portal,
}

impl ProvisioningTarget {
    pub const ALL: [ProvisioningTarget; 5] = [
        ProvisioningTarget::Vault,
        ProvisioningTarget::Store,
        ProvisioningTarget::Syscmp,
        ProvisioningTarget::Comp01,
        ProvisioningTarget::Portal,
    ];

    pub fn database_name(self) -> &'static str {
        match self {
            ProvisioningTarget::Vault => "VAULT",
            ProvisioningTarget::Store => "STORE",
            ProvisioningTarget::Syscmp => "SYSCMP",
            ProvisioningTarget::Comp01 => "COMP01",
            ProvisioningTarget::Portal => "PORTAL",
        }
    }
}

/// A system DSN and the database it resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSourceEntry {
    pub logical_name: &'static str,
    pub target: ProvisioningTarget,
}

pub const DATA_SOURCES: [DataSourceEntry; 5] = [
    DataSourceEntry {
        logical_name: "VAULT",
        target: ProvisioningTarget::Vault,
    },
    DataSourceEntry {
        logical_name: "STORE",
        target: ProvisioningTarget::Store,
    },
    DataSourceEntry {
        logical_name: "SYSCMP",
        target: ProvisioningTarget::Syscmp,
    },
    DataSourceEntry {
        logical_name: "COMP01",
        target: ProvisioningTarget::Comp01,
    },
    DataSourceEntry {
        logical_name: "PORTAL",
        target: ProvisioningTarget::Portal,
    },
];

/// `<host>\<instance>` as used by sqlcmd and the DSNs.
pub fn connection_target(instance: &str) -> String {
    format!("{}\\{}", HOST, instance)
}
