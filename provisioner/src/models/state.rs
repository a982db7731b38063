// Run state shared by every provisioning step
//
// NOTE: This is NOT persisted. It is built once, after the credential has been collected, and is
// read-only for the rest of the run.

use crate::installation::Tools;
use crate::models::catalog;
use crate::security::secret::OpaqueSecret;
use crate::utils::logging::Logger;

#[derive(Debug)]
pub struct ExecutionContext {
    instance: String,
    connection_target: String,
    credential: OpaqueSecret,
    tools: Tools,
    log: Logger,
}

impl ExecutionContext {
    pub fn new(instance: String, credential: OpaqueSecret, tools: Tools, log: Logger) -> Self {
        let connection_target = catalog::connection_target(&instance);
        Self {
            instance,
            connection_target,
            credential,
            tools,
            log,
        }
    }

    /// Selected instance name (e.g. `SQLEXPRESS`).
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// `<host>\<instance>`.
    pub fn connection_target(&self) -> &str {
        &self.connection_target
    }

    pub fn credential(&self) -> &OpaqueSecret {
        &self.credential
    }

    pub fn tools(&self) -> &Tools {
        &self.tools
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }
}
