// Stateful stand-in for a Windows SQL Server host
//
// Answers every operation the steps issue, keeps the resulting host state, and records each
// call so tests can assert which mutations a run performed.

use async_trait::async_trait;
use base64::Engine;
use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Mutex;

use crate::installation::{CommandOutput, CommandRunner, CommandSpec, Tools};
use crate::models::catalog::{IIS_FEATURES, LOGIN_NAME};
use crate::models::state::ExecutionContext;
use crate::security::secret::OpaqueSecret;
use crate::utils::logging::Logger;

pub(crate) const TEST_CREDENTIAL: &str = "S3cure!pass";

/// Context for `instance` with a capturing logger.
pub(crate) fn context(instance: &str) -> (ExecutionContext, Receiver<String>) {
    let (log, rx) = Logger::capture();
    let credential = OpaqueSecret::new(TEST_CREDENTIAL.to_string()).unwrap();
    (
        ExecutionContext::new(instance.to_string(), credential, Tools::default(), log),
        rx,
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct HostState {
    pub instances: Vec<String>,
    pub tcp_enabled: bool,
    pub firewall_rule: bool,
    pub login_mode: i32,
    pub logins: BTreeSet<String>,
    pub databases: BTreeSet<String>,
    pub databases_created: u32,
    pub database_users: BTreeSet<String>,
    pub features: BTreeSet<String>,
    pub certificate: Option<String>,
    pub certificates_minted: u32,
    pub bound_thumbprint: Option<String>,
    pub data_sources: BTreeSet<String>,
}

struct Call {
    operation: &'static str,
    payload: String,
    secret_env: bool,
}

pub(crate) struct FakeHost {
    state: Mutex<HostState>,
    calls: Mutex<Vec<Call>>,
    sqlcmd_installed: bool,
    failure: Option<(&'static str, &'static str)>,
}

impl FakeHost {
    /// Windows-only auth, no firewall rule, only the base web role enabled.
    pub(crate) fn fresh(instances: &[&str]) -> Self {
        let state = HostState {
            instances: instances.iter().map(|i| i.to_string()).collect(),
            login_mode: 1,
            features: BTreeSet::from(["IIS-WebServerRole".to_string()]),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
            sqlcmd_installed: true,
            failure: None,
        }
    }

    pub(crate) fn without_sqlcmd(mut self) -> Self {
        self.sqlcmd_installed = false;
        self
    }

    /// Fail `operation` whenever its payload contains `needle` (empty matches everything).
    pub(crate) fn failing(mut self, operation: &'static str, needle: &'static str) -> Self {
        self.failure = Some((operation, needle));
        self
    }

    pub(crate) fn state(&self) -> HostState {
        self.state.lock().unwrap().clone()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut HostState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.operation.to_string())
            .collect()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Decoded script or query text of the most recent `operation` call.
    pub(crate) fn last_payload(&self, operation: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.operation == operation)
            .map(|c| c.payload.clone())
    }

    /// Number of `operation` calls that carried secret environment entries.
    pub(crate) fn secret_env_seen(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation && c.secret_env)
            .count()
    }

    fn answer(&self, spec: &CommandSpec, payload: &str) -> CommandOutput {
        let mut st = self.state.lock().unwrap();
        let stdout = match spec.operation {
            "discover_instances" => {
                let mut listing = String::from("Servers:\r\n");
                for instance in &st.instances {
                    listing.push_str(&format!("    WKS01\\{}\r\n", instance));
                }
                listing
            }
            "enable_tcp" => {
                st.tcp_enabled = true;
                String::new()
            }
            "restart_service" => String::new(),
            "firewall_probe" => (if st.firewall_rule { "present" } else { "absent" }).to_string(),
            "firewall_add" => {
                st.firewall_rule = true;
                String::new()
            }
            "login_mode_read" => st.login_mode.to_string(),
            "login_mode_write" => {
                st.login_mode = 2;
                String::new()
            }
            "create_login" => {
                if spec.secret_env.is_empty() {
                    return failed("'SQLHOST_PROVISION_SECRET' scripting variable not defined.");
                }
                st.logins.insert(LOGIN_NAME.to_string());
                String::new()
            }
            "create_database" => {
                let db = between(payload, "DB_ID(N'", "')");
                if st.databases.insert(db.to_string()) {
                    st.databases_created += 1;
                }
                "1".to_string()
            }
            "grant_database_user" => {
                let db = between(payload, "USE [", "]");
                if !st.databases.contains(db) {
                    return failed(&format!("Database '{}' does not exist.", db));
                }
                st.database_users.insert(db.to_string());
                String::new()
            }
            "features_probe" => st
                .features
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join("\r\n"),
            "features_enable" => {
                for feature in IIS_FEATURES {
                    if payload.contains(&format!("'{}'", feature)) {
                        st.features.insert(feature.to_string());
                    }
                }
                String::new()
            }
            "certificate_find" => st.certificate.clone().unwrap_or_default(),
            "certificate_mint" => {
                st.certificates_minted += 1;
                let thumbprint = format!("{:040X}", st.certificates_minted);
                st.certificate = Some(thumbprint.clone());
                thumbprint
            }
            "certificate_bind" => {
                let thumbprint = between(payload, "$existing.Thumbprint -eq '", "'").to_string();
                if st.bound_thumbprint.as_deref() == Some(thumbprint.as_str()) {
                    "unchanged".to_string()
                } else {
                    st.bound_thumbprint = Some(thumbprint);
                    "bound".to_string()
                }
            }
            "register_dsn" => {
                let name = between(payload, "Get-OdbcDsn -Name '", "'");
                st.data_sources.insert(name.to_string());
                String::new()
            }
            other => return failed(&format!("unexpected operation '{}'", other)),
        };
        CommandOutput {
            exit_code: Some(0),
            stdout,
            ..Default::default()
        }
    }
}

#[async_trait]
impl CommandRunner for FakeHost {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        let payload = payload_of(spec);
        self.calls.lock().unwrap().push(Call {
            operation: spec.operation,
            payload: payload.clone(),
            secret_env: !spec.secret_env.is_empty(),
        });

        if let Some((operation, needle)) = self.failure {
            if spec.operation == operation && payload.contains(needle) {
                return Ok(failed("Access is denied."));
            }
        }
        Ok(self.answer(spec, &payload))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        if program == Tools::default().sqlcmd && !self.sqlcmd_installed {
            return None;
        }
        Some(PathBuf::from(program))
    }
}

fn failed(stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(1),
        stderr: stderr.to_string(),
        ..Default::default()
    }
}

/// Script text for PowerShell calls, query text for sqlcmd calls.
fn payload_of(spec: &CommandSpec) -> String {
    let last = spec.args.last().cloned().unwrap_or_default();
    if !spec.args.iter().any(|a| a == "-EncodedCommand") {
        return last;
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(last)
        .unwrap();
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).unwrap()
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let from = text.find(start).unwrap() + start.len();
    let rest = &text[from..];
    &rest[..rest.find(end).unwrap()]
}
