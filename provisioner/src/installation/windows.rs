// Windows host configuration via PowerShell
//
// Scripts are pure functions of their inputs (testable on any OS). They are delivered with
// `-EncodedCommand` so no quoting survives into the command line; anything secret is read by the
// script from an environment variable instead of being embedded.

use base64::Engine;
use std::collections::BTreeSet;

use crate::installation::{CommandSpec, Tools};

/// Build a PowerShell invocation for `script`.
pub fn powershell_spec(tools: &Tools, script: &str, operation: &'static str) -> CommandSpec {
    CommandSpec::new(
        &tools.powershell,
        vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-ExecutionPolicy".to_string(),
            "Bypass".to_string(),
            "-EncodedCommand".to_string(),
            encode_powershell(script),
        ],
        operation,
    )
}

/// `-EncodedCommand` payload: base64 of the UTF-16LE script.
pub fn encode_powershell(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Single-quoted PowerShell string literal.
pub fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Enable TCP/IP for `instance` and pin it to `port` (dynamic ports cleared).
pub fn enable_tcp_script(instance: &str, port: u16) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
$names = Get-ItemProperty -Path 'HKLM:\SOFTWARE\Microsoft\Microsoft SQL Server\Instance Names\SQL'
$instanceId = $names.{instance_prop}
if (-not $instanceId) {{ throw ('SQL Server instance ' + {instance} + ' is not registered on this host') }}
$tcp = Join-Path (Join-Path 'HKLM:\SOFTWARE\Microsoft\Microsoft SQL Server' $instanceId) 'MSSQLServer\SuperSocketNetLib\Tcp'
Set-ItemProperty -Path $tcp -Name 'Enabled' -Value 1
$ipAll = Join-Path $tcp 'IPAll'
Set-ItemProperty -Path $ipAll -Name 'TcpPort' -Value '{port}'
Set-ItemProperty -Path $ipAll -Name 'TcpDynamicPorts' -Value ''
"#,
        instance_prop = ps_quote(instance),
        instance = ps_quote(instance),
        port = port,
    )
}

/// Prints `present` or `absent` for an inbound firewall rule.
pub fn firewall_probe_script(rule_name: &str) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
if (Get-NetFirewallRule -DisplayName {rule} -ErrorAction SilentlyContinue) {{ 'present' }} else {{ 'absent' }}
"#,
        rule = ps_quote(rule_name),
    )
}

pub fn firewall_add_script(rule_name: &str, port: u16) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
New-NetFirewallRule -DisplayName {rule} -Direction Inbound -Action Allow -Protocol TCP -LocalPort {port} | Out-Null
"#,
        rule = ps_quote(rule_name),
        port = port,
    )
}

/// Presence probes print exactly `present` or `absent`.
pub fn parse_presence(stdout: &str) -> Option<bool> {
    stdout
        .lines()
        .map(str::trim)
        .rev()
        .find_map(|line| match line.to_ascii_lowercase().as_str() {
            "present" => Some(true),
            "absent" => Some(false),
            _ => None,
        })
}

/// Lists the names of every enabled optional feature, one per line.
pub fn enabled_features_script() -> &'static str {
    r#"$ErrorActionPreference = 'Stop'
Get-WindowsOptionalFeature -Online | Where-Object { $_.State -eq 'Enabled' } | ForEach-Object { $_.FeatureName }
"#
}

/// Required features absent from the enabled-feature listing, in catalog order.
pub fn missing_features<'a>(enabled_listing: &str, required: &[&'a str]) -> Vec<&'a str> {
    let enabled: BTreeSet<String> = enabled_listing
        .lines()
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| !l.is_empty())
        .collect();
    required
        .iter()
        .copied()
        .filter(|f| !enabled.contains(&f.to_ascii_lowercase()))
        .collect()
}

pub fn enable_features_script(features: &[&str]) -> String {
    let list = features
        .iter()
        .map(|f| ps_quote(f))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"$ErrorActionPreference = 'Stop'
Enable-WindowsOptionalFeature -Online -FeatureName {list} -All -NoRestart | Out-Null
"#,
        list = list,
    )
}

/// Prints the thumbprint of a usable certificate with `friendly_name`, or nothing.
pub fn find_certificate_script(friendly_name: &str, min_valid_days: u32) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
$cutoff = (Get-Date).AddDays({days})
Get-ChildItem -Path 'Cert:\LocalMachine\My' | Where-Object {{ $_.FriendlyName -eq {name} -and $_.NotAfter -gt $cutoff -and $_.HasPrivateKey }} | Sort-Object -Property NotAfter -Descending | Select-Object -First 1 -ExpandProperty Thumbprint
"#,
        days = min_valid_days,
        name = ps_quote(friendly_name),
    )
}

/// Mints a self-signed machine certificate and prints its thumbprint.
pub fn mint_certificate_script(friendly_name: &str, lifetime_years: u32) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
$cert = New-SelfSignedCertificate -DnsName $env:COMPUTERNAME, 'localhost' -CertStoreLocation 'Cert:\LocalMachine\My' -FriendlyName {name} -NotAfter (Get-Date).AddYears({years})
$cert.Thumbprint
"#,
        name = ps_quote(friendly_name),
        years = lifetime_years,
    )
}

/// Ensures an https binding on `site:port` and binds `thumbprint`; prints `bound` or `unchanged`.
pub fn bind_certificate_script(site: &str, port: u16, thumbprint: &str) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
Import-Module WebAdministration
if (-not (Get-WebBinding -Name {site} -Protocol 'https' -Port {port})) {{ New-WebBinding -Name {site} -Protocol 'https' -Port {port} -IPAddress '*' }}
$path = 'IIS:\SslBindings\0.0.0.0!{port}'
$existing = Get-Item -Path $path -ErrorAction SilentlyContinue
if ($existing -and $existing.Thumbprint -eq {thumb}) {{ 'unchanged' }} else {{ if ($existing) {{ Remove-Item -Path $path }}; Get-Item -Path (Join-Path 'Cert:\LocalMachine\My' {thumb}) | New-Item -Path $path | Out-Null; 'bound' }}
"#,
        site = ps_quote(site),
        port = port,
        thumb = ps_quote(thumbprint),
    )
}

/// Last 40-hex-digit line of the output, upper-cased.
pub fn parse_thumbprint(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| l.len() == 40 && l.chars().all(|c| c.is_ascii_hexdigit()))
        .map(|l| l.to_ascii_uppercase())
}
