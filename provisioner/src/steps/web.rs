// IIS features and the HTTPS certificate

use async_trait::async_trait;

use crate::installation::windows::{
    bind_certificate_script, enable_features_script, enabled_features_script,
    find_certificate_script, mint_certificate_script, missing_features, parse_thumbprint,
};
use crate::installation::CommandRunner;
use crate::models::catalog::{
    CERTIFICATE_FRIENDLY_NAME, CERTIFICATE_LIFETIME_YEARS, CERTIFICATE_MIN_VALID_DAYS,
    IIS_FEATURES, IIS_SITE_NAME, SECURE_WEB_PORT,
};
use crate::models::report::Criticality;
use crate::models::state::ExecutionContext;
use crate::orchestrator::{run_checked, Step, StepError};
use crate::steps::powershell;

/// Enable the IIS features the web portal needs; already-enabled ones are skipped.
pub struct InstallWebFeatures;

#[async_trait]
impl Step for InstallWebFeatures {
    fn name(&self) -> &'static str {
        "install_web_features"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warn
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        let probe = powershell(ctx, enabled_features_script(), "features_probe");
        let out = run_checked(runner, &probe, "listing enabled features").await?;

        let missing = missing_features(&out.stdout, IIS_FEATURES);
        if missing.is_empty() {
            ctx.log().debug("All IIS features already enabled");
            return Ok(());
        }

        ctx.log()
            .debug(format!("Enabling IIS features: {}", missing.join(", ")));
        let enable = powershell(ctx, &enable_features_script(&missing), "features_enable");
        run_checked(runner, &enable, "enabling IIS features").await?;
        Ok(())
    }
}

/// Bind a certificate to the HTTPS port of the default site.
///
/// A still-valid certificate with the portal's friendly name is reused; a new self-signed one
/// is minted only when none exists.
pub struct BindCertificate;

#[async_trait]
impl Step for BindCertificate {
    fn name(&self) -> &'static str {
        "bind_certificate"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Warn
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        let find = powershell(
            ctx,
            &find_certificate_script(CERTIFICATE_FRIENDLY_NAME, CERTIFICATE_MIN_VALID_DAYS),
            "certificate_find",
        );
        let out = run_checked(runner, &find, "certificate lookup").await?;

        let thumbprint = match parse_thumbprint(&out.stdout) {
            Some(existing) => {
                ctx.log()
                    .debug(format!("Reusing certificate {}", existing));
                existing
            }
            None => {
                let mint = powershell(
                    ctx,
                    &mint_certificate_script(CERTIFICATE_FRIENDLY_NAME, CERTIFICATE_LIFETIME_YEARS),
                    "certificate_mint",
                );
                let out = run_checked(runner, &mint, "creating self-signed certificate").await?;
                let minted = parse_thumbprint(&out.stdout).ok_or_else(|| {
                    StepError::new(format!(
                        "certificate creation printed no thumbprint: {}",
                        out.failure_detail()
                    ))
                })?;
                ctx.log()
                    .debug(format!("Created self-signed certificate {}", minted));
                minted
            }
        };

        let bind = powershell(
            ctx,
            &bind_certificate_script(IIS_SITE_NAME, SECURE_WEB_PORT, &thumbprint),
            "certificate_bind",
        );
        let out = run_checked(
            runner,
            &bind,
            &format!("binding certificate to port {}", SECURE_WEB_PORT),
        )
        .await?;
        if out.stdout.lines().any(|l| l.trim() == "unchanged") {
            ctx.log().debug(format!(
                "Port {} already bound to certificate {}",
                SECURE_WEB_PORT, thumbprint
            ));
        }
        Ok(())
    }
}
