// Login, databases and database users

use async_trait::async_trait;

use crate::database::provisioning::{
    create_database_stmt, create_login_stmt, db_exists_query, grant_database_role_stmt,
    parse_scalar,
};
use crate::database::sqlcmd::{with_password_variable, SECRET_VARIABLE};
use crate::installation::CommandRunner;
use crate::models::catalog::{
    ProvisioningTarget, COLLATION, DATABASE_ROLE, LOGIN_NAME, LOGIN_SERVER_ROLE,
};
use crate::models::report::Criticality;
use crate::models::state::ExecutionContext;
use crate::orchestrator::{run_checked, Step, StepError};
use crate::steps::sql;

/// Create the application login (or reset its password) and make it a server administrator.
pub struct CreateLogin;

#[async_trait]
impl Step for CreateLogin {
    fn name(&self) -> &'static str {
        "create_login"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        let stmt = create_login_stmt(LOGIN_NAME, SECRET_VARIABLE, LOGIN_SERVER_ROLE);
        let spec = with_password_variable(sql(ctx, &stmt, "create_login"), ctx.credential());
        run_checked(runner, &spec, &format!("provisioning login '{}'", LOGIN_NAME)).await?;
        Ok(())
    }
}

pub struct CreateDatabases;

#[async_trait]
impl Step for CreateDatabases {
    fn name(&self) -> &'static str {
        "create_databases"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        for target in ProvisioningTarget::ALL {
            let db = target.database_name();
            let query = format!(
                "SET NOCOUNT ON;\n{}\n{}",
                create_database_stmt(db, COLLATION),
                db_exists_query(db)
            );
            let spec = sql(ctx, &query, "create_database");
            let out = run_checked(runner, &spec, &format!("creating database '{}'", db)).await?;
            if parse_scalar(&out.stdout) != Some(1) {
                return Err(StepError::new(format!(
                    "database '{}' is not present after create",
                    db
                )));
            }
        }
        Ok(())
    }
}

/// Map the login into every database as owner.
pub struct GrantDatabaseUsers;

#[async_trait]
impl Step for GrantDatabaseUsers {
    fn name(&self) -> &'static str {
        "grant_database_users"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        runner: &dyn CommandRunner,
    ) -> Result<(), StepError> {
        for target in ProvisioningTarget::ALL {
            let db = target.database_name();
            let stmt = grant_database_role_stmt(db, LOGIN_NAME, DATABASE_ROLE);
            let spec = sql(ctx, &stmt, "grant_database_user");
            run_checked(
                runner,
                &spec,
                &format!("granting {} on '{}' to '{}'", DATABASE_ROLE, db, LOGIN_NAME),
            )
            .await?;
        }
        Ok(())
    }
}
