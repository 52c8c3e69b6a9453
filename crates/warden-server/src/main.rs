//! Warden Server: wires settings, the user store and the account service.

mod settings;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use warden_auth::AccountService;
use warden_core::error::WardenError;
use warden_core::models::user::{NewAccount, UserRole};
use warden_core::repository::UserRepository;
use warden_db::{DbError, DbManager};

use crate::settings::{BootstrapAdmin, ServerSettings};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("invalid auth configuration: {0}")]
    Auth(String),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("store error: {0}")]
    Store(#[from] WardenError),

    #[error("could not create bootstrap admin {0}")]
    Bootstrap(String),

    #[error("signal handling error: {0}")]
    Signal(#[from] std::io::Error),
}

fn init_tracing(settings: &ServerSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if settings.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the configured administrator unless an account already holds
/// that email. The account is verified up front so it can log in at once.
async fn bootstrap_admin<U: UserRepository>(
    service: &AccountService<U>,
    admin: &BootstrapAdmin,
) -> Result<(), StartupError> {
    if service.get_by_email(&admin.email).await?.is_some() {
        tracing::debug!(email = %admin.email, "Bootstrap admin already present");
        return Ok(());
    }
    let input = NewAccount {
        email: admin.email.clone(),
        password: admin.password.clone(),
        nickname: admin.nickname.clone(),
        role: Some(UserRole::Admin),
        ..Default::default()
    };
    match service.provision(input).await {
        Some(user) => {
            tracing::info!(user_id = %user.id, "Bootstrap admin created");
            Ok(())
        }
        None => Err(StartupError::Bootstrap(admin.email.clone())),
    }
}

async fn run(settings: ServerSettings) -> Result<(), StartupError> {
    let auth_config = settings.auth_config();
    auth_config.validate().map_err(StartupError::Auth)?;

    let db = DbManager::connect(&settings.db_config()).await?;
    let service = AccountService::new(db.users(), auth_config);

    if let Some(admin) = &settings.bootstrap_admin {
        bootstrap_admin(&service, admin).await?;
    }

    match service.count_users().await {
        Ok(count) => tracing::info!(accounts = count, "Warden ready"),
        Err(e) => tracing::warn!(error = %e, "Warden ready, account count unavailable"),
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match ServerSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("warden: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings);

    tracing::info!("Starting Warden server...");

    match run(settings).await {
        Ok(()) => {
            tracing::info!("Warden server stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Warden server failed");
            ExitCode::FAILURE
        }
    }
}
