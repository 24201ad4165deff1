use std::sync::Arc;

use campusdesk_config::{CorsConfig, EmailConfig, EnrollmentConfig, JwtConfig, ServerConfig};
use campusdesk_db::{PgEnrollmentStore, init_db_pool, run_migrations};
use campusdesk_enrollment::{EnrollmentEngine, EnrollmentStore, LogNotifier, Notifier};
use tracing::info;

use crate::utils::email::EmailNotifier;

#[derive(Clone)]
pub struct AppState {
    pub engine: EnrollmentEngine,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub enrollment_config: EnrollmentConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EnrollmentStore>,
        notifier: Arc<dyn Notifier>,
        jwt_config: JwtConfig,
        cors_config: CorsConfig,
        enrollment_config: EnrollmentConfig,
    ) -> Self {
        Self {
            engine: EnrollmentEngine::new(store, notifier, enrollment_config.clone()),
            jwt_config,
            cors_config,
            enrollment_config,
        }
    }
}

/// Connects to Postgres, applies migrations and wires the engine.
pub async fn init_app_state(server: &ServerConfig) -> anyhow::Result<AppState> {
    let pool = init_db_pool(server.database_max_connections).await?;
    run_migrations(&pool).await?;

    let email_config = EmailConfig::from_env();
    let notifier: Arc<dyn Notifier> = if email_config.enabled {
        info!(host = %email_config.smtp_host, "Credential emails enabled");
        Arc::new(EmailNotifier::new(email_config)?)
    } else {
        info!("SMTP disabled, credential notifications are logged only");
        Arc::new(LogNotifier)
    };

    Ok(AppState::new(
        Arc::new(PgEnrollmentStore::new(pool)),
        notifier,
        JwtConfig::from_env(),
        CorsConfig::from_env(),
        EnrollmentConfig::from_env(),
    ))
}
