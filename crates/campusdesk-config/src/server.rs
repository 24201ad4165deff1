use crate::{env_flag, env_or};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub observability_enabled: bool,
    pub database_max_connections: u32,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 3000),
            metrics_port: env_or("METRICS_PORT", 9090),
            observability_enabled: env_flag("OBSERVABILITY_ENABLED", true),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
        }
    }
}
