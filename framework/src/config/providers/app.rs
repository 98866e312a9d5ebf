use crate::config::env::{env, env_flag, Environment};

/// Application configuration
///
/// # Environment Variables
///
/// - `APP_NAME` - Display name used in logs (default: "circuit")
/// - `APP_ENV` - Deployment environment (default: local)
/// - `APP_DEBUG` - Debug mode (default: true)
/// - `APP_SYSTEM_ACTOR_ID` - Actor id recorded in the audit log for bootstrap writes (default: 0)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    pub debug: bool,
    /// Actor recorded for writes that no user initiated
    pub system_actor_id: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            name: env("APP_NAME", "circuit".to_string()),
            environment: Environment::detect(),
            debug: env_flag("APP_DEBUG", true),
            system_actor_id: env("APP_SYSTEM_ACTOR_ID", 0i64),
        }
    }

    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Builder for AppConfig
#[derive(Default)]
pub struct AppConfigBuilder {
    name: Option<String>,
    environment: Option<Environment>,
    debug: Option<bool>,
    system_actor_id: Option<i64>,
}

impl AppConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = Some(env);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn system_actor_id(mut self, id: i64) -> Self {
        self.system_actor_id = Some(id);
        self
    }

    pub fn build(self) -> AppConfig {
        let default = AppConfig::from_env();
        AppConfig {
            name: self.name.unwrap_or(default.name),
            environment: self.environment.unwrap_or(default.environment),
            debug: self.debug.unwrap_or(default.debug),
            system_actor_id: self.system_actor_id.unwrap_or(default.system_actor_id),
        }
    }
}
