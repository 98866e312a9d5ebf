//! Configuration
//!
//! - `.env` loading with environment-based precedence
//! - typed configuration structs read from environment variables
//! - a global repository to fetch them back by type
//!
//! # Example
//!
//! ```rust,no_run
//! use circuit::{Config, DatabaseConfig};
//!
//! Config::init(std::path::Path::new("."));
//!
//! let db = Config::get::<DatabaseConfig>().unwrap();
//! println!("Database: {}", db.url);
//! ```

pub mod env;
pub mod providers;
pub mod repository;

pub use env::{env, env_flag, env_optional, load_dotenv, Environment};
pub use providers::{AppConfig, AppConfigBuilder};

use crate::database::DatabaseConfig;
use crate::workflow::WorkflowConfig;
use std::path::Path;

/// Config facade
pub struct Config;

impl Config {
    /// Load `.env` files and register the built-in configs
    ///
    /// Call once at startup, before connecting to the database.
    pub fn init(project_root: &Path) -> Environment {
        let env = env::load_dotenv(project_root);

        repository::register(AppConfig::from_env());
        repository::register(DatabaseConfig::from_env());
        repository::register(WorkflowConfig::from_env());

        env
    }

    /// Get a typed config struct from the repository
    pub fn get<T: std::any::Any + Send + Sync + Clone + 'static>() -> Option<T> {
        repository::get::<T>()
    }

    /// Register a config struct, replacing any previous one of the same type
    pub fn register<T: std::any::Any + Send + Sync + 'static>(config: T) {
        repository::register(config);
    }

    pub fn has<T: std::any::Any + 'static>() -> bool {
        repository::has::<T>()
    }

    /// Current environment, from AppConfig if registered
    pub fn environment() -> Environment {
        Config::get::<AppConfig>()
            .map(|c| c.environment)
            .unwrap_or_else(Environment::detect)
    }

    pub fn is_production() -> bool {
        Self::environment().is_production()
    }

    pub fn is_debug() -> bool {
        Config::get::<AppConfig>().map(|c| c.debug).unwrap_or(true)
    }
}
