//! Application bootstrap
//!
//! Loads `.env` files, registers configs and opens the database pool before
//! any command runs.

use circuit::{CircuitError, Config, DB};
use std::path::Path;

pub async fn boot(project_root: &str) -> Result<(), CircuitError> {
    let env = Config::init(Path::new(project_root));
    tracing::debug!(environment = %env, "configuration loaded");

    DB::init().await
}
