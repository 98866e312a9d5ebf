//! Environment detection and `.env` loading

use std::path::Path;

/// Deployment environment, read from `APP_ENV`
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Local,
    Development,
    Staging,
    Production,
    Testing,
    Custom(String),
}

impl Environment {
    /// Detect environment from APP_ENV or default to Local
    pub fn detect() -> Self {
        match std::env::var("APP_ENV").ok().as_deref() {
            Some("production") => Self::Production,
            Some("staging") => Self::Staging,
            Some("development") => Self::Development,
            Some("testing") => Self::Testing,
            Some("local") | None => Self::Local,
            Some(other) => Self::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Local => "local",
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Testing => "testing",
            Self::Custom(name) => name.as_str(),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Local or development
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Local | Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load `.env` files from `project_root`
///
/// Precedence, highest first:
/// 1. real process environment
/// 2. `.env.{environment}.local`
/// 3. `.env.{environment}`
/// 4. `.env.local`
/// 5. `.env`
///
/// dotenvy never overwrites a variable that is already set, so files are
/// loaded from most to least specific.
pub fn load_dotenv(project_root: &Path) -> Environment {
    let env = Environment::detect();
    let suffix = env.as_str().to_string();

    let candidates = [
        project_root.join(format!(".env.{}.local", suffix)),
        project_root.join(format!(".env.{}", suffix)),
        project_root.join(".env.local"),
        project_root.join(".env"),
    ];

    for path in candidates.iter() {
        let _ = dotenvy::from_path(path);
    }

    env
}

/// Read an environment variable, falling back to `default` when unset or unparsable
///
/// # Example
/// ```
/// use circuit::config::env;
///
/// let max: u32 = env("DB_MAX_CONNECTIONS", 10);
/// let url = env("DATABASE_URL", "sqlite://./circuit.db".to_string());
/// ```
pub fn env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_optional(key).unwrap_or(default)
}

/// Read an optional environment variable
pub fn env_optional<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Read a boolean flag, accepting `1/0`, `true/false`, `yes/no`, `on/off`
pub fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;

    #[test]
    fn env_falls_back_on_missing_or_garbage() {
        std::env::set_var("CIRCUIT_TEST_ENV_GARBAGE", "not-a-number");
        expect!(env("CIRCUIT_TEST_ENV_GARBAGE", 7u32)).to_equal(7);
        expect!(env("CIRCUIT_TEST_ENV_MISSING", 3u32)).to_equal(3);
    }

    #[test]
    fn flags_accept_common_spellings() {
        std::env::set_var("CIRCUIT_TEST_FLAG_ON", "Yes");
        std::env::set_var("CIRCUIT_TEST_FLAG_OFF", "0");
        expect!(env_flag("CIRCUIT_TEST_FLAG_ON", false)).to_be_true();
        expect!(env_flag("CIRCUIT_TEST_FLAG_OFF", true)).to_be_false();
        expect!(env_flag("CIRCUIT_TEST_FLAG_UNSET", true)).to_be_true();
    }
}
