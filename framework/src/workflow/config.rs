//! Workflow configuration

use crate::config::env::{env, env_flag};
use crate::config::Config;

/// Which holder wins when several agents hold the same custom role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTieBreak {
    /// Latest `starts_at` (then highest assignment id)
    MostRecent,
    /// Earliest `starts_at` (then lowest assignment id)
    Earliest,
    /// Refuse to pick; resolution fails with `AmbiguousRoleHolder`
    Reject,
}

impl RoleTieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MostRecent => "most_recent",
            Self::Earliest => "earliest",
            Self::Reject => "reject",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "most_recent" | "latest" => Some(Self::MostRecent),
            "earliest" | "first" => Some(Self::Earliest),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Workflow configuration
///
/// # Environment Variables
///
/// - `WORKFLOW_ROLE_TIE_BREAK` - `most_recent`, `earliest` or `reject` (default: most_recent)
/// - `WORKFLOW_RESOLVE_HIERARCHY` - Resolve DEMANDEUR/N+1/N+2/RH/DAF steps (default: true)
/// - `WORKFLOW_RH_ROLE_CODE` - Custom role whose holder approves RH steps (default: RH)
/// - `WORKFLOW_DAF_ROLE_CODE` - Custom role whose holder approves DAF steps (default: DAF)
/// - `WORKFLOW_FREEZE_ON_SUBMIT` - Snapshot the circuit when a request is submitted (default: true)
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub role_tie_break: RoleTieBreak,
    /// When false only CUSTOM steps resolve to a validator
    pub resolve_hierarchy: bool,
    pub rh_role_code: String,
    pub daf_role_code: String,
    pub freeze_on_submit: bool,
}

impl WorkflowConfig {
    pub fn from_env() -> Self {
        let tie_break = std::env::var("WORKFLOW_ROLE_TIE_BREAK")
            .ok()
            .and_then(|v| RoleTieBreak::from_str(&v))
            .unwrap_or(RoleTieBreak::MostRecent);

        Self {
            role_tie_break: tie_break,
            resolve_hierarchy: env_flag("WORKFLOW_RESOLVE_HIERARCHY", true),
            rh_role_code: env("WORKFLOW_RH_ROLE_CODE", "RH".to_string()),
            daf_role_code: env("WORKFLOW_DAF_ROLE_CODE", "DAF".to_string()),
            freeze_on_submit: env_flag("WORKFLOW_FREEZE_ON_SUBMIT", true),
        }
    }

    /// Registered config, or one read from the environment
    pub fn current() -> Self {
        Config::get::<WorkflowConfig>().unwrap_or_default()
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect;

    #[test]
    fn tie_break_parses_aliases() {
        expect!(RoleTieBreak::from_str("Latest")).to_equal(Some(RoleTieBreak::MostRecent));
        expect!(RoleTieBreak::from_str("first")).to_equal(Some(RoleTieBreak::Earliest));
        expect!(RoleTieBreak::from_str("reject")).to_equal(Some(RoleTieBreak::Reject));
        expect!(RoleTieBreak::from_str("random")).to_be_none();
    }
}
