//! Validated inputs of the configuration service
//!
//! Each struct derives `validator::Validate`; the service validates before it
//! opens a transaction. They also deserialize, so an admin endpoint can accept
//! them as JSON bodies.

use crate::workflow::types::{StepRole, WorkflowDirection};
use serde::Deserialize;
use validator::{Validate, ValidationError};

pub const DEFAULT_ICON: &str = "📄";
pub const DEFAULT_COLOR: &str = "#3498db";
pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_DISPLAY_ORDER: i32 = 999;

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_direction() -> WorkflowDirection {
    WorkflowDirection::Ascendant
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_display_order() -> i32 {
    DEFAULT_DISPLAY_ORDER
}

fn default_true() -> bool {
    true
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Must not be blank".into()));
    }
    Ok(())
}

fn valid_step_role(role: &StepRole) -> Result<(), ValidationError> {
    if let StepRole::Custom(code) = role {
        if code.trim().is_empty() {
            return Err(ValidationError::new("custom_role")
                .with_message("A CUSTOM step needs a custom role code".into()));
        }
        if code.len() > 100 {
            return Err(ValidationError::new("custom_role")
                .with_message("Custom role code must be at most 100 characters".into()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTemplate {
    #[validate(
        length(min = 1, max = 50, message = "Code must be between 1 and 50 characters"),
        custom(function = "not_blank")
    )]
    pub code: String,
    #[validate(
        length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_direction")]
    pub direction: WorkflowDirection,
    #[serde(default = "default_icon")]
    #[validate(length(max = 50))]
    pub icon: String,
    #[serde(default = "default_color")]
    #[validate(length(max = 20))]
    pub color: String,
}

impl NewTemplate {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: None,
            direction: default_direction(),
            icon: default_icon(),
            color: default_color(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn direction(mut self, direction: WorkflowDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

/// Partial update of a template's descriptive fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TemplateUpdate {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub direction: Option<WorkflowDirection>,
    #[validate(length(max = 50))]
    pub icon: Option<String>,
    #[validate(length(max = 20))]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewStep {
    #[validate(custom(function = "valid_step_role"))]
    pub role: StepRole,
    #[validate(range(min = 1, message = "Order index starts at 1"))]
    pub order_index: i32,
    #[serde(default = "default_true")]
    pub mandatory: bool,
    #[serde(default = "default_true")]
    pub can_reject: bool,
    #[validate(range(min = 0, message = "Deadline cannot be negative"))]
    pub deadline_days: Option<i32>,
    #[serde(default = "default_true")]
    pub notify_email: bool,
    #[serde(default)]
    pub notify_sms: bool,
}

impl NewStep {
    pub fn new(role: StepRole, order_index: i32) -> Self {
        Self {
            role,
            order_index,
            mandatory: true,
            can_reject: true,
            deadline_days: None,
            notify_email: true,
            notify_sms: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    pub fn can_reject(mut self, can_reject: bool) -> Self {
        self.can_reject = can_reject;
        self
    }

    pub fn deadline_days(mut self, days: i32) -> Self {
        self.deadline_days = Some(days);
        self
    }

    pub fn notify_sms(mut self, notify: bool) -> Self {
        self.notify_sms = notify;
        self
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRequestType {
    #[validate(
        length(min = 1, max = 50, message = "Code must be between 1 and 50 characters"),
        custom(function = "not_blank")
    )]
    pub code: String,
    #[validate(
        length(min = 1, max = 200, message = "Label must be between 1 and 200 characters"),
        custom(function = "not_blank")
    )]
    pub label: String,
    pub description: Option<String>,
    pub workflow_template_id: i64,
    #[serde(default = "default_category")]
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(length(max = 50))]
    pub icon: Option<String>,
    #[validate(length(max = 20))]
    pub color: Option<String>,
    /// Stored as JSON text with keys in sorted order
    pub form_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub document_required: bool,
    #[validate(length(max = 200))]
    pub accepted_document_types: Option<String>,
    #[serde(default)]
    pub needs_rh_validation: bool,
    #[serde(default)]
    pub needs_daf_validation: bool,
    #[serde(default = "default_display_order")]
    pub display_order: i32,
}

impl NewRequestType {
    pub fn new(code: impl Into<String>, label: impl Into<String>, workflow_template_id: i64) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            description: None,
            workflow_template_id,
            category: default_category(),
            icon: None,
            color: None,
            form_schema: None,
            document_required: false,
            accepted_document_types: None,
            needs_rh_validation: false,
            needs_daf_validation: false,
            display_order: default_display_order(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn form_schema(mut self, schema: serde_json::Value) -> Self {
        self.form_schema = Some(schema);
        self
    }

    pub fn display_order(mut self, order: i32) -> Self {
        self.display_order = order;
        self
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCustomRole {
    #[validate(
        length(min = 1, max = 100, message = "Code must be between 1 and 100 characters"),
        custom(function = "not_blank")
    )]
    pub code: String,
    #[validate(
        length(min = 1, max = 200, message = "Label must be between 1 and 200 characters"),
        custom(function = "not_blank")
    )]
    pub label: String,
    pub description: Option<String>,
}

impl NewCustomRole {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CircuitError;
    use crate::expect;

    fn errors(input: &impl Validate) -> CircuitError {
        input.validate().unwrap_err().into()
    }

    #[test]
    fn template_code_length_is_bounded() {
        expect!(NewTemplate::new("CIRCUIT_MOYEN", "Moyen").validate().is_ok()).to_be_true();

        let err = errors(&NewTemplate::new("X".repeat(51), "Moyen"));
        expect!(err.status_code()).to_equal(422);
        let CircuitError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        expect!(fields.has("code")).to_be_true();

        let err = errors(&NewTemplate::new("   ", "Moyen"));
        expect!(err.status_code()).to_equal(422);
    }

    #[test]
    fn steps_need_positive_order_and_custom_code() {
        expect!(NewStep::new(StepRole::NPlus1, 0).validate().is_err()).to_be_true();
        expect!(NewStep::new(StepRole::Custom(String::new()), 1).validate().is_err()).to_be_true();
        expect!(NewStep::new(StepRole::NPlus1, 1).deadline_days(-2).validate().is_err()).to_be_true();
        expect!(NewStep::new(StepRole::Custom("RESP_BUDGET".into()), 1).validate().is_ok()).to_be_true();
    }

    #[test]
    fn request_type_defaults_from_json() {
        let input: NewRequestType = serde_json::from_value(serde_json::json!({
            "code": "CONGE",
            "label": "Demande de congé",
            "workflow_template_id": 2
        }))
        .unwrap();

        expect!(input.category.clone()).to_equal("Other".to_string());
        expect!(input.display_order).to_equal(999);
        expect!(input.validate().is_ok()).to_be_true();
    }
}
