use thiserror::Error;

/// Failures raised while applying rules to a single document.
///
/// Any of these aborts the current file; the run continues with the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("invalid rule: {message}")]
    RuleFormat { message: String },

    #[error("invalid transform '{template}': {message}")]
    Expression { template: String, message: String },

    #[error("cannot assign at {location}: target container is {kind}, expected object or array")]
    UnsupportedContainer {
        location: String,
        kind: &'static str,
    },
}

impl RuleError {
    pub fn format(message: impl Into<String>) -> Self {
        RuleError::RuleFormat {
            message: message.into(),
        }
    }

    pub fn expression(template: impl Into<String>, message: impl Into<String>) -> Self {
        RuleError::Expression {
            template: template.into(),
            message: message.into(),
        }
    }
}
