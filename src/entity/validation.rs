use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Minimum number of characters accepted for a password
pub const MIN_PASSWORD_LENGTH: usize = 6;

// local-part@domain grammar, same shape as the common mail-format checkers
static EMAIL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"#,
    )
    .expect("email pattern compiles")
});

/// One validation failure tied to a field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            context: Map::new(),
        }
    }

    /// Attach the `Field` context entry used by message templates
    pub fn with_field_context(mut self) -> Self {
        self.context
            .insert("Field".to_string(), Value::String(self.field.clone()));
        self
    }
}

/// Ordered errors from one pass; empty means the input passed every rule
pub type ValidationResult = Vec<FieldError>;

/// Named operations an entity can be validated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Login,
    ForgotPassword,
    ResetPassword,
    Refresh,
    SwitchLanguage,
}

/// Entities that declare per-operation rule sets
pub trait Validate {
    /// Run every rule applicable to `operation`. Operations that do not apply
    /// to the entity type produce an empty result.
    fn validate(&self, operation: Operation) -> ValidationResult;
}

/// Accumulates field errors for a single validation pass
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<FieldError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> ValidationResult {
        self.errors
    }
}

/// Rule checks evaluated in declaration order. Each check consumes the
/// builder and hands it back, so the collector is threaded through the whole
/// pass and returned by [`Rules::finish`].
#[derive(Debug, Default)]
pub struct Rules {
    collector: ErrorCollector,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: &str, value: &str, message: &str) -> Self {
        if value.is_empty() {
            self.collector
                .push(FieldError::new(field, message).with_field_context());
        }
        self
    }

    /// Only checked when the value is non-empty
    pub fn min_length(mut self, field: &str, value: &str, min: usize, message: &str) -> Self {
        if !value.is_empty() && value.chars().count() < min {
            self.collector
                .push(FieldError::new(field, message).with_field_context());
        }
        self
    }

    /// Only checked when the value is non-empty
    pub fn email(mut self, field: &str, value: &str, message: &str) -> Self {
        if !value.is_empty() && !is_valid_email(value) {
            self.collector.push(FieldError::new(field, message));
        }
        self
    }

    /// Only checked when the value is non-empty
    pub fn one_of(mut self, field: &str, value: &str, allowed: &[&str], message: &str) -> Self {
        if !value.is_empty() && !allowed.contains(&value) {
            self.collector
                .push(FieldError::new(field, message).with_field_context());
        }
        self
    }

    /// On mismatch one error is recorded against each field
    pub fn matches(
        mut self,
        field: &str,
        value: &str,
        other_field: &str,
        other_value: &str,
        message: &str,
    ) -> Self {
        if value != other_value {
            self.collector
                .push(FieldError::new(field, message).with_field_context());
            self.collector
                .push(FieldError::new(other_field, message).with_field_context());
        }
        self
    }

    pub fn finish(self) -> ValidationResult {
        self.collector.finish()
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_FORMAT.is_match(value)
}
