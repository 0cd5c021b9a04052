//! Field-level validation
//!
//! Commands are validated in two passes whose failures are merged into one
//! [`ValidationErrors`] list:
//!
//! 1. Declarative rules from the `validator` derive (required, length,
//!    email, enum membership) using the rule functions in this module.
//! 2. Business rules written by hand against an explicit `today`, such as
//!    "end date must not precede start date" or "critical tasks are due
//!    within three days".
//!
//! No rule short-circuits another: every failure is reported, each as a
//! `{field, message}` pair with the field name in camelCase.
//!
//! # Example
//!
//! ```
//! use taskboard_shared::validation::ValidationErrors;
//!
//! let mut errors = ValidationErrors::new();
//! errors.push("endDate", "EndDate must be greater than or equal to StartDate.");
//! assert!(errors.contains("endDate"));
//! assert!(errors.into_result().is_err());
//! ```

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;
use uuid::Uuid;
use validator::ValidationError;

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(\d{2}\)\d{5}-\d{4}$").expect("phone pattern is a valid regex")
});

/// A single failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation (camelCase)
    pub field: String,

    /// Human-readable message
    pub message: String,
}

/// Every rule failure collected while validating one command
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("validation failed with {} error(s)", .details.len())]
pub struct ValidationErrors {
    details: Vec<ValidationErrorDetail>,
}

impl ValidationErrors {
    /// Creates an empty error list
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list holding one failure
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    /// Records a failure
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.details.push(ValidationErrorDetail {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Appends all failures from `other`
    pub fn merge(&mut self, other: ValidationErrors) {
        self.details.extend(other.details);
    }

    /// Whether no rule failed
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Number of failures
    pub fn len(&self) -> usize {
        self.details.len()
    }

    /// Whether any failure names `field`
    pub fn contains(&self, field: &str) -> bool {
        self.details.iter().any(|detail| detail.field == field)
    }

    /// Messages recorded against `field`
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.details
            .iter()
            .filter(|detail| detail.field == field)
            .map(|detail| detail.message.as_str())
            .collect()
    }

    /// All failures in the order they were recorded
    pub fn details(&self) -> &[ValidationErrorDetail] {
        &self.details
    }

    /// Consumes the list, returning the failures
    pub fn into_details(self) -> Vec<ValidationErrorDetail> {
        self.details
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Collects the outcome of a `validator` derive pass
    pub fn from_derive(result: Result<(), validator::ValidationErrors>) -> Self {
        result.err().map(Self::from).unwrap_or_default()
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| (field.to_string(), errors))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut collected = Self::new();
        for (field, errors) in fields {
            let wire_name = camel_case(&field);
            for error in errors {
                let message = match (&error.message, error.code.as_ref()) {
                    (Some(message), _) => message.to_string(),
                    (None, "required") => format!("{} is required.", pascal_case(&field)),
                    (None, _) => format!("{} is invalid.", pascal_case(&field)),
                };
                collected.push(wire_name.clone(), message);
            }
        }
        collected
    }
}

/// Commands that check both declarative and date-dependent rules
pub trait CommandValidator {
    /// Validates as of the given calendar day (UTC)
    ///
    /// # Errors
    ///
    /// Returns every rule that failed.
    fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors>;

    /// Validates as of the current UTC day
    fn validate_now(&self) -> Result<(), ValidationErrors> {
        self.validate_on(Utc::now().date_naive())
    }
}

/// Converts a snake_case field name to camelCase
pub fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn pascal_case(field: &str) -> String {
    let camel = camel_case(field);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => camel,
    }
}

fn failure(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Rejects empty or whitespace-only text
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

/// Rejects the nil UUID, which is what an omitted id deserializes to
pub fn not_nil(value: &Uuid) -> Result<(), ValidationError> {
    if value.is_nil() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

/// Requires the `(XX)XXXXX-XXXX` phone format
pub fn phone_format(value: &str) -> Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(failure(
            "phone",
            "Phone number must be in the format (XX)XXXXX-XXXX",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct Sample {
        #[validate(custom(function = "not_blank"), length(max = 5, message = "Too long."))]
        name: String,

        #[validate(custom(function = "not_nil"))]
        owner_id: Uuid,

        #[validate(custom(function = "phone_format"))]
        phone: String,
    }

    #[test]
    fn test_derive_errors_are_camel_cased_with_fallback_messages() {
        let sample = Sample {
            name: "   ".to_string(),
            owner_id: Uuid::nil(),
            phone: "(11)98765-4321".to_string(),
        };

        let errors = ValidationErrors::from_derive(sample.validate());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.messages_for("name"), vec!["Name is required."]);
        assert_eq!(errors.messages_for("ownerId"), vec!["OwnerId is required."]);
        assert!(!errors.contains("phone"));
    }

    #[test]
    fn test_explicit_messages_are_kept() {
        let sample = Sample {
            name: "too long".to_string(),
            owner_id: Uuid::new_v4(),
            phone: "11 98765 4321".to_string(),
        };

        let errors = ValidationErrors::from_derive(sample.validate());
        assert_eq!(errors.messages_for("name"), vec!["Too long."]);
        assert_eq!(
            errors.messages_for("phone"),
            vec!["Phone number must be in the format (XX)XXXXX-XXXX"]
        );
    }

    #[test]
    fn test_valid_input_yields_no_errors() {
        let sample = Sample {
            name: "ok".to_string(),
            owner_id: Uuid::new_v4(),
            phone: "(21)12345-6789".to_string(),
        };
        assert!(ValidationErrors::from_derive(sample.validate()).is_empty());
    }

    #[test]
    fn test_merge_and_into_result() {
        let mut errors = ValidationErrors::single("a", "first");
        errors.merge(ValidationErrors::single("b", "second"));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.to_string(), "validation failed with 2 error(s)");
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(camel_case("start_date"), "startDate");
        assert_eq!(camel_case("id"), "id");
        assert_eq!(pascal_case("user_id"), "UserId");
    }
}
