use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Minimum password length enforced by the account forms.
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("This is a required field.")]
    Required,
    #[error("Please provide a valid email address")]
    InvalidEmail,
    #[error("Password must have at least {min_length} characters")]
    TooShort { min_length: usize },
    #[error("Passwords do not match!")]
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    RequiredText,
    RequiredEmail,
    RequiredPassword { min_length: usize },
    ConfirmedPassword { original: String },
}

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$";

fn is_email(value: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).unwrap());
    re.is_match(value.trim())
}

/// Checks `value` against `rule`, handing the value back on success.
///
/// Only `RequiredText` treats whitespace-only input as missing; the other
/// rules require a non-empty value.
pub fn validate<'a>(value: &'a str, rule: &Rule) -> Result<&'a str, ValidationError> {
    let missing = match rule {
        Rule::RequiredText => value.trim().is_empty(),
        _ => value.is_empty(),
    };
    if missing {
        return Err(ValidationError::Required);
    }

    match rule {
        Rule::RequiredText => {}
        Rule::RequiredEmail => {
            if !is_email(value) {
                return Err(ValidationError::InvalidEmail);
            }
        }
        Rule::RequiredPassword { min_length } => {
            if value.chars().count() < *min_length {
                return Err(ValidationError::TooShort {
                    min_length: *min_length,
                });
            }
        }
        Rule::ConfirmedPassword { original } => {
            if value != original {
                return Err(ValidationError::Mismatch);
            }
        }
    }

    Ok(value)
}

pub fn required_text_field(value: &str) -> Result<&str, ValidationError> {
    validate(value, &Rule::RequiredText)
}

pub fn required_email_field(value: &str) -> Result<&str, ValidationError> {
    validate(value, &Rule::RequiredEmail)
}

pub fn required_password_field(value: &str, min_length: usize) -> Result<&str, ValidationError> {
    validate(value, &Rule::RequiredPassword { min_length })
}

pub fn confirmed_password_field<'a>(
    value: &'a str,
    original: &str,
) -> Result<&'a str, ValidationError> {
    validate(
        value,
        &Rule::ConfirmedPassword {
            original: original.to_string(),
        },
    )
}
