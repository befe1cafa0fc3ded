//! Client-side form rules.
//!
//! Every form the storefront submits (sign-up, sign-in, password change,
//! password reset, checkout address) is checked here first so that an
//! obviously invalid request never reaches the remote API.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::types::{Email, EmailError};

/// Minimum length accepted for any password field.
pub const MIN_PASSWORD_LENGTH: usize = 6;
/// Display name length bounds used by sign-up.
pub const NAME_LENGTH: (usize, usize) = (3, 30);
/// Length of the emailed password reset code.
pub const RESET_CODE_LENGTH: usize = 6;

/// Egyptian mobile numbers: `01` + operator digit (0, 1, 2, 5) + 8 digits.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^01[0125][0-9]{8}$").expect("Invalid regex"));

static ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("Invalid regex"));

/// A form field failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was left blank.
    #[error("{field} is required")]
    Required {
        /// Field label.
        field: &'static str,
    },
    /// A field is shorter than allowed.
    #[error("{field} must be at least {min} characters")]
    TooShort {
        /// Field label.
        field: &'static str,
        /// Minimum length.
        min: usize,
    },
    /// A field is longer than allowed.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Field label.
        field: &'static str,
        /// Maximum length.
        max: usize,
    },
    /// The email address is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
    /// Sign-up passwords must mix letters and digits and nothing else.
    #[error("password must include letters and numbers only, with at least one of each")]
    WeakPassword,
    /// Password and confirmation differ.
    #[error("passwords must match")]
    PasswordMismatch,
    /// Not an Egyptian mobile number.
    #[error("invalid Egyptian phone number")]
    InvalidPhone,
    /// Reset codes are exactly six characters.
    #[error("reset code must be {RESET_CODE_LENGTH} digits")]
    InvalidResetCode,
}

/// Require a non-blank value, returning it trimmed.
///
/// # Errors
///
/// Returns [`ValidationError::Required`] when the value is empty or whitespace.
pub fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(trimmed)
}

/// Parse a required email address.
///
/// # Errors
///
/// Returns [`ValidationError::Required`] for blank input and
/// [`ValidationError::InvalidEmail`] for malformed addresses.
pub fn email(value: &str) -> Result<Email, ValidationError> {
    let value = required("email", value)?;
    Ok(Email::parse(value)?)
}

/// Validate a display name (3 to 30 characters).
///
/// # Errors
///
/// Returns an error when the name is blank, too short or too long.
pub fn name(value: &str) -> Result<String, ValidationError> {
    let value = required("name", value)?;
    let (min, max) = NAME_LENGTH;
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort { field: "name", min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field: "name", max });
    }
    Ok(value.to_owned())
}

/// Validate a password used for sign-in, change or reset (length only).
///
/// # Errors
///
/// Returns an error when the password is empty or shorter than six characters.
pub fn password(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field,
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Validate a new account password: letters and digits only, at least one of
/// each, six or more characters.
///
/// # Errors
///
/// Returns an error when the password is missing or does not meet the rule.
pub fn strong_password(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required { field: "password" });
    }
    let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if value.len() < MIN_PASSWORD_LENGTH || !ALNUM_RE.is_match(value) || !has_letter || !has_digit
    {
        return Err(ValidationError::WeakPassword);
    }
    Ok(())
}

/// Check that a confirmation field repeats the password.
///
/// # Errors
///
/// Returns [`ValidationError::PasswordMismatch`] when the two differ.
pub fn confirmation(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if confirm.is_empty() {
        return Err(ValidationError::Required {
            field: "password confirmation",
        });
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Validate an Egyptian mobile number.
///
/// # Errors
///
/// Returns an error when the number is blank or does not match `01[0125]XXXXXXXX`.
pub fn phone(value: &str) -> Result<String, ValidationError> {
    let value = required("phone", value)?;
    if !PHONE_RE.is_match(value) {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(value.to_owned())
}

/// Validate a password reset code.
///
/// # Errors
///
/// Returns an error when the code is blank or not exactly six characters.
pub fn reset_code(value: &str) -> Result<String, ValidationError> {
    let value = required("reset code", value)?;
    if value.chars().count() != RESET_CODE_LENGTH {
        return Err(ValidationError::InvalidResetCode);
    }
    Ok(value.to_owned())
}
