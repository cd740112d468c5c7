//! Field validation for registration input. Runs entirely locally, before
//! any I/O is attempted.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::dto::request::{RegisterUserRequest, UpdateUserRequest};

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s'-]+$").expect("NAME_PATTERN is a valid regex"));

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+]?[(]?[0-9]{1,4}[)]?[-\s.]?[(]?[0-9]{1,4}[)]?[-\s.]?[0-9]{1,4}[-\s.]?[0-9]{1,9}$")
        .expect("PHONE_PATTERN is a valid regex")
});

/// 2-50 characters; letters, spaces, hyphens, and apostrophes.
pub fn validate_name(name: &str) -> AppResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }
    if trimmed.len() < 2 {
        return Err(AppError::ValidationError(
            "Name must be at least 2 characters long".to_string(),
        ));
    }
    if trimmed.len() > 50 {
        return Err(AppError::ValidationError(
            "Name must not exceed 50 characters".to_string(),
        ));
    }
    if !NAME_PATTERN.is_match(trimmed) {
        return Err(AppError::ValidationError(
            "Name can only contain letters, spaces, hyphens, and apostrophes".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    let trimmed = email.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError("Email is required".to_string()));
    }
    if trimmed.len() > 254 {
        return Err(AppError::ValidationError(
            "Email address is too long".to_string(),
        ));
    }
    if !validator::ValidateEmail::validate_email(&trimmed) {
        return Err(AppError::ValidationError(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(())
}

/// 10-15 digits, optional leading `+` for international numbers; the usual
/// separator characters are tolerated.
pub fn validate_phone(phone: &str) -> AppResult<()> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(
            "Phone number is required".to_string(),
        ));
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 10 {
        return Err(AppError::ValidationError(
            "Phone number must be at least 10 digits".to_string(),
        ));
    }
    if digits.len() > 15 {
        return Err(AppError::ValidationError(
            "Phone number is too long".to_string(),
        ));
    }
    if !PHONE_PATTERN.is_match(trimmed) {
        return Err(AppError::ValidationError(
            "Please enter a valid phone number".to_string(),
        ));
    }
    Ok(())
}

/// Normalize a North American number for display:
/// `1234567890` -> `(123) 456-7890`, `11234567890` -> `+1 (123) 456-7890`.
/// Anything unrecognized (including `+`-prefixed international numbers) is
/// returned unchanged.
pub fn format_phone(phone: &str) -> String {
    if phone.starts_with('+') {
        return phone.to_string();
    }

    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..]),
        11 if digits.starts_with('1') => format!(
            "+1 ({}) {}-{}",
            &digits[1..4],
            &digits[4..7],
            &digits[7..]
        ),
        _ => phone.to_string(),
    }
}

/// All registration checks: derive-level structure first, then the
/// domain-specific rules. Fails fast with the first broken field.
pub fn validate_registration(request: &RegisterUserRequest) -> AppResult<()> {
    request.validate()?;
    validate_name(&request.name)?;
    validate_email(&request.email)?;
    validate_phone(&request.phone)?;
    Ok(())
}

pub fn validate_update(request: &UpdateUserRequest) -> AppResult<()> {
    request.validate()?;
    if let Some(name) = &request.name {
        validate_name(name)?;
    }
    if let Some(email) = &request.email {
        validate_email(email)?;
    }
    if let Some(phone) = &request.phone {
        validate_phone(phone)?;
    }
    Ok(())
}
