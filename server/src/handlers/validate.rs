use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;

use crate::error::{AppError, Result};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
// bcrypt ignores everything past 72 bytes
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 8..=72;

pub fn required(field: &str, value: Option<String>) -> Result<String> {
    optional(value).ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// Trims; blank becomes `None`.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn username(value: Option<String>) -> Result<String> {
    let username = required("username", value)?.to_ascii_lowercase();

    if !USERNAME_LEN.contains(&username.len()) {
        return Err(AppError::Validation(format!(
            "username must be between {} and {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AppError::Validation(
            "username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }

    Ok(username)
}

/// Passwords are not trimmed.
pub fn password(value: Option<String>) -> Result<String> {
    let password = value
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;

    if !PASSWORD_LEN.contains(&password.len()) {
        return Err(AppError::Validation(format!(
            "password must be between {} and {} characters",
            PASSWORD_LEN.start(),
            PASSWORD_LEN.end()
        )));
    }

    Ok(password)
}

pub fn email(value: Option<String>) -> Result<Option<String>> {
    match optional(value) {
        Some(email) if !email.contains('@') => Err(AppError::Validation(
            "email must be a valid address".to_string(),
        )),
        other => Ok(other),
    }
}

pub fn birthdate(value: Option<String>) -> Result<Option<NaiveDate>> {
    optional(value)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                AppError::Validation("birthdate must be formatted as YYYY-MM-DD".to_string())
            })
        })
        .transpose()
}

/// Path ids that do not parse cannot name an existing document.
pub fn path_id(raw: &str, kind: &'static str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| AppError::NotFound(kind))
}

pub fn field_id(field: &str, raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("{} is not a valid id", field)))
}
