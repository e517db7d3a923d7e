//! Shared validation utilities
//!
//! Common validation functions for input data across commands and queries.
//!
//! # Examples
//!
//! ```rust,ignore
//! use soxhub_server::features::shared::validation::{validate_code, validate_name};
//!
//! // Validate a control code
//! validate_code("FIN-001", 32)?;
//!
//! // Validate a display name
//! validate_name("Quarterly access review", 256)?;
//! ```

use soxhub_common::types::Role;
use thiserror::Error;

/// Maximum length for control codes
pub const CODE_MAX_LENGTH: usize = 32;

/// Maximum length for display names
pub const NAME_MAX_LENGTH: usize = 256;

/// Maximum length for email addresses
pub const EMAIL_MAX_LENGTH: usize = 320;

/// Errors that can occur during control code validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodeValidationError {
    #[error("Control code is required and cannot be empty")]
    Required,

    #[error("Control code must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },

    #[error("Control code can only contain uppercase letters, numbers, and hyphens")]
    InvalidFormat,

    #[error("Control code cannot start or end with a hyphen")]
    InvalidHyphenPlacement,
}

/// Errors that can occur during name validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("Name is required and cannot be empty")]
    Required,

    #[error("Name must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },
}

/// Errors that can occur during email validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmailValidationError {
    #[error("Email is required and cannot be empty")]
    Required,

    #[error("Email must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },

    #[error("Email is not a valid address")]
    InvalidFormat,
}

/// Errors that can occur during role set validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleSetValidationError {
    #[error("A user must have at least one role")]
    Empty,
}

/// Validate a control code (audit-facing identifier, e.g. "FIN-001")
///
/// # Rules
/// - Must not be empty
/// - Must not exceed max_length characters
/// - Must contain only uppercase letters, numbers, and hyphens
/// - Must not start or end with a hyphen
pub fn validate_code(code: &str, max_length: usize) -> Result<(), CodeValidationError> {
    if code.is_empty() {
        return Err(CodeValidationError::Required);
    }

    if code.len() > max_length {
        return Err(CodeValidationError::TooLong { max_length });
    }

    // Check for valid characters
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CodeValidationError::InvalidFormat);
    }

    // Check hyphen placement
    if code.starts_with('-') || code.ends_with('-') {
        return Err(CodeValidationError::InvalidHyphenPlacement);
    }

    Ok(())
}

/// Validate a name field
///
/// # Rules
/// - Must not be empty (after trimming whitespace)
/// - Must not exceed max_length characters
pub fn validate_name(name: &str, max_length: usize) -> Result<(), NameValidationError> {
    if name.trim().is_empty() {
        return Err(NameValidationError::Required);
    }

    if name.len() > max_length {
        return Err(NameValidationError::TooLong { max_length });
    }

    Ok(())
}

/// Validate an email address
///
/// # Rules
/// - Must not be empty
/// - Must not exceed [`EMAIL_MAX_LENGTH`] characters
/// - Must contain exactly one `@` with a non-empty local part and a domain
///   containing a dot
/// - Must not contain whitespace
pub fn validate_email(email: &str) -> Result<(), EmailValidationError> {
    if email.is_empty() {
        return Err(EmailValidationError::Required);
    }

    if email.len() > EMAIL_MAX_LENGTH {
        return Err(EmailValidationError::TooLong {
            max_length: EMAIL_MAX_LENGTH,
        });
    }

    if email.chars().any(char::is_whitespace) {
        return Err(EmailValidationError::InvalidFormat);
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(EmailValidationError::InvalidFormat),
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(EmailValidationError::InvalidFormat);
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(EmailValidationError::InvalidFormat);
    }

    Ok(())
}

/// Validate a role set
///
/// Role values themselves are typed; the only rule left to check is that the
/// set is not empty.
pub fn validate_roles(roles: &[Role]) -> Result<(), RoleSetValidationError> {
    if roles.is_empty() {
        return Err(RoleSetValidationError::Empty);
    }
    Ok(())
}

/// Deduplicate a role set, preserving first-seen order
pub fn normalize_roles(roles: &[Role]) -> Vec<Role> {
    let mut seen = Vec::with_capacity(roles.len());
    for role in roles {
        if !seen.contains(role) {
            seen.push(*role);
        }
    }
    seen
}
