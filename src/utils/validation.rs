//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for validating parameter names
static PARAM_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap()
});

/// Regex for validating a single API path segment
static PATH_SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\{[a-zA-Z_][a-zA-Z0-9_]*\}|[a-zA-Z0-9._~-]+)$").unwrap()
});

/// Regex for validating macro names (must be a valid Jinja/Python identifier)
static MACRO_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap()
});

/// Regex for validating client ids
static CLIENT_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").unwrap()
});

/// Validate a parameter name
pub fn validate_param_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 64 && PARAM_NAME_REGEX.is_match(name)
}

/// Validate an API path (leading/trailing slashes are tolerated)
pub fn validate_api_path(path: &str) -> bool {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.len() > 255 {
        return false;
    }

    trimmed
        .split('/')
        .all(|segment| PATH_SEGMENT_REGEX.is_match(segment))
}

/// Validate a macro name
pub fn validate_macro_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 100 && MACRO_NAME_REGEX.is_match(name)
}

/// Validate a client id
pub fn validate_client_id(client_id: &str) -> bool {
    !client_id.is_empty() && client_id.len() <= 128 && CLIENT_ID_REGEX.is_match(client_id)
}

/// Adapter for `#[validate(custom(function = ...))]`
pub fn api_path(path: &str) -> Result<(), validator::ValidationError> {
    if validate_api_path(path) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_api_path"))
    }
}

/// Adapter for `#[validate(custom(function = ...))]`
pub fn macro_name(name: &str) -> Result<(), validator::ValidationError> {
    if validate_macro_name(name) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_macro_name"))
    }
}

/// Adapter for `#[validate(custom(function = ...))]`
pub fn client_id(client_id: &str) -> Result<(), validator::ValidationError> {
    if validate_client_id(client_id) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_client_id"))
    }
}
