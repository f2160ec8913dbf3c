//! Input validation for signup and gallery payloads

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{ApiError, ApiResult};
use crate::models::{GalleryPayload, NewUser, SignupRequest};

/// Validate a signup body: all three fields present and well-formed
pub fn validate_signup(body: SignupRequest) -> ApiResult<NewUser> {
    let username = body
        .username
        .ok_or_else(|| ApiError::Validation("username is required".to_string()))?;
    let email = body
        .email
        .ok_or_else(|| ApiError::Validation("email is required".to_string()))?;
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("password is required".to_string()))?;

    validate_username(&username)?;
    validate_email(&email)?;

    Ok(NewUser {
        username,
        email,
        password,
    })
}

/// Validate a gallery creation body: name and desc both present
pub fn validate_gallery(body: GalleryPayload) -> ApiResult<(String, String)> {
    let name = body
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("name is required".to_string()))?;
    let desc = body
        .desc
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::Validation("desc is required".to_string()))?;

    Ok((name, desc))
}

fn validate_username(username: &str) -> ApiResult<()> {
    if username.is_empty() {
        return Err(ApiError::Validation("username is required".to_string()));
    }

    if username.len() > 32 {
        return Err(ApiError::Validation(
            "username must be at most 32 characters long".to_string(),
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(ApiError::Validation(
            "username can only contain letters, numbers, dots, dashes and underscores".to_string(),
        ));
    }

    Ok(())
}

fn validate_email(email: &str) -> ApiResult<()> {
    if email.is_empty() {
        return Err(ApiError::Validation("email is required".to_string()));
    }

    if email.len() > 254 {
        return Err(ApiError::Validation(
            "email must be at most 254 characters long".to_string(),
        ));
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err(ApiError::Validation("invalid email format".to_string()));
    }

    Ok(())
}
