use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// The authenticated user as returned by `GET /api/me`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Login form: `POST /api/login` body.
#[derive(Serialize, Validate, Debug, Clone)]
pub struct Credentials {
    #[validate(custom(function = "validate_login_username"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

fn validate_login_username(username: &str) -> Result<(), ValidationError> {
    let message = match username.chars().count() {
        0 => "Username is required",
        1 | 2 => "Username must be at least 3 characters",
        _ => return Ok(()),
    };
    Err(ValidationError::new("username").with_message(Cow::Borrowed(message)))
}

/// Registration form. Only username and password go over the wire; the
/// confirmation exists for validation.
#[derive(Serialize, Validate, Debug, Clone)]
pub struct Registration {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(skip_serializing)]
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl Registration {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Registration {
            username: username.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }
}
