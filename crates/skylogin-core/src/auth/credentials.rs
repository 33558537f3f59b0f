use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Form fields that can carry a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Identifier,
    Password,
    Code,
}

/// A required-field (or shape) failure for one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

pub const IDENTIFIER_REQUIRED: &str = "Username or email is required";
pub const PASSWORD_REQUIRED: &str = "Password is required";
pub const CODE_REQUIRED: &str = "Verification code is required";
pub const CODE_INVALID: &str = "Verification code cannot contain spaces";

/// Login credentials. Lives only as long as a submission; never persisted.
#[derive(Debug)]
pub struct Credentials {
    pub identifier: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Check both fields are present, reporting every failing field.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.identifier.is_empty() {
            errors.push(FieldError {
                field: Field::Identifier,
                message: IDENTIFIER_REQUIRED,
            });
        }
        if self.password.expose_secret().is_empty() {
            errors.push(FieldError {
                field: Field::Password,
                message: PASSWORD_REQUIRED,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validate an emailed sign-in code before sending it.
pub fn validate_code(code: &str) -> Result<(), FieldError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(FieldError {
            field: Field::Code,
            message: CODE_REQUIRED,
        });
    }
    if code.chars().any(char::is_whitespace) {
        return Err(FieldError {
            field: Field::Code,
            message: CODE_INVALID,
        });
    }
    Ok(())
}
