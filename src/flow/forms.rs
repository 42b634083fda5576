//! Auth form state and credential validation.
//!
//! Validation mirrors what the backend will enforce so most mistakes are
//! caught before a request leaves the device. Errors clear per-field as
//! soon as the user edits that field; the controller additionally clears
//! the whole set after a display window.

use std::collections::BTreeMap;

use regex::Regex;

use crate::services::{Credentials, SignupProfile};

/// Which variant of the auth form is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

/// A field of the auth form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    FullName,
    Email,
    Password,
}

impl AuthField {
    fn key(&self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::Email => "email",
            Self::Password => "password",
        }
    }
}

/// Compiled credential validation rules.
#[derive(Debug)]
pub struct AuthRules {
    email_re: Regex,
}

impl AuthRules {
    pub fn new() -> Self {
        Self {
            email_re: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap(),
        }
    }

    fn valid_email(&self, email: &str) -> bool {
        self.email_re.is_match(email)
    }
}

impl Default for AuthRules {
    fn default() -> Self {
        Self::new()
    }
}

/// The auth screen's form state.
#[derive(Debug, Clone)]
pub struct AuthForm {
    mode: AuthMode,
    full_name: String,
    email: String,
    password: String,
    accepted_terms: bool,
    errors: BTreeMap<String, String>,
}

impl AuthForm {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            full_name: String::new(),
            email: String::new(),
            password: String::new(),
            accepted_terms: false,
            errors: BTreeMap::new(),
        }
    }

    /// Switch between login and signup. Field values survive the switch;
    /// errors do not.
    pub fn set_mode(&mut self, mode: AuthMode) {
        self.mode = mode;
        self.errors.clear();
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Update a field, clearing its error as the user starts typing.
    pub fn set_field(&mut self, field: AuthField, value: impl Into<String>) {
        let value = value.into();
        match field {
            AuthField::FullName => self.full_name = value,
            AuthField::Email => self.email = value,
            AuthField::Password => self.password = value,
        }
        self.errors.remove(field.key());
    }

    pub fn set_accepted_terms(&mut self, accepted: bool) {
        self.accepted_terms = accepted;
        if accepted {
            self.errors.remove("terms");
        }
    }

    /// Run the credential checks for the current mode. Returns true when
    /// the form is clean; otherwise `errors()` carries one message per
    /// failing field.
    pub fn validate(&mut self, rules: &AuthRules) -> bool {
        let mut errors = BTreeMap::new();

        if self.email.trim().is_empty() {
            errors.insert("email".to_string(), "Email is required".to_string());
        } else if !rules.valid_email(&self.email) {
            errors.insert(
                "email".to_string(),
                "Please enter a valid email address".to_string(),
            );
        }

        if self.password.trim().is_empty() {
            errors.insert("password".to_string(), "Password is required".to_string());
        } else if self.password.len() < 6 {
            errors.insert(
                "password".to_string(),
                "Password must be at least 6 characters".to_string(),
            );
        }

        if self.mode == AuthMode::Signup {
            if self.full_name.trim().is_empty() {
                errors.insert(
                    "full_name".to_string(),
                    "Full name is required".to_string(),
                );
            }
            if !self.accepted_terms {
                errors.insert(
                    "terms".to_string(),
                    "You must accept the terms and privacy policy to continue".to_string(),
                );
            }
        }

        self.errors = errors;
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Merge backend-reported field errors into the form.
    pub fn set_errors(&mut self, errors: BTreeMap<String, String>) {
        self.errors = errors;
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    pub fn signup_profile(&self) -> SignupProfile {
        SignupProfile {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            accepted_terms: self.accepted_terms,
        }
    }
}
