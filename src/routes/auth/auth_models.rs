use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::user::User;
use crate::validation::{check_email, check_password, check_username, trimmed, Violations};

// Registration request
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, ApiError> {
        let username = trimmed(self.username);
        let email = trimmed(self.email);
        let mut violations = Violations::new();
        check_username(&mut violations, username.as_deref());
        check_email(&mut violations, email.as_deref());
        check_password(&mut violations, self.password.as_deref());
        violations.into_result()?;
        Ok(Registration {
            username: username.unwrap_or_default(),
            email: email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        })
    }
}

// Login request
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ApiError> {
        let email = trimmed(self.email);
        let mut violations = Violations::new();
        check_email(&mut violations, email.as_deref());
        match self.password.as_deref() {
            Some(password) => violations.check(!password.is_empty(), "Password is required"),
            None => violations.push("Password is required"),
        }
        violations.into_result()?;
        Ok(Credentials {
            email: email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        })
    }
}

// Profile update request; a password, when sent, replaces the current one
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<ProfileUpdate, ApiError> {
        let username = trimmed(self.username);
        let email = trimmed(self.email);
        let mut violations = Violations::new();
        check_username(&mut violations, username.as_deref());
        check_email(&mut violations, email.as_deref());
        if self.password.is_some() {
            check_password(&mut violations, self.password.as_deref());
        }
        violations.into_result()?;
        Ok(ProfileUpdate {
            username: username.unwrap_or_default(),
            email: email.unwrap_or_default(),
            password: self.password,
        })
    }
}

#[derive(Serialize)]
pub struct AuthData {
    pub user: User,
    pub token: String,
}

#[derive(Serialize)]
pub struct UserData {
    pub user: User,
}
