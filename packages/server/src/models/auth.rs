use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Optional; used only for notifications.
    pub email: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub id: i32,
    pub username: String,
    pub role: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
}

impl From<user::Model> for RegisterResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            role: m.role,
        }
    }
}

pub fn validate_register_request(req: &RegisterRequest) -> Result<(), AppError> {
    let username = req.username.trim();
    if username.chars().count() < 3 || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 3-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AppError::Validation(
            "Username may contain only letters, digits, '_', '-' and '.'".into(),
        ));
    }
    if req.password.len() < 8 || req.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    if let Some(ref email) = req.email {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') || email.len() > 254 {
            return Err(AppError::Validation("Invalid email address".into()));
        }
    }
    Ok(())
}

pub fn validate_login_request(req: &LoginRequest) -> Result<(), AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(username: &str, password: &str, email: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            password: password.into(),
            email: email.map(Into::into),
        }
    }

    #[test]
    fn accepts_reasonable_registrations() {
        assert!(validate_register_request(&req("alice", "password1", None)).is_ok());
        assert!(
            validate_register_request(&req("a.b-c_1", "password1", Some("a@example.com"))).is_ok()
        );
    }

    #[test]
    fn rejects_bad_usernames() {
        assert!(validate_register_request(&req("ab", "password1", None)).is_err());
        assert!(validate_register_request(&req("has space", "password1", None)).is_err());
        assert!(validate_register_request(&req(&"x".repeat(33), "password1", None)).is_err());
    }

    #[test]
    fn rejects_short_passwords_and_bad_emails() {
        assert!(validate_register_request(&req("alice", "short", None)).is_err());
        assert!(validate_register_request(&req("alice", "password1", Some("nope"))).is_err());
    }
}
