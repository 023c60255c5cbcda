use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User ID
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: usize, // Expiration timestamp
}

/// Sign a new JWT token for a user.
pub fn sign(
    user_id: i32,
    username: &str,
    role: &str,
    permissions: Vec<String>,
    secret: &str,
    ttl_days: i64,
) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(ttl_days))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        role: role.to_owned(),
        permissions,
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let token = sign(
            7,
            "alice",
            "contestant",
            vec!["attempt:submit".into()],
            "test-secret",
            7,
        )
        .unwrap();
        let claims = verify(&token, "test-secret").unwrap();
        assert_eq!(claims.uid, 7);
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, "contestant");
        assert_eq!(claims.permissions, vec!["attempt:submit".to_string()]);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign(1, "bob", "admin", vec![], "secret-a", 7).unwrap();
        assert!(verify(&token, "secret-b").is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify("not-a-token", "secret").is_err());
    }
}
