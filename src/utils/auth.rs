use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;
use chrono::{Duration, Utc};

use crate::models::User;

const BCRYPT_COST: u32 = 10;

/// Customer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User) -> Self {
        let now = Utc::now();
        let exp = now + Duration::days(7);

        Self {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Admin console token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String, // admin username
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl AdminClaims {
    pub const ROLE: &'static str = "admin";

    pub fn new(username: &str) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(12);

        Self {
            sub: username.to_string(),
            role: Self::ROLE.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn create_token<T: Serialize>(
    claims: &T,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn verify_token<T: DeserializeOwned>(
    token: &str,
    secret: &str,
) -> Result<T, jsonwebtoken::errors::Error> {
    let token_data = decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, BCRYPT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn customer_token_round_trip() {
        let user = user();
        let token = create_token(&Claims::new(&user), "customer-secret").unwrap();

        let claims: Claims = verify_token(&token, "customer-secret").unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "asha@example.com");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token(&AdminClaims::new("admin"), "admin-secret").unwrap();
        assert!(verify_token::<AdminClaims>(&token, "customer-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = AdminClaims::new("admin");
        claims.exp = (Utc::now() - Duration::hours(1)).timestamp();
        let token = create_token(&claims, "admin-secret").unwrap();
        assert!(verify_token::<AdminClaims>(&token, "admin-secret").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("royal300").unwrap();
        assert!(verify_password("royal300", &hash).unwrap());
        assert!(!verify_password("royal301", &hash).unwrap());
    }
}
