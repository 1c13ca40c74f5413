use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::JwtConfig;
use crate::db::models::Caregiver;
use crate::db::repository::CaregiverRepository;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Caregiver id.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn create_jwt(caregiver_id: &str, config: &JwtConfig) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: caregiver_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(config.expiration_hours)).timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_jwt(token: &str, config: &JwtConfig) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(data.claims)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

/// Resolve a bearer token to a live caregiver row. A token whose subject
/// has since been removed from the circle is rejected.
pub async fn caregiver_from_token(
    pool: &SqlitePool,
    token: &str,
    config: &JwtConfig,
) -> AppResult<Caregiver> {
    let claims = decode_jwt(token, config)?;

    let caregiver = CaregiverRepository::find_by_id(pool, &claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    // A pending invite row has no credentials and can never hold a token.
    if caregiver.is_pending() {
        return Err(AppError::Unauthorized);
    }

    Ok(caregiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key".to_string(),
            expiration_hours: 24,
        }
    }

    #[test]
    fn jwt_round_trip_preserves_subject() {
        let config = test_config();
        let token = create_jwt("caregiver-123", &config).unwrap();
        let claims = decode_jwt(&token, &config).unwrap();
        assert_eq!(claims.sub, "caregiver-123");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let config = test_config();
        let token = create_jwt("caregiver-123", &config).unwrap();

        let other = JwtConfig {
            secret: "different-secret".to_string(),
            expiration_hours: 24,
        };
        assert!(decode_jwt(&token, &other).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }
}
