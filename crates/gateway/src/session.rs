//! Bearer tokens for marketplace sessions.
//!
//! A session is identified by the id of its user profile. The token only
//! carries that id; role and ban status are read from the store on every call.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use common::{AppResult, JwtConfig};

const TOKEN_TYPE_BEARER: &str = "Bearer";
const SECONDS_PER_HOUR: i64 = 3600;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

/// Token handed out when a session starts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token expiration time in seconds
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration_hours: i64,
}

impl SessionTokens {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            expiration_hours: config.expiration_hours,
        }
    }

    /// Sign a token for the session profile
    pub fn issue(&self, user_id: Uuid) -> AppResult<TokenResponse> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            exp: (now + Duration::hours(self.expiration_hours)).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding)?;

        Ok(TokenResponse {
            access_token: token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.expiration_hours * SECONDS_PER_HOUR,
        })
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}
