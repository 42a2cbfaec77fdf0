//! Bearer token verification.
//!
//! Tokens are issued elsewhere. This module only checks the HS256 signature,
//! expiry, optional issuer and token type, then turns the claims into a
//! [`Principal`].

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use profile_common::{AppError, AppResult, AuthConfig};
use profile_core::{Principal, Role};
use profile_db::entities::user::SubscriptionLevel;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ACCESS_TOKEN_TYPE: &str = "access";

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub subscription_level: SubscriptionLevel,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub ghost_mode: bool,
    #[serde(rename = "type")]
    pub token_type: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            subscription_level: claims.subscription_level,
            role: claims.role,
            ghost_mode: claims.ghost_mode,
        }
    }
}

/// Verifies access tokens against a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decode a token into the caller's identity.
    pub fn verify(&self, token: &str) -> AppResult<Principal> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized
        })?;

        if data.claims.token_type != ACCESS_TOKEN_TYPE {
            debug!(token_type = %data.claims.token_type, "Rejected non-access token");
            return Err(AppError::Unauthorized);
        }
        Ok(data.claims.into())
    }
}
