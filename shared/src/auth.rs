//! Authentication and authorization primitives

use crate::{config::AuthConfig, error::AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_token_ttl: Duration::seconds(config.access_token_ttl_seconds as i64),
        }
    }

    /// Issue an access token for `user_id`
    pub fn issue_access_token(&self, user_id: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.access_token_ttl).timestamp(),
            iat: now.timestamp(),
            jti: Some(uuid::Uuid::new_v4().to_string()),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate access token: {}", e)))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(JWT_ALGORITHM);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::authentication("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::authentication("Invalid token signature")
                }
                _ => AppError::authentication("Invalid token"),
            }
        })?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(AppError::authentication("Token has no subject"));
        }

        Ok(token_data.claims)
    }
}

/// Actions a user can be authorized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ReportsLocalRead,
    ReportsLocalWrite,
    ReportsGlobalRead,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReportsLocalRead => "reports:local:read",
            Permission::ReportsLocalWrite => "reports:local:write",
            Permission::ReportsGlobalRead => "reports:global:read",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User roles, stored by numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Superintendent,
    Administrator,
    Principal,
    CanteenManager,
}

impl Role {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Role::Superintendent),
            2 => Some(Role::Administrator),
            3 => Some(Role::Principal),
            4 => Some(Role::CanteenManager),
            _ => None,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Role::Superintendent => 1,
            Role::Administrator => 2,
            Role::Principal => 3,
            Role::CanteenManager => 4,
        }
    }

    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Superintendent | Role::Administrator => {
                &[Permission::ReportsGlobalRead, Permission::ReportsLocalRead]
            }
            Role::Principal | Role::CanteenManager => {
                &[Permission::ReportsLocalRead, Permission::ReportsLocalWrite]
            }
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}
