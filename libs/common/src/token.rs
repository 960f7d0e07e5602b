//! JWT claims and access-token verification shared by all services
//!
//! Tokens are signed RS256 by the authentication service; every other
//! service only needs the public key to turn a bearer token into a
//! [`Principal`].

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{Principal, Role};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Role at the time the token was issued
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal::new(self.sub, self.role)
    }
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("unexpected token type")]
    WrongType,
}

/// Read a PEM key from the given environment variable. The value may be the
/// PEM text itself or a path to a file holding it.
pub fn load_pem(var: &str) -> Result<String> {
    let value =
        std::env::var(var).map_err(|_| anyhow::anyhow!("{var} environment variable not set"))?;

    if value.starts_with("-----BEGIN") {
        return Ok(value);
    }

    let pem = std::fs::read_to_string(&value)
        .map_err(|e| anyhow::anyhow!("Failed to read key file {value}: {e}"))?;
    Ok(pem.trim().to_string())
}

/// Verifies RS256 tokens against the issuer's public key
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(public_key_pem: &str) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Build a verifier from `JWT_PUBLIC_KEY`
    pub fn from_env() -> Result<Self> {
        Self::new(&load_pem("JWT_PUBLIC_KEY")?)
    }

    /// Decode and validate any token issued by the authentication service
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        Ok(decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }

    /// Validate an access token and return the principal it names
    pub fn verify_access(&self, token: &str) -> Result<Principal, TokenError> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(TokenError::WrongType);
        }
        Ok(claims.principal())
    }
}
