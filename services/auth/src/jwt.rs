//! JWT service for token generation
//!
//! Tokens are signed with RS256. Verification uses the shared
//! [`TokenVerifier`] so this service and the API service agree on claims.

use anyhow::Result;
use common::token::{Claims, TokenError, TokenType, TokenVerifier, load_pem};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::User;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Private key for signing tokens
    pub private_key: String,
    /// Public key for verifying tokens
    pub public_key: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY`: Private key for signing tokens (PEM format) or path to private key file
    /// - `JWT_PUBLIC_KEY`: Public key for verifying tokens (PEM format) or path to public key file
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("jwt_access_token_expiry", 900_i64)?
            .set_default("jwt_refresh_token_expiry", 604_800_i64)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(JwtConfig {
            private_key: load_pem("JWT_PRIVATE_KEY")?,
            public_key: load_pem("JWT_PUBLIC_KEY")?,
            access_token_expiry: settings.get_int("jwt_access_token_expiry")? as u64,
            refresh_token_expiry: settings.get_int("jwt_refresh_token_expiry")? as u64,
        })
    }
}

/// Issued token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    verifier: TokenVerifier,
    config: JwtConfig,
}

fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())?;
        let verifier = TokenVerifier::new(&config.public_key)?;

        Ok(JwtService {
            encoding_key,
            verifier,
            config,
        })
    }

    fn sign(&self, user: &User, token_type: TokenType, ttl: u64) -> Result<String> {
        let now = now_secs()?;
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now,
            exp: now + ttl,
            token_type,
        };

        Ok(encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Generate an access and refresh token for a user
    pub fn issue(&self, user: &User) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign(user, TokenType::Access, self.config.access_token_expiry)?,
            refresh_token: self.sign(user, TokenType::Refresh, self.config.refresh_token_expiry)?,
        })
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Validate a refresh token and return its claims
    pub fn validate_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.verifier.decode(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }

    /// Seconds a token has left before it expires on its own
    pub fn remaining_lifetime(&self, claims: &Claims) -> u64 {
        now_secs()
            .map(|now| claims.exp.saturating_sub(now))
            .unwrap_or(self.config.refresh_token_expiry)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}
