//! Identity tokens.
//!
//! Players carry an HS256 JWT between visits. A token that is missing,
//! expired, or forged is not an error for the player: they are issued a
//! fresh anonymous identity instead.

use chrono::Utc;
use derive_getters::Getters;
use derive_more::{Display, Error};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use wordduel::{IdentityClass, PlayerId};

/// Issuer and audience of every token.
pub const TOKEN_ISSUER: &str = "word-duel";

const TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Claims {
    sub: PlayerId,
    class: IdentityClass,
    iss: String,
    aud: String,
    iat: i64,
    exp: i64,
}

impl Claims {
    fn new(player_id: PlayerId, class: IdentityClass) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: player_id,
            class,
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_ISSUER.to_string(),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        }
    }
}

/// Who a connection turned out to be.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Identity {
    /// Durable player id.
    player_id: PlayerId,
    /// Identity class.
    class: IdentityClass,
    /// Set only when a new token was issued and must be handed back.
    token: Option<String>,
}

/// Signs and verifies identity tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer keyed by `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_ISSUER]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Signs a token for an existing player id.
    #[instrument(skip(self))]
    pub fn issue_for(&self, player_id: &str, class: IdentityClass) -> Result<String, IdentityError> {
        let claims = Claims::new(player_id.to_string(), class);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IdentityError::new(format!("Failed to sign token: {}", e)))
    }

    /// Mints a new player id and signs a token for it.
    #[instrument(skip(self))]
    pub fn issue(&self, class: IdentityClass) -> Result<Identity, IdentityError> {
        let player_id = uuid::Uuid::new_v4().to_string();
        let token = self.issue_for(&player_id, class)?;
        info!(player_id = %player_id, class = %class, "Issued identity");
        Ok(Identity {
            player_id,
            class,
            token: Some(token),
        })
    }

    /// Checks a token's signature, issuer, audience, and expiry.
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> Result<Claims, IdentityError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| IdentityError::new(format!("Invalid token: {}", e)))
    }

    /// Resolves the presented token to an identity, issuing a fresh
    /// anonymous one when there is no usable token.
    #[instrument(skip(self, token), fields(presented = token.is_some()))]
    pub fn resolve(&self, token: Option<&str>) -> Result<Identity, IdentityError> {
        if let Some(token) = token {
            match self.verify(token) {
                Ok(claims) => {
                    debug!(player_id = %claims.sub, "Token verified");
                    return Ok(Identity {
                        player_id: claims.sub,
                        class: claims.class,
                        token: None,
                    });
                }
                Err(e) => debug!(error = %e, "Rejected presented token"),
            }
        }
        self.issue(IdentityClass::Anon)
    }
}

/// Token signing error.
#[derive(Debug, Clone, Display, Error)]
#[display("Identity error: {} at {}:{}", message, file, line)]
pub struct IdentityError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl IdentityError {
    /// Creates a new identity error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
