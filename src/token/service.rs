//! Verification token minting and validation.
//! Used by: registration, state.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::token::clock::Clock;
use crate::token::signer::{Signer, TimestampSigner, UnsignError};
use crate::user::UserIdentity;

/// Signing parameters, read once at startup.
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    salt: String,
    max_age: Duration,
}

impl TokenConfig {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        salt: impl Into<String>,
        max_age_secs: u64,
    ) -> Result<Self> {
        let secret = secret.into();
        let salt = salt.into();
        if salt.is_empty() {
            return Err(Error::Config("salt must be a non-empty string".into()));
        }
        if secret.is_empty() {
            return Err(Error::Config("secret key must not be empty".into()));
        }
        Ok(Self {
            secret,
            salt,
            max_age: Duration::from_secs(max_age_secs),
        })
    }

    pub fn from_settings(settings: &Settings, secret: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(secret, settings.salt.clone(), settings.verification_token_max_age)
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("salt", &self.salt)
            .field("max_age", &self.max_age)
            .finish()
    }
}

/// Mints tokens bound to a user and turns them back into the user's
/// identifier. Stateless apart from the signer.
pub struct VerificationTokenService<S = TimestampSigner> {
    signer: S,
    max_age: Duration,
}

impl VerificationTokenService<TimestampSigner> {
    pub fn new(config: &TokenConfig) -> Result<Self> {
        let signer = TimestampSigner::new(&config.secret, &config.salt)?;
        Ok(Self::with_signer(signer, config.max_age))
    }
}

impl<C: Clock> VerificationTokenService<TimestampSigner<C>> {
    pub fn with_clock(config: &TokenConfig, clock: C) -> Result<Self> {
        let signer = TimestampSigner::with_clock(&config.secret, &config.salt, clock)?;
        Ok(Self::with_signer(signer, config.max_age))
    }
}

impl<S: Signer> VerificationTokenService<S> {
    pub fn with_signer(signer: S, max_age: Duration) -> Self {
        Self { signer, max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Fails with [`Error::Crypto`] when there is no user or it has no
    /// usable identifier.
    pub fn mint<U: UserIdentity + ?Sized>(&self, user: Option<&U>) -> Result<String> {
        let identifier = user
            .and_then(|u| u.identifier())
            .filter(|id| !id.is_empty())
            .ok_or(Error::Crypto)?;
        Ok(self.signer.sign(identifier))
    }

    /// Missing token is [`Error::Programming`], an old one
    /// [`Error::TokenExpired`]; every other rejection is [`Error::Crypto`].
    pub fn verify(&self, token: Option<&str>) -> Result<String> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(Error::Programming),
        };

        match self.signer.unsign(token, self.max_age) {
            Ok(identifier) => Ok(identifier),
            Err(UnsignError::Expired { age, max_age }) => Err(Error::TokenExpired { age, max_age }),
            Err(UnsignError::BadSignature) | Err(UnsignError::Malformed) => Err(Error::Crypto),
        }
    }
}
