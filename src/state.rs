//! Shared application state.
//! Used by: command, main.

use std::ffi::OsString;
use std::sync::Arc;

use crate::error::Result;
use crate::registration::{Mailer, Registrar};
use crate::settings::Settings;
use crate::store::SqliteUserStore;
use crate::token::signer::generate_secret;
use crate::token::{TimestampSigner, TokenConfig, VerificationTokenService};

pub struct AppStateInner {
    pub settings: Settings,
    pub users: SqliteUserStore,
    pub tokens: VerificationTokenService,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn registrar<'a>(
        &'a self,
        mailer: &'a dyn Mailer,
    ) -> Result<Registrar<'a, TimestampSigner>> {
        Registrar::new(&self.settings, &self.users, &self.tokens, mailer)
    }
}

struct StateBuilder {
    settings: Settings,
    users: SqliteUserStore,
    secret: Vec<u8>,
}

impl StateBuilder {
    fn build(self) -> Result<AppState> {
        let config = TokenConfig::from_settings(&self.settings, self.secret)?;
        tracing::debug!(?config, "token service configured");

        if let Err(e) = self.settings.operation_mode() {
            tracing::warn!(
                error = %e,
                "registration is unavailable until the operation mode is fixed"
            );
        }

        Ok(Arc::new(AppStateInner {
            tokens: VerificationTokenService::new(&config)?,
            settings: self.settings,
            users: self.users,
        }))
    }
}

/// `SECRET_KEY` from the environment, or a random one that only lives as
/// long as the process.
pub fn secret_from_env() -> Vec<u8> {
    secret_from(std::env::var_os("SECRET_KEY"))
}

/// The raw bytes of `key`; it does not have to be valid Unicode.
fn secret_from(key: Option<OsString>) -> Vec<u8> {
    match key {
        Some(key) if !key.is_empty() => key.into_encoded_bytes(),
        _ => {
            tracing::warn!("SECRET_KEY not set, tokens will not survive a restart");
            generate_secret()
        }
    }
}

pub fn build_state(db_path: &str, settings: Settings, secret: Vec<u8>) -> Result<AppState> {
    StateBuilder {
        users: SqliteUserStore::open(db_path)?,
        settings,
        secret,
    }
    .build()
}

pub fn build_test_state(settings: Settings) -> Result<AppState> {
    StateBuilder {
        users: SqliteUserStore::open_in_memory()?,
        settings,
        secret: generate_secret(),
    }
    .build()
}
