//! HMAC-SHA256 timestamp signing.
//! Used by: token::service, state.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::token::clock::{Clock, SystemClock};

type HmacSha256 = Hmac<Sha256>;

const SEP: char = ':';
const SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignError {
    Expired { age: u64, max_age: u64 },
    BadSignature,
    Malformed,
}

/// Signs a value together with the current time and checks it back.
pub trait Signer: Send + Sync {
    fn sign(&self, value: &str) -> String;
    fn unsign(&self, token: &str, max_age: Duration) -> std::result::Result<String, UnsignError>;
}

/// Produces `<value>:<timestamp hex>:<signature>`. The value may contain the
/// separator; parsing always splits from the right.
pub struct TimestampSigner<C = SystemClock> {
    mac: HmacSha256,
    clock: C,
}

impl TimestampSigner<SystemClock> {
    pub fn new(secret: &[u8], salt: &str) -> Result<Self> {
        Self::with_clock(secret, salt, SystemClock)
    }
}

impl<C: Clock> TimestampSigner<C> {
    pub fn with_clock(secret: &[u8], salt: &str, clock: C) -> Result<Self> {
        let key = derive_key(secret, salt);
        let mac = HmacSha256::new_from_slice(&key).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { mac, clock })
    }

    fn signature(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

impl<C: Clock> Signer for TimestampSigner<C> {
    fn sign(&self, value: &str) -> String {
        let payload = format!("{}{}{:x}", value, SEP, self.clock.now().max(0));
        let signature = self.signature(&payload);
        format!("{}{}{}", payload, SEP, signature)
    }

    fn unsign(&self, token: &str, max_age: Duration) -> std::result::Result<String, UnsignError> {
        let (payload, sig_b64) = token.rsplit_once(SEP).ok_or(UnsignError::Malformed)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| UnsignError::BadSignature)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig).map_err(|_| UnsignError::BadSignature)?;

        // Only trusted payloads get here.
        let (value, ts_hex) = payload.rsplit_once(SEP).ok_or(UnsignError::Malformed)?;
        let issued = i64::from_str_radix(ts_hex, 16).map_err(|_| UnsignError::Malformed)?;

        let age = self.clock.now().saturating_sub(issued).max(0) as u64;
        let max_age = max_age.as_secs();
        if age > max_age {
            return Err(UnsignError::Expired { age, max_age });
        }
        Ok(value.to_owned())
    }
}

/// Mixes the salt into the secret so each namespace gets its own key.
fn derive_key(secret: &[u8], salt: &str) -> [u8; 32] {
    Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(b"signer")
        .chain_update(secret)
        .finalize()
        .into()
}

pub fn generate_secret() -> Vec<u8> {
    let mut secret = vec![0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}
