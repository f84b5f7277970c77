//! Unified error types for auth-enhanced.
//! Used by: token, settings, store, registration, command.

/// Message shared by every crypto failure, whatever the root cause.
pub const CRYPTO_ERROR_MESSAGE: &str = "Something went wrong during crypto operations. \
     This error message is unspecific to prevent any fingerprinting.";

pub const PROGRAMMING_ERROR_MESSAGE: &str = "'verify_token()' was called without an actual token. \
     You see this message, because this is probably a programming error/mistake.";

pub const CONVERSION_ERROR_MESSAGE: &str = "Could not convert the parameter to an integer value.";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}", PROGRAMMING_ERROR_MESSAGE)]
    Programming,

    #[error("token expired (age {age}s > max age {max_age}s)")]
    TokenExpired { age: u64, max_age: u64 },

    #[error("{}", CRYPTO_ERROR_MESSAGE)]
    Crypto,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{}", CONVERSION_ERROR_MESSAGE)]
    Conversion,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Command(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn lock_err<E: std::fmt::Display>(what: &'static str) -> impl Fn(E) -> Error {
    move |e| Error::Config(format!("{} lock poisoned: {}", what, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_message_is_fixed() {
        assert_eq!(
            Error::Crypto.to_string(),
            "Something went wrong during crypto operations. This error message \
             is unspecific to prevent any fingerprinting."
        );
    }

    #[test]
    fn programming_message_names_missing_token() {
        let msg = Error::Programming.to_string();
        assert!(msg.starts_with("'verify_token()' was called without an actual token."));
        assert!(msg.ends_with("programming error/mistake."));
    }

    #[test]
    fn expired_is_distinct_from_crypto() {
        let expired = Error::TokenExpired { age: 6, max_age: 5 };
        assert_ne!(expired.to_string(), Error::Crypto.to_string());
        assert_eq!(expired.to_string(), "token expired (age 6s > max age 5s)");
    }

    #[test]
    fn command_error_shows_message_verbatim() {
        let err = Error::Command("No valid command was provided!".into());
        assert_eq!(err.to_string(), "No valid command was provided!");
    }

    #[test]
    fn lock_err_wraps_as_config() {
        let err = lock_err("users")("poisoned");
        assert!(matches!(err, Error::Config(ref m) if m == "users lock poisoned: poisoned"));
    }
}
