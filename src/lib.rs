//! auth-enhanced: account activation workflows built on signed, time-limited
//! verification tokens.
//! Used by: the `authenhanced` binary and host applications.

pub mod checks;
pub mod command;
pub mod console;
pub mod error;
pub mod registration;
pub mod settings;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod token;
pub mod user;

pub use error::{Error, Result};
pub use token::{TokenConfig, VerificationTokenService};
pub use user::{User, UserIdentity, UserStore};
