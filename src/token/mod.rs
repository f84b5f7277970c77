//! Verification token signing, minting, and validation.
//! Used by: registration, state.

pub mod clock;
pub mod service;
pub mod signer;

pub use service::{TokenConfig, VerificationTokenService};
pub use signer::{Signer, TimestampSigner, UnsignError};
