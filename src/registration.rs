//! Registration and activation of accounts according to the operation mode.
//! Used by: state.

use crate::checks::is_valid_email;
use crate::error::{Error, Result};
use crate::settings::{OperationMode, Settings};
use crate::token::{Signer, VerificationTokenService};
use crate::user::{User, UserStore};

const VERIFICATION_TEMPLATE: &str = "user_verification";
const VERIFICATION_SUBJECT: &str = "Verify your email address";

/// A message for the email-delivery collaborator. Rendering the template is
/// the mailer's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub template: String,
    pub username: String,
    pub token: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, mail: &Mail) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Activated,
    VerificationSent,
    /// Stored, but the mailer failed; resend with `send_verification`.
    VerificationPending,
    AwaitingApproval,
}

pub struct Registrar<'a, S: Signer> {
    settings: &'a Settings,
    mode: OperationMode,
    users: &'a dyn UserStore,
    tokens: &'a VerificationTokenService<S>,
    mailer: &'a dyn Mailer,
}

impl<'a, S: Signer> Registrar<'a, S> {
    pub fn new(
        settings: &'a Settings,
        users: &'a dyn UserStore,
        tokens: &'a VerificationTokenService<S>,
        mailer: &'a dyn Mailer,
    ) -> Result<Self> {
        Ok(Self {
            mode: settings.operation_mode()?,
            settings,
            users,
            tokens,
            mailer,
        })
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    pub fn register(&self, mut user: User) -> Result<Registration> {
        if user.username.is_empty() {
            return Err(Error::Validation("username must not be empty".into()));
        }
        if !is_valid_email(&user.email) {
            return Err(Error::Validation(format!(
                "'{}' is not a valid email address",
                user.email
            )));
        }
        if self.users.find(&user.username)?.is_some() {
            return Err(Error::Validation(format!(
                "username '{}' is already taken",
                user.username
            )));
        }

        user.is_active = self.mode == OperationMode::Auto;
        self.users.insert(&user)?;
        tracing::info!(username = %user.username, mode = %self.mode, "account registered");

        match self.mode {
            OperationMode::Auto => Ok(Registration::Activated),
            // The account is stored either way; a failed mail is recovered
            // through `send_verification`.
            OperationMode::EmailVerification => match self.send_verification(&user) {
                Ok(()) => Ok(Registration::VerificationSent),
                Err(e) => {
                    tracing::warn!(
                        username = %user.username,
                        error = %e,
                        "verification mail not sent"
                    );
                    Ok(Registration::VerificationPending)
                }
            },
            OperationMode::Manual => Ok(Registration::AwaitingApproval),
        }
    }

    /// Mints a fresh token for `user` and hands it to the mailer. Also used to
    /// resend after a token expired.
    pub fn send_verification(&self, user: &User) -> Result<()> {
        let token = self.tokens.mint(Some(user))?;
        let mail = Mail {
            from: self.settings.email_from_address.clone(),
            to: user.email.clone(),
            subject: format!("{}{}", self.settings.email_prefix, VERIFICATION_SUBJECT),
            template: format!(
                "{}/{}",
                self.settings.email_template_prefix, VERIFICATION_TEMPLATE
            ),
            username: user.username.clone(),
            token,
        };
        self.mailer.send(&mail)?;
        tracing::info!(username = %user.username, "verification mail handed to mailer");
        Ok(())
    }

    /// Errors from the token service come back unchanged. Only
    /// email-verification mode activates the account here; manual mode still
    /// waits for an administrator.
    pub fn confirm_email(&self, token: Option<&str>) -> Result<User> {
        let username = match self.tokens.verify(token) {
            Ok(username) => username,
            Err(e) => {
                tracing::warn!(error = %e, "email verification rejected");
                return Err(e);
            }
        };

        // A valid token for an account that no longer exists.
        if self.users.find(&username)?.is_none() {
            return Err(Error::Crypto);
        }
        let activate = self.mode == OperationMode::EmailVerification;
        self.users.confirm_email(&username, activate)?;
        let user = self.users.find(&username)?.ok_or(Error::Crypto)?;
        tracing::info!(username = %username, active = user.is_active, "email verified");
        Ok(user)
    }

    /// Manual activation by an administrator.
    pub fn activate(&self, username: &str) -> Result<()> {
        if !self.users.set_active(username, true)? {
            return Err(Error::Validation(format!("unknown account '{}'", username)));
        }
        tracing::info!(username, "account activated manually");
        Ok(())
    }
}
