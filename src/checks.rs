//! Sanity checks over the loaded settings.
//! Used by: command, main.
//!
//! Two kinds of checks live here: each setting holds an accepted value, and
//! settings that depend on each other agree. Nothing is fixed up; callers get
//! a list of messages and decide what to do.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::settings::{
    AdminSignupNotification, EmailSettings, Settings, MODE_AUTO_ACTIVATION, MODE_EMAIL_ACTIVATION,
    MODE_MANUAL_ACTIVATION, RECOMMENDED_LOGIN_URL,
};

const MAX_EMAIL_LENGTH: usize = 254;

/// Notification methods recipients may ask for.
pub const SUPPORTED_METHODS: &[&str] = &["mail"];

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(concat!(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+",
        r"@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
        r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    ))
    .expect("email regex is valid");
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(email)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckMessage {
    pub level: Level,
    pub id: &'static str,
    pub msg: String,
    pub hint: String,
}

impl CheckMessage {
    fn error(id: &'static str, msg: &str, hint: String) -> Self {
        Self { level: Level::Error, id, msg: msg.into(), hint }
    }

    fn warning(id: &'static str, msg: &str, hint: String) -> Self {
        Self { level: Level::Warning, id, msg: msg.into(), hint }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for CheckMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}\n\tHINT: {}", self.id, self.msg, self.hint)
    }
}

/// Something wrong with one entry of `admin_signup_notification`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationIssue {
    /// `true` without any recipient.
    EnabledWithoutRecipients,
    InvalidEmail { username: String, email: String },
    UnsupportedMethod { username: String, method: String },
}

impl fmt::Display for NotificationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnabledWithoutRecipients => write!(f, "notifications enabled without recipients"),
            Self::InvalidEmail { username, email } => {
                write!(f, "{}: invalid email address '{}'", username, email)
            }
            Self::UnsupportedMethod { username, method } => {
                write!(f, "{}: unsupported notification method '{}'", username, method)
            }
        }
    }
}

pub fn validate_admin_notification(setting: &AdminSignupNotification) -> Vec<NotificationIssue> {
    let recipients = match setting {
        AdminSignupNotification::Flag(false) => return Vec::new(),
        AdminSignupNotification::Flag(true) => {
            return vec![NotificationIssue::EnabledWithoutRecipients];
        }
        AdminSignupNotification::Recipients(r) => r,
    };

    let mut issues = Vec::new();
    for recipient in recipients {
        if !is_valid_email(recipient.email()) {
            issues.push(NotificationIssue::InvalidEmail {
                username: recipient.username().to_owned(),
                email: recipient.email().to_owned(),
            });
        }
        issues.extend(
            recipient
                .methods()
                .iter()
                .filter(|m| !SUPPORTED_METHODS.contains(&m.as_str()))
                .map(|m| NotificationIssue::UnsupportedMethod {
                    username: recipient.username().to_owned(),
                    method: m.clone(),
                }),
        );
    }
    issues
}

pub fn check_settings(settings: &Settings) -> Vec<CheckMessage> {
    let mut messages = Vec::new();

    if settings.operation_mode().is_err() {
        messages.push(CheckMessage::error(
            "dae.e001",
            "'operation_mode' is set to an invalid value!",
            format!(
                "Please check your settings and ensure, that 'operation_mode' is set to one of \
                 the following values: '{}', '{}' or '{}'.",
                MODE_AUTO_ACTIVATION, MODE_EMAIL_ACTIVATION, MODE_MANUAL_ACTIVATION
            ),
        ));
    }

    if settings.email_template_prefix.ends_with('/') {
        messages.push(CheckMessage::error(
            "dae.e002",
            "'email_template_prefix' must not have a trailing slash!",
            "Please check your settings and ensure, that 'email_template_prefix' does not end \
             with a slash ('/')."
                .into(),
        ));
    }

    let issues = validate_admin_notification(&settings.admin_signup_notification);
    if !issues.is_empty() {
        let details = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        messages.push(CheckMessage::error(
            "dae.e003",
            "'admin_signup_notification' is set to an invalid value!",
            format!(
                "Please check your settings and ensure, that 'admin_signup_notification' is either \
                 set to 'false' or a list of entries of the form [USERNAME, EMAIL_ADDRESS, \
                 [NOTIFICATION_METHOD, ...]]. Currently supported method is 'mail'. Found: {}.",
                details
            ),
        ));
    }

    if settings.login_url != RECOMMENDED_LOGIN_URL {
        messages.push(CheckMessage::warning(
            "dae.w001",
            "'login_url' does not point to the login url provided by auth-enhanced.",
            format!(
                "The suggested value for 'login_url' is '{}', which provides the built-in login \
                 view. If you set another login url on purpose, you can safely ignore this \
                 warning.",
                RECOMMENDED_LOGIN_URL
            ),
        ));
    }

    if settings.email == EmailSettings::default() {
        messages.push(CheckMessage::warning(
            "dae.w002",
            "Your email settings are identical to the default values!",
            "While it may be possible to run with these settings, it seems unlikely. If mails \
             are not delivered, please check your settings. If everything works just fine, you \
             can safely ignore this warning."
                .into(),
        ));
    }

    messages
}
