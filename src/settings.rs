//! Application settings with their default values.
//! Used by: checks, token::service, registration, command, main.
//!
//! Every key is optional in the settings file; missing keys fall back to the
//! defaults below. A handful of keys can also be overridden from the
//! environment (see [`Settings::apply_overrides`]).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_SETTINGS_PATH: &str = "auth_enhanced.json";

/// No trailing slash.
pub const DEFAULT_EMAIL_TEMPLATE_PREFIX: &str = "auth_enhanced/mail";
pub const DEFAULT_FROM_ADDRESS: &str = "webmaster@localhost";
pub const DEFAULT_LOGIN_URL: &str = "/accounts/login/";
pub const RECOMMENDED_LOGIN_URL: &str = "auth_enhanced:login";
pub const DEFAULT_SALT: &str = "django-auth_enhanced";
pub const DEFAULT_VERIFICATION_TOKEN_MAX_AGE: u64 = 3600;
pub const DEFAULT_EMAIL_BACKEND: &str = "smtp";

pub const MODE_AUTO_ACTIVATION: &str = "auto";
pub const MODE_EMAIL_ACTIVATION: &str = "email-verification";
pub const MODE_MANUAL_ACTIVATION: &str = "manual";

/// How freshly registered accounts are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Accounts are active right away.
    Auto,
    /// Accounts become active once the email address is verified.
    EmailVerification,
    /// Accounts stay inactive until an administrator activates them.
    Manual,
}

impl OperationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => MODE_AUTO_ACTIVATION,
            Self::EmailVerification => MODE_EMAIL_ACTIVATION,
            Self::Manual => MODE_MANUAL_ACTIVATION,
        }
    }
}

impl FromStr for OperationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            MODE_AUTO_ACTIVATION => Ok(Self::Auto),
            MODE_EMAIL_ACTIVATION => Ok(Self::EmailVerification),
            MODE_MANUAL_ACTIVATION => Ok(Self::Manual),
            other => Err(Error::Config(format!("unknown operation mode '{}'", other))),
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(USERNAME, EMAIL_ADDRESS, [NOTIFICATION_METHOD, ...])`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecipient(pub String, pub String, pub Vec<String>);

impl NotificationRecipient {
    pub fn username(&self) -> &str {
        &self.0
    }

    pub fn email(&self) -> &str {
        &self.1
    }

    pub fn methods(&self) -> &[String] {
        &self.2
    }
}

/// Either `false` or a list of recipients. `true` is accepted by the parser
/// and flagged by the system checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdminSignupNotification {
    Flag(bool),
    Recipients(Vec<NotificationRecipient>),
}

impl Default for AdminSignupNotification {
    fn default() -> Self {
        Self::Flag(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub host_user: String,
    pub host_password: String,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub timeout: Option<u64>,
    pub ssl_keyfile: Option<String>,
    pub ssl_certfile: Option<String>,
    pub backend: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 25,
            host_user: String::new(),
            host_password: String::new(),
            use_tls: false,
            use_ssl: false,
            timeout: None,
            ssl_keyfile: None,
            ssl_certfile: None,
            backend: DEFAULT_EMAIL_BACKEND.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub admin_signup_notification: AdminSignupNotification,
    /// Subject prefix for mails sent to administrators.
    pub email_admin_notification_prefix: String,
    pub email_from_address: String,
    /// Subject prefix for mails sent to users.
    pub email_prefix: String,
    pub email_template_prefix: String,
    /// Kept raw so that an invalid value reaches the system checks.
    pub operation_mode: String,
    pub salt: String,
    /// Seconds. The settings file may also say `"2h"` or `"1d"`.
    #[serde(deserialize_with = "deserialize_max_age")]
    pub verification_token_max_age: u64,
    pub login_url: String,
    pub email: EmailSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admin_signup_notification: AdminSignupNotification::default(),
            email_admin_notification_prefix: String::new(),
            email_from_address: DEFAULT_FROM_ADDRESS.into(),
            email_prefix: String::new(),
            email_template_prefix: DEFAULT_EMAIL_TEMPLATE_PREFIX.into(),
            operation_mode: MODE_AUTO_ACTIVATION.into(),
            salt: DEFAULT_SALT.into(),
            verification_token_max_age: DEFAULT_VERIFICATION_TOKEN_MAX_AGE,
            login_url: DEFAULT_LOGIN_URL.into(),
            email: EmailSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid settings file {}: {}", path.display(), e)))
    }

    /// Reads `path` if it exists, then applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut settings = if path.exists() {
            tracing::info!(path = %path.display(), "loading settings");
            Self::from_file(path)?
        } else {
            tracing::info!(path = %path.display(), "settings file not found, using defaults");
            Self::default()
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Overrides `operation_mode`, `salt` and `verification_token_max_age`
    /// from `DAE_OPERATION_MODE`, `DAE_SALT` and
    /// `DAE_VERIFICATION_TOKEN_MAX_AGE`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("DAE_OPERATION_MODE") {
            self.operation_mode = mode;
        }
        if let Some(salt) = lookup("DAE_SALT") {
            self.salt = salt;
        }
        if let Some(max_age) = lookup("DAE_VERIFICATION_TOKEN_MAX_AGE") {
            self.verification_token_max_age = convert_to_seconds(&max_age)?;
        }
        Ok(())
    }

    pub fn operation_mode(&self) -> Result<OperationMode> {
        self.operation_mode.parse()
    }
}

/// `"2h"` is hours, `"3d"` days, anything else plain seconds.
pub fn convert_to_seconds(time_str: &str) -> Result<u64> {
    let time_str = time_str.trim();
    let (digits, factor) = if let Some(hours) = time_str.strip_suffix('h') {
        (hours, 3600)
    } else if let Some(days) = time_str.strip_suffix('d') {
        (days, 3600 * 24)
    } else {
        (time_str, 1)
    };
    let value: u64 = digits.parse().map_err(|_| Error::Conversion)?;
    value.checked_mul(factor).ok_or(Error::Conversion)
}

fn deserialize_max_age<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(secs),
        Raw::Text(text) => convert_to_seconds(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    mod convert {
        use super::*;

        #[test]
        fn plain_seconds() -> Result<()> {
            assert_eq!(convert_to_seconds("90")?, 90);
            Ok(())
        }

        #[test]
        fn hours() -> Result<()> {
            assert_eq!(convert_to_seconds("2h")?, 7200);
            Ok(())
        }

        #[test]
        fn days() -> Result<()> {
            assert_eq!(convert_to_seconds("1d")?, 86_400);
            Ok(())
        }

        #[test]
        fn garbage_fails() {
            assert!(matches!(convert_to_seconds("soon"), Err(Error::Conversion)));
            assert!(matches!(convert_to_seconds("h"), Err(Error::Conversion)));
            assert!(matches!(convert_to_seconds("-5"), Err(Error::Conversion)));
        }

        #[test]
        fn conversion_message() {
            let err = convert_to_seconds("x").err().map(|e| e.to_string());
            assert_eq!(
                err.as_deref(),
                Some("Could not convert the parameter to an integer value.")
            );
        }
    }

    #[test]
    fn defaults_are_injected() {
        let s = Settings::default();
        assert_eq!(s.admin_signup_notification, AdminSignupNotification::Flag(false));
        assert_eq!(s.email_from_address, "webmaster@localhost");
        assert_eq!(s.email_template_prefix, "auth_enhanced/mail");
        assert_eq!(s.operation_mode, "auto");
        assert_eq!(s.salt, "django-auth_enhanced");
        assert_eq!(s.verification_token_max_age, 3600);
        assert!(s.email_prefix.is_empty());
        assert!(s.email_admin_notification_prefix.is_empty());
    }

    #[test]
    fn empty_object_parses_to_defaults() -> Result<()> {
        let s: Settings = serde_json::from_str("{}")?;
        assert_eq!(s, Settings::default());
        Ok(())
    }

    #[test]
    fn partial_file_keeps_other_defaults() -> Result<()> {
        let s: Settings = serde_json::from_str(
            r#"{"operation_mode": "manual", "verification_token_max_age": "2h"}"#,
        )?;
        assert_eq!(s.operation_mode()?, OperationMode::Manual);
        assert_eq!(s.verification_token_max_age, 7200);
        assert_eq!(s.salt, DEFAULT_SALT);
        Ok(())
    }

    #[test]
    fn recipients_parse_from_tuples() -> Result<()> {
        let s: Settings = serde_json::from_str(
            r#"{"admin_signup_notification": [["django", "django@localhost", ["mail"]]]}"#,
        )?;
        match s.admin_signup_notification {
            AdminSignupNotification::Recipients(ref r) => {
                assert_eq!(r.len(), 1);
                assert_eq!(r[0].username(), "django");
                assert_eq!(r[0].email(), "django@localhost");
                assert_eq!(r[0].methods(), ["mail".to_string()]);
            }
            AdminSignupNotification::Flag(_) => panic!("expected recipients"),
        }
        Ok(())
    }

    #[test]
    fn non_string_salt_is_config_error() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"salt": 42}}"#)?;
        let result = Settings::from_file(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
        Ok(())
    }

    #[test]
    fn from_file_reads_json() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"salt": "newsletter", "email_prefix": "[site] "}}"#)?;
        let s = Settings::from_file(file.path())?;
        assert_eq!(s.salt, "newsletter");
        assert_eq!(s.email_prefix, "[site] ");
        Ok(())
    }

    #[test]
    fn load_without_file_uses_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut s = Settings::load(dir.path().join("missing.json"))?;
        // The environment may carry overrides; compare what it cannot touch.
        s.operation_mode = MODE_AUTO_ACTIVATION.into();
        s.salt = DEFAULT_SALT.into();
        s.verification_token_max_age = DEFAULT_VERIFICATION_TOKEN_MAX_AGE;
        assert_eq!(s, Settings::default());
        Ok(())
    }

    #[test]
    fn overrides_apply() -> Result<()> {
        let mut s = Settings::default();
        s.apply_overrides(lookup(&[
            ("DAE_OPERATION_MODE", "email-verification"),
            ("DAE_SALT", "other"),
            ("DAE_VERIFICATION_TOKEN_MAX_AGE", "1d"),
        ]))?;
        assert_eq!(s.operation_mode()?, OperationMode::EmailVerification);
        assert_eq!(s.salt, "other");
        assert_eq!(s.verification_token_max_age, 86_400);
        Ok(())
    }

    #[test]
    fn bad_max_age_override_fails() {
        let mut s = Settings::default();
        let result = s.apply_overrides(lookup(&[("DAE_VERIFICATION_TOKEN_MAX_AGE", "later")]));
        assert!(matches!(result, Err(Error::Conversion)));
    }

    #[test]
    fn unknown_mode_is_config_error() {
        let mut s = Settings::default();
        s.operation_mode = "sometimes".into();
        assert!(matches!(s.operation_mode(), Err(Error::Config(_))));
    }

    #[test]
    fn mode_round_trips_through_str() -> Result<()> {
        for mode in [OperationMode::Auto, OperationMode::EmailVerification, OperationMode::Manual] {
            assert_eq!(mode.as_str().parse::<OperationMode>()?, mode);
        }
        Ok(())
    }
}
