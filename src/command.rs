//! The `authenhanced` management command.
//! Used by: main.

use std::collections::BTreeMap;
use std::io::Write;
use std::str::FromStr;

use clap::Parser;

use crate::checks::{check_settings, validate_admin_notification};
use crate::console;
use crate::error::{Error, Result};
use crate::settings::{AdminSignupNotification, Settings, DEFAULT_SETTINGS_PATH};
use crate::state::{self, AppState};
use crate::user::UserStore;

pub const DEFAULT_DATABASE_PATH: &str = "auth_enhanced.db";

#[derive(Debug, Parser)]
#[command(
    name = "authenhanced",
    version = "0.1.0",
    about = "Checks and supports the account activation setup."
)]
pub struct Cli {
    /// The actual command to perform (accepted values: 'admin-notification',
    /// 'unique-email', 'check' and 'full')
    pub cmd: String,

    /// Settings file (JSON)
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    pub settings: String,

    /// SQLite user database
    #[arg(long, default_value = DEFAULT_DATABASE_PATH)]
    pub database: String,
}

impl Cli {
    pub fn command(&self) -> Result<Command> {
        self.cmd.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    UniqueEmail,
    AdminNotification,
    Check,
    Full,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unique-email" => Ok(Self::UniqueEmail),
            "admin-notification" => Ok(Self::AdminNotification),
            "check" => Ok(Self::Check),
            "full" => Ok(Self::Full),
            _ => Err(Error::Command("No valid command was provided!".into())),
        }
    }
}

/// Validates the command before anything touches the settings file or the
/// database, then runs it against a freshly built state.
pub fn execute(
    cli: &Cli,
    secret: impl FnOnce() -> Vec<u8>,
    out: &mut dyn Write,
) -> Result<()> {
    let command = cli.command()?;
    let settings = Settings::load(&cli.settings)?;
    let state = state::build_state(&cli.database, settings, secret())?;
    tracing::info!(?command, database = %cli.database, "starting authenhanced");
    run(command, &state, out)
}

pub fn run(command: Command, state: &AppState, out: &mut dyn Write) -> Result<()> {
    tracing::debug!(?command, "running management command");

    match command {
        Command::UniqueEmail => {
            check_email_uniqueness(&state.users, out)?;
        }
        Command::AdminNotification => {
            check_admin_notification(&state.settings, &state.users, out)?;
        }
        Command::Check => {
            check_system(&state.settings, out)?;
        }
        Command::Full => {
            console::info(out, "Performing all app-specific checks!")?;
            check_email_uniqueness(&state.users, out)?;
            check_admin_notification(&state.settings, &state.users, out)?;
        }
    }
    Ok(())
}

/// Fails if two accounts share an email address (compared case-insensitively).
pub fn check_email_uniqueness(users: &dyn UserStore, out: &mut dyn Write) -> Result<bool> {
    let mut by_email: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for user in users.all()? {
        by_email
            .entry(user.email.trim().to_lowercase())
            .or_default()
            .push(user.username);
    }

    let mut offenders: Vec<String> = by_email
        .into_values()
        .filter(|names| names.len() > 1)
        .flatten()
        .collect();

    if !offenders.is_empty() {
        offenders.sort();
        return Err(Error::Command(format!(
            "The following accounts don't have unique email addresses: {}",
            offenders.join(", ")
        )));
    }

    console::ok(out, "All email addresses are unique!")?;
    Ok(true)
}

/// Fails if a configured recipient is unknown, has no verified address, or
/// may not change accounts.
pub fn check_admin_notification(
    settings: &Settings,
    users: &dyn UserStore,
    out: &mut dyn Write,
) -> Result<bool> {
    let issues = validate_admin_notification(&settings.admin_signup_notification);
    if !issues.is_empty() {
        let details = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        return Err(Error::Command(format!(
            "'admin_signup_notification' is set to an invalid value: {}.",
            details
        )));
    }

    let recipients = match &settings.admin_signup_notification {
        AdminSignupNotification::Recipients(r) => r,
        AdminSignupNotification::Flag(_) => {
            console::ok(out, "Admin notifications are disabled.")?;
            return Ok(true);
        }
    };

    let mut missing = Vec::new();
    let mut unverified = Vec::new();
    let mut unprivileged = Vec::new();
    for recipient in recipients {
        let name = recipient.username();
        match users.find(name)? {
            None => missing.push(name),
            Some(user) => {
                if !user.email_verified || user.email != recipient.email() {
                    unverified.push(name);
                }
                if !user.can_change_users {
                    unprivileged.push(name);
                }
            }
        }
    }

    if !missing.is_empty() {
        return Err(Error::Command(format!(
            "The following accounts could not be found: {}.",
            missing.join(", ")
        )));
    }
    if !unverified.is_empty() {
        return Err(Error::Command(format!(
            "The following accounts do not have a verified email address: {}. \
             Administrative notifications will only be sent to verfified email addresses.",
            unverified.join(", ")
        )));
    }
    if !unprivileged.is_empty() {
        return Err(Error::Command(format!(
            "The following accounts do not have the sufficient permissions to actually \
             modify accounts: {}.",
            unprivileged.join(", ")
        )));
    }

    console::ok(out, "Admin notification settings are valid!")?;
    Ok(true)
}

/// Prints every settings check; fails when any of them is an error.
pub fn check_system(settings: &Settings, out: &mut dyn Write) -> Result<bool> {
    let messages = check_settings(settings);
    for message in &messages {
        console::check_message(out, message)?;
    }

    let errors = messages.iter().filter(|m| m.is_error()).count();
    if errors > 0 {
        return Err(Error::Command(format!(
            "System check identified {} error(s) in the settings.",
            errors
        )));
    }
    console::ok(out, &format!("System check identified {} warning(s).", messages.len()))?;
    Ok(true)
}
