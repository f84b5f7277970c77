//! `authenhanced` management command.
//! Used by: binary entrypoint.

use std::process::ExitCode;

use clap::Parser;

use auth_enhanced::command::{self, Cli};
use auth_enhanced::{console, state, telemetry};

fn main() -> ExitCode {
    telemetry::init_tracing();
    let cli = Cli::parse();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command::execute(&cli, state::secret_from_env, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            console::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
