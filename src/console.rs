//! Terminal output for the management command.
//! Used by: command, main.

use std::io::{self, Write};

use colored::Colorize;

use crate::checks::{CheckMessage, Level};

// === Badges ===

fn badge(text: &str, fg: colored::Color, bg: colored::Color) -> colored::ColoredString {
    format!(" {} ", text).color(fg).on_color(bg).bold()
}

// === Command output ===

pub fn ok(out: &mut dyn Write, msg: &str) -> io::Result<()> {
    writeln!(out, "{} {}", "[ok]".green().bold(), msg)
}

pub fn info(out: &mut dyn Write, msg: &str) -> io::Result<()> {
    writeln!(out, "{}", msg.white().bold())
}

pub fn check_message(out: &mut dyn Write, message: &CheckMessage) -> io::Result<()> {
    let label = match message.level {
        Level::Error => badge("ERROR", colored::Color::White, colored::Color::Red),
        Level::Warning => badge("WARN", colored::Color::Black, colored::Color::Yellow),
    };
    writeln!(out, "{} {} {}", label, format!("({})", message.id).dimmed(), message.msg)?;
    writeln!(out, "    {} {}", "HINT:".dimmed(), message.hint.dimmed())
}

pub fn error(msg: &str) {
    eprintln!("{} {}", badge("FAIL", colored::Color::White, colored::Color::Red), msg.red());
}
