use std::io::{BufRead, IsTerminal, Write};

use crate::error::{Error, ErrorKind, Result};

/// A source of the human answers needed by the one-time passcode login.
///
/// The default [`Terminal`] prompt reads the standard input. Embedders
/// with their own user interface provide another implementation.
pub trait Prompt {
    /// Returns the account email address.
    ///
    /// # Errors
    ///
    /// Fails when no address can be obtained.
    fn email(&mut self) -> Result<String>;

    /// Returns the one-time passcode just emailed to the account.
    ///
    /// # Errors
    ///
    /// Fails when no passcode can be obtained.
    fn otp(&mut self) -> Result<String>;
}

/// Asks the questions on the standard output and reads the answers from
/// the standard input.
///
/// A standard input which is not a terminal never answers, so that a
/// program run from a pipe or a service fails instead of blocking.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminal;

impl Prompt for Terminal {
    fn email(&mut self) -> Result<String> {
        ask("Enter your Cozify account email address: ").and_then(|email| {
            email.ok_or_else(|| {
                Error::new(
                    ErrorKind::Authentication,
                    "Email address unavailable, authentication cannot succeed. This may happen if running non-interactively (stdin closed or not a terminal).",
                )
            })
        })
    }

    fn otp(&mut self) -> Result<String> {
        ask("OTP from your email: ").and_then(|otp| {
            otp.ok_or_else(|| {
                Error::new(
                    ErrorKind::Authentication,
                    "OTP unavailable, authentication cannot succeed. This may happen if running non-interactively (stdin closed or not a terminal).",
                )
            })
        })
    }
}

fn ask(question: &str) -> Result<Option<String>> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Ok(None);
    }

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(question.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|e| Error::new(ErrorKind::Authentication, format!("Failed to ask: {e}")))?;

    read_answer(stdin.lock())
}

fn read_answer(mut reader: impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| Error::new(ErrorKind::Authentication, format!("Failed to read input: {e}")))?;

    let answer = line.trim();
    if read == 0 || answer.is_empty() {
        return Ok(None);
    }
    Ok(Some(answer.to_owned()))
}
