//! Parsing for the interactive client's prompts.

use std::io::{self, BufRead};
use std::thread;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::calculator::Arithmetic;

const LINE_BUFFER: usize = 16;

/// What the user asked for at the operation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    Apply(Arithmetic),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("Invalid operation '{0}'. Please use +, -, *, or /")]
    UnknownOperation(String),

    #[error("'{0}' is not a number. Please enter valid numbers!")]
    InvalidNumber(String),
}

/// Parse the operation prompt. Surrounding whitespace and case are ignored.
pub fn parse_command(line: &str) -> Result<Command, PromptError> {
    let input = line.trim().to_lowercase();
    if input == "exit" {
        return Ok(Command::Exit);
    }

    Arithmetic::from_symbol(&input)
        .map(Command::Apply)
        .ok_or(PromptError::UnknownOperation(input))
}

pub fn parse_operand(line: &str) -> Result<f64, PromptError> {
    let input = line.trim();
    input
        .parse()
        .map_err(|_| PromptError::InvalidNumber(input.to_string()))
}

/// Read lines from `reader` on a dedicated OS thread.
///
/// The thread lives outside the runtime, so a read blocked on a terminal
/// does not hold up runtime shutdown. The channel closes at end of input or
/// after the first read error.
pub fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}
