use std::{
    io::{Read, Write},
    path::Path,
};

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::{
    command::Command,
    errors::{CommandError, FramingError},
    framing::{FrameReader, FrameWriter},
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// The reply sent back for every request that made it past framing.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub result: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Value>,
}

impl Envelope {
    pub fn success(reply: Option<Value>) -> Self {
        Self {
            result: Outcome::Success,
            reply,
        }
    }

    pub fn error() -> Self {
        Self {
            result: Outcome::Error,
            reply: None,
        }
    }
}

/// How a single request/response cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// The input closed before a request arrived; nothing was written.
    EndOfInput,
    Replied(Outcome),
}

/// Runs `command` and wraps its result. Failure text goes to `diagnostics`,
/// never into the envelope.
pub fn execute<D: Write>(command: &Command, directory: &Path, diagnostics: &mut D) -> Envelope {
    match command.execute(directory) {
        Ok(reply) => {
            info!(op = command.op(), "Command succeeded");
            Envelope::success(reply)
        }
        Err(e) => report(&e, diagnostics),
    }
}

/// Parses and executes one decoded request.
pub fn dispatch<D: Write>(request: Value, directory: &Path, diagnostics: &mut D) -> Envelope {
    match Command::parse(request) {
        Ok(command) => execute(&command, directory, diagnostics),
        Err(e) => report(&e, diagnostics),
    }
}

/// Reads one frame, answers it and returns. Command failures are answered
/// with an error envelope; framing failures are returned to the caller.
pub fn run_once<R, W, D>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    diagnostics: &mut D,
    directory: &Path,
) -> Result<Cycle, FramingError>
where
    R: Read,
    W: Write,
    D: Write,
{
    let Some(request) = reader.read_frame()? else {
        info!("Input closed before a request arrived");
        return Ok(Cycle::EndOfInput);
    };

    let envelope = dispatch(request, directory, diagnostics);
    writer.write_frame(&envelope)?;
    Ok(Cycle::Replied(envelope.result))
}

fn report<D: Write>(e: &CommandError, diagnostics: &mut D) -> Envelope {
    error!(kind = e.kind().as_str(), "Command failed: {}", e);
    // The diagnostic stream is best-effort; the envelope still goes out.
    let _ = write!(diagnostics, "{}", e).and_then(|_| diagnostics.flush());
    Envelope::error()
}
