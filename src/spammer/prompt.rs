use std::io::{BufRead, Write};

use log::warn;

use crate::{stress::Version, Error, Result};

pub const VERSION_PROMPT: &str = "Which version are you testing? (1-4, or 0 to quit): ";
pub const COUNT_PROMPT: &str = "How many requests would you like to send?: ";

/// Largest burst one round will fire; every request is its own task and socket.
pub const MAX_REQUESTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Spam { version: Version, requests: usize },
}

/// Console dialogue asking for a version and a request count.
///
/// Bad answers are explained and asked again. End of input quits.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn next_command(&mut self) -> Result<Command> {
        let version = loop {
            write!(self.output, "\n{VERSION_PROMPT}")?;
            let Some(answer) = self.read_answer()? else {
                return Ok(Command::Quit);
            };
            match parse_version(&answer) {
                Ok(None) => return Ok(Command::Quit),
                Ok(Some(version)) => break version,
                Err(e) => self.complain(&e)?,
            }
        };
        let requests = loop {
            write!(self.output, "{COUNT_PROMPT}")?;
            let Some(answer) = self.read_answer()? else {
                return Ok(Command::Quit);
            };
            match parse_count(&answer) {
                Ok(requests) => break requests,
                Err(e) => self.complain(&e)?,
            }
        };
        Ok(Command::Spam { version, requests })
    }

    fn read_answer(&mut self) -> Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn complain(&mut self, e: &Error) -> Result<()> {
        warn!("rejected console input: {e}");
        writeln!(self.output, "{e}")?;
        Ok(())
    }
}

/// `Ok(None)` means the operator asked to quit.
pub fn parse_version(answer: &str) -> Result<Option<Version>> {
    let number: u32 = answer
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{answer:?} is not a version number")))?;
    if number == 0 {
        return Ok(None);
    }
    Version::try_from(number).map(Some)
}

pub fn parse_count(answer: &str) -> Result<usize> {
    let requests: usize = answer
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{answer:?} is not a request count of 0 or more")))?;
    if requests > MAX_REQUESTS {
        return Err(Error::InvalidInput(format!(
            "{requests} requests is too many for one round, send at most {MAX_REQUESTS}"
        )));
    }
    Ok(requests)
}
