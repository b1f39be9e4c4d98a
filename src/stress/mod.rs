use std::fmt::Display;

use crate::{Error, Result};

pub mod controller;
pub mod sequence;

pub use controller::{ControllerDelays, StressTestController};
pub use sequence::SharedSequence;

/// Number of copies of the chosen letter every handler produces.
pub const LETTERS_PER_CALL: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    /// Appends to the shared sequence and never clears it.
    V1,
    /// Clears the shared sequence before filling it.
    V2,
    /// Like `V2`, with a short delay between filling and reading.
    V3,
    /// Uses a sequence local to the call, with a long delay.
    V4,
}

impl Version {
    pub const ALL: [Version; 4] = [Version::V1, Version::V2, Version::V3, Version::V4];

    pub fn number(self) -> u32 {
        match self {
            Version::V1 => 1,
            Version::V2 => 2,
            Version::V3 => 3,
            Version::V4 => 4,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Version::V1 => "/v1",
            Version::V2 => "/v2",
            Version::V3 => "/v3",
            Version::V4 => "/v4",
        }
    }

    /// Maps a request target onto a version, ignoring any query string.
    pub fn from_path(target: &str) -> Option<Version> {
        let path = target.split_once('?').map_or(target, |(path, _)| path);
        Version::ALL.into_iter().find(|version| version.path() == path)
    }
}

impl TryFrom<u32> for Version {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Version::V1),
            2 => Ok(Version::V2),
            3 => Ok(Version::V3),
            4 => Ok(Version::V4),
            other => Err(Error::InvalidInput(format!(
                "there is no version {other}, pick one of 1-4"
            ))),
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// True when `body` is exactly ten copies of one uppercase ASCII letter.
pub fn is_well_formed(body: &str) -> bool {
    let bytes = body.as_bytes();
    match bytes.first() {
        Some(first) if first.is_ascii_uppercase() => {
            bytes.len() == LETTERS_PER_CALL && bytes.iter().all(|b| b == first)
        }
        _ => false,
    }
}
