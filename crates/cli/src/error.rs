//! CLI errors and their exit codes.
//!
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: simulation error (bad image shape, bad config, step failure)
//! - 11: I/O error (reading the sprite, writing the PNG)
//! - 12: input error (bad `--params` JSON, unreadable `--config`)
//! - 13: serialization error

use std::fmt;

use windsway_core::SwayError;

#[derive(Debug)]
pub enum CliError {
    Simulation(SwayError),
    Io(String),
    Input(String),
    Serialization(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Simulation(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Simulation(e) => write!(f, "{e}"),
            CliError::Io(msg) | CliError::Input(msg) | CliError::Serialization(msg) => {
                write!(f, "{msg}")
            }
        }
    }
}

impl From<SwayError> for CliError {
    fn from(e: SwayError) -> Self {
        match e {
            SwayError::Io(msg) => CliError::Io(msg),
            SwayError::InvalidConfig(msg) => CliError::Input(msg),
            other => CliError::Simulation(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}
