//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to create an HTTP client
    ClientCreation(String),
    /// Invalid or corrupted chart link token
    InvalidChartLink(String),
    /// Failed to read or parse an input file
    Input(String),
    /// Server failed to bind or serve
    Serve(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::InvalidChartLink(_) => {
                eprintln!();
                eprintln!("The token must come from a chart URL's `config` parameter.");
            }
            CliError::Serve(_) => {
                eprintln!();
                eprintln!("Check that the address is free and you may bind to it.");
            }
            _ => {}
        }

        let code = match self {
            CliError::ClientCreation(_) => 1,
            CliError::InvalidChartLink(_) => 2,
            CliError::Input(_) => 2,
            CliError::Serve(_) => 3,
        };
        process::exit(code);
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::ClientCreation(msg) => write!(f, "failed to create HTTP client: {}", msg),
            CliError::InvalidChartLink(msg) => write!(f, "invalid chart link: {}", msg),
            CliError::Input(msg) => write!(f, "invalid input: {}", msg),
            CliError::Serve(err) => write!(f, "server error: {}", err),
        }
    }
}

impl std::error::Error for CliError {}
