use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No code provided")]
    EmptyCode,

    #[error("Script file was not created: {}", .0.display())]
    ScriptMissing(PathBuf),

    #[error("Interpreter not found: {0}")]
    InterpreterNotFound(String),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("System error: {0}")]
    System(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
