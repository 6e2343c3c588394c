//! Error taxonomy. Only `ConfigError` (at startup) and a lost driver
//! connection abort the process; everything else degrades to a log line.

use thiserror::Error;

use crate::sys::hotkey::Hotkey;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate keybinding: {0}")]
    DuplicateBinding(Hotkey),
    #[error("unknown layout kind: {0}")]
    UnknownLayout(String),
    #[error("unknown group: {0}")]
    UnknownGroup(String),
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("display driver connection lost")]
    ConnectionLost,
    #[error("display driver request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to launch {command:?}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
