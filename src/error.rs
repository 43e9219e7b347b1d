use std::{io, path::PathBuf};

use thiserror::Error;

/// Config document could not be read or replaced.
#[derive(Debug, Error)]
pub enum ConfigAccessError {
    #[error("config file '{}' does not exist", .0.display())]
    Missing(PathBuf),

    #[error("failed to read config file '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write replacement for '{}': {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to move replacement over '{}': {source}", .path.display())]
    Replace { path: PathBuf, source: io::Error },
}

/// The document does not have the shape a directive expects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("directive '{directive}': anchor on line {anchor_line} expects a target {offset} lines below, but the document ends")]
    Truncated {
        directive: String,
        anchor_line: usize,
        offset: usize,
    },

    #[error("directive '{directive}': line {line} has no {field} to replace")]
    FieldMissing {
        directive: String,
        line: usize,
        field: &'static str,
    },

    #[error("directive '{directive}': anchor on line {anchor_line} reaches across the profile starting on line {profile_line}")]
    CrossesProfile {
        directive: String,
        anchor_line: usize,
        profile_line: usize,
    },
}

/// A VLAN block of the stats export is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("VLAN {vlan}: block has {found} columns, column {needed} is required")]
    TooFewColumns {
        vlan: String,
        found: usize,
        needed: usize,
    },

    #[error("VLAN {vlan}: column {column} holds '{value}', expected a number")]
    NotANumber {
        vlan: String,
        column: usize,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("result store '{}' is not connected", .0.display())]
    NotConnected(PathBuf),

    #[error("result store '{}' I/O failure: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("result store '{}' CSV failure: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("unknown directory '{}'", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("test script '{}' does not exist", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("executable '{0}' could not be started: {1}")]
    ExecutableNotFound(String, String),

    #[error("'{command}' exited with {status}")]
    Failed { command: String, status: String },
}
