//! Fatal errors and their process exit codes.
//!
//! Every failure in a run unwinds to `main` as a [`ScanError`]. The variant
//! decides the exit code and whether usage text is printed after the message.

use std::path::PathBuf;

use thiserror::Error;

/// Exit codes (BSD `sysexits.h` compatible).
pub mod exitcode {
    /// Command line usage error
    pub const USAGE: i32 = 64;
    /// Data format error
    pub const DATAERR: i32 = 65;
    /// Cannot open input
    pub const NOINPUT: i32 = 66;
    /// Service unavailable
    pub const UNAVAILABLE: i32 = 69;
    /// Internal software error
    pub const SOFTWARE: i32 = 70;
    /// Input/output error
    pub const IOERR: i32 = 74;
    /// Configuration error
    pub const CONFIG: i32 = 78;
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Argument --{0} is specified more than once.")]
    DuplicateArgument(String),

    #[error("Missing required argument --{0}")]
    MissingArgument(String),

    #[error("Command is not specified.")]
    MissingCommand,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Missing --type argument and could not infer type based on input file name.")]
    UnknownType,

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Invalid version '{version}' for package {package}")]
    InvalidVersion { package: String, version: String },

    #[error("Cannot search '{}': {source}", root.display())]
    InvalidSearchRoot {
        root: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error("Failed to resolve dependencies for {}: {source:#}", path.display())]
    Resolve {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("Failed to publish consumer data for {package}: {source:#}")]
    Publish {
        package: String,
        source: anyhow::Error,
    },

    #[error("Failed to update manifest {}: {source:#}", path.display())]
    Manifest {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("Failed to load configuration: {0:#}")]
    Config(anyhow::Error),
}

/// Result type for a pgscan run.
pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    /// Whether usage text should follow the error message.
    pub fn show_usage(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidArgument(_)
                | ScanError::DuplicateArgument(_)
                | ScanError::MissingCommand
                | ScanError::InvalidCommand(_)
        )
    }

    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScanError::InvalidArgument(_)
            | ScanError::DuplicateArgument(_)
            | ScanError::MissingArgument(_)
            | ScanError::MissingCommand
            | ScanError::InvalidCommand(_) => exitcode::USAGE,
            ScanError::UnknownType
            | ScanError::InvalidType(_)
            | ScanError::InvalidVersion { .. }
            | ScanError::InvalidPattern { .. } => exitcode::DATAERR,
            ScanError::InvalidSearchRoot { .. } => exitcode::NOINPUT,
            ScanError::Resolve { .. } | ScanError::Regex(_) => exitcode::SOFTWARE,
            ScanError::Publish { .. } => exitcode::UNAVAILABLE,
            ScanError::Manifest { .. } => exitcode::IOERR,
            ScanError::Config(_) => exitcode::CONFIG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_errors_show_usage() {
        assert!(ScanError::InvalidArgument("-3x".into()).show_usage());
        assert!(ScanError::DuplicateArgument("type".into()).show_usage());
        assert!(ScanError::InvalidCommand("scan".into()).show_usage());
        assert!(!ScanError::MissingArgument("input".into()).show_usage());
        assert!(!ScanError::UnknownType.show_usage());
    }

    #[test]
    fn test_exit_codes_are_nonzero() {
        let errors = [
            ScanError::MissingCommand,
            ScanError::UnknownType,
            ScanError::Publish {
                package: "Foo".into(),
                source: anyhow::anyhow!("503"),
            },
        ];
        for e in &errors {
            assert_ne!(e.exit_code(), 0);
        }
        assert_eq!(ScanError::MissingCommand.exit_code(), exitcode::USAGE);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ScanError::DuplicateArgument("type".into()).to_string(),
            "Argument --type is specified more than once."
        );
        assert_eq!(
            ScanError::MissingArgument("package-feed".into()).to_string(),
            "Missing required argument --package-feed"
        );
    }
}
