// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit codes
//!
//! `frepo` maps every command outcome onto a Unix exit code so scripts can
//! branch on failure kind instead of parsing stderr. Codes follow BSD
//! `sysexits.h` where one applies; only the handful `main.rs` can actually
//! produce are represented here, via [`ExitCode::from_error`]'s string match
//! over the error returned by a command.
//!
//! ```rust,no_run
//! use file_repo_bootstrap::exit_code::ExitCode;
//!
//! fn run_application() -> Result<(), Box<dyn std::error::Error>> {
//!     Ok(())
//! }
//!
//! fn main() {
//!     let result = run_application();
//!     let exit_code = match result {
//!         Ok(_) => ExitCode::Success,
//!         Err(e) => ExitCode::from_error(e.as_ref()),
//!     };
//!     std::process::exit(exit_code.as_i32());
//! }
//! ```

use std::fmt;

/// Exit codes following Unix conventions (BSD sysexits.h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// General error (1)
    Error = 1,

    /// Command line usage error (64): invalid arguments, missing required
    /// arguments, unknown flags.
    UsageError = 64,

    /// Data format error (65): invalid input data, malformed configuration,
    /// parse errors.
    DataError = 65,

    /// Cannot open input (66): file not found, permission denied on input.
    NoInput = 66,

    /// Service unavailable (69): the repository root or a dependency isn't
    /// reachable.
    Unavailable = 69,

    /// I/O error (74): read or write failure against the repository.
    IoError = 74,

    /// Permission denied (77): insufficient privileges, access denied.
    NoPerm = 77,

    /// Configuration error (78): invalid or missing repository configuration.
    Config = 78,

    /// Interrupted by signal (130): SIGINT/SIGTERM/SIGHUP arrived mid-command
    /// and the operation was cancelled cooperatively.
    Interrupted = 130,
}

impl ExitCode {
    /// Convert to i32 for use with `std::process::exit`.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a command's error to an exit code by matching common phrases in
    /// its `Display` text. Cooperative cancellation is checked first since a
    /// cancelled operation's underlying error may also mention e.g. "io".
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        let error_string = error.to_string().to_lowercase();

        if error_string.contains("cancelled") {
            ExitCode::Interrupted
        } else if error_string.contains("permission") || error_string.contains("access denied") {
            ExitCode::NoPerm
        } else if error_string.contains("not found") || error_string.contains("no such") {
            ExitCode::NoInput
        } else if error_string.contains("invalid") || error_string.contains("argument") {
            ExitCode::UsageError
        } else if error_string.contains("parse") || error_string.contains("format") {
            ExitCode::DataError
        } else if error_string.contains("io") || error_string.contains("read") || error_string.contains("write") {
            ExitCode::IoError
        } else if error_string.contains("config") {
            ExitCode::Config
        } else if error_string.contains("unavailable") || error_string.contains("not available") {
            ExitCode::Unavailable
        } else {
            ExitCode::Error
        }
    }

    /// Human-readable description of this exit code.
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::UsageError => "Command line usage error",
            ExitCode::DataError => "Data format error",
            ExitCode::NoInput => "Cannot open input",
            ExitCode::Unavailable => "Service unavailable",
            ExitCode::IoError => "I/O error",
            ExitCode::NoPerm => "Permission denied",
            ExitCode::Config => "Configuration error",
            ExitCode::Interrupted => "Interrupted by signal",
        }
    }

    /// True for the success code.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// True for any non-success code.
    pub fn is_error(self) -> bool {
        !self.is_success()
    }

    /// True if this represents a signal interruption rather than a command
    /// failure.
    pub fn is_signal(self) -> bool {
        matches!(self, ExitCode::Interrupted)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Error.as_i32(), 1);
        assert_eq!(ExitCode::UsageError.as_i32(), 64);
        assert_eq!(ExitCode::Config.as_i32(), 78);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_is_success() {
        assert!(ExitCode::Success.is_success());
        assert!(!ExitCode::Error.is_success());
        assert!(!ExitCode::UsageError.is_success());
    }

    #[test]
    fn test_is_error() {
        assert!(!ExitCode::Success.is_error());
        assert!(ExitCode::Error.is_error());
        assert!(ExitCode::Config.is_error());
    }

    #[test]
    fn test_is_signal() {
        assert!(ExitCode::Interrupted.is_signal());
        assert!(!ExitCode::Success.is_signal());
        assert!(!ExitCode::Error.is_signal());
    }

    #[test]
    fn test_default() {
        assert_eq!(ExitCode::default(), ExitCode::Success);
    }

    #[test]
    fn test_display() {
        let code = ExitCode::UsageError;
        let display = format!("{code}");
        assert!(display.contains("Command line usage error"));
        assert!(display.contains("64"));
    }

    #[test]
    fn test_from_error() {
        use std::io;

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        assert_eq!(ExitCode::from_error(&err), ExitCode::NoPerm);

        let err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        assert_eq!(ExitCode::from_error(&err), ExitCode::NoInput);
    }

    #[test]
    fn test_from_error_cancelled() {
        #[derive(Debug)]
        struct Cancelled(String);
        impl fmt::Display for Cancelled {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "cancelled: {}", self.0)
            }
        }
        impl std::error::Error for Cancelled {}

        let err = Cancelled("cleanup sweep cancelled".into());
        assert_eq!(ExitCode::from_error(&err), ExitCode::Interrupted);
    }

    #[test]
    fn test_conversion_to_i32() {
        let code: i32 = ExitCode::Config.into();
        assert_eq!(code, 78);
    }
}
