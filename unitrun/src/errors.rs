// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;
use unitrun_metadata::UnitrunExitCode;
use unitrun_runner::errors::*;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// The error type returned by a harness loader.
pub type LoadError = Box<dyn Error + Send + Sync + 'static>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that stops the harness from performing or completing a run.
///
/// Failing units are not errors: they are reported in the output, and the run still exits with
/// [`UnitrunExitCode::OK`].
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("loading test units failed")]
    LoadFailed {
        #[source]
        err: LoadError,
    },
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 {
        #[source]
        err: camino::FromPathBufError,
    },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("building test runner failed")]
    TestRunnerBuildError {
        #[from]
        err: TestRunnerBuildError,
    },
    #[error("writing test list to output failed")]
    WriteTestListError {
        #[source]
        err: std::io::Error,
    },
    #[error("test run failed")]
    TestRunFailed {
        #[source]
        err: TestRunnerExecuteErrors<WriteEventError>,
    },
}

impl ExpectedError {
    pub(crate) fn load_failed(err: impl Into<LoadError>) -> Self {
        Self::LoadFailed { err: err.into() }
    }

    pub(crate) fn current_dir_failed(err: std::io::Error) -> Self {
        Self::CurrentDirFailed { err }
    }

    pub(crate) fn current_dir_invalid_utf8(err: camino::FromPathBufError) -> Self {
        Self::CurrentDirInvalidUtf8 { err }
    }

    pub(crate) fn write_test_list_error(err: std::io::Error) -> Self {
        Self::WriteTestListError { err }
    }

    pub(crate) fn test_run_failed(err: TestRunnerExecuteErrors<WriteEventError>) -> Self {
        Self::TestRunFailed { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::LoadFailed { .. } => UnitrunExitCode::LOAD_FAILED,
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ProfileNotFound { .. }
            | Self::ConfigParseError { .. }
            | Self::TestRunnerBuildError { .. } => UnitrunExitCode::SETUP_ERROR,
            Self::WriteTestListError { .. } => UnitrunExitCode::WRITE_OUTPUT_ERROR,
            Self::TestRunFailed { err } => {
                // An engine fault takes precedence over a failure to write output.
                if err.engine_fault.is_some() {
                    UnitrunExitCode::ENGINE_ABORTED
                } else {
                    UnitrunExitCode::WRITE_OUTPUT_ERROR
                }
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::LoadFailed { err } => {
                error!(target: NO_HEADING_TARGET, "cannot run unit tests: {err}");
                err.source()
            }
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { err } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    err.as_path().display().style(styles.bold)
                );
                None
            }
            Self::ProfileNotFound { err } => {
                error!("{err}");
                err.source()
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse unitrun config at `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::TestRunnerBuildError { err } => {
                error!("failed to build test runner");
                Some(err as &dyn Error)
            }
            Self::WriteTestListError { err } => {
                error!("failed to write test list to output");
                Some(err as &dyn Error)
            }
            Self::TestRunFailed { err } => {
                if let Some(engine_fault) = &err.engine_fault {
                    error!("test run aborted: {engine_fault}");
                }
                match &err.report_error {
                    Some(report_error) => {
                        error!("failed to write test results to output");
                        Some(report_error as &dyn Error)
                    }
                    None => err.engine_fault.as_ref().and_then(|fault| fault.source()),
                }
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
