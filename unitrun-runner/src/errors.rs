// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by unitrun.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse unitrun config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// An error which indicates that a profile was requested but not known to unitrun.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// An error that occurs while parsing a [`TestThreads`](crate::config::TestThreads) value.
#[derive(Clone, Debug, Error)]
#[error("unrecognized value for test-threads: {input}\n(hint: expected an integer or \"num-cpus\")")]
pub struct TestThreadsParseError {
    input: String,
}

impl TestThreadsParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurs while building a [`TestFilter`](crate::test_filter::TestFilter).
#[derive(Clone, Debug, Error)]
#[error("error building name filter")]
pub struct TestFilterBuildError {
    #[source]
    error: aho_corasick::BuildError,
}

impl TestFilterBuildError {
    pub(crate) fn new(error: aho_corasick::BuildError) -> Self {
        Self { error }
    }
}

/// An error that occurs while building a [`TestRunner`](crate::runner::TestRunner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestRunnerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] std::io::Error),
}

/// An error in the execution engine itself, as opposed to a failing unit.
///
/// Failing units are reported as outcomes and never surface as errors. An engine fault stops the
/// run: no further units are started.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineFault {
    /// A unit requested that the whole run be aborted, through
    /// [`abort_run`](crate::runner::abort_run).
    #[error("unit `{unit_name}` aborted the run: {reason}")]
    Aborted {
        /// The name of the unit that aborted the run.
        unit_name: String,

        /// The reason given for the abort.
        reason: String,
    },

    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread for unit `{unit_name}`")]
    WorkerSpawn {
        /// The name of the unit that could not be started.
        unit_name: String,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A worker thread went away without reporting a result.
    #[error("worker thread for unit `{unit_name}` exited without reporting a result")]
    WorkerLost {
        /// The name of the unit whose worker was lost.
        unit_name: String,
    },
}

/// Errors that occurred while executing a test run.
///
/// Returned by [`TestRunner::try_execute`](crate::runner::TestRunner::try_execute).
#[derive(Debug)]
pub struct TestRunnerExecuteErrors<E> {
    /// An error that occurred while reporting results to the callback.
    pub report_error: Option<E>,

    /// The first engine fault encountered during the run.
    pub engine_fault: Option<EngineFault>,
}

impl<E: fmt::Display> fmt::Display for TestRunnerExecuteErrors<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.report_error, &self.engine_fault) {
            (Some(report_error), Some(engine_fault)) => write!(
                f,
                "error reporting results: {report_error} (engine fault also occurred: {engine_fault})"
            ),
            (Some(report_error), None) => write!(f, "error reporting results: {report_error}"),
            (None, Some(engine_fault)) => write!(f, "{engine_fault}"),
            (None, None) => write!(f, "unknown error executing tests"),
        }
    }
}

impl<E: error::Error + 'static> error::Error for TestRunnerExecuteErrors<E> {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match (&self.report_error, &self.engine_fault) {
            (Some(report_error), _) => Some(report_error),
            (None, Some(engine_fault)) => engine_fault.source(),
            (None, None) => None,
        }
    }
}

/// An error that occurs while writing an event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] std::io::Error),

    /// An error occurred while formatting the event.
    #[error("error formatting event")]
    Fmt(#[source] std::fmt::Error),
}

/// Displays an error along with its chain of sources, one per line.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        if source.is_some() {
            write!(f, "\n  caused by:")?;
        }
        while let Some(error) = source {
            write!(f, "\n  - {error}")?;
            source = error.source();
        }

        Ok(())
    }
}
