// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Main entry point implementation.

use super::app::HarnessApp;
use crate::{ExpectedError, LoadError, output::OutputWriter};
use clap::Parser;
use unitrun_metadata::UnitrunExitCode;
use unitrun_runner::registry::Registry;

/// Main entry point for a harness binary.
///
/// Parses the command line, calls `loader` to build the registry of units, and then lists or runs
/// the selected units. Never returns: the process exits with one of the codes documented in
/// [`UnitrunExitCode`].
///
/// Exiting the process also ends any worker threads left behind by timed out units.
///
/// ```no_run
/// use unitrun_runner::{registry::Registry, unit::TestUnit};
///
/// fn main() {
///     unitrun::main_with(|| {
///         let mut registry = Registry::new();
///         registry.register(TestUnit::new("Example.passes", || assert_eq!(1 + 1, 2)));
///         Ok::<_, std::io::Error>(registry)
///     })
/// }
/// ```
pub fn main_with<F, E>(loader: F) -> !
where
    F: FnOnce() -> Result<Registry, E>,
    E: Into<LoadError>,
{
    let _ = enable_ansi_support::enable_ansi_support();

    let app = match HarnessApp::try_parse() {
        Ok(app) => app,
        Err(err) => std::process::exit(handle_clap_error(err)),
    };
    let output = app.init_output();

    let result = loader()
        .map_err(ExpectedError::load_failed)
        .and_then(|registry| app.exec(&registry, output, &mut OutputWriter::default()));

    match result {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}

/// Prints a clap error or help message, and returns the exit code to use.
fn handle_clap_error(err: clap::Error) -> i32 {
    use clap::error::ErrorKind;

    // Help and version go to stdout, other errors to stderr.
    let _ = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        | ErrorKind::DisplayVersion => UnitrunExitCode::OK,
        _ => UnitrunExitCode::SETUP_ERROR,
    }
}
