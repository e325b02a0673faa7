// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints out test execution statuses.
//!
//! The main structure in this module is [`Reporter`].

use super::{
    duration::{DisplayMillis, DisplayThousands},
    events::*,
    helpers::Styles,
};
use crate::{
    errors::WriteEventError,
    helpers::plural,
    registry::TestInstance,
};
use indent_write::fmt::IndentWriter;
use owo_colors::{OwoColorize, Style};
use std::{
    fmt::{self, Write as _},
    io::{self, Write},
};
use swrite::{SWrite, swrite, swriteln};

/// Indentation applied to the detail lines below a failed unit.
const DETAIL_INDENT: &str = "       ";

/// Output destination for the reporter.
///
/// This is usually standard output, but can be an in-memory buffer for tests.
pub enum ReporterOutput<'a> {
    /// Produce output on the (possibly piped) standard output.
    Terminal,

    /// Write output to a buffer.
    Buffer(&'a mut Vec<u8>),

    /// Write output to an arbitrary writer.
    Writer(Box<dyn Write + Send + 'a>),
}

/// Test reporter builder.
#[derive(Debug, Default)]
pub struct ReporterBuilder {
    should_colorize: bool,
    verbose: bool,
    search_pattern: Option<String>,
}

impl ReporterBuilder {
    /// Set to true if the reporter should colorize output.
    pub fn set_colorize(&mut self, should_colorize: bool) -> &mut Self {
        self.should_colorize = should_colorize;
        self
    }

    /// Sets verbose output, which adds a header line describing the run.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Sets the search pattern used to select units.
    ///
    /// A non-empty pattern is echoed once, before anything else is printed.
    pub fn set_search_pattern(&mut self, pattern: impl Into<String>) -> &mut Self {
        let pattern = pattern.into();
        self.search_pattern = (!pattern.is_empty()).then_some(pattern);
        self
    }

    /// Creates a new test reporter.
    pub fn build<'a>(&self, output: ReporterOutput<'a>) -> Reporter<'a> {
        let mut styles = Styles::default();
        if self.should_colorize {
            styles.colorize();
        }

        Reporter {
            output,
            styles,
            verbose: self.verbose,
            search_pattern: self.search_pattern.clone(),
        }
    }
}

/// Functionality to report test results to an output sink.
pub struct Reporter<'a> {
    output: ReporterOutput<'a>,
    styles: Styles,
    verbose: bool,
    search_pattern: Option<String>,
}

impl<'a> Reporter<'a> {
    /// Report a test event.
    pub fn report_event(&mut self, event: TestEvent<'a>) -> Result<(), WriteEventError> {
        let mut buf = String::new();
        self.write_event_impl(&event, &mut buf).map_err(WriteEventError::Fmt)?;
        if buf.is_empty() {
            return Ok(());
        }

        match &mut self.output {
            ReporterOutput::Terminal => {
                let mut writer = io::stdout().lock();
                writer
                    .write_all(buf.as_bytes())
                    .and_then(|()| writer.flush())
                    .map_err(WriteEventError::Io)
            }
            ReporterOutput::Buffer(out) => {
                out.extend_from_slice(buf.as_bytes());
                Ok(())
            }
            ReporterOutput::Writer(writer) => writer
                .write_all(buf.as_bytes())
                .and_then(|()| writer.flush())
                .map_err(WriteEventError::Io),
        }
    }

    fn write_event_impl(&self, event: &TestEvent<'a>, buf: &mut String) -> fmt::Result {
        match &event.kind {
            TestEventKind::RunStarted {
                test_list,
                test_threads,
                ..
            } => {
                if let Some(pattern) = &self.search_pattern {
                    swriteln!(buf, "search pattern: {pattern}");
                }
                if self.verbose {
                    let count = test_list.run_count();
                    swrite!(
                        buf,
                        "running {} {} across {} {}",
                        count.style(self.styles.count),
                        plural::tests_str(count),
                        test_threads.style(self.styles.count),
                        plural::threads_str(*test_threads),
                    );
                    let skipped = test_list.skip_count();
                    if skipped > 0 {
                        swrite!(
                            buf,
                            " ({} {} skipped)",
                            skipped.style(self.styles.count),
                            plural::tests_str(skipped),
                        );
                    }
                    buf.push('\n');
                }
            }
            TestEventKind::TestSkipped { test_instance } => {
                self.write_status_line(*test_instance, &ExecutionOutcome::skipped(), buf)?;
            }
            TestEventKind::TestStarted { .. } => {}
            TestEventKind::TestFinished {
                test_instance,
                outcome,
                ..
            } => {
                self.write_status_line(*test_instance, outcome, buf)?;
            }
            TestEventKind::RunFinished { run_stats, .. } => {
                swriteln!(
                    buf,
                    "{} tests, {} skipped, {} passed, {} failed",
                    run_stats.total().style(self.styles.count),
                    run_stats.skipped.style(self.styles.count),
                    run_stats.passed().style(self.styles.count),
                    run_stats.failed.style(self.styles.count),
                );
            }
        }

        Ok(())
    }

    fn write_status_line(
        &self,
        test_instance: TestInstance<'_>,
        outcome: &ExecutionOutcome,
        buf: &mut String,
    ) -> fmt::Result {
        let (tag, style) = self.status_tag(outcome.status());
        swrite!(buf, "[{}] {}", tag.style(style), test_instance.name());
        if let Some(description) = test_instance.unit.description() {
            swrite!(buf, ": {description}");
        }
        swrite!(buf, " ({} ms)", DisplayMillis(outcome.time_taken));

        if let Some(failure) = outcome.failure() {
            write_failure_detail(failure, buf)?;
        }
        buf.push('\n');
        Ok(())
    }

    fn status_tag(&self, status: UnitStatus) -> (&'static str, Style) {
        match status {
            UnitStatus::Skipped => ("skip", self.styles.skip),
            UnitStatus::Passed => ("pass", self.styles.pass),
            UnitStatus::Failed => ("fail", self.styles.fail),
        }
    }
}

/// Writes the indented lines describing `failure`, each preceded by a newline.
///
/// Multi-line messages are indented as a block.
fn write_failure_detail(failure: &FailureKind, buf: &mut String) -> fmt::Result {
    // Empty lines are not indented, so each leading newline passes through as is.
    let mut writer = IndentWriter::new(DETAIL_INDENT, buf);
    match failure {
        FailureKind::TimedOut { timeout } => {
            // Rounded up: a nonzero budget is never shown as 0 ms.
            let millis = timeout.as_nanos().div_ceil(1_000_000);
            write!(
                writer,
                "\ntest case timed out after {} ms",
                DisplayThousands(millis),
            )?;
        }
        FailureKind::AssertionFailed { message, .. } => {
            write!(writer, "\nassertion failed")?;
            if let Some(message) = message {
                write!(writer, ": {message}")?;
            }
        }
        FailureKind::RuntimeError { description, .. } => {
            write!(writer, "\n{description}")?;
        }
    }

    if let Some(location) = failure.location() {
        write!(writer, "\nat {location}")?;
    }
    Ok(())
}
