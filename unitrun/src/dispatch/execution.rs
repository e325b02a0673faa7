// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listing and running the units selected by a harness invocation.

use super::app::ConfigOpts;
use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputWriter},
};
use camino::Utf8PathBuf;
use std::io::Write;
use tracing::{debug, info};
use unitrun_metadata::UnitrunExitCode;
use unitrun_runner::{
    config::UnitrunConfig,
    registry::Registry,
    reporter::ReporterBuilder,
    runner::TestRunnerBuilder,
};

/// State shared by listing and running: the selection pattern and the resolved config.
pub(super) struct HarnessRun<'a> {
    pattern: &'a str,
    config: UnitrunConfig,
    profile_name: &'a str,
    output: OutputContext,
}

impl<'a> HarnessRun<'a> {
    pub(super) fn new(
        pattern: &'a str,
        config_opts: &'a ConfigOpts,
        output: OutputContext,
    ) -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(ExpectedError::current_dir_failed)?;
        let workspace_root =
            Utf8PathBuf::try_from(current_dir).map_err(ExpectedError::current_dir_invalid_utf8)?;

        let config =
            UnitrunConfig::from_sources(workspace_root, config_opts.config_file.as_deref())?;
        let profile_name = config_opts
            .profile
            .as_deref()
            .unwrap_or(UnitrunConfig::DEFAULT_PROFILE);

        Ok(Self {
            pattern,
            config,
            profile_name,
            output,
        })
    }

    /// Prints the fully-qualified name of every selected unit, one per line.
    pub(super) fn list(self, registry: &Registry, output_writer: &mut OutputWriter) -> Result<i32> {
        // Validate the profile even though nothing runs.
        self.config.profile(self.profile_name)?;
        let test_list = registry.select(self.pattern);

        let mut writer = output_writer.stdout_writer();
        for test_instance in test_list.iter() {
            let suffix = if test_instance.unit.is_skipped() {
                " (skipped)"
            } else {
                ""
            };
            writeln!(writer, "{}{suffix}", test_instance.name())
                .map_err(ExpectedError::write_test_list_error)?;
        }
        writer
            .flush()
            .map_err(ExpectedError::write_test_list_error)?;

        Ok(UnitrunExitCode::OK)
    }

    /// Runs every selected unit, reporting results to stdout.
    pub(super) fn exec(
        self,
        registry: &Registry,
        runner_builder: TestRunnerBuilder,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let profile = self.config.profile(self.profile_name)?;
        let test_list = registry.select(self.pattern);
        if test_list.is_empty() {
            info!("no units match the pattern `{}`", self.pattern);
        }

        let should_colorize = self
            .output
            .color
            .should_colorize(supports_color::Stream::Stdout);
        let mut reporter_builder = ReporterBuilder::default();
        reporter_builder
            .set_colorize(should_colorize)
            .set_verbose(self.output.verbose)
            .set_search_pattern(self.pattern);

        let runner = runner_builder.build(&test_list, &profile)?;
        let mut reporter = reporter_builder.build(output_writer.reporter_output());

        let run_stats = runner
            .try_execute(|event| reporter.report_event(event))
            .map_err(ExpectedError::test_run_failed)?;
        debug!(?run_stats, "run finished");

        // Failing units don't affect the exit code.
        Ok(UnitrunExitCode::OK)
    }
}
