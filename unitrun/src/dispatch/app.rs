// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line arguments for a harness binary.

use super::execution::HarnessRun;
use crate::{
    Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::Utf8PathBuf;
use clap::{Args, builder::BoolishValueParser};
use std::time::Duration;
use tracing::debug;
use unitrun_runner::{config::TestThreads, registry::Registry, runner::TestRunnerBuilder};

/// Runs the test units registered with this harness.
///
/// Units run in parallel, each on its own thread, and are timed out if they exceed their time
/// budget. Passing units are printed as they finish and failing units once every unit has
/// finished, followed by a summary line.
#[derive(Debug, clap::Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct HarnessApp {
    /// Run only units whose fully-qualified name contains this pattern
    #[arg(value_name = "PATTERN", default_value = "")]
    pattern: String,

    /// Print the names of the selected units instead of running them
    #[arg(long)]
    list: bool,

    #[clap(flatten)]
    runner: RunnerOpts,

    #[clap(flatten)]
    config: ConfigOpts,

    #[clap(flatten)]
    output: OutputOpts,
}

impl HarnessApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app against the given registry.
    ///
    /// Returns the exit code. A completed run exits with 0 even if some units failed.
    pub fn exec(
        self,
        registry: &Registry,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let pattern = self.pattern.trim();
        debug!(pattern, list = self.list, "executing harness");

        let run = HarnessRun::new(pattern, &self.config, output)?;
        if self.list {
            run.list(registry, output_writer)
        } else {
            run.exec(registry, self.runner.to_builder(), output_writer)
        }
    }
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Runner options")]
pub(super) struct RunnerOpts {
    /// Number of units to run simultaneously [possible values: integer or "num-cpus"]
    /// [default: from profile]
    #[arg(
        long,
        short = 'j',
        visible_alias = "jobs",
        value_name = "N",
        env = "UNITRUN_TEST_THREADS",
        allow_negative_numbers = true
    )]
    test_threads: Option<TestThreads>,

    /// Time budget for units that don't set their own timeout, e.g. "2s" or "500ms"
    /// [default: from profile]
    #[arg(
        long,
        value_name = "DURATION",
        env = "UNITRUN_DEFAULT_TIMEOUT",
        value_parser = humantime::parse_duration
    )]
    default_timeout: Option<Duration>,

    /// Never time out units, for example while a debugger is attached
    #[arg(long, env = "UNITRUN_NO_TIMEOUTS", value_parser = BoolishValueParser::new())]
    no_timeouts: bool,
}

impl RunnerOpts {
    pub(super) fn to_builder(&self) -> TestRunnerBuilder {
        let mut builder = TestRunnerBuilder::default();

        if let Some(test_threads) = self.test_threads {
            builder.set_test_threads(test_threads);
        }
        if let Some(default_timeout) = self.default_timeout {
            builder.set_default_timeout(default_timeout);
        }
        // The flag can only turn timeouts off. Otherwise the profile decides.
        if self.no_timeouts {
            builder.set_suppress_timeouts(true);
        }

        builder
    }
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Config options")]
pub(super) struct ConfigOpts {
    /// Config file [default: .config/unitrun.toml in the current directory]
    #[arg(long, value_name = "PATH")]
    pub(super) config_file: Option<Utf8PathBuf>,

    /// Configuration profile to use [default: "default"]
    #[arg(long, short = 'P', value_name = "PROFILE", env = "UNITRUN_PROFILE")]
    pub(super) profile: Option<String>,
}
