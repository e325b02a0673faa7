// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, WrapErr, eyre};
use std::{
    sync::{
        Arc, Once,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};
use unitrun_runner::{
    cancellation_requested,
    config::UnitrunConfig,
    registry::Registry,
    reporter::events::{ExecutionOutcome, RunStats, TestEvent, TestEventKind, UnitStatus},
    runner::TestRunnerBuilder,
};

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Another test binary setup may have installed a hook already.
        _ = color_eyre::install();
    });
}

/// Sleeps for `duration`, returning early once the unit has been timed out.
pub(crate) fn cooperative_sleep(duration: Duration) {
    let deadline = Instant::now() + duration;
    while !cancellation_requested() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::park_timeout(deadline - now);
    }
}

/// Counts how many times a unit body was invoked.
#[derive(Clone, Debug, Default)]
pub(crate) struct InvocationCounter(Arc<AtomicUsize>);

impl InvocationCounter {
    pub(crate) fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// An owned summary of a test event, so it can outlive the registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum RecordedEvent {
    RunStarted,
    Skipped(String),
    Started(String),
    Finished(String, ExecutionOutcome),
    RunFinished(RunStats),
}

impl RecordedEvent {
    pub(crate) fn from_event(event: TestEvent<'_>) -> Self {
        match event.kind {
            TestEventKind::RunStarted { .. } => Self::RunStarted,
            TestEventKind::TestSkipped { test_instance } => {
                Self::Skipped(test_instance.name().to_owned())
            }
            TestEventKind::TestStarted { test_instance, .. } => {
                Self::Started(test_instance.name().to_owned())
            }
            TestEventKind::TestFinished {
                test_instance,
                outcome,
                ..
            } => Self::Finished(test_instance.name().to_owned(), outcome),
            TestEventKind::RunFinished { run_stats, .. } => Self::RunFinished(run_stats),
        }
    }

    /// Returns the status tag and name the reporter would print for this event.
    pub(crate) fn status_line(&self) -> Option<String> {
        match self {
            Self::Skipped(name) => Some(format!("skip {name}")),
            Self::Finished(name, outcome) => {
                let tag = match outcome.status() {
                    UnitStatus::Skipped => "skip",
                    UnitStatus::Passed => "pass",
                    UnitStatus::Failed => "fail",
                };
                Some(format!("{tag} {name}"))
            }
            Self::RunStarted | Self::Started(_) | Self::RunFinished(_) => None,
        }
    }
}

/// The result of a run: statistics and every recorded event, in order.
#[derive(Debug)]
pub(crate) struct RunResult {
    pub(crate) run_stats: RunStats,
    pub(crate) events: Vec<RecordedEvent>,
}

impl RunResult {
    pub(crate) fn outcome(&self, name: &str) -> &ExecutionOutcome {
        self.events
            .iter()
            .find_map(|event| match event {
                RecordedEvent::Finished(n, outcome) if n == name => Some(outcome),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no outcome recorded for {name}"))
    }

    pub(crate) fn status_lines(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(RecordedEvent::status_line)
            .collect()
    }
}

pub(crate) fn load_config() -> Result<(Utf8TempDir, UnitrunConfig)> {
    let workspace_dir = camino_tempfile::tempdir().wrap_err("failed to create temp dir")?;
    let config = UnitrunConfig::from_sources(workspace_dir.path(), None)?;
    Ok((workspace_dir, config))
}

/// Runs every unit in `registry` matching `pattern`, recording each event.
pub(crate) fn run_registry(
    registry: &Registry,
    pattern: &str,
    configure: impl FnOnce(&mut TestRunnerBuilder),
) -> Result<RunResult> {
    let (_workspace_dir, config) = load_config()?;
    let profile = config.profile(UnitrunConfig::DEFAULT_PROFILE)?;
    let test_list = registry.select(pattern);

    let mut builder = TestRunnerBuilder::default();
    configure(&mut builder);
    let runner = builder.build(&test_list, &profile)?;

    let mut events = Vec::new();
    let run_stats = runner
        .execute(|event| events.push(RecordedEvent::from_event(event)))
        .map_err(|errors| eyre!("run failed: {errors}"))?;

    Ok(RunResult { run_stats, events })
}
