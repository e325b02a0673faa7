// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use std::{
    thread,
    time::{Duration, Instant},
};
use unitrun_runner::{
    abort_run,
    config::{TestThreads, UnitrunConfig},
    errors::EngineFault,
    reporter::events::{ExecutionResult, FailureKind, TestEventKind, UnitStatus},
    registry::Registry,
    runner::TestRunnerBuilder,
    unit::{TestUnit, UnitError, UnitGroup, UnitResult, UnitSettings},
};

#[test]
fn skipped_units_are_never_invoked() -> Result<()> {
    test_init();

    let counter = InvocationCounter::default();
    let mut registry = Registry::new();

    let mut settings = UnitSettings::new();
    settings.set_skip(true);
    let c = counter.clone();
    registry.register(TestUnit::with_settings("Units.explicit", settings, move || {
        c.hit()
    }));

    let mut group = UnitGroup::new("Skipped");
    group.set_skip(true);
    let c = counter.clone();
    registry.register_in(&group, TestUnit::new("inherited", move || c.hit()));
    registry.register(TestUnit::new("Units.runs", || {}));

    let result = run_registry(&registry, "", |_| {})?;

    assert_eq!(counter.count(), 0, "skipped bodies were never invoked");
    assert_eq!(
        result.events[..3],
        [
            RecordedEvent::RunStarted,
            RecordedEvent::Skipped("Units.explicit".to_owned()),
            RecordedEvent::Skipped("Skipped.inherited".to_owned()),
        ],
        "skipped units are reported first, in list order"
    );
    assert_eq!(result.run_stats.skipped, 2);
    assert_eq!(result.run_stats.passed(), 1);
    assert!(result.run_stats.is_success());
    Ok(())
}

#[test]
fn unit_within_budget_passes() -> Result<()> {
    test_init();

    let mut registry = Registry::new();
    registry.register(TestUnit::new("Units.quick", || {
        thread::sleep(Duration::from_millis(10))
    }));

    let result = run_registry(&registry, "", |builder| {
        builder.set_default_timeout(Duration::from_secs(10));
    })?;

    let outcome = result.outcome("Units.quick");
    assert_eq!(outcome.result, ExecutionResult::Pass);
    assert!(outcome.is_finished());
    assert!(outcome.time_taken.unwrap() >= Duration::from_millis(10));
    Ok(())
}

#[test]
fn unit_over_budget_times_out() -> Result<()> {
    test_init();

    let timeout = Duration::from_millis(20);
    let mut registry = Registry::new();
    registry.register(TestUnit::new("Units.slow", || {
        cooperative_sleep(Duration::from_secs(30))
    }));

    let result = run_registry(&registry, "", |builder| {
        builder.set_default_timeout(timeout);
    })?;

    let outcome = result.outcome("Units.slow");
    assert_eq!(
        outcome.result,
        ExecutionResult::Fail(FailureKind::TimedOut { timeout })
    );
    let time_taken = outcome.time_taken.unwrap();
    ensure!(
        time_taken >= timeout,
        "time taken {time_taken:?} is at least the timeout {timeout:?}"
    );
    assert_eq!(result.run_stats.timed_out, 1);
    Ok(())
}

#[test]
fn unit_timeout_overrides_default() -> Result<()> {
    test_init();

    let mut settings = UnitSettings::new();
    settings.set_timeout(Duration::from_millis(500));
    let mut registry = Registry::new();
    registry.register(TestUnit::with_settings("Units.budgeted", settings, || {
        thread::sleep(Duration::from_millis(10))
    }));

    let result = run_registry(&registry, "", |builder| {
        builder.set_default_timeout(Duration::from_millis(1));
    })?;

    assert_eq!(result.outcome("Units.budgeted").result, ExecutionResult::Pass);
    Ok(())
}

#[test]
fn pattern_selects_matching_units() -> Result<()> {
    test_init();

    let counter = InvocationCounter::default();
    let mut registry = Registry::new();
    let group = UnitGroup::new("UnitTestTest");
    for name in ["simplePass", "otherPass"] {
        let c = counter.clone();
        registry.register_in(&group, TestUnit::new(name, move || c.hit()));
    }
    let c = counter.clone();
    registry.register(TestUnit::new("Elsewhere.simplePass", move || c.hit()));

    let result = run_registry(&registry, "UnitTestTest.simple", |_| {})?;

    assert_eq!(counter.count(), 1, "only the matching unit ran");
    assert_eq!(result.status_lines(), ["pass UnitTestTest.simplePass"]);
    Ok(())
}

#[test]
fn many_concurrent_overruns_all_finish() -> Result<()> {
    test_init();

    const COUNT: usize = 8;
    let timeout = Duration::from_millis(50);
    let mut registry = Registry::new();
    for i in 0..COUNT {
        registry.register(TestUnit::new(format!("Overruns.unit{i}"), || {
            // Does not cooperate with cancellation.
            thread::sleep(Duration::from_secs(3))
        }));
    }

    let start = Instant::now();
    let result = run_registry(&registry, "", |builder| {
        builder
            .set_test_threads(TestThreads::Count(COUNT))
            .set_default_timeout(timeout);
    })?;
    let elapsed = start.elapsed();

    ensure!(
        elapsed < Duration::from_secs(3),
        "the run did not wait for abandoned workers (took {elapsed:?})"
    );
    assert_eq!(result.run_stats.finished_count, COUNT);
    assert_eq!(result.run_stats.timed_out, COUNT);
    for i in 0..COUNT {
        let outcome = result.outcome(&format!("Overruns.unit{i}"));
        assert_eq!(
            outcome.result,
            ExecutionResult::Fail(FailureKind::TimedOut { timeout })
        );
    }
    Ok(())
}

#[test]
fn failures_are_reported_after_passes() -> Result<()> {
    test_init();

    let mut registry = Registry::new();
    let group = UnitGroup::new("Ordering");
    registry
        .register_in(
            &group,
            TestUnit::new("failsFirst", || assert_eq!(1 + 1, 3, "math is broken")),
        )
        .register_in(
            &group,
            TestUnit::new("errors", || -> UnitResult {
                Err(UnitError::msg("connection refused"))
            }),
        )
        .register_in(
            &group,
            TestUnit::new("passesLater", || thread::sleep(Duration::from_millis(50))),
        );

    let result = run_registry(&registry, "", |builder| {
        builder.set_test_threads(TestThreads::Count(3));
    })?;

    let lines = result.status_lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "pass Ordering.passesLater", "passes come first");
    assert!(
        lines[1..].iter().all(|line| line.starts_with("fail ")),
        "failures come last: {lines:?}"
    );
    assert!(
        matches!(result.events.last(), Some(RecordedEvent::RunFinished(_))),
        "summary is last"
    );

    let Some(FailureKind::AssertionFailed { message, location }) =
        result.outcome("Ordering.failsFirst").failure()
    else {
        panic!("expected an assertion failure");
    };
    assert!(
        message.as_deref().unwrap_or_default().contains("math is broken"),
        "message: {message:?}"
    );
    assert_eq!(location.as_ref().map(|l| l.file()), Some(file!()));

    let Some(FailureKind::RuntimeError { description, .. }) =
        result.outcome("Ordering.errors").failure()
    else {
        panic!("expected a runtime error");
    };
    assert_eq!(description, "connection refused");

    assert_eq!(result.run_stats.total(), 3);
    assert_eq!(result.run_stats.failed, 2);
    assert_eq!(result.run_stats.passed(), 1);
    Ok(())
}

#[test]
fn abort_run_stops_the_run() -> Result<()> {
    test_init();

    let counter = InvocationCounter::default();
    let mut registry = Registry::new();
    registry.register(TestUnit::new("Setup.database", || -> UnitResult {
        abort_run("database is unreachable")
    }));
    for i in 0..4 {
        let c = counter.clone();
        registry.register(TestUnit::new(format!("Later.unit{i}"), move || c.hit()));
    }

    let (_workspace_dir, config) = load_config()?;
    let profile = config.profile(UnitrunConfig::DEFAULT_PROFILE)?;
    let test_list = registry.select("");
    let mut builder = TestRunnerBuilder::default();
    builder.set_test_threads(TestThreads::Count(1));
    let runner = builder.build(&test_list, &profile)?;

    let mut finished = 0;
    let errors = runner
        .execute(|event| {
            if let TestEventKind::RunFinished { .. } = event.kind {
                finished += 1;
            }
        })
        .expect_err("engine fault is returned");

    assert!(errors.report_error.is_none());
    let Some(EngineFault::Aborted { unit_name, reason }) = &errors.engine_fault else {
        panic!("expected an abort, found {:?}", errors.engine_fault);
    };
    assert_eq!(unit_name, "Setup.database");
    assert_eq!(reason, "database is unreachable");
    assert_eq!(counter.count(), 0, "no unit started after the abort");
    assert_eq!(finished, 1, "the run still finishes");
    Ok(())
}

#[test]
fn callback_error_stops_starting_units() -> Result<()> {
    test_init();

    const COUNT: usize = 10;
    let counter = InvocationCounter::default();
    let mut registry = Registry::new();
    for i in 0..COUNT {
        let c = counter.clone();
        registry.register(TestUnit::new(format!("Units.unit{i}"), move || {
            c.hit();
            thread::sleep(Duration::from_millis(10));
        }));
    }

    let (_workspace_dir, config) = load_config()?;
    let profile = config.profile(UnitrunConfig::DEFAULT_PROFILE)?;
    let test_list = registry.select("");
    let mut builder = TestRunnerBuilder::default();
    builder.set_test_threads(TestThreads::Count(1));
    let runner = builder.build(&test_list, &profile)?;

    let errors = runner
        .try_execute(|event| match event.kind {
            TestEventKind::TestFinished { .. } => Err(std::io::Error::other("output closed")),
            _ => Ok(()),
        })
        .expect_err("callback error is returned");

    assert_eq!(
        errors.report_error.map(|error| error.to_string()),
        Some("output closed".to_owned())
    );
    assert!(errors.engine_fault.is_none());
    ensure!(
        counter.count() < COUNT,
        "some units were never started ({} of {COUNT} ran)",
        counter.count()
    );
    Ok(())
}

#[test]
fn unit_status_counts_are_consistent() -> Result<()> {
    test_init();

    let mut settings = UnitSettings::new();
    settings.set_skip(true);
    let mut registry = Registry::new();
    registry
        .register(TestUnit::new("Mixed.pass", || {}))
        .register(TestUnit::with_settings("Mixed.skip", settings, || {}))
        .register(TestUnit::new("Mixed.fail", || -> UnitResult {
            Err(UnitError::msg("nope"))
        }));

    let result = run_registry(&registry, "", |_| {})?;

    let statuses: Vec<_> = ["Mixed.pass", "Mixed.fail"]
        .iter()
        .map(|name| result.outcome(name).status())
        .collect();
    assert_eq!(statuses, [UnitStatus::Passed, UnitStatus::Failed]);

    let stats = result.run_stats;
    assert_eq!(stats.total(), 3);
    assert_eq!(stats.passed(), stats.total() - stats.failed - stats.skipped);
    Ok(())
}
