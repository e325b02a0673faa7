// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A demonstration harness with a fixed set of units.
//!
//! Setting `UNITRUN_DEMO_FAIL_LOAD` makes loading fail, and setting `UNITRUN_DEMO_ABORT` registers
//! a unit that aborts the run.

use color_eyre::{Result, eyre::bail};
use std::{
    thread,
    time::{Duration, Instant},
};
use unitrun_runner::{
    abort_run, cancellation_requested,
    registry::Registry,
    unit::{TestUnit, UnitError, UnitGroup, UnitResult, UnitSettings},
};

fn main() -> Result<()> {
    color_eyre::install()?;
    unitrun::main_with(load_units)
}

fn load_units() -> Result<Registry> {
    if std::env::var_os("UNITRUN_DEMO_FAIL_LOAD").is_some() {
        bail!("unit manifest not found");
    }

    let mut registry = Registry::new();
    register_unit_test_test(&mut registry);
    register_ab(&mut registry);
    if std::env::var_os("UNITRUN_DEMO_ABORT").is_some() {
        registry.register(TestUnit::new("Abort.database", || -> UnitResult {
            abort_run("database is unreachable")
        }));
    }
    Ok(registry)
}

fn register_unit_test_test(registry: &mut Registry) {
    let group = UnitGroup::new("UnitTestTest");

    registry
        .register_in(
            &group,
            TestUnit::with_settings(
                "simplePass",
                described("a unit that returns normally passes"),
                || {},
            ),
        )
        .register_in(
            &group,
            TestUnit::with_settings(
                "assertionFails",
                described("a failed assertion is reported with its message"),
                || assert_eq!(2 + 2, 5, "arithmetic still works"),
            ),
        )
        .register_in(
            &group,
            TestUnit::new("runtimeError", || -> UnitResult {
                let port: u16 = "http".parse()?;
                if port == 0 {
                    return Err(UnitError::msg("port must be nonzero"));
                }
                Ok(())
            }),
        );

    let mut sleeper = described("long running units are timed out");
    sleeper.set_timeout(Duration::from_millis(50));
    registry.register_in(
        &group,
        TestUnit::with_settings("sleeper", sleeper, || {
            cooperative_sleep(Duration::from_secs(5))
        }),
    );

    let mut budgeted = described("a unit timeout overrides the default");
    budgeted.set_timeout(Duration::from_millis(200));
    registry.register_in(
        &group,
        TestUnit::with_settings("budgeted", budgeted, || {
            thread::sleep(Duration::from_millis(10))
        }),
    );

    let mut skipped = UnitSettings::new();
    skipped.set_skip(true);
    registry.register_in(
        &group,
        TestUnit::with_settings("skippedMethod", skipped, || -> UnitResult {
            panic!("skipped units never run")
        }),
    );

    let mut inner = group.child("Inner");
    inner.set_skip(true);
    registry.register_in(
        &inner,
        TestUnit::new("skippedInner", || -> UnitResult {
            panic!("units in skipped groups never run")
        }),
    );

    let mut infinite = UnitSettings::new();
    infinite.set_timeout(Duration::from_millis(10));
    for i in 1..=8 {
        let unit = TestUnit::with_settings(
            format!("infiniteLoop{i}"),
            infinite.clone(),
            || -> UnitResult {
                // Never cooperates. The thread is left behind until the process exits.
                loop {
                    thread::park_timeout(Duration::from_millis(1));
                }
            },
        );
        registry.register_in(&group, unit);
    }
}

fn register_ab(registry: &mut Registry) {
    let group = UnitGroup::new("Demo");
    let mut one_ms = UnitSettings::new();
    one_ms.set_timeout(Duration::from_millis(1));

    registry
        .register_in(&group, TestUnit::new("A", || {}))
        .register_in(
            &group,
            TestUnit::with_settings("B", one_ms, || {
                cooperative_sleep(Duration::from_millis(500))
            }),
        );
}

fn described(description: &str) -> UnitSettings {
    let mut settings = UnitSettings::new();
    settings.set_description(description);
    settings
}

fn cooperative_sleep(duration: Duration) {
    let deadline = Instant::now() + duration;
    while !cancellation_requested() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::park_timeout(deadline - now);
    }
}
