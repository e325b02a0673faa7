// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The controller for the test runner.
//!
//! This module interfaces with the reporter callback and the executor. It receives events from
//! the executor, decides the order in which outcomes are reported, and sends events to the
//! callback.

use super::internal_events::{ExecutorEvent, InternalEvent};
use crate::{
    errors::EngineFault,
    registry::{TestInstance, TestList},
    reporter::events::{ExecutionOutcome, RunStats, TestEvent, TestEventKind},
    time::StopwatchStart,
};
use chrono::Local;
use debug_ignore::DebugIgnore;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc::UnboundedReceiver, oneshot};
use tracing::debug;

/// Context for the dispatcher.
///
/// This struct is responsible for coordinating events between the executor and the reporter
/// callback.
#[derive_where::derive_where(Debug)]
pub(super) struct DispatcherContext<'a, F> {
    callback: DebugIgnore<F>,
    profile_name: String,
    test_threads: usize,
    stopwatch: StopwatchStart,
    run_stats: RunStats,
    running: usize,
    // Failures are held back until every unit has finished, in completion order.
    deferred_failures: Vec<DeferredFailure<'a>>,
    cancel_state: Option<CancelReason>,
    engine_fault: Option<EngineFault>,
}

impl<'a, F> DispatcherContext<'a, F>
where
    F: FnMut(TestEvent<'a>) + Send,
{
    pub(super) fn new(
        callback: F,
        profile_name: &str,
        test_threads: usize,
        initial_run_count: usize,
    ) -> Self {
        Self {
            callback: DebugIgnore(callback),
            profile_name: profile_name.to_owned(),
            test_threads,
            stopwatch: crate::time::stopwatch(),
            run_stats: RunStats {
                initial_run_count,
                ..RunStats::default()
            },
            running: 0,
            deferred_failures: Vec::new(),
            cancel_state: None,
            engine_fault: None,
        }
    }

    /// Runs the dispatcher to completion, until `executor_rx` is closed.
    ///
    /// Sets `cancelled` once the run should stop starting new units.
    ///
    /// This is expected to be spawned as a task via [`async_scoped`].
    pub(super) async fn run(
        &mut self,
        mut executor_rx: UnboundedReceiver<ExecutorEvent<'a>>,
        report_cancel_rx: oneshot::Receiver<()>,
        cancelled: &AtomicBool,
    ) {
        let mut report_cancel_rx = std::pin::pin!(report_cancel_rx);
        let mut report_cancel_rx_done = false;

        loop {
            let internal_event = tokio::select! {
                internal_event = executor_rx.recv() => {
                    match internal_event {
                        Some(event) => InternalEvent::Executor(event),
                        None => {
                            // All units have been completed.
                            break;
                        }
                    }
                },
                res = &mut report_cancel_rx, if !report_cancel_rx_done => {
                    report_cancel_rx_done = true;
                    match res {
                        Ok(()) => InternalEvent::ReportCancel,
                        Err(_) => {
                            // The sender is kept alive until the end of the run, so this only
                            // happens around shutdown.
                            debug!("report_cancel_rx was dropped early");
                            continue;
                        }
                    }
                }
            };

            match self.handle_event(internal_event) {
                HandleEventResponse::Cancel(reason) => {
                    debug!(?reason, "cancelling run: no further units will be started");
                    cancelled.store(true, Ordering::Release);
                }
                HandleEventResponse::None => {}
            }
        }
    }

    pub(super) fn run_started(&mut self, test_list: &'a TestList<'a>) {
        self.basic_callback(TestEventKind::RunStarted {
            test_list,
            profile_name: self.profile_name.clone(),
            test_threads: self.test_threads,
        })
    }

    /// Reports a unit that will never be started.
    pub(super) fn test_skipped(&mut self, test_instance: TestInstance<'a>) {
        self.run_stats.skipped += 1;
        self.basic_callback(TestEventKind::TestSkipped { test_instance })
    }

    #[inline]
    fn basic_callback(&mut self, kind: TestEventKind<'a>) {
        let snapshot = self.stopwatch.snapshot();
        let event = TestEvent {
            timestamp: Local::now().fixed_offset(),
            elapsed: snapshot.duration,
            kind,
        };
        (self.callback)(event)
    }

    fn handle_event(&mut self, event: InternalEvent<'a>) -> HandleEventResponse {
        match event {
            InternalEvent::Executor(ExecutorEvent::Started { test_instance }) => {
                self.running += 1;
                self.basic_callback(TestEventKind::TestStarted {
                    test_instance,
                    running: self.running,
                });
                HandleEventResponse::None
            }
            InternalEvent::Executor(ExecutorEvent::Finished {
                test_instance,
                outcome,
            }) => {
                self.running -= 1;
                self.run_stats.on_test_finished(&outcome);
                debug!(
                    test_name = test_instance.name(),
                    status = ?outcome.status(),
                    "unit finished",
                );

                if outcome.failure().is_some() {
                    self.deferred_failures.push(DeferredFailure {
                        test_instance,
                        outcome,
                        running: self.running,
                    });
                } else {
                    self.basic_callback(TestEventKind::TestFinished {
                        test_instance,
                        outcome,
                        running: self.running,
                    });
                }
                HandleEventResponse::None
            }
            InternalEvent::Executor(ExecutorEvent::EngineFault {
                test_instance,
                fault,
            }) => {
                self.running -= 1;
                debug!(
                    test_name = test_instance.name(),
                    fault = %fault,
                    "engine fault",
                );
                // Only the first fault is returned.
                if self.engine_fault.is_none() {
                    self.engine_fault = Some(fault);
                }
                self.begin_cancel(CancelReason::EngineFault)
            }
            InternalEvent::ReportCancel => self.begin_cancel(CancelReason::ReportError),
        }
    }

    /// Begin cancellation of a test run, if the current cancel state is less than the required
    /// one.
    fn begin_cancel(&mut self, reason: CancelReason) -> HandleEventResponse {
        if self.cancel_state < Some(reason) {
            self.cancel_state = Some(reason);
            HandleEventResponse::Cancel(reason)
        } else {
            HandleEventResponse::None
        }
    }

    /// Reports every deferred failure in completion order, then the run summary.
    pub(super) fn run_finished(&mut self) {
        for failure in std::mem::take(&mut self.deferred_failures) {
            self.basic_callback(TestEventKind::TestFinished {
                test_instance: failure.test_instance,
                outcome: failure.outcome,
                running: failure.running,
            });
        }

        let stopwatch_end = self.stopwatch.snapshot();
        self.basic_callback(TestEventKind::RunFinished {
            start_time: stopwatch_end.start_time.fixed_offset(),
            elapsed: stopwatch_end.duration,
            run_stats: self.run_stats,
        })
    }

    pub(super) fn run_stats(&self) -> RunStats {
        self.run_stats
    }

    pub(super) fn take_engine_fault(&mut self) -> Option<EngineFault> {
        self.engine_fault.take()
    }
}

#[derive(Debug)]
struct DeferredFailure<'a> {
    test_instance: TestInstance<'a>,
    outcome: ExecutionOutcome,
    running: usize,
}

/// The reason a run is being cancelled, in increasing order of severity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
enum CancelReason {
    /// The reporter callback returned an error.
    ReportError,

    /// An executor hit an engine fault.
    EngineFault,
}

#[derive(Debug, Eq, PartialEq)]
enum HandleEventResponse {
    /// Stop starting new units.
    Cancel(CancelReason),

    /// No response.
    None,
}
