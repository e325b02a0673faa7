// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{DispatcherContext, ExecutorContext, ExecutorEvent};
use crate::{
    config::{RunnerProfile, TestThreads},
    errors::{EngineFault, TestRunnerBuildError, TestRunnerExecuteErrors},
    registry::TestList,
    reporter::events::{RunStats, TestEvent},
};
use async_scoped::TokioScope;
use futures::prelude::*;
use std::{
    convert::Infallible,
    fmt,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tokio::{
    runtime::Runtime,
    sync::{mpsc::unbounded_channel, oneshot},
};
use tracing::debug;

/// Test runner options.
#[derive(Debug, Default)]
pub struct TestRunnerBuilder {
    test_threads: Option<TestThreads>,
    default_timeout: Option<Duration>,
    suppress_timeouts: Option<bool>,
}

impl TestRunnerBuilder {
    /// Sets the number of units to run simultaneously.
    pub fn set_test_threads(&mut self, test_threads: TestThreads) -> &mut Self {
        self.test_threads = Some(test_threads);
        self
    }

    /// Sets the time budget for units that don't specify their own timeout.
    pub fn set_default_timeout(&mut self, default_timeout: Duration) -> &mut Self {
        self.default_timeout = Some(default_timeout);
        self
    }

    /// If true, units always run to completion and are never timed out.
    ///
    /// This is meant for runs under a debugger, where a breakpoint would otherwise cause the
    /// unit to time out.
    pub fn set_suppress_timeouts(&mut self, suppress_timeouts: bool) -> &mut Self {
        self.suppress_timeouts = Some(suppress_timeouts);
        self
    }

    /// Creates a new test runner.
    ///
    /// Settings not set on this builder are taken from `profile`.
    pub fn build<'a>(
        self,
        test_list: &'a TestList<'a>,
        profile: &RunnerProfile<'_>,
    ) -> Result<TestRunner<'a>, TestRunnerBuildError> {
        // At least one unit must be able to run.
        let test_threads = self
            .test_threads
            .unwrap_or_else(|| profile.test_threads())
            .compute()
            .max(1);
        let default_timeout = self
            .default_timeout
            .unwrap_or_else(|| profile.default_timeout());
        let suppress_timeouts = self
            .suppress_timeouts
            .unwrap_or_else(|| profile.suppress_timeouts());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("unitrun-runner-worker")
            .build()
            .map_err(TestRunnerBuildError::TokioRuntimeCreate)?;

        Ok(TestRunner {
            inner: TestRunnerInner {
                profile_name: profile.name().to_owned(),
                test_threads,
                executor: ExecutorContext::new(default_timeout, suppress_timeouts),
                test_list,
                runtime,
            },
        })
    }
}

/// Context for running units.
///
/// Created using [`TestRunnerBuilder::build`].
#[derive(Debug)]
pub struct TestRunner<'a> {
    inner: TestRunnerInner<'a>,
}

impl<'a> TestRunner<'a> {
    /// Returns the number of units that may run at the same time.
    pub fn test_threads(&self) -> usize {
        self.inner.test_threads
    }

    /// Executes the listed units, each one on its own worker thread.
    ///
    /// The callback is called with each test event. Skipped units are reported first, passing
    /// units as soon as they finish, and failing units once every unit has finished.
    ///
    /// Returns an error if the engine itself failed.
    pub fn execute<F>(
        self,
        mut callback: F,
    ) -> Result<RunStats, TestRunnerExecuteErrors<Infallible>>
    where
        F: FnMut(TestEvent<'a>) + Send,
    {
        self.try_execute::<Infallible, _>(|test_event| {
            callback(test_event);
            Ok(())
        })
    }

    /// Executes the listed units, each one on its own worker thread.
    ///
    /// Accepts a callback that is called with each test event. If the callback returns an error,
    /// no further units are started and the first error is returned once the units already
    /// running have finished.
    ///
    /// Returns an error if the callback failed, or if the engine itself failed.
    pub fn try_execute<E, F>(
        self,
        mut callback: F,
    ) -> Result<RunStats, TestRunnerExecuteErrors<E>>
    where
        F: FnMut(TestEvent<'a>) -> Result<(), E> + Send,
        E: fmt::Debug + Send,
    {
        let (report_cancel_tx, report_cancel_rx) = oneshot::channel();

        // If report_cancel_tx is None, at least one error has occurred and the
        // runner has been instructed to shut down. first_error is also set to
        // Some in that case.
        let mut report_cancel_tx = Some(report_cancel_tx);
        let mut first_error = None;

        let res = self.inner.execute(report_cancel_rx, |event| {
            match callback(event) {
                Ok(()) => {}
                Err(error) => {
                    // If the callback fails, we need to let the runner know to start shutting
                    // down. But we keep reporting results in case the callback starts working
                    // again.
                    if let Some(report_cancel_tx) = report_cancel_tx.take() {
                        let _ = report_cancel_tx.send(());
                        first_error = Some(error);
                    }
                }
            }
        });

        // Worker threads of timed out units may still be running. Shut the runtime down without
        // waiting for them.
        self.inner.runtime.shutdown_background();

        match (res, first_error) {
            (Ok(run_stats), None) => Ok(run_stats),
            (res, report_error) => Err(TestRunnerExecuteErrors {
                report_error,
                engine_fault: res.err(),
            }),
        }
    }
}

#[derive(Debug)]
struct TestRunnerInner<'a> {
    profile_name: String,
    test_threads: usize,
    executor: ExecutorContext,
    test_list: &'a TestList<'a>,
    runtime: Runtime,
}

impl<'a> TestRunnerInner<'a> {
    fn execute<F>(
        &self,
        report_cancel_rx: oneshot::Receiver<()>,
        callback: F,
    ) -> Result<RunStats, EngineFault>
    where
        F: FnMut(TestEvent<'a>) + Send,
    {
        let cancelled = AtomicBool::new(false);
        let cancelled_ref = &cancelled;

        let mut dispatcher_cx = DispatcherContext::new(
            callback,
            &self.profile_name,
            self.test_threads,
            self.test_list.run_count(),
        );

        // Send the initial event, followed by every skipped unit in list order.
        dispatcher_cx.run_started(self.test_list);
        for test_instance in self.test_list.iter() {
            if test_instance.unit.is_skipped() {
                dispatcher_cx.test_skipped(test_instance);
            }
        }

        let dispatcher_cx_mut = &mut dispatcher_cx;

        let _guard = self.runtime.enter();

        let ((), results) = TokioScope::scope_and_block(move |scope| {
            let (resp_tx, resp_rx) = unbounded_channel::<ExecutorEvent<'a>>();

            // Run the dispatcher to completion in a task.
            let dispatcher_fut = dispatcher_cx_mut.run(resp_rx, report_cancel_rx, cancelled_ref);
            scope.spawn_cancellable(dispatcher_fut, || ());

            let run_fut = futures::stream::iter(
                self.test_list
                    .iter()
                    .filter(|test_instance| !test_instance.unit.is_skipped()),
            )
            .map(move |test_instance| {
                let this_resp_tx = resp_tx.clone();
                async move {
                    if cancelled_ref.load(Ordering::Acquire) {
                        // Check for test cancellation.
                        debug!(test_name = test_instance.name(), "run cancelled, not starting");
                        return;
                    }
                    let flow = self
                        .executor
                        .run_test_instance(test_instance, this_resp_tx)
                        .await;
                    if flow.is_break() {
                        // Stop starting units without waiting for the dispatcher.
                        cancelled_ref.store(true, Ordering::Release);
                    }
                }
            })
            // buffer_unordered means units are started in order but finish in any order.
            .buffer_unordered(self.test_threads)
            .collect::<()>();

            // Run the stream to completion.
            scope.spawn_cancellable(run_fut, || ());
        });

        dispatcher_cx.run_finished();

        for result in results {
            if let Err(join_error) = result {
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
                debug!(%join_error, "runner task did not complete");
            }
        }

        match dispatcher_cx.take_engine_fault() {
            Some(fault) => Err(fault),
            None => Ok(dispatcher_cx.run_stats()),
        }
    }
}
