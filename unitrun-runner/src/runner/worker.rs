// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker threads that run unit bodies.
//!
//! Each unit body runs on its own detached OS thread. The outcome is sent back over a oneshot
//! channel, so the executor never shares mutable state with a worker.

use crate::{
    helpers::panic_payload_message,
    reporter::events::FailureKind,
    unit::{SourceLocation, UnitBody},
};
use std::{
    any::Any,
    cell::RefCell,
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Once,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};
use tokio::sync::oneshot;

thread_local! {
    // Set for the duration of a unit body, on worker threads only.
    static WORKER_STATE: RefCell<Option<WorkerState>> = const { RefCell::new(None) };
}

static INSTALL_PANIC_HOOK: Once = Once::new();

// `assert!` panics with this prefix followed by the stringified condition.
const ASSERTION_FAILED_PREFIX: &str = "assertion failed: ";

// `assert_eq!` and `assert_ne!` panic with "assertion `left == right` failed", then either the
// custom message after ": " or nothing, then the left and right lines.
const COMPARISON_PREFIX: &str = "assertion `";
const COMPARISON_SUFFIX: &str = "` failed";

#[derive(Debug)]
struct WorkerState {
    cancel: Arc<AtomicBool>,
    panic_location: Option<SourceLocation>,
}

/// The result reported by a worker thread once its unit body returns or unwinds.
#[derive(Debug)]
pub(super) enum WorkerResult {
    Passed,
    Failed(FailureKind),
    Aborted { reason: String },
}

/// Payload used to unwind out of a unit body and abort the whole run.
struct EngineAbort {
    reason: String,
}

/// Aborts the whole test run from within a unit body.
///
/// This is not a test failure: the runner stops starting new units and returns an engine fault
/// naming this unit and `reason`. Units already running are allowed to settle.
///
/// This unwinds without invoking the panic hook. Called outside a unit body, it unwinds the
/// current thread like any other panic.
pub fn abort_run(reason: impl Into<String>) -> ! {
    panic::resume_unwind(Box::new(EngineAbort {
        reason: reason.into(),
    }))
}

/// Returns true if the currently running unit has been asked to stop.
///
/// This becomes true once the unit's timeout has elapsed. Long-running bodies can poll this to
/// exit early; waits through [`std::thread::park_timeout`] are woken up when it changes.
///
/// Always returns false outside a unit body.
pub fn cancellation_requested() -> bool {
    WORKER_STATE.with(|state| {
        state
            .try_borrow()
            .ok()
            .and_then(|state| {
                state
                    .as_ref()
                    .map(|state| state.cancel.load(Ordering::Acquire))
            })
            .unwrap_or(false)
    })
}

/// Spawns a detached worker thread running `body`.
///
/// The returned receiver yields exactly one result, unless the thread dies without reporting
/// one.
pub(super) fn spawn_worker(
    unit_name: &str,
    body: UnitBody,
    cancel: Arc<AtomicBool>,
) -> io::Result<(JoinHandle<()>, oneshot::Receiver<WorkerResult>)> {
    install_panic_hook();

    let (tx, rx) = oneshot::channel();
    let handle = thread::Builder::new()
        .name(worker_thread_name(unit_name))
        .spawn(move || {
            let result = run_body(&body, cancel);
            // The receiver is gone if the unit timed out.
            _ = tx.send(result);
        })?;

    Ok((handle, rx))
}

fn run_body(body: &UnitBody, cancel: Arc<AtomicBool>) -> WorkerResult {
    WORKER_STATE.with(|state| {
        *state.borrow_mut() = Some(WorkerState {
            cancel,
            panic_location: None,
        });
    });

    let result = panic::catch_unwind(AssertUnwindSafe(|| body()));

    let panic_location = WORKER_STATE
        .with(|state| state.borrow_mut().take())
        .and_then(|state| state.panic_location);

    match result {
        Ok(Ok(())) => WorkerResult::Passed,
        Ok(Err(error)) => WorkerResult::Failed(FailureKind::RuntimeError {
            description: error.description(),
            location: Some(error.location().clone()),
        }),
        Err(payload) => classify_panic(payload, panic_location),
    }
}

fn classify_panic(
    payload: Box<dyn Any + Send>,
    location: Option<SourceLocation>,
) -> WorkerResult {
    match payload.downcast::<EngineAbort>() {
        Ok(abort) => WorkerResult::Aborted {
            reason: abort.reason,
        },
        Err(payload) => {
            let failure = match panic_payload_message(&*payload) {
                Some(message) => match assertion_message(&message) {
                    Some(message) => FailureKind::AssertionFailed {
                        message: Some(message),
                        location,
                    },
                    None => FailureKind::RuntimeError {
                        description: message,
                        location,
                    },
                },
                None => FailureKind::RuntimeError {
                    description: "panicked with a non-string payload".to_owned(),
                    location,
                },
            };
            WorkerResult::Failed(failure)
        }
    }
}

/// Returns the assertion message if `message` was produced by the `assert!` family, with the
/// standard prefix removed.
///
/// `assert!` with a custom message panics with just that message, so it is indistinguishable from
/// `panic!` and classified as a runtime error.
fn assertion_message(message: &str) -> Option<String> {
    if let Some(condition) = message.strip_prefix(ASSERTION_FAILED_PREFIX) {
        return Some(condition.to_owned());
    }

    let rest = message.strip_prefix(COMPARISON_PREFIX)?;
    let (comparison, rest) = rest.split_once(COMPARISON_SUFFIX)?;
    match rest.strip_prefix(": ") {
        Some(custom) => Some(custom.to_owned()),
        None => Some(format!("`{comparison}`{rest}")),
    }
}

fn worker_thread_name(unit_name: &str) -> String {
    // Thread names may not contain null bytes.
    format!("unitrun-unit-{}", unit_name.replace('\0', "\\0"))
}

/// Installs a panic hook that records panic locations on worker threads.
///
/// The default panic message is suppressed on worker threads, since the failure is reported
/// through the outcome instead. Panics on any other thread go to the previous hook.
fn install_panic_hook() {
    INSTALL_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let recorded = WORKER_STATE.with(|state| match state.try_borrow_mut() {
                Ok(mut state) => match state.as_mut() {
                    Some(state) => {
                        state.panic_location = info.location().map(SourceLocation::caller);
                        true
                    }
                    None => false,
                },
                Err(_) => false,
            });
            if !recorded {
                previous(info);
            }
        }));
    });
}
