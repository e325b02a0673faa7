// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{borrow::Cow, ffi::OsString, fmt, process::Output};

const UNITRUN_ENV_VARS: &[&str] = &[
    "UNITRUN_TEST_THREADS",
    "UNITRUN_DEFAULT_TIMEOUT",
    "UNITRUN_NO_TIMEOUTS",
    "UNITRUN_PROFILE",
    "UNITRUN_VERBOSE",
    "UNITRUN_COLOR",
    "UNITRUN_LOG",
];

/// A command line for the demo harness binary.
#[derive(Clone, Debug)]
pub(crate) struct DemoCli {
    args: Vec<String>,
    envs: Vec<(OsString, OsString)>,
}

impl DemoCli {
    pub(crate) fn new() -> Self {
        Self {
            args: vec!["--color".to_owned(), "never".to_owned()],
            envs: Vec::new(),
        }
    }

    pub(crate) fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub(crate) fn env(mut self, k: impl Into<OsString>, v: impl Into<OsString>) -> Self {
        self.envs.push((k.into(), v.into()));
        self
    }

    pub(crate) fn output(&self) -> DemoOutput {
        let mut expr = duct::cmd(env!("CARGO_BIN_EXE_unitrun-demo"), &self.args);
        // Settings on inner expressions take precedence, so explicit variables go first.
        for (k, v) in &self.envs {
            expr = expr.env(k, v);
        }
        // Keep the environment of the test run from leaking into the harness.
        for var in UNITRUN_ENV_VARS {
            expr = expr.env_remove(var);
        }
        let expr = expr.stdout_capture().stderr_capture().unchecked();

        let output = expr.run().expect("failed to execute the demo harness");
        DemoOutput {
            args: self.args.clone(),
            output,
        }
    }
}

pub(crate) struct DemoOutput {
    args: Vec<String>,
    output: Output,
}

impl DemoOutput {
    pub(crate) fn exit_code(&self) -> Option<i32> {
        self.output.status.code()
    }

    pub(crate) fn stdout_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output.stdout)
    }

    pub(crate) fn stderr_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output.stderr)
    }
}

impl fmt::Display for DemoOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "args: {:?}\nexit code: {:?}\n\
                   --- stdout ---\n{}\n\n--- stderr ---\n{}\n\n",
            self.args,
            self.exit_code(),
            self.stdout_as_str(),
            self.stderr_as_str(),
        )
    }
}

/// Replaces the measured duration on each status line with `X`.
pub(crate) fn normalize_durations(output: &str) -> String {
    output
        .lines()
        .map(|line| match (line.starts_with('['), line.rfind(" (")) {
            (true, Some(start)) if line.ends_with(" ms)") => format!("{} (X ms)", &line[..start]),
            _ => line.to_owned(),
        })
        .map(|line| line + "\n")
        .collect()
}
