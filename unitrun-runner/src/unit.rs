// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test units: the individually runnable pieces of a test suite.
//!
//! A [`TestUnit`] is a name, a body (a zero-argument callable), and some [`UnitSettings`]. Units
//! are built by whatever code discovers tests, and are then handed to a
//! [`Registry`](crate::registry::Registry). Once registered, a unit is never modified.

use debug_ignore::DebugIgnore;
use std::{error::Error, fmt, panic::Location, sync::Arc, time::Duration};

/// The result returned by the body of a test unit.
pub type UnitResult = Result<(), UnitError>;

/// The body of a test unit.
///
/// Bodies are shared with worker threads, and a timed-out body may outlive the run that started
/// it, so they must be `'static`.
pub type UnitBody = Arc<dyn Fn() -> UnitResult + Send + Sync + 'static>;

/// Settings attached to a test unit at registration time.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UnitSettings {
    description: Option<String>,
    timeout: Option<Duration>,
    skip: bool,
}

impl UnitSettings {
    /// Creates a new set of default settings: no description, the default timeout, not skipped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a human-readable description, printed next to the unit's name.
    ///
    /// An empty description is treated as no description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        let description = description.into();
        self.description = (!description.is_empty()).then_some(description);
        self
    }

    /// Sets a timeout for this unit, overriding the process-wide default.
    ///
    /// A zero timeout is treated as no override.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Marks this unit as skipped. Skipped units are reported but never run.
    pub fn set_skip(&mut self, skip: bool) -> &mut Self {
        self.skip = skip;
        self
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the timeout override, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns true if the unit itself is marked as skipped.
    pub fn skip(&self) -> bool {
        self.skip
    }
}

/// One independently runnable test.
#[derive(Clone, Debug)]
pub struct TestUnit {
    name: String,
    settings: UnitSettings,
    // Set if an enclosing group is skipped.
    inherited_skip: bool,
    body: DebugIgnore<UnitBody>,
}

impl TestUnit {
    /// Creates a new test unit with default settings.
    ///
    /// The body can return either `()` or a [`UnitResult`]. A body fails by panicking (for
    /// example through `assert!`), or by returning an error.
    pub fn new<F, R>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoUnitResult,
    {
        Self::with_settings(name, UnitSettings::default(), body)
    }

    /// Creates a new test unit with the given settings.
    pub fn with_settings<F, R>(name: impl Into<String>, settings: UnitSettings, body: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoUnitResult,
    {
        Self {
            name: name.into(),
            settings,
            inherited_skip: false,
            body: DebugIgnore(Arc::new(move || body().into_unit_result())),
        }
    }

    /// Returns the fully-qualified name of this unit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description of this unit, if any.
    pub fn description(&self) -> Option<&str> {
        self.settings.description()
    }

    /// Returns the timeout override for this unit, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.settings.timeout()
    }

    /// Returns the settings this unit was registered with.
    pub fn settings(&self) -> &UnitSettings {
        &self.settings
    }

    /// Returns true if this unit is skipped, either directly or through an enclosing group.
    pub fn is_skipped(&self) -> bool {
        self.settings.skip() || self.inherited_skip
    }

    pub(crate) fn body(&self) -> &UnitBody {
        &self.body
    }

    pub(crate) fn in_group(mut self, group: &UnitGroup) -> Self {
        self.name = format!("{}.{}", group.name, self.name);
        self.inherited_skip |= group.skip;
        self
    }
}

/// A named group enclosing test units, such as a module.
///
/// Units registered through a group are named `<group>.<unit>` and inherit the group's skip flag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnitGroup {
    name: String,
    skip: bool,
}

impl UnitGroup {
    /// Creates a new, non-skipped group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skip: false,
        }
    }

    /// Creates a group nested inside this one. The child inherits this group's skip flag.
    pub fn child(&self, name: impl AsRef<str>) -> Self {
        Self {
            name: format!("{}.{}", self.name, name.as_ref()),
            skip: self.skip,
        }
    }

    /// Marks every unit in this group as skipped.
    pub fn set_skip(&mut self, skip: bool) -> &mut Self {
        self.skip = skip;
        self
    }

    /// Returns the name of this group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this group is skipped.
    pub fn is_skipped(&self) -> bool {
        self.skip
    }
}

/// Conversion from the return value of a unit body into a [`UnitResult`].
///
/// This is implemented for `()` and for [`UnitResult`] itself. Bodies that call fallible code
/// should return a `UnitResult` and use `?`, which records where the error was raised.
pub trait IntoUnitResult {
    /// Converts `self` into a `UnitResult`.
    fn into_unit_result(self) -> UnitResult;
}

impl IntoUnitResult for () {
    fn into_unit_result(self) -> UnitResult {
        Ok(())
    }
}

impl IntoUnitResult for UnitResult {
    fn into_unit_result(self) -> UnitResult {
        self
    }
}

/// An error returned by the body of a test unit.
///
/// Any error type can be converted into a `UnitError` with `?`; the location of the `?` (or of
/// the call to [`UnitError::msg`] or [`UnitError::new`]) is recorded and shown in the report.
///
/// Like `anyhow::Error`, this type deliberately does not implement [`std::error::Error`], so that
/// the blanket `From` conversion is possible.
pub struct UnitError {
    error: Box<dyn Error + Send + Sync + 'static>,
    location: SourceLocation,
}

impl UnitError {
    /// Creates a new error wrapping the given error value.
    #[track_caller]
    pub fn new(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self {
            error: error.into(),
            location: SourceLocation::caller(Location::caller()),
        }
    }

    /// Creates a new error from a message.
    #[track_caller]
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::new(message.to_string())
    }

    /// Returns the location where this error was created.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Returns a one-line description of this error, including its sources.
    pub fn description(&self) -> String {
        let mut description = self.error.to_string();
        let mut source = self.error.source();
        while let Some(error) = source {
            description.push_str(": ");
            description.push_str(&error.to_string());
            source = error.source();
        }
        description
    }
}

impl<E> From<E> for UnitError
where
    E: Error + Send + Sync + 'static,
{
    #[track_caller]
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl fmt::Debug for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitError")
            .field("error", &self.error)
            .field("location", &self.location)
            .finish()
    }
}

/// A location in source code.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SourceLocation {
    file: String,
    line: u32,
    column: u32,
}

impl SourceLocation {
    /// Creates a new source location.
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    pub(crate) fn caller(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }

    /// Returns the file name.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Returns the line number, starting from 1.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns the column number, starting from 1.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
