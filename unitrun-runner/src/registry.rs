// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registered test units, and the lists selected from them.
//!
//! A [`Registry`] owns every unit known to the harness. A run operates on a [`TestList`], which is
//! an ordered selection of borrowed units.

use crate::{
    test_filter::TestFilter,
    unit::{TestUnit, UnitGroup},
};

/// The collection of registered test units.
///
/// Units are kept in registration order. Names are not required to be unique: duplicates are kept
/// and each one runs.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    units: Vec<TestUnit>,
}

impl Registry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit.
    pub fn register(&mut self, unit: TestUnit) -> &mut Self {
        self.units.push(unit);
        self
    }

    /// Registers a unit inside a group.
    ///
    /// The unit is renamed to `<group>.<unit>`, and is skipped if the group is skipped.
    pub fn register_in(&mut self, group: &UnitGroup, unit: TestUnit) -> &mut Self {
        self.register(unit.in_group(group))
    }

    /// Returns the number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if no units have been registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterates over every registered unit in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TestUnit> + '_ {
        self.units.iter()
    }

    /// Selects every unit whose fully-qualified name contains `pattern`.
    ///
    /// The empty pattern selects every unit. The result is in registration order, and may be
    /// empty.
    pub fn select(&self, pattern: &str) -> TestList<'_> {
        self.filter(&TestFilter::substring(pattern))
    }

    /// Selects every unit matched by the given filter, in registration order.
    pub fn filter(&self, filter: &TestFilter) -> TestList<'_> {
        TestList::new(self.units.iter().filter(|unit| filter.is_match(unit.name())))
    }
}

/// An ordered list of units selected for a run.
#[derive(Clone, Debug)]
pub struct TestList<'a> {
    units: Vec<&'a TestUnit>,
    skip_count: usize,
}

impl<'a> TestList<'a> {
    /// Creates a new list from the given units, keeping their order.
    pub fn new(units: impl IntoIterator<Item = &'a TestUnit>) -> Self {
        let units: Vec<_> = units.into_iter().collect();
        let skip_count = units.iter().filter(|unit| unit.is_skipped()).count();
        Self { units, skip_count }
    }

    /// Returns the total number of units in this list, including skipped ones.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if this list is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns the number of units that will be reported as skipped.
    pub fn skip_count(&self) -> usize {
        self.skip_count
    }

    /// Returns the number of units that will actually be run.
    pub fn run_count(&self) -> usize {
        self.units.len() - self.skip_count
    }

    /// Iterates over the units in this list, in order.
    pub fn iter(&self) -> impl Iterator<Item = TestInstance<'a>> + '_ {
        self.units
            .iter()
            .copied()
            .enumerate()
            .map(|(index, unit)| TestInstance::new(index, unit))
    }
}

/// A unit within a [`TestList`], along with its position.
#[derive(Clone, Copy, Debug)]
pub struct TestInstance<'a> {
    /// The position of this unit in its list.
    pub index: usize,

    /// The unit itself.
    pub unit: &'a TestUnit,
}

impl<'a> TestInstance<'a> {
    pub(crate) fn new(index: usize, unit: &'a TestUnit) -> Self {
        Self { index, unit }
    }

    /// Returns the fully-qualified name of the unit.
    #[inline]
    pub fn name(&self) -> &'a str {
        self.unit.name()
    }
}
