// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Display helpers for durations.

use std::{
    fmt::{self, Write},
    time::Duration,
};

/// Displays an integer with `,` as the thousands separator.
pub(super) struct DisplayThousands(pub(super) u128);

impl fmt::Display for DisplayThousands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        let len = digits.len();
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                f.write_char(',')?;
            }
            f.write_char(ch)?;
        }
        Ok(())
    }
}

/// Displays a duration in milliseconds with two decimal places, or `?` if the unit never
/// finished.
pub(super) struct DisplayMillis(pub(super) Option<Duration>);

impl fmt::Display for DisplayMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(duration) => {
                // Round half up to the nearest hundredth of a millisecond.
                let hundredths = (duration.as_nanos() + 5_000) / 10_000;
                write!(
                    f,
                    "{}.{:02}",
                    DisplayThousands(hundredths / 100),
                    hundredths % 100
                )
            }
            None => write!(f, "?"),
        }
    }
}
