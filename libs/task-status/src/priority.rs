// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Scheduling priorities.
//!
//! Priorities are opaque to the status machinery, all it needs is a total order so that an
//! escalation can tell whether it actually *raised* a task's priority.

use core::fmt;

/// The scheduling priority of a task.
///
/// Higher values are more urgent. The named constants mirror the usual quality-of-service classes
/// but any `u8` is a valid priority.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Priority(u8);

impl Priority {
    pub const UNSPECIFIED: Self = Self(0x00);
    pub const BACKGROUND: Self = Self(0x09);
    pub const UTILITY: Self = Self(0x11);
    pub const DEFAULT: Self = Self(0x15);
    pub const USER_INITIATED: Self = Self(0x19);
    pub const USER_INTERACTIVE: Self = Self(0x21);

    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNSPECIFIED => f.pad("unspecified"),
            Self::BACKGROUND => f.pad("background"),
            Self::UTILITY => f.pad("utility"),
            Self::DEFAULT => f.pad("default"),
            Self::USER_INITIATED => f.pad("user-initiated"),
            Self::USER_INTERACTIVE => f.pad("user-interactive"),
            Self(raw) => write!(f, "{raw:#04x}"),
        }
    }
}

impl mycelium_bitfield::FromBits<usize> for Priority {
    type Error = core::convert::Infallible;

    /// The number of bits required to represent a value of this type.
    const BITS: u32 = 8;

    #[inline]
    fn try_from_bits(bits: usize) -> Result<Self, Self::Error> {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "the bitfield only ever hands us the low 8 bits"
        )]
        Ok(Self(bits as u8))
    }

    #[inline]
    fn into_bits(self) -> usize {
        usize::from(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_raw_value() {
        assert!(Priority::BACKGROUND < Priority::UTILITY);
        assert!(Priority::UTILITY < Priority::DEFAULT);
        assert!(Priority::DEFAULT < Priority::USER_INITIATED);
        assert!(Priority::USER_INITIATED < Priority::USER_INTERACTIVE);
        assert_eq!(Priority::from_raw(0x15), Priority::DEFAULT);
    }

    #[test]
    fn display() {
        assert_eq!(Priority::DEFAULT.to_string(), "default");
        assert_eq!(Priority::from_raw(0x2a).to_string(), "0x2a");
    }
}
