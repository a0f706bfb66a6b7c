//! Handler priorities.
//!
//! Priorities are the only ordering primitive between handlers of one event:
//! lower values run first, equal values run in registration order.

use std::fmt;

/// Ordering key for an event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(i32);

impl Priority {
    /// Runs before any domain logic. Used for bootstrapping.
    pub const ABSOLUTE: Priority = Priority(-100);
    /// High priority band.
    pub const HIGH: Priority = Priority(-80);
    /// Medium priority band.
    pub const MEDIUM: Priority = Priority(-60);
    /// Low priority band.
    pub const LOW: Priority = Priority(-40);
    /// Support handlers that run before the default band.
    pub const SUPPORT: Priority = Priority(-20);
    /// Priority of handlers that do not ask for one.
    pub const DEFAULT: Priority = Priority(0);
    /// Finalization, after every domain contribution.
    pub const LAST: Priority = Priority(100);

    /// Create a priority from a raw value.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Raw numeric value.
    pub const fn value(self) -> i32 {
        self.0
    }

    /// The priority immediately before this one.
    ///
    /// `Priority::ABSOLUTE.before()` is the "absolute first minus one" slot.
    pub const fn before(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// The priority immediately after this one.
    pub const fn after(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_ordered() {
        assert!(Priority::ABSOLUTE.before() < Priority::ABSOLUTE);
        assert!(Priority::ABSOLUTE < Priority::HIGH);
        assert!(Priority::HIGH < Priority::MEDIUM);
        assert!(Priority::MEDIUM < Priority::LOW);
        assert!(Priority::LOW < Priority::SUPPORT);
        assert!(Priority::SUPPORT < Priority::DEFAULT);
        assert!(Priority::DEFAULT < Priority::LAST);
    }

    #[test]
    fn test_neighbours() {
        assert_eq!(Priority::ABSOLUTE.before().value(), -101);
        assert_eq!(Priority::ABSOLUTE.after().value(), -99);
        assert_eq!(Priority::new(i32::MIN).before().value(), i32::MIN);
    }
}
