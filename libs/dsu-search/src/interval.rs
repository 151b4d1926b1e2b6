//! Time intervals built from optional "on or after" / "before" bounds.

use chrono::{DateTime, FixedOffset};

pub type Timestamp = DateTime<FixedOffset>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Included(Timestamp),
    Excluded(Timestamp),
    Unbounded,
}

impl Bound {
    pub fn value(&self) -> Option<&Timestamp> {
        match self {
            Self::Included(t) | Self::Excluded(t) => Some(t),
            Self::Unbounded => None,
        }
    }

    pub fn is_inclusive(&self) -> bool {
        matches!(self, Self::Included(_))
    }
}

/// An interval over timestamps. Inverted intervals are representable; the
/// bounds are kept as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub lower: Bound,
    pub upper: Bound,
}

impl Interval {
    /// Closed-open `[on_or_after, before)`, with a missing side left unbounded.
    pub fn closed_open(on_or_after: Option<Timestamp>, before: Option<Timestamp>) -> Self {
        Self {
            lower: on_or_after.map_or(Bound::Unbounded, Bound::Included),
            upper: before.map_or(Bound::Unbounded, Bound::Excluded),
        }
    }

    pub fn all() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    pub fn has_lower_bound(&self) -> bool {
        !matches!(self.lower, Bound::Unbounded)
    }

    pub fn has_upper_bound(&self) -> bool {
        !matches!(self.upper, Bound::Unbounded)
    }

    pub fn is_unbounded(&self) -> bool {
        !self.has_lower_bound() && !self.has_upper_bound()
    }
}
