//! Bi-temporal validity tracking.
//!
//! Every fact (entity, observation, relationship) carries a [`Validity`]
//! instead of being row-level deleted: an assertion timestamp and an
//! optional retraction timestamp. A fact is visible at time `t` iff it was
//! asserted at or before `t` and, if retracted, the retraction happened
//! after `t`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bi-temporal validity key for a stored fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    /// When the fact was asserted.
    pub asserted_at: DateTime<Utc>,
    /// When the fact was retracted, if ever.
    pub retracted_at: Option<DateTime<Utc>>,
}

impl Validity {
    /// Construct a validity that is asserted now and never retracted.
    #[must_use]
    pub fn asserted_at(now: DateTime<Utc>) -> Self {
        Self {
            asserted_at: now,
            retracted_at: None,
        }
    }

    /// Whether this fact is visible at time `t`.
    #[must_use]
    pub fn is_visible_at(&self, t: DateTime<Utc>) -> bool {
        if self.asserted_at > t {
            return false;
        }
        match self.retracted_at {
            Some(r) => r > t,
            None => true,
        }
    }

    /// Whether this fact is visible right now.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.retracted_at.is_none()
    }

    /// Retract this fact at the given time, producing the new validity.
    /// A no-op (returns `self` unchanged) if already retracted earlier.
    #[must_use]
    pub fn retract_at(&self, t: DateTime<Utc>) -> Self {
        if let Some(existing) = self.retracted_at {
            if existing <= t {
                return *self;
            }
        }
        Self {
            asserted_at: self.asserted_at,
            retracted_at: Some(t),
        }
    }
}
