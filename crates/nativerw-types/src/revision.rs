use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Revision marker for a resource.
///
/// Revisions for one identifier are not required to be contiguous; the
/// largest stored value is the latest. Callers usually mint them from the
/// wall clock with [`Revision::now`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(i64);

impl Revision {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// A revision stamped with the current UTC time in nanoseconds.
    pub fn now() -> Self {
        let now = Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
        Self(nanos)
    }

    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Revision {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidRevision(s.to_string()))
    }
}

impl From<i64> for Revision {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Revision> for i64 {
    fn from(revision: Revision) -> Self {
        revision.0
    }
}
