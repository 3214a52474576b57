use std::str::FromStr;

use crate::ScheduleError;

/// A single field of a schedule line.
///
/// Ranges are half-open: `8-17` covers `8..=16`. A single value `N` is stored as `N..N + 1`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Interval {
    Wildcard,
    Range { from: u32, to: u32 },
}

impl Interval {
    pub fn matches(&self, value: u32) -> bool {
        match *self {
            Interval::Wildcard => true,
            Interval::Range { from, to } => from <= value && value < to,
        }
    }
}

impl FromStr for Interval {
    type Err = ScheduleError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token == "*" {
            return Ok(Interval::Wildcard);
        }

        if token.contains('-') {
            let invalid_interval = || ScheduleError::InvalidInterval { token: token.into() };

            let mut bounds = token.split('-');
            let (Some(from), Some(to), None) = (bounds.next(), bounds.next(), bounds.next()) else {
                return Err(invalid_interval());
            };
            let from: u32 = from.parse().map_err(|_| invalid_interval())?;
            let to: u32 = to.parse().map_err(|_| invalid_interval())?;

            if from >= to {
                return Err(ScheduleError::EmptyInterval { token: token.into() });
            }
            return Ok(Interval::Range { from, to });
        }

        let invalid_field = || ScheduleError::InvalidField { token: token.into() };
        let value: u32 = token.parse().map_err(|_| invalid_field())?;
        let to = value.checked_add(1).ok_or_else(invalid_field)?;

        Ok(Interval::Range { from: value, to })
    }
}
