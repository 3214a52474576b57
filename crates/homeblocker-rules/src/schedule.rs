use std::str::FromStr;

use chrono::{Datelike, Timelike};

use crate::{Interval, ScheduleError};

/// One `<minute> <hour> <day> <month> <weekday> <on|off>` line.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ScheduleLine {
    pub minute: Interval,
    pub hour: Interval,
    pub day: Interval,
    pub month: Interval,
    /// Days are counted from Sunday (0) to Saturday (6)
    pub weekday: Interval,
    pub enabled: bool,
}

impl ScheduleLine {
    pub fn matches<T: Datelike + Timelike>(&self, time: &T) -> bool {
        self.minute.matches(time.minute())
            && self.hour.matches(time.hour())
            && self.day.matches(time.day())
            && self.month.matches(time.month())
            && self.weekday.matches(time.weekday().num_days_from_sunday())
    }
}

impl FromStr for ScheduleLine {
    type Err = ScheduleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [minute, hour, day, month, weekday, toggle] = fields.as_slice() else {
            return Err(ScheduleError::FieldCount {
                line: line.into(),
                count: fields.len(),
            });
        };

        let enabled = match *toggle {
            "on" => true,
            "off" => false,
            _ => return Err(ScheduleError::InvalidToggle { line: line.into() }),
        };

        Ok(ScheduleLine {
            minute: minute.parse()?,
            hour: hour.parse()?,
            day: day.parse()?,
            month: month.parse()?,
            weekday: weekday.parse()?,
            enabled,
        })
    }
}

/// An ordered list of schedule lines. Later lines override earlier ones.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Schedule {
    lines: Vec<ScheduleLine>,
}

impl Schedule {
    /// Blocking is active unless the last line matching `time` says `off`.
    pub fn is_active<T: Datelike + Timelike>(&self, time: &T) -> bool {
        self.lines
            .iter()
            .rev()
            .find(|line| line.matches(time))
            .map_or(true, |line| line.enabled)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            // Skip blank lines
            .filter(|(_, line)| !line.is_empty())
            .map(|(number, line)| {
                line.parse::<ScheduleLine>().map_err(|e| ScheduleError::Line {
                    number,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Schedule { lines })
    }
}
