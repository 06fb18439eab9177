use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::SchedulerError;

/// Wall-clock rule describing when a cadence is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Trigger {
    Daily { at: NaiveTime },
    Weekly { day: Weekday, at: NaiveTime },
    /// `day` is a day of the month; months without that day never fire.
    Monthly { day: u32, at: NaiveTime },
}

impl Trigger {
    fn at(&self) -> NaiveTime {
        match self {
            Trigger::Daily { at } | Trigger::Weekly { at, .. } | Trigger::Monthly { at, .. } => *at,
        }
    }

    fn matches_date(&self, date: NaiveDate) -> bool {
        match self {
            Trigger::Daily { .. } => true,
            Trigger::Weekly { day, .. } => date.weekday() == *day,
            Trigger::Monthly { day, .. } => date.day() == *day,
        }
    }

    /// The latest trigger instant in `(after, until]`, if any.
    pub fn fired_between(&self, after: NaiveDateTime, until: NaiveDateTime) -> Option<NaiveDateTime> {
        if until <= after {
            return None;
        }
        let earliest = after.date();
        let mut date = until.date();
        loop {
            if self.matches_date(date) {
                let instant = date.and_time(self.at());
                if instant > after && instant <= until {
                    return Some(instant);
                }
            }
            if date <= earliest {
                return None;
            }
            date = date.pred_opt()?;
        }
    }

    /// The first trigger instant strictly after `now`, searching about two months ahead.
    pub fn next_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut date = now.date();
        for _ in 0..62 {
            if self.matches_date(date) {
                let instant = date.and_time(self.at());
                if instant > now {
                    return Some(instant);
                }
            }
            date = date.succ_opt()?;
        }
        None
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Trigger::Weekly { day, at } => write!(f, "every {} at {}", day, at.format("%H:%M")),
            Trigger::Monthly { day, at } => write!(f, "day {} of each month at {}", day, at.format("%H:%M")),
        }
    }
}

/// Parse a wall-clock time written as `HH:MM`.
pub fn parse_time(s: &str) -> Result<NaiveTime, SchedulerError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| SchedulerError::InvalidTime(s.to_string()))
}
