//! Season buckets for threshold selection
//!
//! Thresholds are calibrated per season because outdoor PM2.5 and HVAC duty
//! cycles differ sharply between heating, cooling and shoulder months. The
//! calendar-month rule is a fixed business rule for a northern-hemisphere
//! household; it sits behind [`SeasonRule`] so a location-aware rule can be
//! dropped in without touching the evaluators.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::Timestamp;

/// Season bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Summer,
    Shoulder,
}

impl Season {
    pub const ALL: [Season; 3] = [Season::Winter, Season::Summer, Season::Shoulder];

    pub const fn name(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Summer => "summer",
            Season::Shoulder => "shoulder",
        }
    }

    /// Calendar rule: Dec–Feb winter, Jun–Aug summer, everything else shoulder
    pub fn of_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            6..=8 => Season::Summer,
            _ => Season::Shoulder,
        }
    }

    pub fn of(at: Timestamp) -> Self {
        Self::of_month(at.month())
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps an instant to a season bucket
pub trait SeasonRule {
    fn season_of(&self, at: Timestamp) -> Season;
}

/// Calendar-month season rule
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarSeasons;

impl SeasonRule for CalendarSeasons {
    fn season_of(&self, at: Timestamp) -> Season {
        Season::of(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn months_map_to_buckets() {
        let winter: Vec<u32> = (1..=12).filter(|m| Season::of_month(*m) == Season::Winter).collect();
        let summer: Vec<u32> = (1..=12).filter(|m| Season::of_month(*m) == Season::Summer).collect();
        assert_eq!(winter, vec![1, 2, 12]);
        assert_eq!(summer, vec![6, 7, 8]);
        assert_eq!(Season::of_month(4), Season::Shoulder);
        assert_eq!(Season::of_month(11), Season::Shoulder);
    }

    #[test]
    fn calendar_rule_uses_timestamp_month() {
        let at = Utc.with_ymd_and_hms(2025, 7, 4, 9, 0, 0).unwrap();
        assert_eq!(CalendarSeasons.season_of(at), Season::Summer);
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&Season::Shoulder).unwrap(), "\"shoulder\"");
        assert_eq!(Season::Winter.to_string(), "winter");
    }
}
