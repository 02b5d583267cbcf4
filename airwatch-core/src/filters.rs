//! Filter replacement reminders
//!
//! The HVAC filter is judged by measured efficiency. Everything else in the
//! house (fridge water filter, humidifier wick, purifier pre-filters) has no
//! sensor and is replaced on a calendar. Those schedules are configured as
//! [`FilterReminderRule`]s and checked against the filter-change log.

use chrono::NaiveDate;

use crate::alerts::{Alert, AlertKind};
use crate::config::FilterReminderRule;
use crate::reading::FilterChangeRecord;
use crate::time::Timestamp;

/// Where a rule stands today
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderStatus {
    Fine { days_in_service: i64, due_in_days: i64 },
    DueSoon { days_in_service: i64, due_in_days: i64 },
    Overdue { days_in_service: i64, overdue_days: i64 },
    NeverReplaced,
}

fn matches(rule: &FilterReminderRule, record: &FilterChangeRecord) -> bool {
    let same_type = record.filter_type.trim().eq_ignore_ascii_case(rule.filter_type.trim());
    let same_location = rule
        .location
        .as_deref()
        .map_or(true, |loc| record.location.trim().eq_ignore_ascii_case(loc.trim()));
    same_type && same_location
}

/// Date of the latest replacement matching the rule
pub fn last_replacement(rule: &FilterReminderRule, log: &[FilterChangeRecord]) -> Option<NaiveDate> {
    log.iter()
        .filter(|r| r.action.resets_service() && matches(rule, r))
        .map(|r| r.date)
        .max()
}

/// Days since the latest replacement, `None` when none is recorded
pub fn days_in_service(rule: &FilterReminderRule, log: &[FilterChangeRecord], today: NaiveDate) -> Option<i64> {
    last_replacement(rule, log).map(|date| (today - date).num_days())
}

pub fn status(rule: &FilterReminderRule, log: &[FilterChangeRecord], today: NaiveDate) -> ReminderStatus {
    let Some(days_in_service) = days_in_service(rule, log, today) else {
        return ReminderStatus::NeverReplaced;
    };
    let due_in_days = rule.interval_days - days_in_service;
    if due_in_days < 0 {
        ReminderStatus::Overdue {
            days_in_service,
            overdue_days: -due_in_days,
        }
    } else if due_in_days <= rule.lead_days {
        ReminderStatus::DueSoon {
            days_in_service,
            due_in_days,
        }
    } else {
        ReminderStatus::Fine {
            days_in_service,
            due_in_days,
        }
    }
}

fn label(rule: &FilterReminderRule) -> String {
    match &rule.location {
        Some(location) => format!("{} filter ({})", rule.filter_type, location),
        None => format!("{} filter", rule.filter_type),
    }
}

/// One alert per rule that needs attention
pub fn reminders(rules: &[FilterReminderRule], log: &[FilterChangeRecord], now: Timestamp) -> Vec<Alert> {
    let today = now.date_naive();
    rules
        .iter()
        .filter_map(|rule| match status(rule, log, today) {
            ReminderStatus::Fine { .. } => None,
            ReminderStatus::DueSoon { days_in_service, due_in_days } => Some(Alert::info(
                AlertKind::FilterReminder,
                format!(
                    "{} is due for replacement in {} days ({} days in service).",
                    label(rule),
                    due_in_days,
                    days_in_service
                ),
                now,
            )),
            ReminderStatus::Overdue { days_in_service, overdue_days } => Some(Alert::warning(
                AlertKind::FilterReminder,
                format!(
                    "Replace the {} now: {} days in service, {} days past its {}-day interval.",
                    label(rule),
                    days_in_service,
                    overdue_days,
                    rule.interval_days
                ),
                now,
            )),
            ReminderStatus::NeverReplaced => Some(Alert::info(
                AlertKind::FilterReminder,
                format!("No replacement recorded for the {}; log the next change.", label(rule)),
                now,
            )),
        })
        .collect()
}
