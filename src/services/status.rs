use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Hours and minutes split of a countdown, truncated toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountdownParts {
    pub hours: i64,
    pub minutes: i64,
}

impl CountdownParts {
    fn from_duration(d: Duration) -> Self {
        let minutes_total = d.num_minutes().max(0);
        CountdownParts {
            hours: minutes_total / 60,
            minutes: minutes_total % 60,
        }
    }
}

/// Schedule state of a single medication, derived entirely from its
/// frequency and the most recent administration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DoseStatus {
    /// frequency_hours == 0; no schedule to evaluate.
    AsNeeded,
    /// Never administered, or schedule restarted.
    Due,
    Taken {
        next_due: NaiveDateTime,
        remaining: CountdownParts,
    },
    Overdue {
        next_due: NaiveDateTime,
        overdue_by: CountdownParts,
    },
}

/// Evaluate a medication's schedule at `now`.
///
/// The interval boundary is closed: exactly `frequency_hours` after the last
/// dose the medication flips to overdue, never a lingering "taken".
pub fn evaluate_dose(
    frequency_hours: i64,
    last_administered: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> DoseStatus {
    if frequency_hours == 0 {
        return DoseStatus::AsNeeded;
    }

    let last = match last_administered {
        Some(last) => last,
        None => return DoseStatus::Due,
    };

    let next_due = last + Duration::hours(frequency_hours);
    if now < next_due {
        DoseStatus::Taken {
            next_due,
            remaining: CountdownParts::from_duration(next_due - now),
        }
    } else {
        DoseStatus::Overdue {
            next_due,
            overdue_by: CountdownParts::from_duration(now - next_due),
        }
    }
}

/// Days left in a fixed-length course, never negative. A `duration_days`
/// of 0 means open-ended and returns `None`.
pub fn days_remaining(
    duration_days: i64,
    start_date: NaiveDateTime,
    now: NaiveDateTime,
) -> Option<i64> {
    if duration_days <= 0 {
        return None;
    }

    let end = start_date + Duration::days(duration_days);
    if now >= end {
        return Some(0);
    }

    // Partial days count as a full remaining day.
    let seconds_left = (end - now).num_seconds();
    Some((seconds_left + 86_399) / 86_400)
}

/// Sum of intake amounts. Callers pass logs already restricted to the
/// current UTC day, so this is a plain total.
pub fn daily_total(amounts: impl IntoIterator<Item = i64>) -> i64 {
    amounts.into_iter().sum()
}

/// Percentage of the daily goal reached, capped at 100. A goal of zero
/// reads as "tracking disabled" and always reports 0.
pub fn progress_percent(total_oz: i64, goal_oz: i64) -> f64 {
    if goal_oz <= 0 {
        return 0.0;
    }
    (total_oz as f64 * 100.0 / goal_oz as f64).min(100.0)
}

/// Traffic-light reading of bowel regularity for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BowelStatus {
    Regular,
    Caution,
    LaxativeNeeded,
    /// Nothing logged yet.
    NoData,
}

pub fn bowel_status(
    last_positive: Option<NaiveDateTime>,
    has_logs: bool,
    now: NaiveDateTime,
    caution_hours: i64,
    alert_hours: i64,
) -> BowelStatus {
    let last = match last_positive {
        Some(last) => last,
        // History with no positive entry is itself a caution sign.
        None if has_logs => return BowelStatus::Caution,
        None => return BowelStatus::NoData,
    };

    let hours_since = (now - last).num_hours();
    if hours_since > alert_hours {
        BowelStatus::LaxativeNeeded
    } else if hours_since > caution_hours {
        BowelStatus::Caution
    } else {
        BowelStatus::Regular
    }
}
