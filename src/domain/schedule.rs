/// Due-date calculation for habits
///
/// Given a habit's frequency, its optional target weekdays and a reference
/// time (creation, update or latest completion), work out when the habit is
/// next due. The reference day is the calendar day in the reference's own
/// offset, so a completion stamped `2024-01-02T20:00:00-05:00` counts for
/// January 2nd. Every result is midnight UTC of some day strictly after that
/// day, except at the very end of chrono's date range where it saturates.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::domain::Frequency;

/// Number of days in a week, used for the weekly wrap-around
const DAYS_PER_WEEK: i64 = 7;

/// Compute the next time a habit should be performed
///
/// - `Daily`: start of the following day.
/// - `Weekly` with target days: start of the first target weekday strictly
///   after the reference weekday, wrapping into next week when none is left.
/// - `Weekly` without target days: start of the same weekday next week.
/// - `Monthly`: same day-of-month next month, clamped to that month's length.
/// - `Custom`: no rule of its own, behaves like `Daily`.
///
/// `target_days` holds weekday indices with 0 = Monday .. 6 = Sunday.
///
/// When no later day can be represented the result is the start of
/// `NaiveDate::MAX`, which is not after the reference.
pub fn compute_next_due<Tz: TimeZone>(
    frequency: Frequency,
    target_days: Option<&[u8]>,
    reference: DateTime<Tz>,
) -> DateTime<Utc> {
    let today = reference.date_naive();

    let due_day = match frequency {
        Frequency::Weekly => {
            let ahead = days_until_weekly_target(today, target_days);
            today.checked_add_days(Days::new(ahead as u64))
        }
        // Months arithmetic clamps to the last valid day (Jan 31 -> Feb 28/29)
        Frequency::Monthly => today.checked_add_months(Months::new(1)),
        Frequency::Daily | Frequency::Custom => today.checked_add_days(Days::new(1)),
    };

    match due_day {
        Some(day) => start_of_day(day),
        None => {
            tracing::warn!("Next due date after {} is out of range, saturating", today);
            start_of_day(NaiveDate::MAX)
        }
    }
}

/// Midnight UTC at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Weekday index of a date, 0 = Monday .. 6 = Sunday
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// How many days ahead the next weekly occurrence falls
///
/// A target equal to today's weekday does not count as "later this week".
fn days_until_weekly_target(today: NaiveDate, target_days: Option<&[u8]>) -> i64 {
    let targets = match target_days {
        Some(days) if !days.is_empty() => days,
        _ => return DAYS_PER_WEEK,
    };

    let weekday = weekday_index(today) as i64;
    let later_this_week = targets
        .iter()
        .map(|&day| day as i64)
        .filter(|&day| day > weekday)
        .min();
    let earliest = targets.iter().map(|&day| day as i64).min();

    match (later_this_week, earliest) {
        (Some(day), _) => day - weekday,
        (None, Some(first)) => DAYS_PER_WEEK - weekday + first,
        (None, None) => DAYS_PER_WEEK,
    }
}
