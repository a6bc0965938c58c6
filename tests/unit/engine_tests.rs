/// Scheduling and streak rules as seen by library users
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use habit_tracker_server::*;

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

#[test]
fn test_weekly_schedule_walks_target_days() {
    // Mon/Wed/Fri habit, starting on a Monday evening
    let targets = [0u8, 2, 4];
    let mut reference = at(2024, 1, 1, 19);
    let mut due_dates = Vec::new();

    for _ in 0..4 {
        let due = compute_next_due(Frequency::Weekly, Some(&targets), reference);
        due_dates.push(due.date_naive().day());
        reference = due + Duration::hours(8);
    }

    assert_eq!(due_dates, vec![3, 5, 8, 10]);
}

#[test]
fn test_monthly_schedule_clamps_each_month() {
    let mut reference = at(2023, 10, 31, 12);
    let mut months = Vec::new();

    for _ in 0..5 {
        let due = compute_next_due(Frequency::Monthly, None, reference);
        months.push((due.year(), due.month(), due.day()));
        reference = due;
    }

    // Once clamped to the 30th the day of month doesn't grow back
    assert_eq!(
        months,
        vec![(2023, 11, 30), (2023, 12, 30), (2024, 1, 30), (2024, 2, 29), (2024, 3, 29)]
    );
}

#[test]
fn test_due_dates_are_future_midnights() {
    let frequencies = [Frequency::Daily, Frequency::Weekly, Frequency::Monthly, Frequency::Custom];
    let targets: [&[u8]; 3] = [&[], &[6], &[0, 3, 5]];
    let mut reference = at(2023, 12, 25, 0);

    while reference < at(2024, 3, 10, 0) {
        for frequency in frequencies {
            for days in targets {
                let due = compute_next_due(frequency, Some(days), reference);
                assert!(due > reference, "{:?} {:?} at {}", frequency, days, reference);
                assert_eq!((due.hour(), due.minute(), due.second()), (0, 0, 0));
            }
        }
        reference += Duration::hours(13);
    }
}

#[test]
fn test_streak_rules() {
    let empty = recompute_streak::<Utc>(&[], 5);
    assert_eq!(empty, StreakState { current_streak: 0, longest_streak: 5 });

    let same_day = recompute_streak(&[at(2024, 1, 1, 6), at(2024, 1, 1, 22)], 0);
    assert_eq!(same_day.current_streak, 1);

    let unordered = [at(2024, 1, 3, 9), at(2024, 1, 1, 9), at(2024, 1, 2, 9)];
    assert_eq!(recompute_streak(&unordered, 0).current_streak, 3);

    let with_gap = [at(2024, 1, 1, 9), at(2024, 1, 2, 9), at(2024, 1, 5, 9)];
    let state = recompute_streak(&with_gap, 0);
    assert_eq!(state.current_streak, 1);
    assert_eq!(state.longest_streak, 2);
}

#[test]
fn test_longest_streak_never_drops_as_history_grows() {
    let days = [1, 2, 3, 7, 8, 20, 4, 5, 6];
    let mut history = Vec::new();
    let mut longest = 0;

    for day in days {
        history.push(at(2024, 5, day, 12));
        let state = recompute_streak(&history, longest);
        assert!(state.longest_streak >= longest);
        assert!(state.longest_streak >= state.current_streak);
        longest = state.longest_streak;
    }

    // Backfilling 4..=6 joins 1..=8 into one run
    assert_eq!(longest, 8);
}

#[test]
fn test_habit_lifecycle_without_storage() {
    let created = at(2024, 2, 27, 8);
    let mut habit = Habit::new(
        UserId::new("alice"),
        NewHabit {
            name: "Water".to_string(),
            ..Default::default()
        },
        created,
    )
    .unwrap();
    assert_eq!(habit.next_due_at, at(2024, 2, 28, 0));

    let mut history = Vec::new();
    for offset in 0..3 {
        let when = created + Duration::days(offset);
        history.push(when);
        habit.record_completion(&history, when);
    }

    assert_eq!(habit.streak, 3);
    assert_eq!(habit.total_completions, 3);
    assert_eq!(habit.last_completed_at, Some(at(2024, 2, 29, 8)));
    assert_eq!(habit.next_due_at, at(2024, 3, 1, 0));
}
