//! Chart data and streak arithmetic over a user's activities.
//!
//! Everything here works on UTC calendar days.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::models::activity::Activity;

const WEEKS_SHOWN: i64 = 4;

#[derive(Debug, Serialize, PartialEq)]
pub struct ActivityStats {
    pub total_activities: usize,
    pub activity_types: BTreeMap<String, usize>,
    pub weekly: Vec<WeekCount>,
    pub calendar: MonthCalendar,
    pub total_duration_seconds: i64,
    pub longest_activity_seconds: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WeekCount {
    pub week_start: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    /// 0 = Sunday
    pub first_weekday: u32,
    pub active_days: Vec<u32>,
}

pub fn activity_stats(activities: &[Activity], today: NaiveDate) -> ActivityStats {
    let mut activity_types = BTreeMap::new();
    for activity in activities {
        let label = match activity.activity_type.trim() {
            "" => "Unknown",
            label => label,
        };
        *activity_types.entry(label.to_string()).or_insert(0) += 1;
    }

    ActivityStats {
        total_activities: activities.len(),
        activity_types,
        weekly: weekly_counts(activities, today),
        calendar: month_calendar(activities, today),
        total_duration_seconds: total_duration(activities),
        longest_activity_seconds: longest_duration(activities),
    }
}

pub fn total_duration(activities: &[Activity]) -> i64 {
    activities
        .iter()
        .filter_map(|a| a.duration_seconds)
        .map(i64::from)
        .sum()
}

pub fn longest_duration(activities: &[Activity]) -> i64 {
    activities
        .iter()
        .filter_map(|a| a.duration_seconds)
        .map(i64::from)
        .max()
        .unwrap_or(0)
}

/// The Sunday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

fn weekly_counts(activities: &[Activity], today: NaiveDate) -> Vec<WeekCount> {
    let first = week_start(today - Duration::days(7 * (WEEKS_SHOWN - 1)));
    let mut weeks: Vec<WeekCount> = (0..WEEKS_SHOWN)
        .map(|i| WeekCount {
            week_start: first + Duration::days(7 * i),
            count: 0,
        })
        .collect();

    for activity in activities {
        let start = week_start(activity.datetime.date_naive());
        if let Some(week) = weeks.iter_mut().find(|w| w.week_start == start) {
            week.count += 1;
        }
    }
    weeks
}

fn month_calendar(activities: &[Activity], today: NaiveDate) -> MonthCalendar {
    let first = today.with_day(1).unwrap_or(today);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let days_in_month = next_month
        .map(|next| (next - first).num_days() as u32)
        .unwrap_or(31);

    let active_days: BTreeSet<u32> = activities
        .iter()
        .map(|a| a.datetime.date_naive())
        .filter(|d| d.year() == first.year() && d.month() == first.month())
        .map(|d| d.day())
        .collect();

    MonthCalendar {
        year: first.year(),
        month: first.month(),
        days_in_month,
        first_weekday: first.weekday().num_days_from_sunday(),
        active_days: active_days.into_iter().collect(),
    }
}

fn active_dates(activities: &[Activity]) -> BTreeSet<NaiveDate> {
    activities.iter().map(|a| a.datetime.date_naive()).collect()
}

/// Longest run of keys that are exactly `step` days apart.
fn longest_run(keys: &BTreeSet<NaiveDate>, step: i64) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for &key in keys {
        run = match prev {
            Some(p) if key - p == Duration::days(step) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(key);
    }
    best
}

/// Longest run of consecutive days with at least one activity.
pub fn daily_streak(activities: &[Activity]) -> u32 {
    longest_run(&active_dates(activities), 1)
}

/// Consecutive active days ending today, or ending yesterday if today is still empty.
pub fn current_streak(activities: &[Activity], today: NaiveDate) -> u32 {
    let dates = active_dates(activities);
    let mut day = if dates.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while dates.contains(&day) {
        streak += 1;
        day = day - Duration::days(1);
    }
    streak
}

/// Longest run of consecutive weekends (keyed by their Saturday) with an activity.
pub fn weekend_streak(activities: &[Activity]) -> u32 {
    let weekends: BTreeSet<NaiveDate> = active_dates(activities)
        .into_iter()
        .filter_map(|date| match date.weekday() {
            Weekday::Sat => Some(date),
            Weekday::Sun => Some(date - Duration::days(1)),
            _ => None,
        })
        .collect();
    longest_run(&weekends, 7)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn activity_on(date: NaiveDate, hour: u32, activity_type: &str) -> Activity {
        let at = Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap());
        Activity {
            id: 0,
            user_id: 1,
            title: activity_type.to_string(),
            activity_type: activity_type.to_string(),
            description: None,
            datetime: at,
            duration_seconds: None,
            location_name: None,
            latitude: None,
            longitude: None,
            weather: None,
            song: None,
            photos: String::new(),
            created_at: at,
            updated_at: at,
        }
    }

    pub(crate) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2024-06-12 is a Wednesday
        assert_eq!(week_start(day(2024, 6, 12)), day(2024, 6, 9));
        assert_eq!(week_start(day(2024, 6, 9)), day(2024, 6, 9));
        assert_eq!(week_start(day(2024, 6, 15)), day(2024, 6, 9));
    }

    #[test]
    fn weekly_counts_cover_the_last_four_weeks() {
        let today = day(2024, 6, 12);
        let activities = vec![
            activity_on(day(2024, 6, 11), 9, "Hammocking"),
            activity_on(day(2024, 6, 10), 9, "Hammocking"),
            activity_on(day(2024, 5, 20), 9, "Stargazing"),
            activity_on(day(2024, 5, 1), 9, "Stargazing"),
        ];
        let weekly = weekly_counts(&activities, today);

        let starts: Vec<_> = weekly.iter().map(|w| w.week_start).collect();
        assert_eq!(
            starts,
            vec![day(2024, 5, 19), day(2024, 5, 26), day(2024, 6, 2), day(2024, 6, 9)]
        );
        let counts: Vec<_> = weekly.iter().map(|w| w.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 2]);
    }

    #[test]
    fn calendar_marks_active_days_of_this_month() {
        let activities = vec![
            activity_on(day(2024, 2, 3), 9, "Camping"),
            activity_on(day(2024, 2, 3), 20, "Campfire"),
            activity_on(day(2024, 2, 29), 9, "Camping"),
            activity_on(day(2024, 1, 30), 9, "Camping"),
        ];
        let calendar = month_calendar(&activities, day(2024, 2, 14));

        assert_eq!(calendar.days_in_month, 29);
        // 2024-02-01 is a Thursday
        assert_eq!(calendar.first_weekday, 4);
        assert_eq!(calendar.active_days, vec![3, 29]);
    }

    #[test]
    fn december_calendar_rolls_the_year() {
        let calendar = month_calendar(&[], day(2023, 12, 25));
        assert_eq!((calendar.year, calendar.month), (2023, 12));
        assert_eq!(calendar.days_in_month, 31);
    }

    #[test]
    fn types_and_durations_are_aggregated() {
        let mut a = activity_on(day(2024, 6, 1), 9, "Fishing");
        a.duration_seconds = Some(3600);
        let mut b = activity_on(day(2024, 6, 2), 9, "Fishing");
        b.duration_seconds = Some(9000);
        let c = activity_on(day(2024, 6, 3), 9, " ");

        let stats = activity_stats(&[a, b, c], day(2024, 6, 3));
        assert_eq!(stats.total_activities, 3);
        assert_eq!(stats.activity_types["Fishing"], 2);
        assert_eq!(stats.activity_types["Unknown"], 1);
        assert_eq!(stats.total_duration_seconds, 12_600);
        assert_eq!(stats.longest_activity_seconds, 9000);
    }

    #[test]
    fn daily_streak_finds_longest_run() {
        let activities: Vec<_> = [1, 2, 3, 5, 6, 7, 8, 8, 20]
            .iter()
            .map(|&d| activity_on(day(2024, 3, d), 9, "Foraging"))
            .collect();
        assert_eq!(daily_streak(&activities), 4);
        assert_eq!(daily_streak(&[]), 0);
    }

    #[test]
    fn current_streak_tolerates_an_empty_today() {
        let activities: Vec<_> = [10, 11, 12]
            .iter()
            .map(|&d| activity_on(day(2024, 3, d), 9, "Foraging"))
            .collect();

        assert_eq!(current_streak(&activities, day(2024, 3, 12)), 3);
        assert_eq!(current_streak(&activities, day(2024, 3, 13)), 3);
        assert_eq!(current_streak(&activities, day(2024, 3, 14)), 0);
    }

    #[test]
    fn weekend_streak_joins_saturday_and_sunday() {
        // Sat 6th, Sun 14th, Sat 20th, Sun 28th (April 2024), then a gap
        let activities: Vec<_> = [6, 14, 20, 28]
            .iter()
            .map(|&d| activity_on(day(2024, 4, d), 9, "Picnicking"))
            .chain(std::iter::once(activity_on(day(2024, 5, 18), 9, "Picnicking")))
            .chain(std::iter::once(activity_on(day(2024, 4, 10), 9, "Picnicking")))
            .collect();
        assert_eq!(weekend_streak(&activities), 4);
    }
}
