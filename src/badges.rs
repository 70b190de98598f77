//! Achievement rules.
//!
//! Each badge is a single threshold over one aggregate of the user's history.
//! Once earned, a badge is stored with its date and stays earned even if the
//! aggregate later drops (deleted activities, unfollows).

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::{models::activity::Activity, stats};

const SUNSET_SUNRISE: &str = "sunset/sunrise";
const EARLY_HOUR: u32 = 8;
const LATE_HOUR: u32 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    ActivityCount,
    ActivityType,
    Diversity,
    Duration,
    Social,
    Streak,
    Location,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "activity_type", rename_all = "snake_case")]
pub enum Metric {
    TotalActivities,
    ActivityType(&'static str),
    UniqueActivityTypes,
    LongestActivity,
    TotalDuration,
    FollowingCount,
    FollowerCount,
    CommentCount,
    WeekendStreak,
    DailyStreak,
    CurrentStreak,
    UniqueLocations,
    EarlyActivities,
    LateActivities,
    WeatherConditions,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Criterion {
    pub metric: Metric,
    pub target: u64,
}

#[derive(Debug, Serialize)]
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: BadgeCategory,
    pub criteria: Criterion,
}

const fn badge(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    category: BadgeCategory,
    metric: Metric,
    target: u64,
) -> Badge {
    Badge {
        id,
        name,
        description,
        icon,
        category,
        criteria: Criterion { metric, target },
    }
}

#[rustfmt::skip]
pub static BADGES: &[Badge] = &[
    badge("first_activity", "First Steps", "Log your first outdoor activity", "🌱",
        BadgeCategory::ActivityCount, Metric::TotalActivities, 1),
    badge("explorer", "Explorer", "Log 5 outdoor activities", "🏃‍♂️",
        BadgeCategory::ActivityCount, Metric::TotalActivities, 5),
    badge("adventurer", "Adventurer", "Log 25 outdoor activities", "🗺️",
        BadgeCategory::ActivityCount, Metric::TotalActivities, 25),
    badge("master", "Nature Master", "Log 100 outdoor activities", "👑",
        BadgeCategory::ActivityCount, Metric::TotalActivities, 100),
    badge("stargazer", "Stargazer", "Log 3 stargazing activities", "⭐",
        BadgeCategory::ActivityType, Metric::ActivityType("stargazing"), 3),
    badge("hammock_master", "Hammock Master", "Log 5 hammocking activities", "🛏️",
        BadgeCategory::ActivityType, Metric::ActivityType("hammocking"), 5),
    badge("bird_watcher", "Bird Watcher", "Log 3 bird watching activities", "🐦",
        BadgeCategory::ActivityType, Metric::ActivityType("bird watching"), 3),
    badge("sunset_chaser", "Sunset Chaser", "Log 5 sunset/sunrise activities", "🌅",
        BadgeCategory::ActivityType, Metric::ActivityType(SUNSET_SUNRISE), 5),
    badge("activity_explorer", "Activity Explorer", "Try 3 different types of outdoor activities", "🎯",
        BadgeCategory::Diversity, Metric::UniqueActivityTypes, 3),
    badge("activity_master", "Activity Master", "Try 5 different types of outdoor activities", "🎖️",
        BadgeCategory::Diversity, Metric::UniqueActivityTypes, 5),
    badge("patient", "Patient Observer", "Spend 2+ hours on a single activity", "⏰",
        BadgeCategory::Duration, Metric::LongestActivity, 7_200),
    badge("meditation_master", "Meditation Master", "Spend 4+ hours on a single activity", "🧘‍♀️",
        BadgeCategory::Duration, Metric::LongestActivity, 14_400),
    badge("time_investor", "Time Investor", "Spend 24 total hours on outdoor activities", "⏳",
        BadgeCategory::Duration, Metric::TotalDuration, 86_400),
    badge("social_butterfly", "Social Butterfly", "Follow 10 other users", "🦋",
        BadgeCategory::Social, Metric::FollowingCount, 10),
    badge("influencer", "Nature Influencer", "Gain 20 followers", "🌟",
        BadgeCategory::Social, Metric::FollowerCount, 20),
    badge("commenter", "Community Commenter", "Leave 10 comments on activities", "💬",
        BadgeCategory::Social, Metric::CommentCount, 10),
    badge("weekend_warrior", "Weekend Warrior", "Log activities on 4 consecutive weekends", "📅",
        BadgeCategory::Streak, Metric::WeekendStreak, 4),
    badge("daily_practitioner", "Daily Practitioner", "Log activities for 7 consecutive days", "📆",
        BadgeCategory::Streak, Metric::DailyStreak, 7),
    badge("streak_master", "Streak Master", "Log activities for 5 consecutive days", "🔥",
        BadgeCategory::Streak, Metric::CurrentStreak, 5),
    badge("local_explorer", "Local Explorer", "Log activities in 5 different locations", "📍",
        BadgeCategory::Location, Metric::UniqueLocations, 5),
    badge("traveler", "Nature Traveler", "Log activities in 10 different locations", "✈️",
        BadgeCategory::Location, Metric::UniqueLocations, 10),
    badge("early_bird", "Early Bird", "Log 5 activities before 8 AM", "🌅",
        BadgeCategory::Special, Metric::EarlyActivities, 5),
    badge("night_owl", "Night Owl", "Log 5 activities after 10 PM", "🦉",
        BadgeCategory::Special, Metric::LateActivities, 5),
    badge("weather_warrior", "Weather Warrior", "Log activities in 3 different weather conditions", "🌦️",
        BadgeCategory::Special, Metric::WeatherConditions, 3),
];

/// Aggregates the badge rules are evaluated against.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BadgeStats {
    pub total_activities: u64,
    /// Lower-cased type to count, plus the synthetic `sunset/sunrise` key.
    pub activity_types: HashMap<String, u64>,
    pub unique_activity_types: u64,
    pub longest_activity: u64,
    pub total_duration: u64,
    pub following_count: u64,
    pub follower_count: u64,
    pub comment_count: u64,
    pub weekend_streak: u64,
    pub daily_streak: u64,
    pub current_streak: u64,
    pub unique_locations: u64,
    pub early_activities: u64,
    pub late_activities: u64,
    pub weather_conditions: u64,
}

/// Social counts that live outside the activity table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocialCounts {
    pub following: i64,
    pub followers: i64,
    pub comments: i64,
}

fn distinct_lowercase<'a>(values: impl Iterator<Item = Option<&'a str>>) -> u64 {
    values
        .flatten()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .len() as u64
}

impl BadgeStats {
    pub fn collect(activities: &[Activity], social: SocialCounts, today: NaiveDate) -> Self {
        let mut activity_types: HashMap<String, u64> = HashMap::new();
        for activity in activities {
            let key = activity.activity_type.trim().to_lowercase();
            if !key.is_empty() {
                *activity_types.entry(key).or_default() += 1;
            }
        }
        let unique_activity_types = activity_types.len() as u64;

        let sunset_sunrise = activities
            .iter()
            .map(|a| a.activity_type.to_lowercase())
            .filter(|t| t.contains("sunset") || t.contains("sunrise"))
            .count() as u64;
        if sunset_sunrise > 0 {
            activity_types.insert(SUNSET_SUNRISE.to_string(), sunset_sunrise);
        }

        let count_hours = |pred: fn(u32) -> bool| {
            activities
                .iter()
                .filter(|a| pred(a.datetime.hour()))
                .count() as u64
        };

        BadgeStats {
            total_activities: activities.len() as u64,
            activity_types,
            unique_activity_types,
            longest_activity: stats::longest_duration(activities).max(0) as u64,
            total_duration: stats::total_duration(activities).max(0) as u64,
            following_count: social.following.max(0) as u64,
            follower_count: social.followers.max(0) as u64,
            comment_count: social.comments.max(0) as u64,
            weekend_streak: stats::weekend_streak(activities) as u64,
            daily_streak: stats::daily_streak(activities) as u64,
            current_streak: stats::current_streak(activities, today) as u64,
            unique_locations: distinct_lowercase(
                activities.iter().map(|a| a.location_name.as_deref()),
            ),
            early_activities: count_hours(|h| h < EARLY_HOUR),
            late_activities: count_hours(|h| h >= LATE_HOUR),
            weather_conditions: distinct_lowercase(activities.iter().map(|a| a.weather.as_deref())),
        }
    }

    pub fn value(&self, metric: Metric) -> u64 {
        match metric {
            Metric::TotalActivities => self.total_activities,
            Metric::ActivityType(kind) => self.activity_types.get(kind).copied().unwrap_or(0),
            Metric::UniqueActivityTypes => self.unique_activity_types,
            Metric::LongestActivity => self.longest_activity,
            Metric::TotalDuration => self.total_duration,
            Metric::FollowingCount => self.following_count,
            Metric::FollowerCount => self.follower_count,
            Metric::CommentCount => self.comment_count,
            Metric::WeekendStreak => self.weekend_streak,
            Metric::DailyStreak => self.daily_streak,
            Metric::CurrentStreak => self.current_streak,
            Metric::UniqueLocations => self.unique_locations,
            Metric::EarlyActivities => self.early_activities,
            Metric::LateActivities => self.late_activities,
            Metric::WeatherConditions => self.weather_conditions,
        }
    }
}

pub fn has_earned(badge: &Badge, stats: &BadgeStats) -> bool {
    stats.value(badge.criteria.metric) >= badge.criteria.target
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EarnedBadge {
    pub badge_id: String,
    pub earned_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BadgeStatus {
    #[serde(flatten)]
    pub badge: &'static Badge,
    pub earned: bool,
    pub earned_date: Option<DateTime<Utc>>,
    pub progress: u64,
    pub target: u64,
}

/// Every badge with its earned state. A stored record keeps a badge earned.
pub fn user_badges(stats: &BadgeStats, earned: &[EarnedBadge]) -> Vec<BadgeStatus> {
    BADGES
        .iter()
        .map(|badge| {
            let earned_date = earned
                .iter()
                .find(|record| record.badge_id == badge.id)
                .map(|record| record.earned_date);
            let target = badge.criteria.target;

            BadgeStatus {
                badge,
                earned: earned_date.is_some() || has_earned(badge, stats),
                earned_date,
                progress: stats.value(badge.criteria.metric).min(target),
                target,
            }
        })
        .collect()
}

/// Badges earned by `stats` that have no stored record yet.
pub fn newly_earned(stats: &BadgeStats, earned: &[EarnedBadge]) -> Vec<&'static str> {
    BADGES
        .iter()
        .filter(|badge| has_earned(badge, stats))
        .filter(|badge| !earned.iter().any(|record| record.badge_id == badge.id))
        .map(|badge| badge.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tests::{activity_on, day};

    fn find_badge(id: &str) -> Option<&'static Badge> {
        BADGES.iter().find(|badge| badge.id == id)
    }

    fn stats_for(activities: &[Activity]) -> BadgeStats {
        BadgeStats::collect(activities, SocialCounts::default(), day(2024, 7, 1))
    }

    #[test]
    fn table_has_unique_ids() {
        let ids: BTreeSet<_> = BADGES.iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), BADGES.len());
        assert_eq!(BADGES.len(), 24);
    }

    #[test]
    fn first_activity_unlocks_first_steps() {
        let stats = stats_for(&[activity_on(day(2024, 6, 1), 12, "Hammocking")]);
        let first = find_badge("first_activity").unwrap();
        let explorer = find_badge("explorer").unwrap();

        assert!(has_earned(first, &stats));
        assert!(!has_earned(explorer, &stats));
    }

    #[test]
    fn type_badges_match_case_insensitively() {
        let activities: Vec<_> = (1..=3)
            .map(|d| activity_on(day(2024, 6, d), 23, "Stargazing"))
            .collect();
        let stats = stats_for(&activities);

        assert_eq!(stats.value(Metric::ActivityType("stargazing")), 3);
        assert!(has_earned(find_badge("stargazer").unwrap(), &stats));
    }

    #[test]
    fn sunset_and_sunrise_share_a_counter() {
        let activities = vec![
            activity_on(day(2024, 6, 1), 20, "Sunset Watching"),
            activity_on(day(2024, 6, 2), 5, "Sunrise Watching"),
            activity_on(day(2024, 6, 3), 20, "Sunset Watching"),
        ];
        let stats = stats_for(&activities);

        assert_eq!(stats.value(Metric::ActivityType(SUNSET_SUNRISE)), 3);
        assert_eq!(stats.unique_activity_types, 2);
    }

    #[test]
    fn time_of_day_counters() {
        let activities = vec![
            activity_on(day(2024, 6, 1), 5, "Bird Watching"),
            activity_on(day(2024, 6, 2), 7, "Bird Watching"),
            activity_on(day(2024, 6, 3), 8, "Bird Watching"),
            activity_on(day(2024, 6, 4), 22, "Stargazing"),
        ];
        let stats = stats_for(&activities);

        assert_eq!(stats.early_activities, 2);
        assert_eq!(stats.late_activities, 1);
    }

    #[test]
    fn locations_and_weather_are_distinct_ignoring_case() {
        let mut a = activity_on(day(2024, 6, 1), 9, "Tidepooling");
        a.location_name = Some("Pescadero".into());
        a.weather = Some("Foggy".into());
        let mut b = activity_on(day(2024, 6, 2), 9, "Tidepooling");
        b.location_name = Some(" pescadero ".into());
        b.weather = Some("Sunny".into());
        let mut c = activity_on(day(2024, 6, 3), 9, "Tidepooling");
        c.location_name = Some("".into());

        let stats = stats_for(&[a, b, c]);
        assert_eq!(stats.unique_locations, 1);
        assert_eq!(stats.weather_conditions, 2);
    }

    #[test]
    fn social_counts_feed_social_badges() {
        let stats = BadgeStats::collect(
            &[],
            SocialCounts {
                following: 10,
                followers: 3,
                comments: 12,
            },
            day(2024, 7, 1),
        );

        assert!(has_earned(find_badge("social_butterfly").unwrap(), &stats));
        assert!(!has_earned(find_badge("influencer").unwrap(), &stats));
        assert!(has_earned(find_badge("commenter").unwrap(), &stats));
    }

    #[test]
    fn stored_badges_stay_earned_with_their_date() {
        let earned_at = Utc::now();
        let records = vec![EarnedBadge {
            badge_id: "explorer".into(),
            earned_date: earned_at,
        }];
        let statuses = user_badges(&BadgeStats::default(), &records);

        let explorer = statuses.iter().find(|s| s.badge.id == "explorer").unwrap();
        assert!(explorer.earned);
        assert_eq!(explorer.earned_date, Some(earned_at));
        assert_eq!(explorer.progress, 0);
        assert_eq!(explorer.target, 5);

        let first = statuses.iter().find(|s| s.badge.id == "first_activity").unwrap();
        assert!(!first.earned);
        assert_eq!(first.earned_date, None);
    }

    #[test]
    fn progress_is_capped_at_target() {
        let activities: Vec<_> = (1..=8)
            .map(|d| activity_on(day(2024, 6, d), 12, "Camping"))
            .collect();
        let statuses = user_badges(&stats_for(&activities), &[]);
        let explorer = statuses.iter().find(|s| s.badge.id == "explorer").unwrap();

        assert_eq!(explorer.progress, 5);
        assert!(explorer.earned);
    }

    #[test]
    fn newly_earned_skips_recorded_badges() {
        let activities: Vec<_> = (1..=5)
            .map(|d| activity_on(day(2024, 6, d), 12, "Camping"))
            .collect();
        let stats = stats_for(&activities);
        let records = vec![EarnedBadge {
            badge_id: "first_activity".into(),
            earned_date: Utc::now(),
        }];

        let fresh = newly_earned(&stats, &records);
        assert!(fresh.contains(&"explorer"));
        assert!(!fresh.contains(&"first_activity"));
        // five days a month ago: no live streak, too short for a week
        assert!(!fresh.contains(&"streak_master"));
        assert!(!fresh.contains(&"daily_practitioner"));
    }

    #[test]
    fn catalog_serializes_criteria() {
        let json = serde_json::to_value(find_badge("stargazer").unwrap()).unwrap();
        assert_eq!(json["criteria"]["metric"]["kind"], "activity_type");
        assert_eq!(json["criteria"]["metric"]["activity_type"], "stargazing");
        assert_eq!(json["criteria"]["target"], 3);
        assert_eq!(json["category"], "activity_type");
    }
}
