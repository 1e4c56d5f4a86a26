//! Practice statistics derived from the daily activity buckets.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Stats {
    pub today_minutes: u64,
    /// Completed work sessions today.
    pub today_sessions: u64,
    pub week_minutes: u64,
    pub total_minutes: u64,
    pub total_sessions: u64,
    pub streak_days: u64,
    pub daily_goal_minutes: u32,
    pub weekly_goal_minutes: u32,
    /// 0.0 .. 100.0
    pub daily_goal_pct: f64,
    /// 0.0 .. 100.0
    pub weekly_goal_pct: f64,
}

impl Stats {
    /// Fill in goal targets and the derived percentages.
    pub fn with_goals(mut self, daily_goal_minutes: u32, weekly_goal_minutes: u32) -> Self {
        self.daily_goal_minutes = daily_goal_minutes;
        self.weekly_goal_minutes = weekly_goal_minutes;
        self.daily_goal_pct = goal_pct(self.today_minutes, daily_goal_minutes);
        self.weekly_goal_pct = goal_pct(self.week_minutes, weekly_goal_minutes);
        self
    }
}

fn goal_pct(done: u64, goal: u32) -> f64 {
    if goal == 0 {
        return 0.0;
    }
    (done as f64 / f64::from(goal) * 100.0).min(100.0)
}

/// Length of the run of consecutive practice days ending today or yesterday.
///
/// `practice_days` holds every date with nonzero minutes, in any order. A
/// streak whose last day is yesterday is still alive; one ending earlier is 0.
pub fn current_streak(practice_days: &[NaiveDate], today: NaiveDate) -> u64 {
    let mut days: Vec<NaiveDate> = practice_days.iter().copied().filter(|d| *d <= today).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&latest) = days.first() else {
        return 0;
    };
    if latest < today - Duration::days(1) {
        return 0;
    }

    let mut streak = 0;
    let mut expected = latest;
    for day in days {
        if day != expected {
            break;
        }
        streak += 1;
        expected = day - Duration::days(1);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn streak_counts_back_from_today() {
        let days = [d("2026-03-10"), d("2026-03-08"), d("2026-03-09"), d("2026-03-06")];
        assert_eq!(current_streak(&days, d("2026-03-10")), 3);
    }

    #[test]
    fn streak_ending_yesterday_is_alive() {
        let days = [d("2026-03-09"), d("2026-03-08")];
        assert_eq!(current_streak(&days, d("2026-03-10")), 2);
    }

    #[test]
    fn streak_ending_earlier_is_broken() {
        let days = [d("2026-03-08"), d("2026-03-07")];
        assert_eq!(current_streak(&days, d("2026-03-10")), 0);
        assert_eq!(current_streak(&[], d("2026-03-10")), 0);
    }

    #[test]
    fn duplicate_days_count_once() {
        let days = [d("2026-03-10"), d("2026-03-10"), d("2026-03-09")];
        assert_eq!(current_streak(&days, d("2026-03-10")), 2);
    }

    #[test]
    fn goal_percentages_are_capped() {
        let stats = Stats {
            today_minutes: 300,
            week_minutes: 210,
            ..Default::default()
        }
        .with_goals(240, 420);
        assert_eq!(stats.daily_goal_pct, 100.0);
        assert_eq!(stats.weekly_goal_pct, 50.0);
        assert_eq!(Stats::default().with_goals(0, 0).daily_goal_pct, 0.0);
    }
}
