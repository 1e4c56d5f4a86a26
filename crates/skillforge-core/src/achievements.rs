//! Achievement catalogue and threshold evaluation.
//!
//! Evaluation is pure: metrics and the already-unlocked set go in, newly
//! crossed thresholds come out. Recording the unlock is the store's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AchievementId {
    #[serde(rename = "first_hour")]
    FirstHour,
    #[serde(rename = "first_100_hours")]
    First100Hours,
    #[serde(rename = "first_1000_hours")]
    First1000Hours,
    #[serde(rename = "skill_mastery")]
    SkillMastery,
    #[serde(rename = "streak_7_days")]
    Streak7Days,
    #[serde(rename = "streak_30_days")]
    Streak30Days,
    #[serde(rename = "streak_100_days")]
    Streak100Days,
    #[serde(rename = "streak_365_days")]
    Streak365Days,
    #[serde(rename = "first_skill")]
    FirstSkill,
    #[serde(rename = "five_skills")]
    FiveSkills,
    #[serde(rename = "ten_skills")]
    TenSkills,
    #[serde(rename = "night_owl")]
    NightOwl,
    #[serde(rename = "early_bird")]
    EarlyBird,
    #[serde(rename = "focused")]
    Focused,
    #[serde(rename = "dedicated")]
    Dedicated,
}

impl AchievementId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementId::FirstHour => "first_hour",
            AchievementId::First100Hours => "first_100_hours",
            AchievementId::First1000Hours => "first_1000_hours",
            AchievementId::SkillMastery => "skill_mastery",
            AchievementId::Streak7Days => "streak_7_days",
            AchievementId::Streak30Days => "streak_30_days",
            AchievementId::Streak100Days => "streak_100_days",
            AchievementId::Streak365Days => "streak_365_days",
            AchievementId::FirstSkill => "first_skill",
            AchievementId::FiveSkills => "five_skills",
            AchievementId::TenSkills => "ten_skills",
            AchievementId::NightOwl => "night_owl",
            AchievementId::EarlyBird => "early_bird",
            AchievementId::Focused => "focused",
            AchievementId::Dedicated => "dedicated",
        }
    }

    pub fn def(&self) -> &'static AchievementDef {
        // The catalogue has one entry per variant.
        CATALOGUE
            .iter()
            .find(|def| def.id == *self)
            .unwrap_or(&CATALOGUE[0])
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATALOGUE
            .iter()
            .map(|def| def.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown achievement: {s}"))
    }
}

/// The quantity an achievement's threshold is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Credited minutes across all skills.
    TotalMinutes,
    /// Accumulated minutes on the single most practised skill.
    MaxSkillMinutes,
    /// Consecutive practice days ending today or yesterday.
    StreakDays,
    SkillCount,
    /// Completed work sessions today.
    TodaySessions,
    /// Completed work sessions in the last seven days, today included.
    WeekSessions,
    /// Local hour a work session just completed in, within `[from, to)`.
    CompletionHour { from: u32, to: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementDef {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub metric: Metric,
    pub target: u64,
}

static CATALOGUE: [AchievementDef; 15] = [
    AchievementDef {
        id: AchievementId::FirstHour,
        name: "First Hour",
        description: "Log your first hour of focused work",
        icon: "Clock",
        metric: Metric::TotalMinutes,
        target: 60,
    },
    AchievementDef {
        id: AchievementId::First100Hours,
        name: "100 Hours",
        description: "Log 100 hours of practice",
        icon: "Trophy",
        metric: Metric::TotalMinutes,
        target: 6_000,
    },
    AchievementDef {
        id: AchievementId::First1000Hours,
        name: "1000 Hours",
        description: "Log 1000 hours of practice",
        icon: "Award",
        metric: Metric::TotalMinutes,
        target: 60_000,
    },
    AchievementDef {
        id: AchievementId::SkillMastery,
        name: "Mastery Achieved",
        description: "Put 10,000 hours into a single skill",
        icon: "Crown",
        metric: Metric::MaxSkillMinutes,
        target: 600_000,
    },
    AchievementDef {
        id: AchievementId::Streak7Days,
        name: "7 Day Streak",
        description: "Practice 7 days in a row",
        icon: "Flame",
        metric: Metric::StreakDays,
        target: 7,
    },
    AchievementDef {
        id: AchievementId::Streak30Days,
        name: "30 Day Streak",
        description: "Practice 30 days in a row",
        icon: "Star",
        metric: Metric::StreakDays,
        target: 30,
    },
    AchievementDef {
        id: AchievementId::Streak100Days,
        name: "100 Day Streak",
        description: "Practice 100 days in a row",
        icon: "Zap",
        metric: Metric::StreakDays,
        target: 100,
    },
    AchievementDef {
        id: AchievementId::Streak365Days,
        name: "Year of Growth",
        description: "Practice every day for a year",
        icon: "Sparkles",
        metric: Metric::StreakDays,
        target: 365,
    },
    AchievementDef {
        id: AchievementId::FirstSkill,
        name: "Journey Begins",
        description: "Create a skill",
        icon: "Target",
        metric: Metric::SkillCount,
        target: 1,
    },
    AchievementDef {
        id: AchievementId::FiveSkills,
        name: "Polymath",
        description: "Track 5 skills",
        icon: "Book",
        metric: Metric::SkillCount,
        target: 5,
    },
    AchievementDef {
        id: AchievementId::TenSkills,
        name: "Renaissance",
        description: "Track 10 skills",
        icon: "Library",
        metric: Metric::SkillCount,
        target: 10,
    },
    AchievementDef {
        id: AchievementId::NightOwl,
        name: "Night Owl",
        description: "Finish a work session between midnight and 4 AM",
        icon: "Moon",
        metric: Metric::CompletionHour { from: 0, to: 4 },
        target: 1,
    },
    AchievementDef {
        id: AchievementId::EarlyBird,
        name: "Early Bird",
        description: "Finish a work session between 4 AM and 6 AM",
        icon: "Sunrise",
        metric: Metric::CompletionHour { from: 4, to: 6 },
        target: 1,
    },
    AchievementDef {
        id: AchievementId::Focused,
        name: "Laser Focused",
        description: "Complete 10 work sessions in one day",
        icon: "Focus",
        metric: Metric::TodaySessions,
        target: 10,
    },
    AchievementDef {
        id: AchievementId::Dedicated,
        name: "Dedicated",
        description: "Complete 50 work sessions in a week",
        icon: "Heart",
        metric: Metric::WeekSessions,
        target: 50,
    },
];

pub fn catalogue() -> &'static [AchievementDef] {
    &CATALOGUE
}

/// Values read back from the store after a credit commits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementMetrics {
    pub total_minutes: u64,
    pub max_skill_minutes: u64,
    pub streak_days: u64,
    pub skill_count: u64,
    pub today_sessions: u64,
    pub week_sessions: u64,
    /// Local hour of the work session that just completed, if any.
    pub completion_hour: Option<u32>,
}

impl AchievementMetrics {
    pub fn value_of(&self, metric: Metric) -> u64 {
        match metric {
            Metric::TotalMinutes => self.total_minutes,
            Metric::MaxSkillMinutes => self.max_skill_minutes,
            Metric::StreakDays => self.streak_days,
            Metric::SkillCount => self.skill_count,
            Metric::TodaySessions => self.today_sessions,
            Metric::WeekSessions => self.week_sessions,
            Metric::CompletionHour { from, to } => match self.completion_hour {
                Some(hour) if hour >= from && hour < to => 1,
                _ => 0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unlock {
    pub id: AchievementId,
    pub progress: u64,
}

pub trait AchievementEvaluator {
    /// Identifiers whose threshold is met and which are not yet in `unlocked`.
    fn evaluate(&self, metrics: &AchievementMetrics, unlocked: &HashSet<AchievementId>) -> Vec<Unlock>;
}

/// Evaluates the built-in catalogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogueEvaluator;

impl AchievementEvaluator for CatalogueEvaluator {
    fn evaluate(&self, metrics: &AchievementMetrics, unlocked: &HashSet<AchievementId>) -> Vec<Unlock> {
        catalogue()
            .iter()
            .filter(|def| !unlocked.contains(&def.id))
            .filter_map(|def| {
                let progress = metrics.value_of(def.metric);
                (progress >= def.target).then_some(Unlock {
                    id: def.id,
                    progress,
                })
            })
            .collect()
    }
}

/// A catalogue entry joined with its stored progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub progress: u64,
    pub target: u64,
    pub unlocked_at: Option<DateTime<Utc>>,
}
