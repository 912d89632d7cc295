use std::fmt;

use chrono::NaiveDate;
use log::info;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::Money;
use crate::EngineResult;

/// One experience point per this much money contributed.
const MONEY_PER_XP: Decimal = dec!(10);
/// XP needed for levels 2 through 5.
const LEVEL_THRESHOLDS: [u64; 4] = [250, 500, 750, 1000];
/// A contribution this many days after the previous one extends the streak.
const STREAK_GAP_DAYS: std::ops::RangeInclusive<i64> = 6..=8;
/// Weekly amount suggested when no plan is known.
pub const DEFAULT_WEEKLY_AMOUNT: Money = dec!(200);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "Streak Starter")]
    StreakStarter,
    #[serde(rename = "Halfway Hero")]
    HalfwayHero,
    #[serde(rename = "Discipline Demon")]
    DisciplineDemon,
}

impl Badge {
    pub fn as_str(self) -> &'static str {
        match self {
            Badge::StreakStarter => "Streak Starter",
            Badge::HalfwayHero => "Halfway Hero",
            Badge::DisciplineDemon => "Discipline Demon",
        }
    }

    fn earned(self, tracker: &ContributionTracker) -> bool {
        match self {
            Badge::StreakStarter => tracker.streak >= 4,
            Badge::HalfwayHero => tracker.xp >= 500,
            Badge::DisciplineDemon => tracker.streak >= 8,
        }
    }

    const ALL: [Badge; 3] = [Badge::StreakStarter, Badge::HalfwayHero, Badge::DisciplineDemon];
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weekly micro-investment progress: XP, level, streak and badges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionTracker {
    pub xp: u64,
    pub level: u8,
    /// Consecutive weekly contributions, counting the latest.
    pub streak: u32,
    pub last_contribution: Option<NaiveDate>,
    /// In the order they were earned.
    pub badges: Vec<Badge>,
}

impl Default for ContributionTracker {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            streak: 0,
            last_contribution: None,
            badges: Vec::new(),
        }
    }
}

/// Level 1 to 5 for an XP total.
pub fn level_for_xp(xp: u64) -> u8 {
    1 + LEVEL_THRESHOLDS.iter().filter(|&&t| xp >= t).count() as u8
}

impl ContributionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contribution and return the badges it newly earned.
    /// Contributions must arrive in date order.
    pub fn record_contribution(&mut self, amount: Money, date: NaiveDate) -> EngineResult<Vec<Badge>> {
        if amount < Decimal::ZERO {
            return Err(EngineError::invalid("amount", "must be non-negative"));
        }
        if let Some(last) = self.last_contribution {
            if date < last {
                return Err(EngineError::invalid(
                    "date",
                    format!("{date} is before the last contribution on {last}"),
                ));
            }
        }

        let gained = (amount / MONEY_PER_XP).floor().to_u64().unwrap_or(u64::MAX);
        self.xp = self.xp.saturating_add(gained);

        let continues = self
            .last_contribution
            .is_some_and(|last| STREAK_GAP_DAYS.contains(&(date - last).num_days()));
        self.streak = if continues { self.streak.saturating_add(1) } else { 1 };
        self.last_contribution = Some(date);
        self.level = level_for_xp(self.xp);

        let new_badges: Vec<Badge> = Badge::ALL
            .into_iter()
            .filter(|b| !self.badges.contains(b) && b.earned(self))
            .collect();
        self.badges.extend(&new_badges);
        if !new_badges.is_empty() {
            info!("badges earned on {date}: {new_badges:?}");
        }
        Ok(new_badges)
    }

    /// Reminder for a user who has not started or has missed a week.
    /// `weekly_amount` defaults to [`DEFAULT_WEEKLY_AMOUNT`].
    pub fn nudge(&self, today: NaiveDate, weekly_amount: Option<Money>) -> Option<String> {
        let amount = weekly_amount.unwrap_or(DEFAULT_WEEKLY_AMOUNT);
        match self.last_contribution {
            None => Some(format!("Ready to start your weekly ₹{amount} micro-investment?")),
            Some(last) if (today - last).num_days() > 7 => Some(format!(
                "Missed last week's goal. Try investing ₹{amount} today to stay on track!"
            )),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(249), 1);
        assert_eq!(level_for_xp(250), 2);
        assert_eq!(level_for_xp(500), 3);
        assert_eq!(level_for_xp(999), 4);
        assert_eq!(level_for_xp(1000), 5);
        assert_eq!(level_for_xp(u64::MAX), 5);
    }

    #[test]
    fn test_xp_floors_amount() {
        let mut t = ContributionTracker::new();
        t.record_contribution(dec!(199), start()).unwrap();
        assert_eq!(t.xp, 19);
        assert_eq!(t.streak, 1);
        assert_eq!(t.level, 1);
    }

    #[test]
    fn test_weekly_streak_and_badges() {
        let mut t = ContributionTracker::new();
        let mut earned = Vec::new();
        for week in 0..8u64 {
            let date = start() + Days::new(week * 7);
            earned.extend(t.record_contribution(dec!(700), date).unwrap());
        }
        assert_eq!(t.streak, 8);
        assert_eq!(t.xp, 560);
        assert_eq!(t.level, 3);
        assert_eq!(
            earned,
            vec![Badge::StreakStarter, Badge::HalfwayHero, Badge::DisciplineDemon]
        );
        assert_eq!(t.badges, earned);
    }

    #[test]
    fn test_gap_outside_window_resets_streak() {
        let mut t = ContributionTracker::new();
        t.record_contribution(dec!(100), start()).unwrap();
        t.record_contribution(dec!(100), start() + Days::new(6)).unwrap();
        assert_eq!(t.streak, 2);
        t.record_contribution(dec!(100), start() + Days::new(15)).unwrap();
        assert_eq!(t.streak, 1);
        t.record_contribution(dec!(100), start() + Days::new(17)).unwrap();
        assert_eq!(t.streak, 1);
    }

    #[test]
    fn test_badges_are_not_repeated() {
        let mut t = ContributionTracker::new();
        assert_eq!(t.record_contribution(dec!(5000), start()).unwrap(), vec![Badge::HalfwayHero]);
        assert!(t.record_contribution(dec!(5000), start() + Days::new(7)).unwrap().is_empty());
        assert_eq!(t.badges, vec![Badge::HalfwayHero]);
    }

    #[test]
    fn test_rejects_out_of_order_and_negative() {
        let mut t = ContributionTracker::new();
        t.record_contribution(dec!(100), start()).unwrap();
        assert!(t.record_contribution(dec!(100), start() - Days::new(1)).is_err());
        assert!(t.record_contribution(dec!(-1), start()).is_err());
        assert_eq!(t.xp, 10);
    }

    #[test]
    fn test_huge_amount_saturates_xp() {
        let mut t = ContributionTracker::new();
        t.record_contribution(Decimal::MAX, start()).unwrap();
        assert_eq!(t.xp, u64::MAX);
        assert_eq!(t.level, 5);
    }

    #[test]
    fn test_nudges() {
        let mut t = ContributionTracker::new();
        let first = t.nudge(start(), None).unwrap();
        assert!(first.contains("₹200"));

        t.record_contribution(dec!(300), start()).unwrap();
        assert_eq!(t.nudge(start() + Days::new(7), None), None);
        let missed = t.nudge(start() + Days::new(8), Some(dec!(450))).unwrap();
        assert!(missed.contains("Missed"));
        assert!(missed.contains("₹450"));
    }

    #[test]
    fn test_badges_serialize_as_names() {
        let json = serde_json::to_string(&vec![Badge::HalfwayHero]).unwrap();
        assert_eq!(json, r#"["Halfway Hero"]"#);
    }
}
