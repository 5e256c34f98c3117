use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::person::Level;

/// One value per seniority level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LevelTable<T> {
    pub intern: T,
    pub junior: T,
    pub mid: T,
    pub senior: T,
    pub specialist: T,
}

impl<T: Copy> LevelTable<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            intern: value,
            junior: value,
            mid: value,
            senior: value,
            specialist: value,
        }
    }

    pub fn get(&self, level: Level) -> T {
        match level {
            Level::Intern => self.intern,
            Level::Junior => self.junior,
            Level::Mid => self.mid,
            Level::Senior => self.senior,
            Level::Specialist => self.specialist,
        }
    }

    pub fn values(&self) -> [T; 5] {
        [self.intern, self.junior, self.mid, self.senior, self.specialist]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalParams {
    /// Effort units produced per capacity-week.
    pub velocity: LevelTable<f64>,
    pub rework_rate: LevelTable<f64>,
    /// Weekly probability that an active person falls sick.
    pub sick_rate: f64,
    /// Weekly probability that an active person leaves.
    pub turn_over_rate: f64,
    /// Weeks between opening a position and the hire.
    pub time_to_hire: LevelTable<u32>,
    /// Weeks a new hire spends onboarding at zero capacity.
    pub ramp_up: LevelTable<u32>,
    pub start_date: NaiveDate,
    pub split_rate: f64,
    pub num_of_monte_carlo_iterations: usize,
}

impl GlobalParams {
    /// Calendar date of the first day of `week` (week 1 starts on the
    /// simulation start date).
    pub fn week_date(&self, week: u32) -> NaiveDate {
        let offset = i64::from(week.saturating_sub(1)) * 7;
        self.start_date + chrono::Duration::days(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_params, on_date};

    #[test]
    fn level_table_returns_value_for_level() {
        let table = LevelTable {
            intern: 0.2,
            junior: 0.5,
            mid: 1.0,
            senior: 1.3,
            specialist: 1.6,
        };
        assert_eq!(table.get(Level::Intern), 0.2);
        assert_eq!(table.get(Level::Mid), 1.0);
        assert_eq!(table.get(Level::Specialist), 1.6);
    }

    #[test]
    fn week_dates_advance_by_seven_days() {
        let params = build_params(on_date(2025, 3, 3));
        assert_eq!(params.week_date(1), on_date(2025, 3, 3));
        assert_eq!(params.week_date(2), on_date(2025, 3, 10));
        assert_eq!(params.week_date(5), on_date(2025, 3, 31));
    }
}
