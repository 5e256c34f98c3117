use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Intern,
    Junior,
    Mid,
    Senior,
    Specialist,
}

impl Level {
    pub fn rank(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,
    pub min_level: Level,
}

impl Skill {
    pub fn new(name: &str, min_level: Level) -> Self {
        Self {
            name: name.to_string(),
            min_level,
        }
    }
}

/// Inclusive vacation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VacationRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl VacationRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    pub level: Level,
    pub skills: Vec<Skill>,
    pub hired: bool,
    pub onboarded: bool,
    pub start_date: Option<NaiveDate>,
    pub vacations_at: Vec<VacationRange>,
}

impl Person {
    pub fn new(id: &str, name: &str, level: Level) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            level,
            skills: Vec::new(),
            hired: true,
            onboarded: true,
            start_date: None,
            vacations_at: Vec::new(),
        }
    }

    /// A person qualifies when every required skill is matched by one of
    /// theirs at the same or a higher level.
    pub fn is_qualified_for(&self, required_skills: &[Skill]) -> bool {
        required_skills.iter().all(|required| {
            self.skills.iter().any(|skill| {
                skill.name == required.name && skill.min_level.rank() >= required.min_level.rank()
            })
        })
    }

    pub fn is_on_vacation(&self, date: NaiveDate) -> bool {
        self.vacations_at.iter().any(|range| range.contains(date))
    }

    /// New hire taking over a departed person's seat.
    pub fn replacement(&self, replacement_number: usize) -> Self {
        Self {
            id: format!("{}-R{replacement_number}", self.id),
            name: format!("Replacement for {}", self.name),
            level: self.level,
            skills: self.skills.clone(),
            hired: false,
            onboarded: false,
            start_date: None,
            vacations_at: Vec::new(),
        }
    }
}
