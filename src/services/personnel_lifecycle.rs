use std::borrow::Cow;
use std::collections::HashSet;

use chrono::NaiveDate;
use rand::Rng;
use rand_distr::{Bernoulli, BernoulliError, Distribution, Uniform};
use serde::Serialize;

use crate::domain::global_params::GlobalParams;
use crate::domain::person::Person;

/// Sick leave lasts between one and this many weeks.
pub const MAX_SICK_WEEKS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnavailabilityStatus {
    Hiring,
    Onboarding,
    Recovering,
    Blocked,
    Vacation,
}

/// Distributions for the weekly personnel events, built once per run.
#[derive(Debug, Clone, Copy)]
pub struct PersonnelEvents {
    sickness: Bernoulli,
    turnover: Bernoulli,
    sick_weeks: Uniform<u32>,
}

impl PersonnelEvents {
    pub fn new(sick_rate: f64, turn_over_rate: f64) -> Result<Self, BernoulliError> {
        Ok(Self {
            sickness: Bernoulli::new(sick_rate)?,
            turnover: Bernoulli::new(turn_over_rate)?,
            sick_weeks: Uniform::new_inclusive(1, MAX_SICK_WEEKS),
        })
    }
}

/// Per-iteration mutable state of one person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonState {
    pub available_capacity: f64,
    pub hired: bool,
    pub onboarded: bool,
    pub hiring_start_week: Option<u32>,
    pub onboarding_start_week: Option<u32>,
    pub onboarding_weeks_remaining: u32,
    pub sick_until_week: Option<u32>,
    pub has_departed: bool,
    pub departure_week: Option<u32>,
}

impl PersonState {
    pub fn for_person(person: &Person) -> Self {
        Self {
            hired: person.hired,
            onboarded: person.hired && person.onboarded,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrewMember<'a> {
    pub person: Cow<'a, Person>,
    pub state: PersonState,
    pub assignment_count: usize,
    /// Skill names this member has already worked under this iteration.
    pub practiced_skills: HashSet<&'a str>,
}

impl<'a> CrewMember<'a> {
    fn new(person: Cow<'a, Person>) -> Self {
        let state = PersonState::for_person(&person);
        Self {
            person,
            state,
            assignment_count: 0,
            practiced_skills: HashSet::new(),
        }
    }
}

/// Working copy of the personnel for one iteration. Replacements for
/// departed people are appended and owned by the crew.
#[derive(Debug, Clone)]
pub struct Crew<'a> {
    pub members: Vec<CrewMember<'a>>,
    replacements_spawned: usize,
}

impl<'a> Crew<'a> {
    pub fn from_templates(personnel: &'a [Person]) -> Self {
        Self {
            members: personnel
                .iter()
                .map(|person| CrewMember::new(Cow::Borrowed(person)))
                .collect(),
            replacements_spawned: 0,
        }
    }

    /// Moves every person one week forward and resets their capacity.
    /// Members without capacity for a reason worth reporting are pushed to
    /// `unavailable` (cleared first).
    pub fn advance_week<R: Rng + ?Sized>(
        &mut self,
        week: u32,
        date: NaiveDate,
        params: &GlobalParams,
        events: &PersonnelEvents,
        rng: &mut R,
        unavailable: &mut Vec<(usize, UnavailabilityStatus)>,
    ) {
        unavailable.clear();
        let present = self.members.len();
        for idx in 0..present {
            let member = &mut self.members[idx];
            match step_person(member, week, date, params, events, rng) {
                WeekOutcome::Available => {}
                WeekOutcome::Unavailable(status) => unavailable.push((idx, status)),
                WeekOutcome::Gone => {}
                WeekOutcome::Departed => {
                    self.replacements_spawned += 1;
                    let mut replacement = CrewMember::new(Cow::Owned(
                        self.members[idx].person.replacement(self.replacements_spawned),
                    ));
                    replacement.state.hiring_start_week = Some(week + 1);
                    self.members.push(replacement);
                }
            }
        }
    }
}

enum WeekOutcome {
    Available,
    Unavailable(UnavailabilityStatus),
    Departed,
    Gone,
}

fn step_person<R: Rng + ?Sized>(
    member: &mut CrewMember<'_>,
    week: u32,
    date: NaiveDate,
    params: &GlobalParams,
    events: &PersonnelEvents,
    rng: &mut R,
) -> WeekOutcome {
    let person = &member.person;
    let state = &mut member.state;
    state.available_capacity = 0.0;

    if state.has_departed {
        return WeekOutcome::Gone;
    }

    if person.start_date.is_some_and(|start| date < start) {
        return WeekOutcome::Unavailable(UnavailabilityStatus::Blocked);
    }

    if !state.hired {
        let opened = *state.hiring_start_week.get_or_insert(week);
        if week < opened + params.time_to_hire.get(person.level) {
            return WeekOutcome::Unavailable(UnavailabilityStatus::Hiring);
        }
        state.hired = true;
    }

    if !state.onboarded {
        if state.onboarding_start_week.is_none() {
            state.onboarding_start_week = Some(week);
            state.onboarding_weeks_remaining = params.ramp_up.get(person.level);
        }
        if state.onboarding_weeks_remaining > 0 {
            state.onboarding_weeks_remaining -= 1;
            if state.onboarding_weeks_remaining == 0 {
                state.onboarded = true;
            }
            return WeekOutcome::Unavailable(UnavailabilityStatus::Onboarding);
        }
        state.onboarded = true;
    }

    if events.turnover.sample(rng) {
        state.has_departed = true;
        state.departure_week = Some(week);
        return WeekOutcome::Departed;
    }

    let is_sick = match state.sick_until_week {
        Some(until) if until >= week => true,
        _ => {
            if events.sickness.sample(rng) {
                state.sick_until_week = Some(week + events.sick_weeks.sample(rng) - 1);
                true
            } else {
                false
            }
        }
    };

    if person.is_on_vacation(date) {
        return WeekOutcome::Unavailable(UnavailabilityStatus::Vacation);
    }
    if is_sick {
        return WeekOutcome::Unavailable(UnavailabilityStatus::Recovering);
    }

    state.available_capacity = 1.0;
    WeekOutcome::Available
}
