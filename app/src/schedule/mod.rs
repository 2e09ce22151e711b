mod evaluator;

pub use evaluator::{HeatingSchedule, HeatingScheduleEntry, heating_schedule, scheduled_target};

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::core::DegreeCelsius;

/// Recurring weekly program: weekday → time of day → target temperature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekSchedule(BTreeMap<DayOfWeek, BTreeMap<TimeOfDay, DegreeCelsius>>);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl WeekSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, day: DayOfWeek, time: TimeOfDay, target: DegreeCelsius) -> Self {
        self.0.entry(day).or_default().insert(time, target);
        self
    }

    /// Same program on every day of the week.
    pub fn daily(slots: &[(TimeOfDay, DegreeCelsius)]) -> Self {
        DayOfWeek::ALL.iter().fold(Self::new(), |schedule, day| {
            slots
                .iter()
                .fold(schedule, |schedule, (time, target)| schedule.with(*day, *time, *target))
        })
    }

    pub fn slots(&self) -> impl Iterator<Item = (DayOfWeek, TimeOfDay, DegreeCelsius)> + '_ {
        self.0
            .iter()
            .flat_map(|(day, times)| times.iter().map(move |(time, target)| (*day, *time, *target)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|times| times.is_empty())
    }

    pub fn is_valid(&self) -> bool {
        self.slots().all(|(_, _, target)| target.is_finite())
    }
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl TimeOfDay {
    pub fn at(hour: u32, minute: u32) -> anyhow::Result<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| anyhow::anyhow!("Invalid time of day {}:{}", hour, minute))
    }

    pub fn naive(&self) -> NaiveTime {
        self.0
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NaiveTime::parse_from_str(&value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M:%S"))
            .map(Self)
            .map_err(|e| anyhow::anyhow!("Invalid time of day {:?}: {}", value, e))
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.second() == 0 {
            write!(f, "{}", self.0.format("%H:%M"))
        } else {
            write!(f, "{}", self.0.format("%H:%M:%S"))
        }
    }
}
