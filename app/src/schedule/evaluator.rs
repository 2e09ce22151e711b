use chrono::{Datelike, Days};

use crate::core::{
    DegreeCelsius, Timestamp,
    time::{from_naive, local_at},
};

use super::{DayOfWeek, TimeOfDay, WeekSchedule};

#[derive(Debug, Clone, PartialEq)]
pub struct HeatingScheduleEntry {
    pub start: Timestamp,
    pub target: DegreeCelsius,
}

/// A week program resolved against an instant: ascending by start, with the first entry being
/// the step active at that instant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeatingSchedule(Vec<HeatingScheduleEntry>);

impl HeatingSchedule {
    pub fn entries(&self) -> &[HeatingScheduleEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Step function: target of the last entry that started at or before `at`.
    pub fn active_target(&self, at: &Timestamp) -> Option<DegreeCelsius> {
        self.0
            .iter()
            .take_while(|entry| &entry.start <= at)
            .last()
            .map(|entry| entry.target)
    }
}

pub fn heating_schedule(week: &WeekSchedule, now: &Timestamp) -> HeatingSchedule {
    let mut upcoming: Vec<HeatingScheduleEntry> = week
        .slots()
        .filter_map(|(day, time, target)| {
            next_occurrence(day, time, now).map(|start| HeatingScheduleEntry { start, target })
        })
        .collect();

    upcoming.sort_by_key(|entry| entry.start);

    //every slot lies in the future, the latest one a week earlier is what is running now
    let Some(active) = upcoming.last().map(|latest| HeatingScheduleEntry {
        start: one_week_before(&latest.start),
        target: latest.target,
    }) else {
        return HeatingSchedule::default();
    };

    upcoming.insert(0, active);
    HeatingSchedule(upcoming)
}

pub fn scheduled_target(week: &WeekSchedule, now: &Timestamp) -> Option<DegreeCelsius> {
    heating_schedule(week, now).active_target(now)
}

fn next_occurrence(day: DayOfWeek, time: TimeOfDay, now: &Timestamp) -> Option<Timestamp> {
    let today = now.date_naive();

    (0..=7)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter(|date| DayOfWeek::from(date.weekday()) == day)
        .filter_map(|date| local_at(date, time.naive()))
        .find(|start| start >= now)
}

fn one_week_before(start: &Timestamp) -> Timestamp {
    start
        .naive_local()
        .checked_sub_days(Days::new(7))
        .and_then(from_naive)
        .unwrap_or_else(|| *start - chrono::TimeDelta::weeks(1))
}
