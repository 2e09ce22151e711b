use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// Instants are kept in local time: schedules and house modes reason in wall-clock terms.
pub type Timestamp = chrono::DateTime<Local>;

pub fn now() -> Timestamp {
    Local::now()
}

/// Local instant for a wall-clock date and time. Ambiguous times resolve to the earlier instant,
/// times skipped by a DST change resolve to `None`.
pub fn local_at(date: NaiveDate, time: NaiveTime) -> Option<Timestamp> {
    from_naive(NaiveDateTime::new(date, time))
}

pub fn from_naive(naive: NaiveDateTime) -> Option<Timestamp> {
    Local.from_local_datetime(&naive).earliest()
}

#[cfg(test)]
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Timestamp {
    Local
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .earliest()
        .unwrap()
}
