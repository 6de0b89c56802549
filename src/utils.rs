use chrono::{DateTime, Datelike as _, Days, FixedOffset, Months, NaiveDate};
use serde::{Deserialize, Deserializer};

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date) + Months::new(1) - Days::new(1)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    last_of_month(date).day()
}

/// The given day-of-month inside the month of `date`, clamped to the month's last day
///
/// ```rs
/// anchored_day(2024-02-10, 31) == 2024-02-29
/// ```
pub fn anchored_day(date: NaiveDate, day: u32) -> NaiveDate {
    let day = day.clamp(1, days_in_month(date));

    first_of_month(date) + Days::new(u64::from(day - 1))
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);

    (value * factor).round() / factor
}

pub fn hours_between(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> f64 {
    let seconds = (*end - *start).num_milliseconds() as f64 / 1000.0;

    round_to(seconds / 3600.0, 2)
}

/// Tells apart a missing JSON field (`None`) from an explicit `null` (`Some(None)`)
///
/// Use together with `#[serde(default)]`
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
