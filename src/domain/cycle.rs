//! Pay cycles anchored to the worker's hire day-of-month.
//!
//! A worker hired on the 15th is paid for the 15th up to the 14th of the next
//! month. Months lacking the hire day use their last day instead.

use chrono::{Datelike as _, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Cycle {
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.end - today).num_days()
    }
}

/// Cycle covering `today` for a worker hired on `hire_date`
///
/// Recomputed on every read, never stored. The end is the day before the next
/// anchor, not `start + 1 month - 1 day`: hired on the 30th, the cycle starting
/// on a clamped Feb 29 runs to Mar 29.
pub fn cycle_for(hire_date: NaiveDate, today: NaiveDate) -> Cycle {
    let hire_day = hire_date.day();

    let this_month = utils::anchored_day(today, hire_day);
    let start = if today >= this_month {
        this_month
    } else {
        utils::anchored_day(utils::first_of_month(today) - Months::new(1), hire_day)
    };

    let next_start = utils::anchored_day(utils::first_of_month(start) + Months::new(1), hire_day);

    Cycle {
        start,
        end: next_start - Days::new(1),
    }
}

/// First salary date of a worker registered on `today`
pub fn next_payment_for(hire_date: NaiveDate, today: NaiveDate) -> NaiveDate {
    if hire_date == today {
        return hire_date + Months::new(1);
    }

    if today.day() <= hire_date.day() {
        utils::anchored_day(today, hire_date.day())
    } else {
        utils::anchored_day(utils::first_of_month(today) + Months::new(1), hire_date.day())
    }
}
