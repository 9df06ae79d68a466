use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// working-day calendar collaborator
///
/// the builder shifts due dates that land on non-working days forward to the
/// next working day
pub trait HolidayCalendar {
    fn is_working_day(&self, date: NaiveDate) -> bool;

    /// roll forward to the next working day
    fn adjusted(&self, date: NaiveDate) -> NaiveDate {
        let mut d = date;
        while !self.is_working_day(d) {
            d = d + Days::new(1);
        }
        d
    }
}

/// every day is a working day; no shifting
#[derive(Debug, Clone, Copy, Default)]
pub struct EveryDay;

impl HolidayCalendar for EveryDay {
    fn is_working_day(&self, _date: NaiveDate) -> bool {
        true
    }
}

/// monday-friday week with an explicit holiday set
#[derive(Debug, Clone, Default)]
pub struct WorkingWeek {
    holidays: BTreeSet<NaiveDate>,
}

impl WorkingWeek {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }
}

impl HolidayCalendar for WorkingWeek {
    fn is_working_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}
