use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub title: String,
}

/// Per-user non-working day: a recurring weekday or a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeeklyOff {
    Fixed(Weekday),
    OneOff(NaiveDate),
}

impl WeeklyOff {
    pub fn matches(&self, day: NaiveDate) -> bool {
        match self {
            WeeklyOff::Fixed(weekday) => day.weekday() == *weekday,
            WeeklyOff::OneOff(date) => *date == day,
        }
    }
}

pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// One user's view of the calendar over some range.
#[derive(Debug, Clone, Default)]
pub struct WorkCalendar {
    holidays: HashSet<NaiveDate>,
    offs: Vec<WeeklyOff>,
}

impl WorkCalendar {
    pub fn new(holidays: impl IntoIterator<Item = Holiday>, offs: Vec<WeeklyOff>) -> Self {
        Self {
            holidays: holidays.into_iter().map(|h| h.date).collect(),
            offs,
        }
    }

    pub fn is_holiday(&self, day: NaiveDate) -> bool {
        self.holidays.contains(&day)
    }

    pub fn is_weekly_off(&self, day: NaiveDate) -> bool {
        self.offs.iter().any(|off| off.matches(day))
    }

    pub fn is_non_working(&self, day: NaiveDate) -> bool {
        self.is_holiday(day) || self.is_weekly_off(day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).expect("valid date")
    }

    #[test]
    fn fixed_and_one_off_days_are_non_working() {
        // 2025-04-13 is a Sunday.
        let calendar = WorkCalendar::new(
            vec![Holiday {
                date: d(14),
                title: "New Year".into(),
            }],
            vec![WeeklyOff::Fixed(Weekday::Sun), WeeklyOff::OneOff(d(16))],
        );

        assert!(calendar.is_weekly_off(d(13)));
        assert!(calendar.is_weekly_off(d(20)));
        assert!(calendar.is_holiday(d(14)));
        assert!(calendar.is_non_working(d(16)));
        assert!(!calendar.is_non_working(d(15)));
    }

    #[test]
    fn weekday_indices_start_on_monday() {
        assert_eq!(weekday_from_index(0), Some(Weekday::Mon));
        assert_eq!(weekday_from_index(6), Some(Weekday::Sun));
        assert_eq!(weekday_from_index(7), None);
    }
}
