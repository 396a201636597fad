use std::collections::{BTreeSet, HashSet};
use std::ops::RangeInclusive;

use chrono::{Datelike, Duration, NaiveDate};

use crate::domain::supplier::Weekday;

/// How many calendar days ahead to look for a delivery slot before treating
/// the supplier as unschedulable.
pub const SEARCH_HORIZON_DAYS: u32 = 14;

/// Precomputed holiday lookup. Implementations must be pure; the scan below
/// queries one date per step and never blocks on I/O.
pub trait HolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// Earliest date strictly after `today` whose weekday is in the supplier's
/// delivery set and which is not a public holiday. Holidays count exactly
/// like non-delivery weekdays. Returns `None` once the horizon is exhausted.
pub fn next_delivery_date(
    today: NaiveDate,
    delivery_weekdays: &HashSet<Weekday>,
    calendar: &dyn HolidayCalendar,
) -> Option<NaiveDate> {
    let mut candidate = today + Duration::days(1);
    for _ in 0..SEARCH_HORIZON_DAYS {
        if !calendar.is_holiday(candidate)
            && delivery_weekdays.contains(&Weekday::from_chrono(candidate.weekday()))
        {
            return Some(candidate);
        }
        candidate += Duration::days(1);
    }
    None
}

/// Calendar with no holidays at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}

/// Public holidays for one region over a fixed year range, materialized as a
/// date set at construction time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionalHolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl RegionalHolidayCalendar {
    /// Region codes follow ISO 3166-2. Only German regions are configured
    /// today; unknown codes return `None`.
    pub fn for_region(region: &str, years: RangeInclusive<i32>) -> Option<Self> {
        match region {
            "DE-SH" => Some(Self::schleswig_holstein(years)),
            _ => None,
        }
    }

    /// Statutory holidays of Schleswig-Holstein: the nationwide fixed dates,
    /// Reformation Day, and the four Easter-derived days.
    pub fn schleswig_holstein(years: RangeInclusive<i32>) -> Self {
        let mut dates = BTreeSet::new();
        for year in years {
            for (month, day) in [(1, 1), (5, 1), (10, 3), (10, 31), (12, 25), (12, 26)] {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    dates.insert(date);
                }
            }
            if let Some(easter) = easter_sunday(year) {
                // Good Friday, Easter Monday, Ascension, Whit Monday.
                for offset in [-2, 1, 39, 50] {
                    dates.insert(easter + Duration::days(offset));
                }
            }
        }
        Self { dates }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl HolidayCalendar for RegionalHolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

/// Anonymous Gregorian computus.
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}
