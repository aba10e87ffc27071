use std::collections::HashSet;

use time::error::ComponentRange;
use time::{Date, Month};

use crate::holiday::Holiday;

/// Column headers, Sunday first.
pub const WEEKDAY_HEADERS: [&str; 7] = ["S", "M", "T", "W", "T", "F", "S"];

const SUNDAY: usize = 0;
const SATURDAY: usize = 6;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Membership {
    /// Filler from the tail of the previous month.
    Previous,
    Current,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Highlight {
    Today,
    /// Sunday or public holiday.
    Red,
    /// Saturday.
    Blue,
    Neutral,
    /// Filler cells are drawn muted and never highlighted.
    Muted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarDay {
    pub day: u8,
    pub membership: Membership,
    /// `YYYY-MM-DD`
    pub date: String,
    pub highlight: Highlight,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: Month,
    pub is_current: bool,
    /// Row-major, seven columns, starting on a Sunday.
    pub cells: Vec<CalendarDay>,
}

impl MonthGrid {
    /// Lay out `month` of `year`.
    ///
    /// `today` is the day of the month to mark when this is the current month.
    pub fn build(
        year: i32,
        month: Month,
        today: Option<u8>,
        holidays: &[Holiday],
    ) -> Result<Self, ComponentRange> {
        let first = Date::from_calendar_date(year, month, 1)?;
        let leading = first.weekday().number_days_from_sunday();
        let days_in_month = month.length(year);

        let (previous_year, previous_month) = match month {
            Month::January => (year - 1, Month::December),
            _ => (year, month.previous()),
        };
        let days_in_previous = previous_month.length(previous_year);

        let holiday_dates: HashSet<&str> = holidays.iter().map(|h| h.date.as_str()).collect();

        let filler = (days_in_previous - leading + 1..=days_in_previous).map(|day| CalendarDay {
            day,
            membership: Membership::Previous,
            date: iso_date(previous_year, previous_month, day),
            highlight: Highlight::Muted,
        });

        let current = (1..=days_in_month).map(|day| (day, iso_date(year, month, day)));

        let mut cells: Vec<CalendarDay> = filler.collect();
        for (day, date) in current {
            let column = cells.len() % 7;
            let highlight = if today == Some(day) {
                Highlight::Today
            } else if column == SUNDAY || holiday_dates.contains(date.as_str()) {
                Highlight::Red
            } else if column == SATURDAY {
                Highlight::Blue
            } else {
                Highlight::Neutral
            };

            cells.push(CalendarDay {
                day,
                membership: Membership::Current,
                date,
                highlight,
            });
        }

        Ok(Self {
            year,
            month,
            is_current: today.is_some(),
            cells,
        })
    }

    /// The cells split into calendar weeks. The last row may be short.
    pub fn weeks(&self) -> std::slice::Chunks<'_, CalendarDay> {
        self.cells.chunks(7)
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.month, self.year)
    }
}

/// The month containing `today` and the one after it.
pub fn two_months(today: Date, holidays: &[Holiday]) -> Result<[MonthGrid; 2], ComponentRange> {
    let (next_year, next_month) = match today.month() {
        Month::December => (today.year() + 1, Month::January),
        month => (today.year(), month.next()),
    };

    Ok([
        MonthGrid::build(today.year(), today.month(), Some(today.day()), holidays)?,
        MonthGrid::build(next_year, next_month, None, holidays)?,
    ])
}

fn iso_date(year: i32, month: Month, day: u8) -> String {
    format!("{:04}-{:02}-{:02}", year, month as u8, day)
}
