use chrono::{Datelike, Days, Duration, Months, NaiveDate, Weekday};
use serde::Serialize;

use crate::models::{Booking, BookingId, DateRange};

/// Calendar grid for the month of `reference`, weeks starting on Sunday.
pub fn generate_month_days(reference: NaiveDate) -> Vec<NaiveDate> {
    month_grid(reference, Weekday::Sun)
}

/// Every day from the start of the week holding the 1st of the month through
/// the end of the week holding its last day. Whole weeks (28, 35 or 42 days)
/// except where the grid is cut at the ends of the supported date range.
pub fn month_grid(reference: NaiveDate, week_start: Weekday) -> Vec<NaiveDate> {
    let first = start_of_month(reference);
    let last = end_of_month(reference);

    let lead = days_into_week(first.weekday(), week_start);
    let trail = 6 - days_into_week(last.weekday(), week_start);

    let grid_start = first
        .checked_sub_days(Days::new(lead))
        .unwrap_or(NaiveDate::MIN);
    let grid_end = last
        .checked_add_days(Days::new(trail))
        .unwrap_or(NaiveDate::MAX);

    grid_start
        .iter_days()
        .take_while(|day| *day <= grid_end)
        .collect()
}

pub fn start_of_month(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.day0()))
}

pub fn end_of_month(day: NaiveDate) -> NaiveDate {
    start_of_month(day)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

pub fn month_window(day: NaiveDate) -> DateRange {
    DateRange {
        start: start_of_month(day),
        end: end_of_month(day),
    }
}

pub fn year_window(day: NaiveDate) -> DateRange {
    let start = day - Duration::days(i64::from(day.ordinal0()));
    let end = start
        .checked_add_months(Months::new(12))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    DateRange { start, end }
}

/// Same calendar day `months` earlier, clamped to the end of shorter months.
pub fn shift_months(day: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        day.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        day.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(day)
}

fn days_into_week(weekday: Weekday, week_start: Weekday) -> u64 {
    let offset = 7 + weekday.num_days_from_sunday() - week_start.num_days_from_sunday();
    u64::from(offset % 7)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
    pub booking_ids: Vec<BookingId>,
}

/// Month grid annotated with the bookings that occupy each day.
pub fn calendar_days(reference: NaiveDate, today: NaiveDate, bookings: &[Booking]) -> Vec<CalendarDay> {
    let month = month_window(reference);
    generate_month_days(reference)
        .into_iter()
        .map(|date| CalendarDay {
            date,
            in_month: month.contains(date),
            is_today: date == today,
            booking_ids: bookings
                .iter()
                .filter(|booking| booking.range().contains(date))
                .map(|booking| booking.id)
                .collect(),
        })
        .collect()
}
