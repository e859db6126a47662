use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    models::{Booking, DateRange, PropertyId},
    services::calendar::{month_window, shift_months, year_window},
};

fn intersecting<'a>(
    window: DateRange,
    property_id: PropertyId,
    bookings: &'a [Booking],
) -> impl Iterator<Item = &'a Booking> + 'a {
    bookings
        .iter()
        .filter(move |booking| booking.property_id == property_id && booking.range().overlaps(&window))
}

/// Revenue earned inside `window`: each booking is clipped to the window and
/// charged per day, both ends inclusive.
pub fn compute_revenue(window: DateRange, property_id: PropertyId, bookings: &[Booking]) -> f64 {
    intersecting(window, property_id, bookings)
        .filter_map(|booking| {
            booking
                .range()
                .clip(&window)
                .map(|clipped| clipped.days() as f64 * booking.price_per_day)
        })
        .sum()
}

/// Counts bookings touching the window; guests with several stays count once per stay.
pub fn compute_guest_count(window: DateRange, property_id: PropertyId, bookings: &[Booking]) -> usize {
    intersecting(window, property_id, bookings).count()
}

pub fn percentage_change(current: f64, previous: f64) -> String {
    if current == 0.0 && previous == 0.0 {
        return "0%".to_string();
    }
    if previous == 0.0 {
        return "100%".to_string();
    }
    format!("{:.2}%", (current - previous) / previous * 100.0)
}

/// Price of a stay: inclusive day count times the daily rate.
pub fn quote_total(range: DateRange, price_per_day: f64) -> f64 {
    range.days() as f64 * price_per_day
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueComparison {
    pub current: f64,
    pub previous: f64,
    pub change: String,
}

impl RevenueComparison {
    fn between(current: f64, previous: f64) -> Self {
        Self {
            current: round2(current),
            previous: round2(previous),
            change: percentage_change(current, previous),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyStats {
    pub property_id: PropertyId,
    pub today: NaiveDate,
    pub guests_this_month: usize,
    pub this_month: RevenueComparison,
    pub this_year: RevenueComparison,
    pub selected_month: NaiveDate,
    pub selected_month_label: String,
    pub selected_month_revenue: RevenueComparison,
}

/// Dashboard figures for one property as of `today`, plus the month holding
/// `selected_month` compared against the month before it.
pub fn property_stats(
    property_id: PropertyId,
    today: NaiveDate,
    selected_month: NaiveDate,
    bookings: &[Booking],
) -> PropertyStats {
    let revenue = |window: DateRange| compute_revenue(window, property_id, bookings);

    let this_month = month_window(today);
    let last_month = month_window(shift_months(today, -1));
    let this_year = year_window(today);
    let last_year = year_window(shift_months(today, -12));
    let selected = month_window(selected_month);
    let before_selected = month_window(shift_months(selected.start, -1));

    PropertyStats {
        property_id,
        today,
        guests_this_month: compute_guest_count(this_month, property_id, bookings),
        this_month: RevenueComparison::between(revenue(this_month), revenue(last_month)),
        this_year: RevenueComparison::between(revenue(this_year), revenue(last_year)),
        selected_month: selected.start,
        selected_month_label: selected.start.format("%B %Y").to_string(),
        selected_month_revenue: RevenueComparison::between(revenue(selected), revenue(before_selected)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
