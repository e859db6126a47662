use crate::models::{Booking, BookingId, DateRange, PropertyId};

/// Bookings of `property_id` whose inclusive range shares a day with `candidate`.
/// The booking being edited is skipped when `exclude_booking_id` names it.
pub fn conflicting_bookings<'a>(
    candidate: DateRange,
    property_id: PropertyId,
    exclude_booking_id: Option<BookingId>,
    bookings: &'a [Booking],
) -> impl Iterator<Item = &'a Booking> + 'a {
    bookings.iter().filter(move |booking| {
        booking.property_id == property_id
            && Some(booking.id) != exclude_booking_id
            && candidate.overlaps(&booking.range())
    })
}

/// A checkout on the same day as another check-in still counts as a conflict.
pub fn has_overlap(
    candidate: DateRange,
    property_id: PropertyId,
    exclude_booking_id: Option<BookingId>,
    bookings: &[Booking],
) -> bool {
    conflicting_bookings(candidate, property_id, exclude_booking_id, bookings)
        .next()
        .is_some()
}
