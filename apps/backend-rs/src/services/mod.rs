pub mod calendar;
pub mod overlap;
pub mod revenue;
