use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub type BookingId = i64;
pub type PropertyId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("End date {end} is before start date {start}.")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

/// Inclusive `[start, end]` span of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if end < start {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Two inclusive ranges overlap unless one ends strictly before the other starts.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        !(self.end < other.start || other.end < self.start)
    }

    pub fn clip(&self, window: &DateRange) -> Option<DateRange> {
        if !self.overlaps(window) {
            return None;
        }
        Some(DateRange {
            start: self.start.max(window.start),
            end: self.end.min(window.end),
        })
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        ((self.end - self.start).num_days() + 1).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub property_id: PropertyId,
    #[serde(rename = "name")]
    pub guest_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(with = "price_per_day")]
    pub price_per_day: f64,
}

impl Booking {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// Booking fields as written to the data store; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    #[validate(range(min = 1))]
    pub property_id: PropertyId,
    #[serde(rename = "name")]
    #[validate(length(min = 1, max = 255))]
    pub guest_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(with = "price_per_day")]
    #[validate(range(exclusive_min = 0.0))]
    pub price_per_day: f64,
}

impl BookingDraft {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PropertyDraft {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
}

/// The store keeps prices as strings (`"150"`) but older rows may hold numbers.
pub(crate) mod price_per_day {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(value),
            Raw::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| de::Error::custom(format!("invalid price per day '{text}'"))),
        }
    }
}
