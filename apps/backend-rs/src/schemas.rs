use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{BookingDraft, BookingId, DateRange, PropertyDraft, PropertyId},
};

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp; time of day is dropped.
/// Years are limited to four digits.
pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|parsed| parsed.date_naive()))
        .ok()
        .filter(|date| (1..=9999).contains(&date.year()))
        .ok_or_else(|| AppError::BadRequest("Invalid date format".to_string()))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl CredentialsInput {
    pub fn into_credentials(self) -> AppResult<Credentials> {
        let (Some(email), Some(password)) = (non_empty(self.email), non_empty(self.password)) else {
            return Err(AppError::BadRequest(
                "Email and password are required".to_string(),
            ));
        };
        let credentials = Credentials { email, password };
        validate_input(&credentials)?;
        Ok(credentials)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertyInput {
    pub name: Option<String>,
    pub location: Option<String>,
}

impl PropertyInput {
    pub fn into_draft(self) -> AppResult<PropertyDraft> {
        let (Some(name), Some(location)) = (non_empty(self.name), non_empty(self.location)) else {
            return Err(AppError::BadRequest(
                "Name and location are required".to_string(),
            ));
        };
        let draft = PropertyDraft { name, location };
        validate_input(&draft)?;
        Ok(draft)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingInput {
    pub name: Option<String>,
    pub property_id: Option<Value>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub price_per_day: Option<Value>,
}

impl BookingInput {
    pub fn into_draft(self) -> AppResult<BookingDraft> {
        let name = non_empty(self.name);
        let property_id = self.property_id.as_ref().and_then(integer_from_value);
        let start_date = non_empty(self.start_date);
        let end_date = non_empty(self.end_date);
        let price_per_day = self.price_per_day.as_ref().and_then(number_from_value);

        let (Some(name), Some(property_id), Some(start_date), Some(end_date), Some(price_per_day)) =
            (name, property_id, start_date, end_date, price_per_day)
        else {
            return Err(AppError::BadRequest(
                "name, propertyId, startDate, endDate, and pricePerDay are required".to_string(),
            ));
        };

        let range = DateRange::new(parse_date(&start_date)?, parse_date(&end_date)?)?;
        let draft = BookingDraft {
            property_id,
            guest_name: name,
            start_date: range.start,
            end_date: range.end,
            price_per_day,
        };
        validate_input(&draft)?;
        Ok(draft)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingsQuery {
    #[serde(alias = "propertyId")]
    pub property_id: Option<PropertyId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

impl MonthQuery {
    pub fn reference_or(&self, today: NaiveDate) -> AppResult<NaiveDate> {
        match non_empty(self.month.clone()) {
            Some(raw) => parse_date(&raw),
            None => Ok(today),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub start: String,
    pub end: String,
    #[serde(alias = "exclude_booking_id")]
    pub exclude_booking_id: Option<BookingId>,
    #[serde(alias = "price_per_day")]
    pub price_per_day: Option<f64>,
}

impl AvailabilityQuery {
    pub fn range(&self) -> AppResult<DateRange> {
        Ok(DateRange::new(parse_date(&self.start)?, parse_date(&self.end)?)?)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn integer_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}
