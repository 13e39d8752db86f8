//! Reusable field validators
//!
//! Each constructor returns a closure taking the field name and its value.

use chrono::NaiveDate;

/// Validator: text must not be blank
pub fn required(
    message: &'static str,
) -> impl Fn(&str, &str) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &str| {
        if value.trim().is_empty() {
            Err(message.to_string())
        } else {
            Ok(())
        }
    }
}

/// Validator: an optional value must be present
pub fn present<T>(
    message: &'static str,
) -> impl Fn(&str, &Option<T>) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &Option<T>| {
        if value.is_some() {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }
}

/// Validator: number must be positive
pub fn positive() -> impl Fn(&str, &i64) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &i64| {
        if *value <= 0 {
            Err(format!("'{}' must be a positive number (value: {})", field, value))
        } else {
            Ok(())
        }
    }
}

/// Validator: date must not be earlier than `today`
pub fn not_before(
    today: NaiveDate,
) -> impl Fn(&str, &NaiveDate) -> Result<(), String> + Send + Sync + Clone {
    move |_: &str, value: &NaiveDate| {
        if *value < today {
            Err("Backdating orders is not allowed".to_string())
        } else {
            Ok(())
        }
    }
}
