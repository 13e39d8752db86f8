//! Reusable input filters
//!
//! Filters transform raw form text before validation.

/// Filter: trim whitespace
pub fn trim(value: &str) -> String {
    value.trim().to_string()
}

/// Filter: convert to uppercase
pub fn uppercase(value: &str) -> String {
    value.to_uppercase()
}

/// Filter: trim, then uppercase
///
/// Applied to SDY numbers, party names, deniers and SL numbers.
pub fn code(value: &str) -> String {
    uppercase(&trim(value))
}

/// Filter: `None` for blank text, otherwise the normalized code
pub fn optional_code(value: &str) -> Option<String> {
    let normalized = code(value);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
