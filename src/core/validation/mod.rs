//! Form validation and input filtering
//!
//! Filters normalize raw form text before validators run. Validators are small
//! closures over a field name and its value, collected by [`FormCheck`] so a
//! form reports every invalid field at once.

pub mod filters;
pub mod validators;

use crate::core::error::{DyehouseError, FieldError, Result};

/// Collects field errors for one form submission
#[derive(Debug, Default)]
pub struct FormCheck {
    errors: Vec<FieldError>,
}

impl FormCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `validator` against `value`, recording a failure under `field`
    pub fn check<T: ?Sized, V>(&mut self, field: &str, value: &T, validator: V) -> &mut Self
    where
        V: Fn(&str, &T) -> std::result::Result<(), String>,
    {
        if let Err(message) = validator(field, value) {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// `Ok` when nothing failed, otherwise a `Validation` error with every field
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DyehouseError::Validation(self.errors))
        }
    }
}
