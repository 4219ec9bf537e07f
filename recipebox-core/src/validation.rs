//! Field-level validation shared by every write endpoint.
//!
//! Validators never stop at the first problem: they record messages against
//! a field key in [`FieldErrors`] so a client gets every mistake in one
//! response.

use bigdecimal::BigDecimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_LINK_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 255;

/// Price columns are NUMERIC(5, 2).
pub const PRICE_MAX_DIGITS: i64 = 5;
pub const PRICE_DECIMAL_PLACES: i64 = 2;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

/// Map of field key -> messages. Nested fields use `tags[0].name` style keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl std::error::Error for FieldErrors {}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(value)` when nothing was recorded, otherwise the collected errors.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

/// Trimmed, non-blank, bounded text. Returns `None` after recording an error.
pub fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
    max_len: usize,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if trimmed.chars().count() > max_len {
        errors.add(field, max_length_message(max_len));
        return None;
    }
    Some(trimmed.to_string())
}

/// Trimmed text that may be blank.
pub fn optional_text(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
    max_len: Option<usize>,
) -> Option<String> {
    let trimmed = value.trim();
    if let Some(max) = max_len {
        if trimmed.chars().count() > max {
            errors.add(field, max_length_message(max));
            return None;
        }
    }
    Some(trimmed.to_string())
}

pub fn title(errors: &mut FieldErrors, value: &str) -> Option<String> {
    required_text(errors, "title", value, MAX_TITLE_LEN)
}

pub fn link(errors: &mut FieldErrors, value: &str) -> Option<String> {
    optional_text(errors, "link", value, Some(MAX_LINK_LEN))
}

pub fn label_name(errors: &mut FieldErrors, field: &str, value: &str) -> Option<String> {
    required_text(errors, field, value, MAX_NAME_LEN)
}

pub fn time_minutes(errors: &mut FieldErrors, value: i64) -> Option<i32> {
    if value < 0 {
        errors.add(
            "time_minutes",
            "Ensure this value is greater than or equal to 0.",
        );
        return None;
    }
    match i32::try_from(value) {
        Ok(minutes) => Some(minutes),
        Err(_) => {
            errors.add(
                "time_minutes",
                format!("Ensure this value is less than or equal to {}.", i32::MAX),
            );
            None
        }
    }
}

/// Checks precision against NUMERIC(5, 2) and rescales to two places.
///
/// Trailing zeros do not count as decimal places, so `5.000` is accepted.
pub fn price(errors: &mut FieldErrors, value: &BigDecimal) -> Option<BigDecimal> {
    let normalized = value.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    let digits = normalized.digits() as i64;
    let decimal_places = scale.max(0);
    let whole_digits = if normalized == BigDecimal::from(0) {
        0
    } else {
        digits - scale
    };

    let mut valid = true;
    if decimal_places > PRICE_DECIMAL_PLACES {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {} decimal places.",
                PRICE_DECIMAL_PLACES
            ),
        );
        valid = false;
    }
    if whole_digits > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES
            ),
        );
        valid = false;
    }

    valid.then(|| normalized.with_scale(PRICE_DECIMAL_PLACES))
}

/// Wire form of a price: always two decimal places, `0` renders as `"0.00"`.
pub fn render_price(value: &BigDecimal) -> String {
    let (units, _) = value
        .with_scale(PRICE_DECIMAL_PLACES)
        .as_bigint_and_exponent();
    let raw = units.to_string();
    let (sign, magnitude) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let places = PRICE_DECIMAL_PLACES as usize;
    let padded = format!("{:0>width$}", magnitude, width = places + 1);
    let (whole, cents) = padded.split_at(padded.len() - places);
    format!("{}{}.{}", sign, whole, cents)
}
