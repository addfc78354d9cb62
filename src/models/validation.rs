use chrono::{DateTime, Utc};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::{AppError, FieldError};

/// Guarded and cross-field checks that sit on top of the declarative
/// `#[validate(...)]` attributes of a payload.
pub trait Rules: Validate {
    fn rules(&self, _now: DateTime<Utc>) -> Vec<FieldError> {
        Vec::new()
    }
}

/// Run both the attribute constraints and the payload's rules, collecting
/// every failure into one validation error.
pub fn validate_payload<T: Rules>(payload: &T) -> Result<(), AppError> {
    validate_payload_at(payload, Utc::now())
}

pub fn validate_payload_at<T: Rules>(payload: &T, now: DateTime<Utc>) -> Result<(), AppError> {
    let mut errors = match payload.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => flatten(&errors),
    };
    errors.extend(payload.rules(now));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn flatten(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut flattened: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, failures)| {
            let field = to_camel_case(&field.to_string());
            failures
                .iter()
                .map(move |failure| FieldError::new(field.clone(), message_for(failure)))
        })
        .collect();

    // HashMap order is not stable
    flattened.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    flattened
}

fn message_for(failure: &ValidationError) -> String {
    match &failure.message {
        Some(message) => message.to_string(),
        None => format!("failed the '{}' check", failure.code),
    }
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Treat empty or whitespace-only strings as absent.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A date is acceptable when it is strictly after the minimum representable
/// instant and strictly before `now`.
pub fn is_past_date(date: &DateTime<Utc>, now: DateTime<Utc>) -> bool {
    *date > DateTime::<Utc>::MIN_UTC && *date < now
}

/// Checks a required date field against [`is_past_date`].
pub fn check_required_past_date(
    field: &str,
    value: Option<&DateTime<Utc>>,
    now: DateTime<Utc>,
    errors: &mut Vec<FieldError>,
) {
    match value {
        None => errors.push(FieldError::new(field, format!("{field} is required."))),
        Some(date) => check_past_date(field, date, now, errors),
    }
}

pub fn check_past_date(
    field: &str,
    date: &DateTime<Utc>,
    now: DateTime<Utc>,
    errors: &mut Vec<FieldError>,
) {
    if !is_past_date(date, now) {
        errors.push(FieldError::new(
            field,
            format!("{field} must be a valid date in the past."),
        ));
    }
}

/// Both bounds of an eligibility window, when present, must be ordered.
pub fn check_age_window(
    minimum_age: Option<i32>,
    maximum_age: Option<i32>,
    errors: &mut Vec<FieldError>,
) {
    if let (Some(min), Some(max)) = (minimum_age, maximum_age) {
        if min > max {
            errors.push(FieldError::new(
                "minimumAge",
                format!("minimumAge ({min}) cannot be greater than maximumAge ({max})."),
            ));
        }
    }
}
