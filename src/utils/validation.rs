use crate::domain::model::TimeOfDay;
use crate::utils::error::{Result, SchedulingError};
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(SchedulingError::ValidationError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_time_range(field_name: &str, start: TimeOfDay, end: TimeOfDay) -> Result<()> {
    if start >= end {
        return Err(SchedulingError::ValidationError {
            field: field_name.to_string(),
            value: format!("{}-{}", start, end),
            reason: "Start time must be before end time".to_string(),
        });
    }
    Ok(())
}

pub fn validate_unique<T>(field_name: &str, values: impl IntoIterator<Item = T>) -> Result<()>
where
    T: Eq + Hash + Display,
{
    let mut seen = HashSet::new();
    for value in values {
        if seen.contains(&value) {
            return Err(SchedulingError::ValidationError {
                field: field_name.to_string(),
                value: value.to_string(),
                reason: "Duplicate value".to_string(),
            });
        }
        seen.insert(value);
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SchedulingError::ValidationError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}
