use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Db(String),
}

/// Reject blank values and values longer than `max` characters.
pub fn validate_bounded(field: &str, value: &str, max: usize) -> Result<(), ModelError> {
    if value.trim().is_empty() {
        return Err(ModelError::Validation(format!("{field} required")));
    }
    if value.chars().count() > max {
        return Err(ModelError::Validation(format!("{field} longer than {max} characters")));
    }
    Ok(())
}
