//! Shared error types for the content optimization system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Serialization failed: {message}")]
    SerializationError { message: String },

    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Invalid value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

impl From<serde_json::Error> for SharedError {
    fn from(error: serde_json::Error) -> Self {
        if error.is_data() || error.is_syntax() || error.is_eof() {
            SharedError::DeserializationError {
                message: error.to_string(),
            }
        } else {
            SharedError::SerializationError {
                message: error.to_string(),
            }
        }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;

/// Check that a value is a finite number in [0, 1]
pub fn ensure_unit_interval(field: &str, value: f64) -> SharedResult<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SharedError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_interval_validation() {
        assert!(ensure_unit_interval("actual", 0.0).is_ok());
        assert!(ensure_unit_interval("actual", 1.0).is_ok());
        assert!(ensure_unit_interval("actual", 1.01).is_err());
        assert!(ensure_unit_interval("actual", f64::NAN).is_err());
        assert!(ensure_unit_interval("actual", -0.1).is_err());
    }

    #[test]
    fn test_json_syntax_error_maps_to_deserialization() {
        let error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(
            SharedError::from(error),
            SharedError::DeserializationError { .. }
        ));
    }
}
