//! # Validation Module
//!
//! Field validation for client types created or edited out-of-band.
//!
//! ## Usage
//! ```rust
//! use roster_core::validation::{validate_record_id, validate_type_name};
//!
//! validate_type_name("Wholesale").unwrap();
//! validate_record_id("550e8400-e29b-41d4-a716-446655440000").unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::ClientType;
use crate::{MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a client-type name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `MAX_NAME_LENGTH` characters
pub fn validate_type_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates an optional description.
pub fn validate_description(description: Option<&str>) -> ValidationResult<()> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => {
            Err(ValidationError::TooLong {
                field: "description".to_string(),
                max: MAX_DESCRIPTION_LENGTH,
            })
        }
        _ => Ok(()),
    }
}

/// Validates a record id.
///
/// Ids are opaque: locally created records get a UUID, but ids that came
/// from the remote may take any shape. Only empty ids and ids with
/// surrounding whitespace are rejected.
pub fn validate_record_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.trim() != id {
        return Err(ValidationError::InvalidFormat {
            field: "id".to_string(),
            reason: "must not have surrounding whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates every user-editable field of a new record.
pub fn validate_new_record(record: &ClientType) -> ValidationResult<()> {
    validate_record_id(&record.id)?;
    validate_type_name(&record.name)?;
    validate_description(record.description.as_deref())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_type_name() {
        assert!(validate_type_name("Retail").is_ok());
        assert!(validate_type_name("  Padded  ").is_ok());

        assert!(validate_type_name("").is_err());
        assert!(validate_type_name("   ").is_err());
        assert!(validate_type_name(&"A".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description(None).is_ok());
        assert!(validate_description(Some("Walk-in customers")).is_ok());
        assert!(validate_description(Some(&"x".repeat(MAX_DESCRIPTION_LENGTH + 1))).is_err());
    }

    #[test]
    fn test_validate_record_id() {
        assert!(validate_record_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_record_id("ct_retail").is_ok());
        assert!(validate_record_id("").is_err());
        assert!(validate_record_id(" ct_retail").is_err());
    }

    #[test]
    fn test_validate_new_record() {
        assert!(validate_new_record(&ClientType::new("Retail")).is_ok());
        assert!(validate_new_record(&ClientType::new("")).is_err());
        assert!(validate_new_record(&ClientType::new("Retail").with_id("remote-42")).is_ok());
        assert!(validate_new_record(&ClientType::new("Retail").with_id("   ")).is_err());
    }
}
