//! Inbound frame validation rules.

use super::serializer::DecodeError;

/// Check size and emptiness of a raw inbound text frame.
pub fn validate_inbound(raw: &str, max_size: usize) -> Result<(), DecodeError> {
    if raw.len() > max_size {
        return Err(DecodeError::Malformed(format!(
            "Message exceeds maximum size of {max_size} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(DecodeError::Malformed("Empty message".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_oversized_and_blank() {
        assert!(validate_inbound(&"x".repeat(11), 10).is_err());
        assert!(validate_inbound("   ", 10).is_err());
        assert!(validate_inbound("{}", 10).is_ok());
    }
}
