//! Order field rules.

use super::error::DomainError;

pub const PAYMENT_ID_MAX_CHARS: usize = 100;

pub fn validate_payment_id(value: &str) -> Result<String, DomainError> {
    let payment_id = value.trim();
    if payment_id.is_empty() {
        return Err(DomainError::validation("payment_id", "must not be empty"));
    }
    if payment_id.chars().count() > PAYMENT_ID_MAX_CHARS {
        return Err(DomainError::validation(
            "payment_id",
            format!("must be at most {PAYMENT_ID_MAX_CHARS} characters"),
        ));
    }
    Ok(payment_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_id_rules() {
        assert_eq!(validate_payment_id(" pay_123 ").unwrap(), "pay_123");
        assert!(validate_payment_id("  ").is_err());
        assert!(validate_payment_id(&"p".repeat(PAYMENT_ID_MAX_CHARS + 1)).is_err());
    }
}
