use crate::error::{OrchestratorError, Result};
use regex::Regex;

/// EVM-style address: `0x` followed by 40 hex characters. Narrower formats
/// (ENS names, other chains) are out of scope — this only guards against
/// obviously malformed input reaching an adapter call.
const WALLET_ADDRESS_PATTERN: &str = r"^0x[a-fA-F0-9]{40}$";

const MAX_ACTION_LENGTH: usize = 200;

pub struct Validator {
    wallet_address_regex: Regex,
}

impl Validator {
    pub fn new() -> Result<Self> {
        let wallet_address_regex = Regex::new(WALLET_ADDRESS_PATTERN)
            .map_err(|e| OrchestratorError::Configuration(format!("invalid wallet regex: {e}")))?;
        Ok(Self { wallet_address_regex })
    }

    pub fn validate_wallet_address(&self, address: &str) -> Result<()> {
        if !self.wallet_address_regex.is_match(address) {
            return Err(OrchestratorError::Validation(format!(
                "'{address}' is not a well-formed wallet address"
            )));
        }
        Ok(())
    }

    pub fn validate_action(&self, action: &str) -> Result<()> {
        let trimmed = action.trim();
        if trimmed.is_empty() {
            return Err(OrchestratorError::Validation("action must not be empty".to_string()));
        }
        if trimmed.len() > MAX_ACTION_LENGTH {
            return Err(OrchestratorError::Validation(format!(
                "action exceeds {MAX_ACTION_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new().expect("wallet address pattern is a fixed, valid regex")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_wallet_address() {
        let validator = Validator::default();
        assert!(validator
            .validate_wallet_address("0x000000000000000000000000000000000000aB")
            .is_ok());
    }

    #[test]
    fn rejects_malformed_wallet_address() {
        let validator = Validator::default();
        assert!(validator.validate_wallet_address("not-an-address").is_err());
        assert!(validator.validate_wallet_address("0x123").is_err());
    }

    #[test]
    fn rejects_empty_action() {
        let validator = Validator::default();
        assert!(validator.validate_action("   ").is_err());
    }

    #[test]
    fn rejects_overlong_action() {
        let validator = Validator::default();
        let long_action = "a".repeat(MAX_ACTION_LENGTH + 1);
        assert!(validator.validate_action(&long_action).is_err());
    }
}
