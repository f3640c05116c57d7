//! Account email model
//!
//! An account owns a collection of email addresses keyed by the address itself.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::ChildEntity;
use super::ids::ParentId;

/// Payload of one account email row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Address as supplied by the caller, original casing preserved
    pub address: String,
}

/// An email row belonging to an account
pub type AccountEmail = ChildEntity<EmailAddress>;

impl EmailAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into().trim().to_string(),
        }
    }

    /// Validate the address shape
    pub fn validate(&self) -> Result<(), EmailValidationError> {
        if self.address.is_empty() {
            return Err(EmailValidationError::Empty);
        }

        if self.address.len() > 254 {
            return Err(EmailValidationError::TooLong(self.address.len()));
        }

        match self.address.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(EmailValidationError::Malformed(self.address.clone())),
        }
    }
}

impl ChildEntity<EmailAddress> {
    /// Build an unsaved email row for an account
    pub fn email(account_id: ParentId, address: impl Into<String>) -> Self {
        let payload = EmailAddress::new(address);
        ChildEntity::new(account_id, payload.address.clone(), payload)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Validation errors for email addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailValidationError {
    Empty,
    TooLong(usize),
    Malformed(String),
}

impl fmt::Display for EmailValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Email address cannot be empty"),
            Self::TooLong(len) => {
                write!(f, "Email address too long ({} chars, max 254)", len)
            }
            Self::Malformed(address) => write!(f, "Malformed email address: '{}'", address),
        }
    }
}

impl std::error::Error for EmailValidationError {}
