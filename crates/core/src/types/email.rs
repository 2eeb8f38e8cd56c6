//! Merchant email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address was rejected on the sign-in or sign-up form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("Enter your email address")]
    Empty,
    #[error("Email addresses are limited to {0} characters")]
    TooLong(usize),
    #[error("Email address needs a name and a domain around a single @")]
    Malformed,
    #[error("Email address cannot contain spaces")]
    Whitespace,
}

/// A trimmed, lowercased email address.
///
/// Only the shape is checked (`local@domain`); the auth backend decides
/// whether the address actually exists.
///
/// ```
/// use bizgrow_core::Email;
///
/// let email = Email::parse(" Ravi@RaoStores.in ").unwrap();
/// assert_eq!(email.as_str(), "ravi@raostores.in");
/// assert!(Email::parse("ravi@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate and normalise `input`.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first problem found.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong(Self::MAX_LENGTH));
        }
        if trimmed.contains(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        match trimmed.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(trimmed.to_lowercase()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for input in ["ravi@raostores.in", "orders+web@bakery.co.in", "a@b"] {
            assert!(Email::parse(input).is_ok(), "{input}");
        }
    }

    #[test]
    fn test_normalises_case_and_padding() {
        let email = Email::parse("  Meena@Boutique.IN\n").unwrap();
        assert_eq!(email.as_str(), "meena@boutique.in");
        assert_eq!(email.domain(), "boutique.in");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("   ").unwrap_err(), EmailError::Empty);
        assert_eq!(Email::parse("no-at").unwrap_err(), EmailError::Malformed);
        assert_eq!(Email::parse("@shop.in").unwrap_err(), EmailError::Malformed);
        assert_eq!(Email::parse("ravi@").unwrap_err(), EmailError::Malformed);
        assert_eq!(Email::parse("a@b@c.in").unwrap_err(), EmailError::Malformed);
        assert_eq!(
            Email::parse("ravi rao@shop.in").unwrap_err(),
            EmailError::Whitespace
        );
        let long = format!("{}@shop.in", "x".repeat(250));
        assert_eq!(Email::parse(&long).unwrap_err(), EmailError::TooLong(254));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Email = serde_json::from_str("\"Ravi@Shop.in\"").unwrap();
        assert_eq!(ok.to_string(), "ravi@shop.in");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
