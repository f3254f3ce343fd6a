//! Domain identifier types with proper encapsulation.
//!
//! Both identifiers validate on construction, so every value that reaches the
//! engine has already passed its format check.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Check a number with the mod-10 (Luhn) algorithm.
///
/// Digits are read from the right, every second digit is doubled (minus nine
/// when it exceeds nine) and the sum must be divisible by ten. Spaces are
/// skipped; any other non-digit rejects the input, as does an input with no
/// digits at all.
#[must_use]
pub fn luhn_valid(number: &str) -> bool {
    let mut sum = 0u32;
    let mut digits = 0usize;

    for ch in number.chars().rev() {
        if ch == ' ' {
            continue;
        }
        let Some(mut d) = ch.to_digit(10) else {
            return false;
        };
        if digits % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        digits += 1;
    }

    digits > 0 && sum % 10 == 0
}

/// Order number - newtype for type safety.
///
/// Construction goes through [`OrderNumber::parse`], which enforces the Luhn
/// check. The same format is required of withdrawal references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Validate and wrap an order number.
    ///
    /// Spaces are accepted by the checksum but are not part of the identity:
    /// `"4992 7398 716"` and `"49927398716"` are the same order.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidOrderNumber`] if the checksum fails.
    pub fn parse(number: impl Into<String>) -> Result<Self, DomainError> {
        let number = number.into();
        if luhn_valid(&number) {
            Ok(Self(number.chars().filter(|c| *c != ' ').collect()))
        } else {
            Err(DomainError::InvalidOrderNumber { number })
        }
    }

    /// Get the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for OrderNumber {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<OrderNumber> for String {
    fn from(n: OrderNumber) -> Self {
        n.0
    }
}

const LOGIN_MIN: usize = 3;
const LOGIN_MAX: usize = 32;

/// User login - newtype for type safety.
///
/// Accepted logins are 3-32 characters of ASCII letters, digits, `.`, `_`
/// or `-`. Surrounding whitespace is trimmed before the check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Login(String);

impl Login {
    /// Validate and wrap a login.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidLogin`] naming the broken rule.
    pub fn parse(login: impl Into<String>) -> Result<Self, DomainError> {
        let raw = login.into();
        let login = raw.trim();

        if login.is_empty() {
            return Err(DomainError::InvalidLogin {
                login: raw,
                reason: "login is required",
            });
        }
        if !(LOGIN_MIN..=LOGIN_MAX).contains(&login.len()) {
            return Err(DomainError::InvalidLogin {
                login: raw,
                reason: "login must be 3-32 characters long",
            });
        }
        if !login
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(DomainError::InvalidLogin {
                login: raw,
                reason: "only letters, digits, '.', '_' and '-' are allowed",
            });
        }

        Ok(Self(login.to_string()))
    }

    /// Get the login as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Login {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Login {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Login> for String {
    fn from(l: Login) -> Self {
        l.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luhn_accepts_known_valid_numbers() {
        assert!(luhn_valid("49927398716"));
        assert!(luhn_valid("79927398713"));
        assert!(luhn_valid("4561261212345467"));
        assert!(luhn_valid("0"));
    }

    #[test]
    fn luhn_rejects_bad_checksums() {
        assert!(!luhn_valid("49927398717"));
        assert!(!luhn_valid("1234567812345678"));
    }

    #[test]
    fn luhn_skips_interior_spaces() {
        assert!(luhn_valid("4992 7398 716"));
    }

    #[test]
    fn spaced_number_parses_to_compact_form() {
        let spaced = OrderNumber::parse("4561 2612 1234 5467").unwrap();
        assert_eq!(spaced.as_str(), "4561261212345467");
        assert_eq!(spaced, OrderNumber::parse("4561261212345467").unwrap());
    }

    #[test]
    fn luhn_rejects_non_digits() {
        assert!(!luhn_valid("4992-7398716"));
        assert!(!luhn_valid("49927398716a"));
        assert!(!luhn_valid("٤٩"));
    }

    #[test]
    fn luhn_rejects_empty_and_blank() {
        assert!(!luhn_valid(""));
        assert!(!luhn_valid("    "));
    }

    #[test]
    fn order_number_parse_enforces_checksum() {
        let n = OrderNumber::parse("49927398716").unwrap();
        assert_eq!(n.as_str(), "49927398716");

        assert_eq!(
            OrderNumber::parse("12345"),
            Err(DomainError::InvalidOrderNumber {
                number: "12345".into()
            })
        );
    }

    #[test]
    fn order_number_deserialize_validates() {
        let ok: OrderNumber = serde_json::from_str("\"49927398716\"").unwrap();
        assert_eq!(ok.to_string(), "49927398716");

        let bad: Result<OrderNumber, _> = serde_json::from_str("\"12345\"");
        assert!(bad.is_err());
    }

    #[test]
    fn login_accepts_allowed_characters() {
        assert_eq!(Login::parse("alice").unwrap().as_str(), "alice");
        assert_eq!(Login::parse("  a.b_c-9 ").unwrap().as_str(), "a.b_c-9");
    }

    #[test]
    fn login_rejects_bad_formats() {
        assert!(Login::parse("").is_err());
        assert!(Login::parse("ab").is_err());
        assert!(Login::parse("a".repeat(33)).is_err());
        assert!(Login::parse("alice smith").is_err());
        assert!(Login::parse("алиса").is_err());
    }
}
