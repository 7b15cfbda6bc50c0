// 🔢 Financial Identifier Validation
// Structural and checksum rules for the three supported bank detail kinds.
//
// Rules are purely local: digit counts plus the CLABE control digit and the
// card Luhn checksum. Nothing here talks to an issuing bank.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// DETAIL KIND
// ============================================================================

/// The three kinds of payment-collection details an owner can register.
///
/// Each kind carries its own validation ruleset, and an owner holds at most
/// one detail per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetailKind {
    /// Mexican 18-digit interbank account identifier (control digit at the end)
    Clabe,

    /// 16-digit card number (Luhn-checked)
    Card,

    /// Free-form bank account number, 6 to 20 digits
    Account,
}

impl DetailKind {
    /// All kinds in dashboard order.
    pub const ALL: [DetailKind; 3] = [DetailKind::Clabe, DetailKind::Card, DetailKind::Account];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetailKind::Clabe => "CLABE",
            DetailKind::Card => "CARD",
            DetailKind::Account => "ACCOUNT",
        }
    }
}

impl fmt::Display for DetailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLABE" => Ok(DetailKind::Clabe),
            "CARD" => Ok(DetailKind::Card),
            "ACCOUNT" => Ok(DetailKind::Account),
            other => Err(ValidationError::InvalidKind(other.to_string())),
        }
    }
}

// ============================================================================
// VALIDATION ERRORS
// ============================================================================

/// Why a value was rejected.
///
/// `Format` and `Checksum` are deliberately separate variants: a mistyped
/// digit count and a failed control digit need different corrections, and
/// callers present them differently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Kind outside {CLABE, CARD, ACCOUNT}; rejected before normalization.
    #[error("invalid kind of bank detail: {0}")]
    InvalidKind(String),

    /// Wrong length or character class for the kind.
    #[error("{0}")]
    Format(String),

    /// Correct shape, failed checksum.
    #[error("{0}")]
    Checksum(String),
}

impl ValidationError {
    /// Form field this error is scoped to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidKind(_) => "kind",
            ValidationError::Format(_) | ValidationError::Checksum(_) => "value",
        }
    }
}

// ============================================================================
// CHECKSUMS
// ============================================================================

/// Luhn mod-10 for card numbers.
///
/// Parity comes from the total digit count, so the doubled positions are the
/// same whether you scan left-to-right or right-to-left.
pub fn luhn_check(number: &str) -> bool {
    if !all_digits(number) {
        return false;
    }

    let parity = number.len() % 2;
    let mut checksum = 0u32;

    for (i, b) in number.bytes().enumerate() {
        let mut d = u32::from(b - b'0');
        if i % 2 == parity {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        checksum += d;
    }

    checksum % 10 == 0
}

/// CLABE weights cycle 3, 7, 1 across positions 0..=16.
const CLABE_WEIGHTS: [u32; 3] = [3, 7, 1];

/// Control digit for a CLABE: weighted sum of the first 17 digits, each
/// product reduced mod 10 before summing, then `(10 - sum % 10) % 10`.
///
/// Returns `None` unless `digits` starts with 17 ASCII digits.
pub fn clabe_check_digit(digits: &str) -> Option<u8> {
    let bytes = digits.as_bytes();
    if bytes.len() < 17 || !bytes[..17].iter().all(u8::is_ascii_digit) {
        return None;
    }

    let sum: u32 = bytes[..17]
        .iter()
        .enumerate()
        .map(|(i, b)| (u32::from(b - b'0') * CLABE_WEIGHTS[i % 3]) % 10)
        .sum();

    Some(((10 - (sum % 10)) % 10) as u8)
}

// ============================================================================
// VALIDATION DISPATCH
// ============================================================================

/// Validate a normalized (digits-only) value against its kind's ruleset.
///
/// Length and character-class problems come back as [`ValidationError::Format`],
/// checksum failures as [`ValidationError::Checksum`].
pub fn validate(kind: DetailKind, value: &str) -> Result<(), ValidationError> {
    match kind {
        DetailKind::Clabe => {
            if value.len() != 18 || !all_digits(value) {
                return Err(ValidationError::Format(
                    "CLABE must be exactly 18 digits.".to_string(),
                ));
            }
            // Both length and digits checked above, so the control digit exists.
            let expected = clabe_check_digit(value).ok_or_else(|| {
                ValidationError::Format("CLABE must be exactly 18 digits.".to_string())
            })?;
            let actual = value.as_bytes()[17] - b'0';
            if expected != actual {
                return Err(ValidationError::Checksum(
                    "CLABE failed its control-digit checksum.".to_string(),
                ));
            }
            Ok(())
        }

        DetailKind::Card => {
            if value.len() != 16 || !all_digits(value) {
                return Err(ValidationError::Format(
                    "Card number must be exactly 16 digits.".to_string(),
                ));
            }
            if !luhn_check(value) {
                return Err(ValidationError::Checksum(
                    "Card number failed Luhn checksum.".to_string(),
                ));
            }
            Ok(())
        }

        DetailKind::Account => {
            if value.len() < 6 || value.len() > 20 || !all_digits(value) {
                return Err(ValidationError::Format(
                    "Account number must be 6-20 digits.".to_string(),
                ));
            }
            Ok(())
        }
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// TESTS
// ============================================================================
