// 🏷️ Classification - derived fields for validated details
// Card brand from BIN ranges, bank name from the CLABE bank code.
//
// Classification runs only after validation succeeds, and each kind only
// gets the fields that mean something for it: a card never carries a
// bank_code, an account number never carries a brand.

use crate::banks::bank_name_for;
use crate::validation::DetailKind;
use serde::{Deserialize, Serialize};

// ============================================================================
// CARD BRAND
// ============================================================================

/// Issuing network inferred from the leading digits of a card number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardBrand {
    Visa,
    Mastercard,
    /// 16 valid digits, but outside the ranges we recognize
    Other,
    /// Not a card detail
    None,
}

impl CardBrand {
    /// Storage/display form; `None` persists as the empty string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "VISA",
            CardBrand::Mastercard => "MASTERCARD",
            CardBrand::Other => "OTHER",
            CardBrand::None => "",
        }
    }

    /// Inverse of [`CardBrand::as_str`]; anything unrecognized is `None`.
    pub fn from_db(s: &str) -> CardBrand {
        match s {
            "VISA" => CardBrand::Visa,
            "MASTERCARD" => CardBrand::Mastercard,
            "OTHER" => CardBrand::Other,
            _ => CardBrand::None,
        }
    }
}

/// BIN-range brand detection over a validated 16-digit card number.
///
/// Visa: leading 4. Mastercard: first two digits 51-55, or first four
/// 2221-2720 (the 2-series). Everything else is `Other`.
pub fn detect_brand(card_number: &str) -> CardBrand {
    if card_number.starts_with('4') {
        return CardBrand::Visa;
    }

    let two: u32 = card_number
        .get(..2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let four: u32 = card_number
        .get(..4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if (51..=55).contains(&two) || (2221..=2720).contains(&four) {
        return CardBrand::Mastercard;
    }

    CardBrand::Other
}

// ============================================================================
// BANK NAME SOURCE
// ============================================================================

/// Where a detail's bank name came from.
///
/// `Auto` names are rewritten from the catalog on every save; a `Manual`
/// name was typed by the owner and is left alone until they clear it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankNameSource {
    Auto,
    Manual,
}

impl BankNameSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BankNameSource::Auto => "AUTO",
            BankNameSource::Manual => "MANUAL",
        }
    }

    pub fn from_db(s: &str) -> BankNameSource {
        match s {
            "MANUAL" => BankNameSource::Manual,
            _ => BankNameSource::Auto,
        }
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Derived fields for one detail, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub bank_code: String,
    pub bank_name: String,
    pub bank_name_source: BankNameSource,
    pub brand: CardBrand,
}

/// Derive `bank_code` / `bank_name` / `brand` for a validated value.
///
/// `manual_name` is the owner-supplied bank name, if any; a non-empty one
/// wins over the catalog and marks the record `Manual`.
pub fn classify(kind: DetailKind, value: &str, manual_name: Option<&str>) -> Classification {
    let manual = manual_name.map(str::trim).filter(|n| !n.is_empty());

    let (bank_code, brand) = match kind {
        DetailKind::Clabe => (value.get(..3).unwrap_or("").to_string(), CardBrand::None),
        DetailKind::Card => (String::new(), detect_brand(value)),
        DetailKind::Account => (String::new(), CardBrand::None),
    };

    let (bank_name, bank_name_source) = match manual {
        Some(name) => (name.to_string(), BankNameSource::Manual),
        None if kind == DetailKind::Clabe => {
            (bank_name_for(&bank_code).to_string(), BankNameSource::Auto)
        }
        None => (String::new(), BankNameSource::Auto),
    };

    Classification {
        bank_code,
        bank_name,
        bank_name_source,
        brand,
    }
}

// ============================================================================
// TESTS
// ============================================================================
