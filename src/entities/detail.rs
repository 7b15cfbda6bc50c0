// 💳 BankDetail Entity - one validated payment identifier per (owner, kind)
// The stored value is always the normalized, checksum-verified digit
// string; bank_code / bank_name / brand are derived by the classifier and
// recomputed on every save.

use crate::classify::{BankNameSource, CardBrand, Classification};
use crate::masking::mask;
use crate::validation::DetailKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankDetail {
    pub id: String,
    pub owner_id: String,
    pub kind: DetailKind,

    /// Normalized digits, already validated for `kind`.
    pub value: String,

    /// First 3 CLABE digits; empty for other kinds.
    pub bank_code: String,
    pub bank_name: String,
    pub bank_name_source: BankNameSource,

    /// Card brand; `None` for non-card kinds.
    pub brand: CardBrand,

    /// Optional owner-facing label ("Nómina", "Ahorro"), no validation.
    pub alias: String,
    pub is_public: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BankDetail {
    /// Build a fresh record from a validated value and its classification.
    pub fn new(
        owner_id: &str,
        kind: DetailKind,
        value: String,
        classification: Classification,
        alias: String,
        is_public: bool,
    ) -> Self {
        let now = Utc::now();

        BankDetail {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            kind,
            value,
            bank_code: classification.bank_code,
            bank_name: classification.bank_name,
            bank_name_source: classification.bank_name_source,
            brand: classification.brand,
            alias,
            is_public,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the value-derived state of an existing record, keeping its
    /// identity and creation time. Bumps `updated_at`.
    pub fn apply_save(
        &mut self,
        value: String,
        classification: Classification,
        alias: String,
        is_public: bool,
    ) {
        self.value = value;
        self.bank_code = classification.bank_code;
        self.bank_name = classification.bank_name;
        self.bank_name_source = classification.bank_name_source;
        self.brand = classification.brand;
        self.alias = alias;
        self.is_public = is_public;
        self.updated_at = Utc::now();
    }

    /// Obfuscated value for any display surface.
    pub fn masked_value(&self) -> String {
        mask(self.kind, &self.value)
    }

    /// Label shown next to the masked value: the alias when the owner set
    /// one, otherwise the kind name.
    pub fn label(&self) -> &str {
        if self.alias.is_empty() {
            self.kind.as_str()
        } else {
            &self.alias
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn visa_detail() -> BankDetail {
        let value = "4111111111111111".to_string();
        let classification = classify(DetailKind::Card, &value, None);
        BankDetail::new("owner-1", DetailKind::Card, value, classification, String::new(), true)
    }

    #[test]
    fn test_new_detail_carries_classification() {
        let detail = visa_detail();
        assert_eq!(detail.brand, CardBrand::Visa);
        assert_eq!(detail.bank_code, "");
        assert_eq!(detail.bank_name_source, BankNameSource::Auto);
        assert_eq!(detail.created_at, detail.updated_at);
        assert!(detail.is_public);
    }

    #[test]
    fn test_masked_value_uses_kind_rules() {
        let detail = visa_detail();
        assert_eq!(detail.masked_value(), "************1111");
    }

    #[test]
    fn test_apply_save_keeps_identity() {
        let mut detail = visa_detail();
        let id = detail.id.clone();
        let created = detail.created_at;

        let value = "5105105105105100".to_string();
        let classification = classify(DetailKind::Card, &value, None);
        detail.apply_save(value, classification, "Negocio".to_string(), false);

        assert_eq!(detail.id, id);
        assert_eq!(detail.created_at, created);
        assert!(detail.updated_at >= created);
        assert_eq!(detail.brand, CardBrand::Mastercard);
        assert_eq!(detail.alias, "Negocio");
        assert!(!detail.is_public);
    }

    #[test]
    fn test_label_falls_back_to_kind() {
        let mut detail = visa_detail();
        assert_eq!(detail.label(), "CARD");
        detail.alias = "Tarjeta nómina".to_string();
        assert_eq!(detail.label(), "Tarjeta nómina");
    }
}
