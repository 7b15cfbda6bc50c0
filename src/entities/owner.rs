// 👤 Owner Entity - the account behind a public profile
// Registration works with an email, a phone number, or both; the public
// slug is the only identifier that ever appears in a profile URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an owner could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnerError {
    #[error("provide an email or a phone number; at least one is required")]
    MissingContact,

    #[error("email address is not well formed: {0}")]
    InvalidEmail(String),

    #[error("phone number must be 10-15 digits, optionally prefixed with +")]
    InvalidPhone(String),
}

/// Account owner.
///
/// `email` and `phone` are stored normalized; whichever is empty was not
/// provided. `public_slug` stays empty until the storage layer assigns a
/// unique one on first insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub email: String,
    pub phone: String,
    pub display_name: String,
    pub public_slug: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl Owner {
    /// Create a new owner from raw registration input.
    ///
    /// At least one of `email` / `phone` must be non-empty; both are
    /// normalized before any uniqueness check sees them.
    pub fn new(email: &str, phone: &str, display_name: &str) -> Result<Self, OwnerError> {
        let email = normalize_email(email)?;
        let phone = normalize_phone(phone)?;

        if email.is_empty() && phone.is_empty() {
            return Err(OwnerError::MissingContact);
        }

        Ok(Owner {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            phone,
            display_name: display_name.trim().to_string(),
            public_slug: String::new(),
            is_active: true,
            date_joined: Utc::now(),
        })
    }

    /// Preferred contact string (email first, then phone).
    pub fn contact(&self) -> &str {
        if self.email.is_empty() {
            &self.phone
        } else {
            &self.email
        }
    }

    /// Base string for slug generation: display name, else the email
    /// local part, else nothing (bare random slug).
    pub fn slug_base(&self) -> Option<&str> {
        if !self.display_name.is_empty() {
            return Some(&self.display_name);
        }
        if !self.email.is_empty() {
            return self.email.split('@').next();
        }
        None
    }

    /// Path of the public profile page, e.g. `/tacos-mx-a1b2c3/`.
    pub fn public_path(&self) -> String {
        format!("/{}/", self.public_slug)
    }
}

/// Trim, check shape, and lowercase the domain part. Empty input is fine
/// (the caller may register with a phone instead).
fn normalize_email(raw: &str) -> Result<String, OwnerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let Some((local, domain)) = trimmed.rsplit_once('@') else {
        return Err(OwnerError::InvalidEmail(trimmed.to_string()));
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(OwnerError::InvalidEmail(trimmed.to_string()));
    }

    Ok(format!("{}@{}", local, domain.to_lowercase()))
}

/// Strip grouping characters, keep an optional leading `+`, require 10-15
/// digits. Empty input is fine.
fn normalize_phone(raw: &str) -> Result<String, OwnerError> {
    let stripped = crate::normalizer::normalize(raw);
    if stripped.is_empty() {
        return Ok(String::new());
    }

    let (prefix, digits) = match stripped.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", stripped.as_str()),
    };

    let digit_count = digits.len();
    if digit_count < 10 || digit_count > 15 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OwnerError::InvalidPhone(raw.trim().to_string()));
    }

    Ok(format!("{}{}", prefix, digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_with_email_only() {
        let owner = Owner::new("Maria@Example.COM", "", "María").unwrap();
        assert_eq!(owner.email, "Maria@example.com"); // domain lowered, local kept
        assert_eq!(owner.phone, "");
        assert!(owner.is_active);
        assert!(!owner.id.is_empty());
        assert_eq!(owner.public_slug, "");
    }

    #[test]
    fn test_owner_with_phone_only() {
        let owner = Owner::new("", "+52 55 1234-5678", "").unwrap();
        assert_eq!(owner.phone, "+525512345678");
        assert_eq!(owner.contact(), "+525512345678");
    }

    #[test]
    fn test_owner_requires_some_contact() {
        assert_eq!(
            Owner::new("", "   ", "Nobody").unwrap_err(),
            OwnerError::MissingContact
        );
    }

    #[test]
    fn test_bad_email_rejected() {
        assert!(matches!(
            Owner::new("not-an-email", "", "").unwrap_err(),
            OwnerError::InvalidEmail(_)
        ));
        assert!(matches!(
            Owner::new("@nada.mx", "", "").unwrap_err(),
            OwnerError::InvalidEmail(_)
        ));
    }

    #[test]
    fn test_bad_phone_rejected() {
        assert!(matches!(
            Owner::new("", "12345", "").unwrap_err(),
            OwnerError::InvalidPhone(_)
        ));
        assert!(matches!(
            Owner::new("", "+52abc1234567", "").unwrap_err(),
            OwnerError::InvalidPhone(_)
        ));
    }

    #[test]
    fn test_slug_base_prefers_display_name() {
        let owner = Owner::new("juan@example.com", "", "Tacos El Güero").unwrap();
        assert_eq!(owner.slug_base(), Some("Tacos El Güero"));

        let owner = Owner::new("juan@example.com", "", "").unwrap();
        assert_eq!(owner.slug_base(), Some("juan"));

        let owner = Owner::new("", "5512345678", "").unwrap();
        assert_eq!(owner.slug_base(), None);
    }

    #[test]
    fn test_public_path() {
        let mut owner = Owner::new("a@b.mx", "", "").unwrap();
        owner.public_slug = "a-x1y2z3".to_string();
        assert_eq!(owner.public_path(), "/a-x1y2z3/");
    }
}
