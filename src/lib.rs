// Cobra Link - Core Library
// Payment-collection profiles: owners register with email or phone, attach
// bank details (CLABE, card, account number), and share a public page of
// the methods they accept. Exposed as a library for the CLI and tests.

pub mod banks;
pub mod classify;
pub mod db;
pub mod engine;
pub mod entities;
pub mod masking;
pub mod normalizer;
pub mod slug;
pub mod validation;

// Re-export commonly used types
pub use banks::bank_name_for;
pub use classify::{classify, BankNameSource, CardBrand, Classification};
pub use db::{
    delete_owner, find_owner_by_contact, find_owner_by_slug, get_detail, get_events_for_entity,
    insert_owner, list_details, setup_database, slug_taken, Event,
};
pub use engine::{delete_detail, list_public, save_detail, SaveError, SaveRequest};
pub use entities::{BankDetail, Owner};
pub use masking::mask;
pub use normalizer::normalize;
pub use slug::{generate_slug, slugify, unique_slug};
pub use validation::{validate, DetailKind, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
