// Entity Models
// Owners hold identity and the public slug; bank details hold one
// validated payment identifier per kind. Both persist in SQLite (db.rs)
// and serialize with serde for any JSON surface.

pub mod detail;
pub mod owner;

pub use detail::BankDetail;
pub use owner::{Owner, OwnerError};
