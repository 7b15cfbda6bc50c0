// 🔁 Save Pipeline - the one write path for bank details
// normalize → validate → classify → persist, as an explicit function
// instead of a hidden pre-save hook. A save either lands a fully valid
// record or returns an error with the prior state untouched.

use rusqlite::Connection;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::{classify, BankNameSource};
use crate::db::{self, Event};
use crate::entities::BankDetail;
use crate::normalizer::normalize;
use crate::validation::{validate, DetailKind, ValidationError};

/// Everything a caller can hand to [`save_detail`]. `kind` and `value`
/// arrive raw (form input); the optional fields distinguish "not
/// submitted" (`None`, keep what is stored) from "submitted empty"
/// (`Some("")`, clear it).
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub owner_id: String,
    pub kind: String,
    pub value: String,
    pub bank_name: Option<String>,
    pub alias: Option<String>,
    pub is_public: Option<bool>,
}

/// Ways a save can fail. All of them leave storage exactly as it was.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Bad kind or bad value; see [`ValidationError::field`] for scoping.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("owner not found: {0}")]
    OwnerNotFound(String),

    /// A concurrent save for the same (owner, kind) won the race. The
    /// stored data is consistent; the caller may retry.
    #[error("a bank detail for this owner and kind was written concurrently")]
    Conflict,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Surface a save() writes its audit events under.
const ACTOR: &str = "dashboard";

/// Run the full pipeline for one detail.
///
/// Replaces any existing record for the same (owner, kind); the
/// `UNIQUE(owner_id, kind)` index backs this up against concurrent
/// writers. Re-saving an already-valid record recomputes the same
/// derived fields, so the operation is idempotent.
pub fn save_detail(conn: &Connection, req: &SaveRequest) -> Result<BankDetail, SaveError> {
    // Kind gate comes first: an unknown selector fails before the value
    // is even normalized.
    let kind: DetailKind = req.kind.parse()?;

    let value = normalize(&req.value);
    validate(kind, &value)?;
    debug!(kind = %kind, "value validated");

    if !db::owner_exists(conn, &req.owner_id)? {
        return Err(SaveError::OwnerNotFound(req.owner_id.clone()));
    }

    let existing = db::get_detail(conn, &req.owner_id, kind)?;

    // Manual bank-name resolution: a submitted non-empty name locks the
    // override, a submitted empty one clears it, an absent field keeps a
    // previously locked name alive.
    let manual_name: Option<String> = match &req.bank_name {
        Some(name) => {
            let trimmed = name.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        None => existing
            .as_ref()
            .filter(|d| d.bank_name_source == BankNameSource::Manual)
            .map(|d| d.bank_name.clone()),
    };

    let classification = classify(kind, &value, manual_name.as_deref());

    let detail = match existing {
        Some(mut current) => {
            let alias = req.alias.clone().unwrap_or_else(|| current.alias.clone());
            let is_public = req.is_public.unwrap_or(current.is_public);
            current.apply_save(value, classification, alias, is_public);
            db::update_detail(conn, &current).map_err(map_constraint)?;
            current
        }
        None => {
            let alias = req.alias.clone().unwrap_or_default();
            let is_public = req.is_public.unwrap_or(true);
            let fresh =
                BankDetail::new(&req.owner_id, kind, value, classification, alias, is_public);
            db::insert_detail(conn, &fresh).map_err(map_constraint)?;
            fresh
        }
    };

    info!(owner = %detail.owner_id, kind = %detail.kind, "bank detail saved");
    record_event(conn, "bank_detail_saved", &detail);

    Ok(detail)
}

/// The public-profile read: visible details only, ordered by kind and
/// then most recently updated first. Never mutates.
pub fn list_public(conn: &Connection, owner_id: &str) -> anyhow::Result<Vec<BankDetail>> {
    db::list_public_details(conn, owner_id)
}

/// Remove one detail by explicit owner action. Returns whether a record
/// existed.
pub fn delete_detail(
    conn: &Connection,
    owner_id: &str,
    kind: DetailKind,
) -> anyhow::Result<bool> {
    let Some(detail) = db::get_detail(conn, owner_id, kind)? else {
        return Ok(false);
    };

    db::delete_detail_row(conn, owner_id, kind)?;
    info!(owner = %owner_id, kind = %kind, "bank detail deleted");
    record_event(conn, "bank_detail_deleted", &detail);

    Ok(true)
}

fn map_constraint(err: rusqlite::Error) -> SaveError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            warn!("uniqueness constraint rejected a concurrent write");
            SaveError::Conflict
        }
        other => SaveError::Storage(other),
    }
}

/// Audit events carry the masked value and a fingerprint, never the raw
/// digits. A failed audit write is logged and does not undo the save.
fn record_event(conn: &Connection, event_type: &str, detail: &BankDetail) {
    let event = Event::new(
        event_type,
        "bank_detail",
        &detail.id,
        serde_json::json!({
            "kind": detail.kind.as_str(),
            "masked_value": detail.masked_value(),
            "fingerprint": db::value_fingerprint(&detail.value),
        }),
        ACTOR,
    );

    if let Err(e) = db::insert_event(conn, &event) {
        warn!(error = %e, "failed to record audit event");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CardBrand;
    use crate::db::{insert_owner, setup_database};
    use crate::entities::Owner;

    fn test_conn_with_owner() -> (Connection, Owner) {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let mut owner = Owner::new("maria@example.com", "", "María").unwrap();
        insert_owner(&conn, &mut owner).unwrap();
        (conn, owner)
    }

    fn request(owner_id: &str, kind: &str, value: &str) -> SaveRequest {
        SaveRequest {
            owner_id: owner_id.to_string(),
            kind: kind.to_string(),
            value: value.to_string(),
            ..SaveRequest::default()
        }
    }

    fn detail_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM bank_details", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_end_to_end_card_save() {
        let (conn, owner) = test_conn_with_owner();

        let detail =
            save_detail(&conn, &request(&owner.id, "CARD", "4111 1111-1111 1111")).unwrap();

        assert_eq!(detail.value, "4111111111111111");
        assert_eq!(detail.brand, CardBrand::Visa);
        assert_eq!(detail.masked_value(), "************1111");
        assert_eq!(detail.bank_code, "");
        assert!(detail.is_public);
    }

    #[test]
    fn test_saving_twice_replaces_not_duplicates() {
        let (conn, owner) = test_conn_with_owner();

        let first = save_detail(&conn, &request(&owner.id, "CARD", "4111111111111111")).unwrap();
        let second = save_detail(&conn, &request(&owner.id, "CARD", "5105105105105100")).unwrap();

        assert_eq!(detail_count(&conn), 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);

        let stored = db::get_detail(&conn, &owner.id, DetailKind::Card)
            .unwrap()
            .unwrap();
        assert_eq!(stored.value, "5105105105105100");
        assert_eq!(stored.brand, CardBrand::Mastercard);
    }

    #[test]
    fn test_save_is_idempotent_on_derived_fields() {
        let (conn, owner) = test_conn_with_owner();
        let req = request(&owner.id, "CLABE", "002180000000000009");

        let first = save_detail(&conn, &req).unwrap();
        let second = save_detail(&conn, &req).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.value, first.value);
        assert_eq!(second.bank_code, first.bank_code);
        assert_eq!(second.bank_name, first.bank_name);
        assert_eq!(second.bank_name_source, first.bank_name_source);
        assert_eq!(second.brand, first.brand);
    }

    #[test]
    fn test_invalid_value_never_reaches_storage() {
        let (conn, owner) = test_conn_with_owner();

        let err = save_detail(&conn, &request(&owner.id, "CARD", "4111111111111112")).unwrap_err();
        assert!(matches!(
            err,
            SaveError::Invalid(ValidationError::Checksum(_))
        ));
        assert_eq!(detail_count(&conn), 0);
    }

    #[test]
    fn test_failed_save_leaves_prior_record_untouched() {
        let (conn, owner) = test_conn_with_owner();

        save_detail(&conn, &request(&owner.id, "CARD", "4111111111111111")).unwrap();
        let err = save_detail(&conn, &request(&owner.id, "CARD", "123")).unwrap_err();
        assert!(matches!(err, SaveError::Invalid(ValidationError::Format(_))));

        let stored = db::get_detail(&conn, &owner.id, DetailKind::Card)
            .unwrap()
            .unwrap();
        assert_eq!(stored.value, "4111111111111111");
    }

    #[test]
    fn test_unknown_kind_fails_before_anything_else() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        // Owner does not even exist; the kind gate fires first.
        let err = save_detail(&conn, &request("ghost", "IBAN", "4111111111111111")).unwrap_err();
        assert!(matches!(
            err,
            SaveError::Invalid(ValidationError::InvalidKind(_))
        ));
    }

    #[test]
    fn test_unknown_owner_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let err = save_detail(&conn, &request("ghost", "CARD", "4111111111111111")).unwrap_err();
        assert!(matches!(err, SaveError::OwnerNotFound(_)));
    }

    #[test]
    fn test_clabe_auto_bank_name() {
        let (conn, owner) = test_conn_with_owner();

        let detail =
            save_detail(&conn, &request(&owner.id, "CLABE", "002-180-0000000000-09")).unwrap();

        assert_eq!(detail.bank_code, "002");
        assert_eq!(detail.bank_name, "Citibanamex");
        assert_eq!(detail.bank_name_source, BankNameSource::Auto);
        assert_eq!(detail.masked_value(), "002************009");
    }

    #[test]
    fn test_manual_bank_name_survives_resaves() {
        let (conn, owner) = test_conn_with_owner();

        let mut req = request(&owner.id, "CLABE", "002180000000000009");
        req.bank_name = Some("Banamex de toda la vida".to_string());
        let detail = save_detail(&conn, &req).unwrap();
        assert_eq!(detail.bank_name_source, BankNameSource::Manual);

        // Re-save without submitting a bank name: the override holds.
        let resaved = save_detail(&conn, &request(&owner.id, "CLABE", "002180000000000009")).unwrap();
        assert_eq!(resaved.bank_name, "Banamex de toda la vida");
        assert_eq!(resaved.bank_name_source, BankNameSource::Manual);
    }

    #[test]
    fn test_empty_bank_name_clears_manual_override() {
        let (conn, owner) = test_conn_with_owner();

        let mut req = request(&owner.id, "CLABE", "002180000000000009");
        req.bank_name = Some("Mi banco".to_string());
        save_detail(&conn, &req).unwrap();

        let mut clear = request(&owner.id, "CLABE", "002180000000000009");
        clear.bank_name = Some(String::new());
        let detail = save_detail(&conn, &clear).unwrap();

        assert_eq!(detail.bank_name, "Citibanamex");
        assert_eq!(detail.bank_name_source, BankNameSource::Auto);
    }

    #[test]
    fn test_list_public_filters_and_orders() {
        let (conn, owner) = test_conn_with_owner();

        save_detail(&conn, &request(&owner.id, "CLABE", "002180000000000009")).unwrap();
        save_detail(&conn, &request(&owner.id, "CARD", "4111111111111111")).unwrap();

        let mut hidden = request(&owner.id, "ACCOUNT", "1234567890");
        hidden.is_public = Some(false);
        save_detail(&conn, &hidden).unwrap();

        let listed = list_public(&conn, &owner.id).unwrap();
        let kinds: Vec<DetailKind> = listed.iter().map(|d| d.kind).collect();

        // Private account stays off the profile; kinds sort by stored text
        assert_eq!(kinds, vec![DetailKind::Card, DetailKind::Clabe]);
    }

    #[test]
    fn test_resave_preserves_alias_and_visibility_when_absent() {
        let (conn, owner) = test_conn_with_owner();

        let mut req = request(&owner.id, "CARD", "4111111111111111");
        req.alias = Some("Nómina".to_string());
        req.is_public = Some(false);
        save_detail(&conn, &req).unwrap();

        let resaved = save_detail(&conn, &request(&owner.id, "CARD", "4111111111111111")).unwrap();
        assert_eq!(resaved.alias, "Nómina");
        assert!(!resaved.is_public);
    }

    #[test]
    fn test_delete_detail() {
        let (conn, owner) = test_conn_with_owner();
        save_detail(&conn, &request(&owner.id, "CARD", "4111111111111111")).unwrap();

        assert!(delete_detail(&conn, &owner.id, DetailKind::Card).unwrap());
        assert_eq!(detail_count(&conn), 0);

        // Second delete finds nothing
        assert!(!delete_detail(&conn, &owner.id, DetailKind::Card).unwrap());
    }

    #[test]
    fn test_constraint_violation_maps_to_conflict() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed: bank_details.owner_id, bank_details.kind".into()),
        );
        assert!(matches!(map_constraint(err), SaveError::Conflict));

        let other = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(map_constraint(other), SaveError::Storage(_)));
    }

    #[test]
    fn test_save_writes_audit_event_without_raw_digits() {
        let (conn, owner) = test_conn_with_owner();
        let detail = save_detail(&conn, &request(&owner.id, "CARD", "4111111111111111")).unwrap();

        let events = db::get_events_for_entity(&conn, "bank_detail", &detail.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "bank_detail_saved");
        assert_eq!(events[0].actor, "dashboard");
        assert!(!events[0].data.to_string().contains("4111111111111111"));
    }
}
