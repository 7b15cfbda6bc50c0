use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::classify::{BankNameSource, CardBrand};
use crate::entities::{BankDetail, Owner};
use crate::slug::unique_slug;
use crate::validation::DetailKind;

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery, foreign keys for the owner → details cascade
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Owners
    // email/phone are NULL when not provided, so UNIQUE only bites on real
    // duplicates. public_slug is the only identifier exposed in URLs.
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS owners (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE,
            phone TEXT UNIQUE,
            display_name TEXT NOT NULL DEFAULT '',
            public_slug TEXT UNIQUE NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            date_joined TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Bank details
    // UNIQUE(owner_id, kind) is the arbiter for upsert semantics: at most
    // one record per owner per kind, concurrent second writers lose.
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS bank_details (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES owners(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            value TEXT NOT NULL,
            bank_code TEXT NOT NULL DEFAULT '',
            bank_name TEXT NOT NULL DEFAULT '',
            bank_name_source TEXT NOT NULL DEFAULT 'AUTO',
            brand TEXT NOT NULL DEFAULT '',
            alias TEXT NOT NULL DEFAULT '',
            is_public INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (owner_id, kind)
        )",
        [],
    )?;

    // ==========================================================================
    // Events (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_details_owner ON bank_details(owner_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// OWNERS
// ============================================================================

/// Insert a new owner, assigning a unique public slug when none is set.
pub fn insert_owner(conn: &Connection, owner: &mut Owner) -> Result<()> {
    if owner.public_slug.is_empty() {
        let base = owner.slug_base().map(str::to_string);
        owner.public_slug = unique_slug(base.as_deref(), |s| slug_taken(conn, s))?;
    }

    conn.execute(
        "INSERT INTO owners (id, email, phone, display_name, public_slug, is_active, date_joined)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            owner.id,
            opt_text(&owner.email),
            opt_text(&owner.phone),
            owner.display_name,
            owner.public_slug,
            owner.is_active as i32,
            owner.date_joined.to_rfc3339(),
        ],
    )
    .context("failed to insert owner")?;

    Ok(())
}

/// Is this slug already assigned to any owner?
pub fn slug_taken(conn: &Connection, slug: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM owners WHERE public_slug = ?1",
        params![slug],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Look up the active owner behind a public profile URL.
pub fn find_owner_by_slug(conn: &Connection, slug: &str) -> Result<Option<Owner>> {
    let owner = conn
        .query_row(
            "SELECT id, email, phone, display_name, public_slug, is_active, date_joined
             FROM owners WHERE public_slug = ?1 AND is_active = 1",
            params![slug],
            row_to_owner,
        )
        .optional()?;
    Ok(owner)
}

/// Look up an owner by whichever contact they registered: strings with an
/// `@` are treated as email, everything else as phone.
pub fn find_owner_by_contact(conn: &Connection, contact: &str) -> Result<Option<Owner>> {
    let column = if contact.contains('@') { "email" } else { "phone" };
    let sql = format!(
        "SELECT id, email, phone, display_name, public_slug, is_active, date_joined
         FROM owners WHERE {} = ?1",
        column
    );

    let owner = conn
        .query_row(&sql, params![contact.trim()], row_to_owner)
        .optional()?;
    Ok(owner)
}

pub fn owner_exists(conn: &Connection, owner_id: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM owners WHERE id = ?1",
        params![owner_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Delete an owner; their bank details go with them via the FK cascade.
pub fn delete_owner(conn: &Connection, owner_id: &str) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM owners WHERE id = ?1", params![owner_id])?;
    Ok(deleted)
}

fn row_to_owner(row: &rusqlite::Row<'_>) -> rusqlite::Result<Owner> {
    let email: Option<String> = row.get(1)?;
    let phone: Option<String> = row.get(2)?;
    let is_active: i64 = row.get(5)?;
    let date_joined: String = row.get(6)?;

    Ok(Owner {
        id: row.get(0)?,
        email: email.unwrap_or_default(),
        phone: phone.unwrap_or_default(),
        display_name: row.get(3)?,
        public_slug: row.get(4)?,
        is_active: is_active != 0,
        date_joined: parse_timestamp(&date_joined)?,
    })
}

// ============================================================================
// BANK DETAILS
// ============================================================================

const DETAIL_COLUMNS: &str = "id, owner_id, kind, value, bank_code, bank_name, \
     bank_name_source, brand, alias, is_public, created_at, updated_at";

/// Current record for (owner, kind), if any.
pub fn get_detail(
    conn: &Connection,
    owner_id: &str,
    kind: DetailKind,
) -> rusqlite::Result<Option<BankDetail>> {
    let sql = format!(
        "SELECT {} FROM bank_details WHERE owner_id = ?1 AND kind = ?2",
        DETAIL_COLUMNS
    );
    let detail = conn
        .query_row(&sql, params![owner_id, kind.as_str()], row_to_detail)
        .optional()?;
    Ok(detail)
}

/// All of an owner's records, dashboard order.
pub fn list_details(conn: &Connection, owner_id: &str) -> Result<Vec<BankDetail>> {
    let sql = format!(
        "SELECT {} FROM bank_details WHERE owner_id = ?1
         ORDER BY kind, updated_at DESC",
        DETAIL_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let details = stmt
        .query_map(params![owner_id], row_to_detail)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(details)
}

/// The public-profile view: visible records only, kind then most recently
/// updated first.
pub fn list_public_details(conn: &Connection, owner_id: &str) -> Result<Vec<BankDetail>> {
    let sql = format!(
        "SELECT {} FROM bank_details
         WHERE owner_id = ?1 AND is_public = 1
         ORDER BY kind, updated_at DESC",
        DETAIL_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let details = stmt
        .query_map(params![owner_id], row_to_detail)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(details)
}

/// Insert a brand-new record. The UNIQUE(owner_id, kind) index rejects a
/// second record for the same slot; callers map that to their conflict
/// error (see the engine).
pub fn insert_detail(conn: &Connection, detail: &BankDetail) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bank_details (
            id, owner_id, kind, value, bank_code, bank_name,
            bank_name_source, brand, alias, is_public, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            detail.id,
            detail.owner_id,
            detail.kind.as_str(),
            detail.value,
            detail.bank_code,
            detail.bank_name,
            detail.bank_name_source.as_str(),
            detail.brand.as_str(),
            detail.alias,
            detail.is_public as i32,
            detail.created_at.to_rfc3339(),
            detail.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Overwrite an existing record in place (same id).
pub fn update_detail(conn: &Connection, detail: &BankDetail) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE bank_details SET
            value = ?1, bank_code = ?2, bank_name = ?3, bank_name_source = ?4,
            brand = ?5, alias = ?6, is_public = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            detail.value,
            detail.bank_code,
            detail.bank_name,
            detail.bank_name_source.as_str(),
            detail.brand.as_str(),
            detail.alias,
            detail.is_public as i32,
            detail.updated_at.to_rfc3339(),
            detail.id,
        ],
    )
}

pub fn delete_detail_row(
    conn: &Connection,
    owner_id: &str,
    kind: DetailKind,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM bank_details WHERE owner_id = ?1 AND kind = ?2",
        params![owner_id, kind.as_str()],
    )
}

fn row_to_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<BankDetail> {
    let kind_str: String = row.get(2)?;
    let source_str: String = row.get(6)?;
    let brand_str: String = row.get(7)?;
    let is_public: i64 = row.get(9)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    let kind: DetailKind = kind_str.parse().map_err(|_| rusqlite::Error::InvalidQuery)?;

    Ok(BankDetail {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind,
        value: row.get(3)?,
        bank_code: row.get(4)?,
        bank_name: row.get(5)?,
        bank_name_source: BankNameSource::from_db(&source_str),
        brand: CardBrand::from_db(&brand_str),
        alias: row.get(8)?,
        is_public: is_public != 0,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| rusqlite::Error::InvalidQuery)
}

fn opt_text(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

// ============================================================================
// EVENTS (audit trail)
// ============================================================================

/// Audit event. Payloads carry the masked value and a SHA-256 fingerprint
/// of the normalized digits, never the digits themselves.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// SHA-256 fingerprint of a stored value, safe to log and to compare.
pub fn value_fingerprint(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Events for a specific entity, newest first.
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(&timestamp)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(events)
}

// ============================================================================
// TESTS
// ============================================================================
