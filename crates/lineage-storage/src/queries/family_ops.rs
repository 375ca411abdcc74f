//! Raw SQL operations for the family table.

use rusqlite::{params, Connection, OptionalExtension};

use lineage_core::models::Family;
use lineage_core::{LineageError, LineageResult};

use crate::codec::{decode_ts, encode_ts};
use crate::{is_unique_violation, to_storage_err};

struct RawFamily {
    family_id: String,
    family_keys_hash: String,
    party_a_norm: String,
    party_b_norm: String,
    created_at: String,
}

impl RawFamily {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            family_id: row.get(0)?,
            family_keys_hash: row.get(1)?,
            party_a_norm: row.get(2)?,
            party_b_norm: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_family(self) -> LineageResult<Family> {
        Ok(Family {
            created_at: decode_ts("family.created_at", &self.created_at)?,
            family_id: self.family_id,
            family_keys_hash: self.family_keys_hash,
            party_a_norm: self.party_a_norm,
            party_b_norm: self.party_b_norm,
        })
    }
}

const SELECT_FAMILY: &str =
    "SELECT family_id, family_keys_hash, party_a_norm, party_b_norm, created_at FROM family";

/// Insert a new family. A taken keys hash is reported as `ConflictRace`.
pub fn insert_family(conn: &Connection, family: &Family) -> LineageResult<()> {
    conn.execute(
        "INSERT INTO family (family_id, family_keys_hash, party_a_norm, party_b_norm, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            family.family_id,
            family.family_keys_hash,
            family.party_a_norm,
            family.party_b_norm,
            encode_ts(&family.created_at),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            LineageError::ConflictRace {
                entity: "family",
                key: family.family_keys_hash.clone(),
            }
        } else {
            to_storage_err(e)
        }
    })?;
    Ok(())
}

pub fn get_family(conn: &Connection, family_id: &str) -> LineageResult<Option<Family>> {
    conn.query_row(
        &format!("{SELECT_FAMILY} WHERE family_id = ?1"),
        params![family_id],
        RawFamily::from_row,
    )
    .optional()
    .map_err(to_storage_err)?
    .map(RawFamily::into_family)
    .transpose()
}

pub fn find_by_keys_hash(conn: &Connection, keys_hash: &str) -> LineageResult<Option<Family>> {
    conn.query_row(
        &format!("{SELECT_FAMILY} WHERE family_keys_hash = ?1"),
        params![keys_hash],
        RawFamily::from_row,
    )
    .optional()
    .map_err(to_storage_err)?
    .map(RawFamily::into_family)
    .transpose()
}

pub fn list_family_ids(conn: &Connection) -> LineageResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT family_id FROM family ORDER BY family_id")
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(to_storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)
}
