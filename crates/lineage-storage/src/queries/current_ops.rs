//! Raw SQL operations for the family_section_current table.

use rusqlite::{params, Connection, OptionalExtension};

use lineage_core::models::FamilySectionCurrent;
use lineage_core::LineageResult;

use crate::codec::{decode_opt_ts, decode_ts, encode_opt_ts, encode_ts};
use crate::to_storage_err;

struct RawCurrent {
    family_id: String,
    canonical_section_id: String,
    current_node_id: Option<String>,
    current_effective_ts: Option<String>,
    composed_text: Option<String>,
    updated_at: String,
}

impl RawCurrent {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            family_id: row.get(0)?,
            canonical_section_id: row.get(1)?,
            current_node_id: row.get(2)?,
            current_effective_ts: row.get(3)?,
            composed_text: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_current(self) -> LineageResult<FamilySectionCurrent> {
        Ok(FamilySectionCurrent {
            current_effective_ts: decode_opt_ts(
                "family_section_current.current_effective_ts",
                self.current_effective_ts,
            )?,
            updated_at: decode_ts("family_section_current.updated_at", &self.updated_at)?,
            family_id: self.family_id,
            canonical_section_id: self.canonical_section_id,
            current_node_id: self.current_node_id,
            composed_text: self.composed_text,
        })
    }
}

const SELECT_CURRENT: &str = "SELECT family_id, canonical_section_id, current_node_id,
        current_effective_ts, composed_text, updated_at
    FROM family_section_current";

pub fn upsert_current(conn: &Connection, row: &FamilySectionCurrent) -> LineageResult<()> {
    conn.execute(
        "INSERT INTO family_section_current (family_id, canonical_section_id, current_node_id,
            current_effective_ts, composed_text, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(family_id, canonical_section_id) DO UPDATE SET
            current_node_id = excluded.current_node_id,
            current_effective_ts = excluded.current_effective_ts,
            composed_text = excluded.composed_text,
            updated_at = excluded.updated_at",
        params![
            row.family_id,
            row.canonical_section_id,
            row.current_node_id,
            encode_opt_ts(row.current_effective_ts.as_ref()),
            row.composed_text,
            encode_ts(&row.updated_at),
        ],
    )
    .map_err(to_storage_err)?;
    Ok(())
}

pub fn get_current(
    conn: &Connection,
    family_id: &str,
    canonical_section_id: &str,
) -> LineageResult<Option<FamilySectionCurrent>> {
    conn.query_row(
        &format!("{SELECT_CURRENT} WHERE family_id = ?1 AND canonical_section_id = ?2"),
        params![family_id, canonical_section_id],
        RawCurrent::from_row,
    )
    .optional()
    .map_err(to_storage_err)?
    .map(RawCurrent::into_current)
    .transpose()
}

pub fn current_rows_for_family(
    conn: &Connection,
    family_id: &str,
) -> LineageResult<Vec<FamilySectionCurrent>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_CURRENT} WHERE family_id = ?1 ORDER BY canonical_section_id"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![family_id], RawCurrent::from_row)
        .map_err(to_storage_err)?;
    rows.map(|row| row.map_err(to_storage_err)?.into_current())
        .collect()
}

pub fn delete_current(
    conn: &Connection,
    family_id: &str,
    canonical_section_id: &str,
) -> LineageResult<bool> {
    let removed = conn
        .execute(
            "DELETE FROM family_section_current WHERE family_id = ?1 AND canonical_section_id = ?2",
            params![family_id, canonical_section_id],
        )
        .map_err(to_storage_err)?;
    Ok(removed > 0)
}

pub fn clear_current(conn: &Connection) -> LineageResult<usize> {
    conn.execute("DELETE FROM family_section_current", [])
        .map_err(to_storage_err)
}
