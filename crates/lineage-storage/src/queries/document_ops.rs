//! Raw SQL operations for the contract_document table.

use rusqlite::{params, Connection, OptionalExtension};

use lineage_core::models::{ContractDocument, DocQuality, DocType, PartyPair};
use lineage_core::{LineageError, LineageResult};

use crate::codec::{corrupt, decode_enum, decode_opt_ts, decode_ts, encode_opt_ts, encode_ts};
use crate::{is_unique_violation, to_storage_err};

/// Raw document row from the database.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub doc_id: String,
    pub file_hash: String,
    pub family_id: Option<String>,
    pub doc_type: Option<String>,
    pub effective_ts: Option<String>,
    pub term_start_ts: Option<String>,
    pub term_end_ts: Option<String>,
    pub version_ingest: Option<u32>,
    pub version_timeline: Option<u32>,
    pub parties_json: Option<String>,
    pub metadata_confidence: Option<f64>,
    pub doc_quality: String,
    pub created_at: String,
    pub arrival_seq: i64,
}

impl RawDocument {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            doc_id: row.get(0)?,
            file_hash: row.get(1)?,
            family_id: row.get(2)?,
            doc_type: row.get(3)?,
            effective_ts: row.get(4)?,
            term_start_ts: row.get(5)?,
            term_end_ts: row.get(6)?,
            version_ingest: row.get(7)?,
            version_timeline: row.get(8)?,
            parties_json: row.get(9)?,
            metadata_confidence: row.get(10)?,
            doc_quality: row.get(11)?,
            created_at: row.get(12)?,
            arrival_seq: row.get(13)?,
        })
    }

    pub fn into_document(self) -> LineageResult<ContractDocument> {
        let parties = self
            .parties_json
            .map(|raw| {
                serde_json::from_str::<PartyPair>(&raw)
                    .map_err(|e| corrupt("contract_document.parties_json", e.to_string()))
            })
            .transpose()?;
        let quality = self
            .doc_quality
            .parse::<DocQuality>()
            .map_err(|e| corrupt("contract_document.doc_quality", e.to_string()))?;

        Ok(ContractDocument {
            doc_type: decode_enum::<DocType>("contract_document.doc_type", self.doc_type)?,
            effective_ts: decode_opt_ts("contract_document.effective_ts", self.effective_ts)?,
            term_start: decode_opt_ts("contract_document.term_start_ts", self.term_start_ts)?,
            term_end: decode_opt_ts("contract_document.term_end_ts", self.term_end_ts)?,
            created_at: decode_ts("contract_document.created_at", &self.created_at)?,
            arrival_seq: u64::try_from(self.arrival_seq)
                .map_err(|e| corrupt("contract_document.arrival_seq", e.to_string()))?,
            doc_id: self.doc_id,
            file_hash: self.file_hash,
            family_id: self.family_id,
            version_ingest: self.version_ingest,
            version_timeline: self.version_timeline,
            parties,
            metadata_confidence: self.metadata_confidence,
            quality,
        })
    }
}

const SELECT_DOCUMENT: &str = "SELECT doc_id, file_hash, family_id, doc_type, effective_ts,
        term_start_ts, term_end_ts, version_ingest, version_timeline, parties_json,
        metadata_confidence, doc_quality, created_at, arrival_seq
    FROM contract_document";

/// Insert a document, or update the mutable fields of an existing row.
/// New rows get the next arrival sequence.
pub fn upsert_document(conn: &Connection, doc: &ContractDocument) -> LineageResult<()> {
    let parties_json = doc
        .parties
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO contract_document (doc_id, file_hash, family_id, doc_type, effective_ts,
            term_start_ts, term_end_ts, version_ingest, version_timeline, parties_json,
            metadata_confidence, doc_quality, created_at, arrival_seq)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
            (SELECT COALESCE(MAX(arrival_seq), 0) + 1 FROM contract_document))
         ON CONFLICT(doc_id) DO UPDATE SET
            family_id = excluded.family_id,
            doc_type = excluded.doc_type,
            effective_ts = excluded.effective_ts,
            term_start_ts = excluded.term_start_ts,
            term_end_ts = excluded.term_end_ts,
            version_ingest = excluded.version_ingest,
            version_timeline = excluded.version_timeline,
            parties_json = excluded.parties_json,
            metadata_confidence = excluded.metadata_confidence,
            doc_quality = excluded.doc_quality",
        params![
            doc.doc_id,
            doc.file_hash,
            doc.family_id,
            doc.doc_type.map(|t| t.as_str()),
            encode_opt_ts(doc.effective_ts.as_ref()),
            encode_opt_ts(doc.term_start.as_ref()),
            encode_opt_ts(doc.term_end.as_ref()),
            doc.version_ingest,
            doc.version_timeline,
            parties_json,
            doc.metadata_confidence,
            doc.quality.as_str(),
            encode_ts(&doc.created_at),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            LineageError::ConflictRace {
                entity: "contract_document",
                key: doc.file_hash.clone(),
            }
        } else {
            to_storage_err(e)
        }
    })?;
    Ok(())
}

pub fn get_document(conn: &Connection, doc_id: &str) -> LineageResult<Option<ContractDocument>> {
    query_one(conn, &format!("{SELECT_DOCUMENT} WHERE doc_id = ?1"), doc_id)
}

pub fn find_by_file_hash(
    conn: &Connection,
    file_hash: &str,
) -> LineageResult<Option<ContractDocument>> {
    query_one(conn, &format!("{SELECT_DOCUMENT} WHERE file_hash = ?1"), file_hash)
}

/// Documents of a family in arrival order.
pub fn documents_in_family(
    conn: &Connection,
    family_id: &str,
) -> LineageResult<Vec<ContractDocument>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_DOCUMENT} WHERE family_id = ?1 ORDER BY arrival_seq ASC"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![family_id], RawDocument::from_row)
        .map_err(to_storage_err)?;
    rows.map(|row| row.map_err(to_storage_err)?.into_document())
        .collect()
}

pub fn document_at_timeline_version(
    conn: &Connection,
    family_id: &str,
    version_timeline: u32,
) -> LineageResult<Option<ContractDocument>> {
    conn.query_row(
        &format!("{SELECT_DOCUMENT} WHERE family_id = ?1 AND version_timeline = ?2 LIMIT 1"),
        params![family_id, version_timeline],
        RawDocument::from_row,
    )
    .optional()
    .map_err(to_storage_err)?
    .map(RawDocument::into_document)
    .transpose()
}

fn query_one(conn: &Connection, sql: &str, key: &str) -> LineageResult<Option<ContractDocument>> {
    conn.query_row(sql, params![key], RawDocument::from_row)
        .optional()
        .map_err(to_storage_err)?
        .map(RawDocument::into_document)
        .transpose()
}
