//! Raw SQL operations for the clause_node table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use lineage_core::models::{ChangeAction, ClauseNode, ExtractedFacts};
use lineage_core::LineageResult;

use crate::codec::{corrupt, decode_enum, decode_opt_ts, decode_ts, encode_opt_ts, encode_ts};
use crate::to_storage_err;

/// Raw clause row from the database.
#[derive(Debug, Clone)]
pub struct RawClause {
    pub node_id: String,
    pub doc_id: String,
    pub family_id: String,
    pub canonical_section_id: String,
    pub section_title: Option<String>,
    pub referenced_section_id: Option<String>,
    pub change_action: Option<String>,
    pub modifies_section_id: Option<String>,
    pub effective_ts: Option<String>,
    pub declared_effective_ts: Option<String>,
    pub page: u32,
    pub span_start: i64,
    pub span_end: i64,
    pub clause_text: String,
    pub extracted_facts_json: Option<String>,
    pub confidence: f64,
    pub created_at: String,
    pub arrival_seq: i64,
}

impl RawClause {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            node_id: row.get(0)?,
            doc_id: row.get(1)?,
            family_id: row.get(2)?,
            canonical_section_id: row.get(3)?,
            section_title: row.get(4)?,
            referenced_section_id: row.get(5)?,
            change_action: row.get(6)?,
            modifies_section_id: row.get(7)?,
            effective_ts: row.get(8)?,
            declared_effective_ts: row.get(9)?,
            page: row.get(10)?,
            span_start: row.get(11)?,
            span_end: row.get(12)?,
            clause_text: row.get(13)?,
            extracted_facts_json: row.get(14)?,
            confidence: row.get(15)?,
            created_at: row.get(16)?,
            arrival_seq: row.get(17)?,
        })
    }

    pub fn into_node(self) -> LineageResult<ClauseNode> {
        let extracted_facts = self
            .extracted_facts_json
            .as_deref()
            .map(ExtractedFacts::from_json_str)
            .transpose()?;
        let non_negative = |column: &str, value: i64| {
            u64::try_from(value).map_err(|e| corrupt(column, e.to_string()))
        };

        Ok(ClauseNode {
            change_action: decode_enum::<ChangeAction>(
                "clause_node.change_action",
                self.change_action,
            )?,
            effective_ts: decode_opt_ts("clause_node.effective_ts", self.effective_ts)?,
            declared_effective_ts: decode_opt_ts(
                "clause_node.declared_effective_ts",
                self.declared_effective_ts,
            )?,
            created_at: decode_ts("clause_node.created_at", &self.created_at)?,
            span_start: non_negative("clause_node.span_start", self.span_start)?,
            span_end: non_negative("clause_node.span_end", self.span_end)?,
            arrival_seq: non_negative("clause_node.arrival_seq", self.arrival_seq)?,
            node_id: self.node_id,
            doc_id: self.doc_id,
            family_id: self.family_id,
            canonical_section_id: self.canonical_section_id,
            section_title: self.section_title,
            referenced_section_id: self.referenced_section_id,
            modifies_section_id: self.modifies_section_id,
            page: self.page,
            clause_text: self.clause_text,
            extracted_facts,
            confidence: self.confidence,
        })
    }
}

const SELECT_CLAUSE: &str = "SELECT node_id, doc_id, family_id, canonical_section_id,
        section_title, referenced_section_id, change_action, modifies_section_id, effective_ts,
        declared_effective_ts, page, span_start, span_end, clause_text, extracted_facts_json, confidence, created_at,
        arrival_seq
    FROM clause_node";

fn to_i64(column: &str, value: u64) -> LineageResult<i64> {
    i64::try_from(value).map_err(|e| corrupt(column, e.to_string()))
}

/// Insert a clause node or refresh the enrichment fields of an existing one.
/// Returns `true` when the node was new.
pub fn upsert_clause_node(conn: &Connection, node: &ClauseNode) -> LineageResult<bool> {
    let existed = conn
        .query_row(
            "SELECT 1 FROM clause_node WHERE node_id = ?1",
            params![node.node_id],
            |_| Ok(()),
        )
        .optional()
        .map_err(to_storage_err)?
        .is_some();

    let facts_json = node
        .extracted_facts
        .as_ref()
        .map(ExtractedFacts::to_json_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO clause_node (node_id, doc_id, family_id, canonical_section_id, section_title,
            referenced_section_id, change_action, modifies_section_id, effective_ts,
            declared_effective_ts, page, span_start, span_end, clause_text,
            extracted_facts_json, confidence, created_at, arrival_seq)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
            (SELECT COALESCE(MAX(arrival_seq), 0) + 1 FROM clause_node))
         ON CONFLICT(node_id) DO UPDATE SET
            section_title = excluded.section_title,
            referenced_section_id = excluded.referenced_section_id,
            change_action = excluded.change_action,
            modifies_section_id = excluded.modifies_section_id,
            effective_ts = excluded.effective_ts,
            declared_effective_ts = excluded.declared_effective_ts,
            clause_text = excluded.clause_text,
            extracted_facts_json = excluded.extracted_facts_json,
            confidence = excluded.confidence",
        params![
            node.node_id,
            node.doc_id,
            node.family_id,
            node.canonical_section_id,
            node.section_title,
            node.referenced_section_id,
            node.change_action.map(|a| a.as_str()),
            node.modifies_section_id,
            encode_opt_ts(node.effective_ts.as_ref()),
            encode_opt_ts(node.declared_effective_ts.as_ref()),
            node.page,
            to_i64("clause_node.span_start", node.span_start)?,
            to_i64("clause_node.span_end", node.span_end)?,
            node.clause_text,
            facts_json,
            node.confidence,
            encode_ts(&node.created_at),
        ],
    )
    .map_err(to_storage_err)?;

    Ok(!existed)
}

/// Set the date of every node of `doc_id` that declared none of its own.
pub fn set_inherited_effective_ts(
    conn: &Connection,
    doc_id: &str,
    effective_ts: Option<&DateTime<Utc>>,
) -> LineageResult<usize> {
    conn.execute(
        "UPDATE clause_node SET effective_ts = ?2
         WHERE doc_id = ?1 AND declared_effective_ts IS NULL AND effective_ts IS NOT ?2",
        params![doc_id, encode_opt_ts(effective_ts)],
    )
    .map_err(to_storage_err)
}

pub fn move_document_nodes(conn: &Connection, doc_id: &str, family_id: &str) -> LineageResult<usize> {
    conn.execute(
        "UPDATE clause_node SET family_id = ?2 WHERE doc_id = ?1 AND family_id != ?2",
        params![doc_id, family_id],
    )
    .map_err(to_storage_err)
}

/// Nodes of one (family, section) key in arrival order.
pub fn nodes_for_section(
    conn: &Connection,
    family_id: &str,
    canonical_section_id: &str,
) -> LineageResult<Vec<ClauseNode>> {
    query_nodes(
        conn,
        &format!(
            "{SELECT_CLAUSE} WHERE family_id = ?1 AND canonical_section_id = ?2
             ORDER BY arrival_seq ASC"
        ),
        family_id,
        canonical_section_id,
    )
}

pub fn nodes_for_document_section(
    conn: &Connection,
    doc_id: &str,
    canonical_section_id: &str,
) -> LineageResult<Vec<ClauseNode>> {
    query_nodes(
        conn,
        &format!(
            "{SELECT_CLAUSE} WHERE doc_id = ?1 AND canonical_section_id = ?2
             ORDER BY arrival_seq ASC"
        ),
        doc_id,
        canonical_section_id,
    )
}

pub fn section_ids_for_family(conn: &Connection, family_id: &str) -> LineageResult<Vec<String>> {
    distinct_sections(
        conn,
        "SELECT DISTINCT canonical_section_id FROM clause_node WHERE family_id = ?1
         ORDER BY canonical_section_id",
        family_id,
    )
}

pub fn section_ids_for_document(conn: &Connection, doc_id: &str) -> LineageResult<Vec<String>> {
    distinct_sections(
        conn,
        "SELECT DISTINCT canonical_section_id FROM clause_node WHERE doc_id = ?1
         ORDER BY canonical_section_id",
        doc_id,
    )
}

fn query_nodes(conn: &Connection, sql: &str, a: &str, b: &str) -> LineageResult<Vec<ClauseNode>> {
    let mut stmt = conn.prepare(sql).map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![a, b], RawClause::from_row)
        .map_err(to_storage_err)?;
    rows.map(|row| row.map_err(to_storage_err)?.into_node())
        .collect()
}

fn distinct_sections(conn: &Connection, sql: &str, key: &str) -> LineageResult<Vec<String>> {
    let mut stmt = conn.prepare(sql).map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![key], |row| row.get::<_, String>(0))
        .map_err(to_storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)
}
