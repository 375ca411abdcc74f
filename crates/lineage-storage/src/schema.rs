//! Schema SQL constants used by migrations.rs.

/// V1 schema: 4 lineage tables + 6 indexes.
pub const LINEAGE_TABLES_V1: &str = "
    CREATE TABLE IF NOT EXISTS family (
        family_id TEXT PRIMARY KEY NOT NULL,
        family_keys_hash TEXT NOT NULL UNIQUE,
        party_a_norm TEXT NOT NULL,
        party_b_norm TEXT NOT NULL,
        created_at TEXT NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS contract_document (
        doc_id TEXT PRIMARY KEY NOT NULL,
        file_hash TEXT NOT NULL UNIQUE,
        family_id TEXT REFERENCES family(family_id),
        doc_type TEXT CHECK (
            doc_type IN ('master','amendment','restatement','sow','addendum')
            OR doc_type IS NULL
        ),
        effective_ts TEXT,
        term_start_ts TEXT,
        term_end_ts TEXT,
        version_ingest INTEGER,
        version_timeline INTEGER,
        parties_json TEXT,
        metadata_confidence REAL,
        doc_quality TEXT NOT NULL DEFAULT 'normal' CHECK (doc_quality IN ('normal','low')),
        created_at TEXT NOT NULL,
        arrival_seq INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS clause_node (
        node_id TEXT PRIMARY KEY NOT NULL,
        doc_id TEXT NOT NULL REFERENCES contract_document(doc_id),
        family_id TEXT NOT NULL REFERENCES family(family_id),
        canonical_section_id TEXT NOT NULL,
        section_title TEXT,
        referenced_section_id TEXT,
        change_action TEXT CHECK (
            change_action IN ('REPLACE','APPEND','ADD_NEW','DELETE','NO_CHANGE')
            OR change_action IS NULL
        ),
        modifies_section_id TEXT,
        effective_ts TEXT,
        declared_effective_ts TEXT,
        page INTEGER NOT NULL,
        span_start INTEGER NOT NULL,
        span_end INTEGER NOT NULL,
        clause_text TEXT NOT NULL,
        extracted_facts_json TEXT,
        confidence REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
        created_at TEXT NOT NULL,
        arrival_seq INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS family_section_current (
        family_id TEXT NOT NULL REFERENCES family(family_id),
        canonical_section_id TEXT NOT NULL,
        current_node_id TEXT REFERENCES clause_node(node_id),
        current_effective_ts TEXT,
        composed_text TEXT,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (family_id, canonical_section_id)
    ) STRICT;

    CREATE INDEX IF NOT EXISTS idx_document_family ON contract_document(family_id);
    CREATE INDEX IF NOT EXISTS idx_document_effective ON contract_document(effective_ts);
    CREATE INDEX IF NOT EXISTS idx_clause_doc ON clause_node(doc_id);
    CREATE INDEX IF NOT EXISTS idx_clause_family_section ON clause_node(family_id, canonical_section_id);
    CREATE INDEX IF NOT EXISTS idx_clause_doc_section ON clause_node(doc_id, canonical_section_id);
    CREATE INDEX IF NOT EXISTS idx_clause_effective ON clause_node(effective_ts);
";

/// All lineage table names (for verification).
pub const LINEAGE_TABLE_NAMES: [&str; 4] = [
    "family",
    "contract_document",
    "clause_node",
    "family_section_current",
];
