//! Deterministic content addressing.
//!
//! Every entity gets a hash-derived id, so re-processing the same file never
//! creates duplicates, only upserts. All ids are lowercase BLAKE3 hex digests.
//!
//! - `file_hash`  = H(raw file bytes)
//! - `doc_id`     = H(file_hash)
//! - `node_id`    = H(`doc_id|page|span_start|span_end|canonical_section_id`)
//! - `family_keys_hash` = H(`lo|hi`) of the trimmed, lower-cased party names
//! - `family_id`  = H(family_keys_hash)

fn hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hash of raw file bytes.
pub fn file_hash(bytes: &[u8]) -> String {
    hex(bytes)
}

/// Document id derived from the file hash.
pub fn doc_id(file_hash: &str) -> String {
    hex(file_hash.as_bytes())
}

/// Clause node id derived from its provenance fields.
pub fn node_id(
    doc_id: &str,
    page: u32,
    span_start: u64,
    span_end: u64,
    canonical_section_id: &str,
) -> String {
    let key = format!("{doc_id}|{page}|{span_start}|{span_end}|{canonical_section_id}");
    hex(key.as_bytes())
}

/// Trimmed, lower-cased party names in sorted order.
pub fn sorted_party_keys(party_a: &str, party_b: &str) -> (String, String) {
    let a = party_a.trim().to_lowercase();
    let b = party_b.trim().to_lowercase();
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Order-independent family key: `family_keys_hash(A, B) == family_keys_hash(B, A)`.
pub fn family_keys_hash(party_a: &str, party_b: &str) -> String {
    let (lo, hi) = sorted_party_keys(party_a, party_b);
    hex(format!("{lo}|{hi}").as_bytes())
}

/// Family id derived from the family keys hash.
pub fn family_id(family_keys_hash: &str) -> String {
    hex(family_keys_hash.as_bytes())
}
