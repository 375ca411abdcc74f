//! In-memory implementation of the lineage storage port.
//!
//! A write scope runs against a clone of the state and swaps it in only when
//! the closure succeeds, so a failed scope leaves nothing behind.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use lineage_core::errors::StorageError;
use lineage_core::models::{ClauseNode, ContractDocument, Family, FamilySectionCurrent};
use lineage_core::traits::{LineageReader, LineageStorage, LineageWriter, StorageHealth};
use lineage_core::{LineageError, LineageResult};

use crate::migrations::CURRENT_VERSION;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    families: BTreeMap<String, Family>,
    family_by_keys: HashMap<String, String>,
    documents: BTreeMap<String, ContractDocument>,
    doc_by_file_hash: HashMap<String, String>,
    nodes: BTreeMap<String, ClauseNode>,
    current: BTreeMap<(String, String), FamilySectionCurrent>,
    last_doc_seq: u64,
    last_node_seq: u64,
}

#[derive(Default)]
pub struct MemoryLineageStorage {
    state: RwLock<MemoryState>,
    closed: AtomicBool,
}

impl MemoryLineageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> LineageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LineageError::Unavailable {
                reason: "storage has been shut down".to_string(),
            });
        }
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> LineageError {
    StorageError::LockPoisoned(format!("memory state: {e}")).into()
}

impl LineageStorage for MemoryLineageStorage {
    fn read<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&dyn LineageReader) -> LineageResult<T>,
    {
        self.ensure_open()?;
        let state = self.state.read().map_err(poisoned)?;
        f(&*state)
    }

    fn write<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&mut dyn LineageWriter) -> LineageResult<T>,
    {
        self.ensure_open()?;
        let mut state = self.state.write().map_err(poisoned)?;
        let mut draft = state.clone();
        let value = f(&mut draft)?;
        *state = draft;
        Ok(value)
    }

    fn migrate(&self) -> LineageResult<()> {
        self.ensure_open()
    }

    fn health_check(&self) -> LineageResult<StorageHealth> {
        Ok(StorageHealth {
            connected: !self.closed.load(Ordering::Acquire),
            wal_mode: false,
            schema_version: CURRENT_VERSION,
        })
    }

    fn shutdown(&self) -> LineageResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl MemoryState {
    fn sorted_nodes<P>(&self, keep: P) -> Vec<ClauseNode>
    where
        P: Fn(&ClauseNode) -> bool,
    {
        let mut nodes: Vec<ClauseNode> = self.nodes.values().filter(|n| keep(*n)).cloned().collect();
        nodes.sort_by_key(|n| n.arrival_seq);
        nodes
    }

    fn section_ids<P>(&self, keep: P) -> Vec<String>
    where
        P: Fn(&ClauseNode) -> bool,
    {
        self.nodes
            .values()
            .filter(|n| keep(*n))
            .map(|n| n.canonical_section_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl LineageReader for MemoryState {
    fn get_family(&self, family_id: &str) -> LineageResult<Option<Family>> {
        Ok(self.families.get(family_id).cloned())
    }

    fn find_family_by_keys_hash(&self, family_keys_hash: &str) -> LineageResult<Option<Family>> {
        Ok(self
            .family_by_keys
            .get(family_keys_hash)
            .and_then(|id| self.families.get(id))
            .cloned())
    }

    fn list_family_ids(&self) -> LineageResult<Vec<String>> {
        Ok(self.families.keys().cloned().collect())
    }

    fn get_document(&self, doc_id: &str) -> LineageResult<Option<ContractDocument>> {
        Ok(self.documents.get(doc_id).cloned())
    }

    fn find_document_by_file_hash(
        &self,
        file_hash: &str,
    ) -> LineageResult<Option<ContractDocument>> {
        Ok(self
            .doc_by_file_hash
            .get(file_hash)
            .and_then(|id| self.documents.get(id))
            .cloned())
    }

    fn documents_in_family(&self, family_id: &str) -> LineageResult<Vec<ContractDocument>> {
        let mut docs: Vec<ContractDocument> = self
            .documents
            .values()
            .filter(|d| d.family_id.as_deref() == Some(family_id))
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.arrival_seq);
        Ok(docs)
    }

    fn document_at_timeline_version(
        &self,
        family_id: &str,
        version_timeline: u32,
    ) -> LineageResult<Option<ContractDocument>> {
        Ok(self
            .documents
            .values()
            .find(|d| {
                d.family_id.as_deref() == Some(family_id)
                    && d.version_timeline == Some(version_timeline)
            })
            .cloned())
    }

    fn nodes_for_section(
        &self,
        family_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Vec<ClauseNode>> {
        Ok(self.sorted_nodes(|n| {
            n.family_id == family_id && n.canonical_section_id == canonical_section_id
        }))
    }

    fn nodes_for_document_section(
        &self,
        doc_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Vec<ClauseNode>> {
        Ok(self.sorted_nodes(|n| {
            n.doc_id == doc_id && n.canonical_section_id == canonical_section_id
        }))
    }

    fn section_ids_for_family(&self, family_id: &str) -> LineageResult<Vec<String>> {
        Ok(self.section_ids(|n| n.family_id == family_id))
    }

    fn section_ids_for_document(&self, doc_id: &str) -> LineageResult<Vec<String>> {
        Ok(self.section_ids(|n| n.doc_id == doc_id))
    }

    fn get_current(
        &self,
        family_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Option<FamilySectionCurrent>> {
        Ok(self
            .current
            .get(&(family_id.to_string(), canonical_section_id.to_string()))
            .cloned())
    }

    fn current_rows_for_family(
        &self,
        family_id: &str,
    ) -> LineageResult<Vec<FamilySectionCurrent>> {
        Ok(self
            .current
            .values()
            .filter(|row| row.family_id == family_id)
            .cloned()
            .collect())
    }
}

impl LineageWriter for MemoryState {
    fn insert_family(&mut self, family: &Family) -> LineageResult<()> {
        if self.family_by_keys.contains_key(&family.family_keys_hash)
            || self.families.contains_key(&family.family_id)
        {
            return Err(LineageError::ConflictRace {
                entity: "family",
                key: family.family_keys_hash.clone(),
            });
        }
        self.family_by_keys
            .insert(family.family_keys_hash.clone(), family.family_id.clone());
        self.families.insert(family.family_id.clone(), family.clone());
        Ok(())
    }

    fn upsert_document(&mut self, document: &ContractDocument) -> LineageResult<ContractDocument> {
        if let Some(owner) = self.doc_by_file_hash.get(&document.file_hash) {
            if owner != &document.doc_id {
                return Err(LineageError::ConflictRace {
                    entity: "contract_document",
                    key: document.file_hash.clone(),
                });
            }
        }

        let stored = match self.documents.get(&document.doc_id) {
            Some(existing) => ContractDocument {
                doc_id: existing.doc_id.clone(),
                file_hash: existing.file_hash.clone(),
                created_at: existing.created_at,
                arrival_seq: existing.arrival_seq,
                ..document.clone()
            },
            None => {
                self.last_doc_seq += 1;
                ContractDocument {
                    arrival_seq: self.last_doc_seq,
                    ..document.clone()
                }
            }
        };
        self.doc_by_file_hash
            .insert(stored.file_hash.clone(), stored.doc_id.clone());
        self.documents.insert(stored.doc_id.clone(), stored.clone());
        Ok(stored)
    }

    fn upsert_clause_node(&mut self, node: &ClauseNode) -> LineageResult<bool> {
        let (stored, inserted) = match self.nodes.get(&node.node_id) {
            Some(existing) => (
                ClauseNode {
                    doc_id: existing.doc_id.clone(),
                    family_id: existing.family_id.clone(),
                    canonical_section_id: existing.canonical_section_id.clone(),
                    page: existing.page,
                    span_start: existing.span_start,
                    span_end: existing.span_end,
                    created_at: existing.created_at,
                    arrival_seq: existing.arrival_seq,
                    ..node.clone()
                },
                false,
            ),
            None => {
                self.last_node_seq += 1;
                (
                    ClauseNode {
                        arrival_seq: self.last_node_seq,
                        ..node.clone()
                    },
                    true,
                )
            }
        };
        self.nodes.insert(stored.node_id.clone(), stored);
        Ok(inserted)
    }

    fn set_inherited_effective_ts(
        &mut self,
        doc_id: &str,
        effective_ts: Option<DateTime<Utc>>,
    ) -> LineageResult<usize> {
        let mut changed = 0;
        for node in self.nodes.values_mut() {
            if node.doc_id == doc_id
                && node.inherits_document_date()
                && node.effective_ts != effective_ts
            {
                node.effective_ts = effective_ts;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn move_document_nodes(&mut self, doc_id: &str, family_id: &str) -> LineageResult<usize> {
        let mut moved = 0;
        for node in self.nodes.values_mut() {
            if node.doc_id == doc_id && node.family_id != family_id {
                node.family_id = family_id.to_string();
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn upsert_current(&mut self, row: &FamilySectionCurrent) -> LineageResult<()> {
        self.current.insert(
            (row.family_id.clone(), row.canonical_section_id.clone()),
            row.clone(),
        );
        Ok(())
    }

    fn delete_current(
        &mut self,
        family_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<bool> {
        Ok(self
            .current
            .remove(&(family_id.to_string(), canonical_section_id.to_string()))
            .is_some())
    }

    fn clear_current(&mut self) -> LineageResult<usize> {
        let removed = self.current.len();
        self.current.clear();
        Ok(removed)
    }
}
