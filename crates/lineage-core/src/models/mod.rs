mod clause;
mod document;
mod facts;
mod family;
mod query;
mod records;
mod reports;
mod section;

pub use clause::{clamp_confidence, ChangeAction, ClauseNode};
pub use document::{ContractDocument, DocQuality, DocType};
pub use facts::{
    ExtractedFacts, FactValue, FactsUpcaster, FactsUpcasterRegistry, RawFacts,
    CURRENT_FACTS_SCHEMA,
};
pub use family::Family;
pub use query::{
    AsOfSection, ClauseChange, CurrentSection, FamilySelector, HistoryEntry, ResolvedSection,
    SectionHistory, SectionMatch, SectionStatus, VersionChanges,
};
pub use records::{ClauseRecord, DocumentRecord, PartyPair};
pub use reports::{
    CorrectionReport, IngestionReport, MaterializationReport, SectionFailure, SectionKey,
    VersionStamp,
};
pub use section::FamilySectionCurrent;
