//! Family resolution: one family per unordered pair of parties.

use chrono::Utc;
use tracing::{debug, info};

use lineage_core::errors::{LineageError, LineageResult};
use lineage_core::hashing;
use lineage_core::models::{Family, FamilySelector};
use lineage_core::normalize::normalize_party_name;
use lineage_core::traits::{LineageReader, LineageWriter};

fn check_parties(party_a: &str, party_b: &str) -> LineageResult<()> {
    if party_a.trim().is_empty() || party_b.trim().is_empty() {
        return Err(LineageError::InvalidInput(
            "both party names are required to resolve a family".to_string(),
        ));
    }
    Ok(())
}

/// Build the family row for a pair, names stored in sorted order.
pub fn new_family(party_a: &str, party_b: &str) -> Family {
    let (lo, hi) = hashing::sorted_party_keys(party_a, party_b);
    let family_keys_hash = hashing::family_keys_hash(party_a, party_b);
    Family {
        family_id: hashing::family_id(&family_keys_hash),
        family_keys_hash,
        party_a_norm: lo,
        party_b_norm: hi,
        created_at: Utc::now(),
    }
}

/// Return the family for the pair, creating it when absent.
///
/// Idempotent across swapped names. A concurrent insert of the same pair
/// surfaces from storage as `ConflictRace`; the winner's row is re-read and
/// returned instead.
pub fn match_or_create_family<W: LineageWriter + ?Sized>(
    writer: &mut W,
    party_a: &str,
    party_b: &str,
) -> LineageResult<Family> {
    check_parties(party_a, party_b)?;
    let family = new_family(party_a, party_b);

    if let Some(existing) = writer.find_family_by_keys_hash(&family.family_keys_hash)? {
        return Ok(existing);
    }

    match writer.insert_family(&family) {
        Ok(()) => {
            info!(
                family_id = %family.family_id,
                party_a = %family.party_a_norm,
                party_b = %family.party_b_norm,
                "created contract family"
            );
            Ok(family)
        }
        Err(LineageError::ConflictRace { .. }) => {
            debug!(keys = %family.family_keys_hash, "family created concurrently, re-reading");
            writer
                .find_family_by_keys_hash(&family.family_keys_hash)?
                .ok_or_else(|| LineageError::not_found("family", family.family_keys_hash))
        }
        Err(e) => Err(e),
    }
}

/// Read-only lookup of the family for a pair. Never creates.
pub fn find_family<R: LineageReader + ?Sized>(
    reader: &R,
    party_a: &str,
    party_b: &str,
) -> LineageResult<Option<Family>> {
    check_parties(party_a, party_b)?;
    reader.find_family_by_keys_hash(&hashing::family_keys_hash(party_a, party_b))
}

/// Resolve a query selector to its family, or `NotFound`.
///
/// Party names are tried as given first, then in their normalized form,
/// so callers may pass either "Acme Corp." or "acme".
pub fn resolve_selector<R: LineageReader + ?Sized>(
    reader: &R,
    selector: &FamilySelector,
) -> LineageResult<Family> {
    let found = match selector {
        FamilySelector::Id(family_id) => reader.get_family(family_id)?,
        FamilySelector::Parties(a, b) => match find_family(reader, a, b)? {
            Some(family) => Some(family),
            None => {
                let (na, nb) = (normalize_party_name(a), normalize_party_name(b));
                if na.is_empty() || nb.is_empty() {
                    None
                } else {
                    find_family(reader, &na, &nb)?
                }
            }
        },
    };
    found.ok_or_else(|| LineageError::not_found("family", selector.describe()))
}
