//! Slot resolution and pagination.
//!
//! A slot is the literal string `{slotBaseName}_{position}` searched for
//! verbatim in the template text. Positions are dense, 1-based, and bounded
//! by `cards_per_page`; position `i` reads record `i - 1` of the page group
//! and resolves to the empty string when the group is shorter.

use crate::source::Record;

/// Compute the full (slot, value) list for one page group.
///
/// Position-major, mapping-iteration order: all slots for position 1 first,
/// then position 2, and so on. That order also governs substitution, which
/// matters when a replacement value happens to contain another slot's name.
pub fn resolve_slots(
    mapping: &[(String, String)],
    page: &[Record],
    cards_per_page: usize,
) -> Vec<(String, String)> {
    let mut slots = Vec::with_capacity(cards_per_page * mapping.len());

    for position in 1..=cards_per_page {
        let record = page.get(position - 1);
        for (source_field, slot_base) in mapping {
            let value = record
                .and_then(|r| r.get(source_field))
                .cloned()
                .unwrap_or_default();
            slots.push((format!("{slot_base}_{position}"), value));
        }
    }

    slots
}

/// Split the filtered record sequence into consecutive page groups.
///
/// Preserves input order; the final group may be shorter than
/// `cards_per_page`, and an empty sequence yields no groups at all.
pub fn paginate(records: &[Record], cards_per_page: usize) -> impl Iterator<Item = &[Record]> {
    debug_assert!(cards_per_page >= 1);
    records.chunks(cards_per_page.max(1))
}
