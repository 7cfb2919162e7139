//! Classification - the pure function mapping a record to exactly one zone.
//!
//! Rule order, first match wins:
//!
//! 1. explicit zone tag on the record (after alias normalization);
//! 2. lower-cased title tested against ordered keyword groups;
//! 3. default to the gallery.
//!
//! The dashboard versions that preceded this engine disagreed about which
//! keywords meant "services"; this is the single canonical list. Bare
//! "corte" is deliberately not a services keyword so plain cut names fall
//! through to the gallery default, while service names match on their
//! service-specific words ("infantil", "barba", ...).

use crate::record::RawRecord;
use crate::zone::Zone;

/// Ordered keyword groups. Hero before services before team; the first
/// group containing a matching keyword wins.
const KEYWORD_RULES: &[(Zone, &[&str])] = &[
    (Zone::Hero, &["logo", "banner", "fachada", "hero"]),
    (
        Zone::Services,
        &[
            "barba",
            "infantil",
            "pigmenta",
            "sobrancelha",
            "luzes",
            "platinado",
            "tesoura",
            "quimica",
            "química",
            "hidrata",
        ],
    ),
    (
        Zone::Team,
        &[
            "equipe",
            "barbeiro",
            "proprietario",
            "proprietário",
            "profissional",
        ],
    ),
];

/// Map a record to exactly one zone.
///
/// Pure and total: same record in, same zone out, independent of any other
/// record. An empty or whitespace-only title with no zone tag always falls
/// through to [`Zone::Gallery`]; that is deliberate, not an error.
pub fn classify(record: &RawRecord) -> Zone {
    if let Some(zone) = record.zone.as_deref().and_then(Zone::from_tag) {
        return zone;
    }

    let title = record.title.to_lowercase();
    for (zone, keywords) in KEYWORD_RULES {
        if keywords.iter().any(|k| title.contains(k)) {
            return *zone;
        }
    }

    Zone::Gallery
}
