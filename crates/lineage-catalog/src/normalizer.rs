//! Reshapes raw catalog items into typed records.
//!
//! Pure functions only; the client folds the returned counts into its
//! statistics.

use crate::record::{AssetRecord, Fact, LineageLink, RawFact, RawItem, RawLink};
use lineage_core::LinkDirection;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Association of naming aliases. Not a data-flow dependency.
pub const SYNONYM_ASSOCIATION: &str = "core.SynonymDataElementDataFlow";

pub const UNKNOWN: &str = "Unknown";

/// Class type of the placeholder record built for an empty result set.
pub const EMPTY_RECORD_CLASS_TYPE: &str = "unknown";

/// Description facts, highest priority first.
pub const DESCRIPTION_PRIORITY: [&str; 4] = [
    "com.infa.ldm.axon.governedAxonDescription",
    "com.infa.ldm.ootb.enrichments.businessDescription",
    "core.description",
    "technicalDescription",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFilterCounts {
    /// Records dropped for lacking a target id
    pub invalid: u64,
    /// Records dropped for carrying the synonym association
    pub synonyms: u64,
}

impl LinkFilterCounts {
    pub fn is_zero(&self) -> bool {
        self.invalid == 0 && self.synonyms == 0
    }
}

impl AddAssign for LinkFilterCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.invalid += rhs.invalid;
        self.synonyms += rhs.synonyms;
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedLinks {
    pub links: Vec<LineageLink>,
    pub counts: LinkFilterCounts,
}

fn first_present<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .filter_map(Option::as_deref)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Last `/`-separated segment of an asset id.
pub fn trailing_segment(id: &str) -> Option<&str> {
    id.rsplit('/').next().filter(|s| !s.is_empty())
}

fn name_or_id(explicit: Option<&str>, id: &str) -> String {
    explicit
        .or_else(|| trailing_segment(id))
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// `name` → `core.name` → `displayName` → `label` → trailing segment of id.
pub fn resolve_item_name(item: &RawItem, id: &str) -> String {
    let explicit = first_present(&[
        &item.name,
        &item.core_name,
        &item.display_name,
        &item.label,
    ]);
    name_or_id(explicit, id)
}

/// `classType` → `core.classType` → `type`.
pub fn resolve_item_class_type(item: &RawItem) -> String {
    first_present(&[&item.class_type, &item.core_class_type, &item.type_name])
        .unwrap_or(UNKNOWN)
        .to_string()
}

pub fn resolve_link_name(link: &RawLink, target_id: &str) -> String {
    let explicit = first_present(&[
        &link.name,
        &link.core_name,
        &link.display_name,
        &link.label,
    ]);
    name_or_id(explicit, target_id)
}

pub fn resolve_link_class_type(link: &RawLink) -> String {
    first_present(&[&link.class_type, &link.core_class_type, &link.type_name])
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// First non-empty description in [`DESCRIPTION_PRIORITY`] order.
pub fn extract_description(facts: &[RawFact]) -> String {
    DESCRIPTION_PRIORITY
        .iter()
        .find_map(|wanted| {
            // Later facts override earlier ones with the same attribute.
            facts
                .iter()
                .rev()
                .find(|f| f.attribute_id.as_deref() == Some(*wanted))
                .and_then(|f| f.value.as_deref())
                .filter(|v| !v.is_empty())
        })
        .unwrap_or_default()
        .to_string()
}

/// Drop invalid and synonym links, resolve display names, tag direction.
pub fn normalize_links(raw: &[RawLink], direction: LinkDirection) -> NormalizedLinks {
    let mut normalized = NormalizedLinks::default();

    for link in raw {
        let target_id = match link.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => {
                normalized.counts.invalid += 1;
                tracing::debug!("Discarding {} link without target id", direction);
                continue;
            }
        };

        if link.association.as_deref() == Some(SYNONYM_ASSOCIATION) {
            normalized.counts.synonyms += 1;
            continue;
        }

        normalized.links.push(LineageLink {
            target_id: target_id.to_string(),
            target_name: resolve_link_name(link, target_id),
            target_class_type: resolve_link_class_type(link),
            association: link.association.clone(),
            direction,
            href: link.href.clone().filter(|h| !h.is_empty()),
        });
    }

    normalized
}

/// Normalize one item. `id` is the id the record is stored under.
pub fn normalize_item(id: &str, item: &RawItem) -> (AssetRecord, LinkFilterCounts) {
    let upstream = normalize_links(&item.src_links, LinkDirection::Upstream);
    let downstream = normalize_links(&item.dst_links, LinkDirection::Downstream);

    let mut counts = upstream.counts;
    counts += downstream.counts;

    let facts = item
        .facts
        .iter()
        .filter_map(|f| {
            Some(Fact {
                attribute_id: f.attribute_id.clone()?,
                value: f.value.clone().unwrap_or_default(),
            })
        })
        .collect();

    let record = AssetRecord {
        id: id.to_string(),
        name: resolve_item_name(item, id),
        class_type: resolve_item_class_type(item),
        description: extract_description(&item.facts),
        facts,
        src_links: upstream.links,
        dst_links: downstream.links,
        found: true,
    };

    (record, counts)
}

/// Placeholder for ids the catalog knows nothing about.
pub fn empty_record(id: &str) -> AssetRecord {
    AssetRecord {
        id: id.to_string(),
        name: name_or_id(None, id),
        class_type: EMPTY_RECORD_CLASS_TYPE.to_string(),
        description: String::new(),
        facts: Vec::new(),
        src_links: Vec::new(),
        dst_links: Vec::new(),
        found: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_filtering_counts() {
        let raw = vec![
            RawLink::to("a/B").association("core.DirectionalDataFlow"),
            RawLink::to("a/SYN1").association(SYNONYM_ASSOCIATION),
            RawLink::dangling().association("core.DirectionalDataFlow"),
            RawLink::to("  ").association("core.DirectionalDataFlow"),
            RawLink::to("a/SYN2").association(SYNONYM_ASSOCIATION),
            RawLink::to("a/C"),
        ];

        let normalized = normalize_links(&raw, LinkDirection::Upstream);
        let ids: Vec<&str> = normalized
            .links
            .iter()
            .map(|l| l.target_id.as_str())
            .collect();

        assert_eq!(ids, vec!["a/B", "a/C"]);
        assert_eq!(normalized.counts.synonyms, 2);
        assert_eq!(normalized.counts.invalid, 2);
        assert!(normalized
            .links
            .iter()
            .all(|l| l.direction == LinkDirection::Upstream));
    }

    #[test]
    fn test_link_without_id_is_invalid_even_if_synonym() {
        let raw = vec![RawLink::dangling().association(SYNONYM_ASSOCIATION)];
        let normalized = normalize_links(&raw, LinkDirection::Downstream);
        assert_eq!(normalized.counts.invalid, 1);
        assert_eq!(normalized.counts.synonyms, 0);
    }

    #[test]
    fn test_name_fallback_chain() {
        let mut item = RawItem::new("server://db/SCHEMA/ORDERS");
        assert_eq!(resolve_item_name(&item, "server://db/SCHEMA/ORDERS"), "ORDERS");

        item.label = Some("Orders label".into());
        assert_eq!(resolve_item_name(&item, "x"), "Orders label");

        item.display_name = Some("Orders display".into());
        assert_eq!(resolve_item_name(&item, "x"), "Orders display");

        item.core_name = Some("".into());
        assert_eq!(resolve_item_name(&item, "x"), "Orders display");

        item.name = Some("ORDERS_T".into());
        assert_eq!(resolve_item_name(&item, "x"), "ORDERS_T");
    }

    #[test]
    fn test_name_falls_back_to_unknown() {
        let item = RawItem::default();
        assert_eq!(resolve_item_name(&item, "trailing/"), UNKNOWN);
        assert_eq!(resolve_item_class_type(&item), UNKNOWN);
    }

    #[test]
    fn test_link_name_resolution() {
        let link = RawLink::to("db/SCHEMA/STG_CUSTOMER");
        let normalized = normalize_links(&[link], LinkDirection::Upstream);
        assert_eq!(normalized.links[0].target_name, "STG_CUSTOMER");
        assert_eq!(normalized.links[0].target_class_type, UNKNOWN);
    }

    #[test]
    fn test_description_priority() {
        let facts = vec![
            RawFact {
                attribute_id: Some("technicalDescription".into()),
                value: Some("technical".into()),
            },
            RawFact {
                attribute_id: Some("core.description".into()),
                value: Some("core".into()),
            },
            RawFact {
                attribute_id: Some(
                    "com.infa.ldm.ootb.enrichments.businessDescription".into(),
                ),
                value: Some("".into()),
            },
        ];
        assert_eq!(extract_description(&facts), "core");
        assert_eq!(extract_description(&facts[..1]), "technical");
        assert_eq!(extract_description(&[]), "");
    }

    #[test]
    fn test_normalize_item() {
        let item = RawItem::new("db/S/T")
            .named("T")
            .with_class_type("com.infa.ldm.relational.Table")
            .with_fact("core.description", "a table")
            .with_src_link(RawLink::to("db/S/U").association("core.DirectionalDataFlow"))
            .with_src_link(RawLink::to("db/S/ALIAS").association(SYNONYM_ASSOCIATION))
            .with_dst_link(RawLink::to("db/S/V"));

        let (record, counts) = normalize_item("db/S/T", &item);
        assert!(record.found);
        assert_eq!(record.name, "T");
        assert_eq!(record.description, "a table");
        assert_eq!(record.src_links.len(), 1);
        assert_eq!(record.dst_links.len(), 1);
        assert_eq!(record.dst_links[0].direction, LinkDirection::Downstream);
        assert_eq!(counts.synonyms, 1);
        assert_eq!(record.fact("core.description"), Some("a table"));
    }

    #[test]
    fn test_empty_record() {
        let record = empty_record("server://db/SCHEMA/ORPHAN");
        assert!(!record.found);
        assert_eq!(record.name, "ORPHAN");
        assert_eq!(record.class_type, EMPTY_RECORD_CLASS_TYPE);
        assert!(record.src_links.is_empty() && record.dst_links.is_empty());
    }
}
