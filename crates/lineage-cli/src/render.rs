use lineage_catalog::{AssetRecord, LineageLink};
use lineage_core::LinkDirection;
use lineage_graph::{BuildStatistics, TreeNode};
use std::fmt::Write;

fn arrow(direction: Option<LinkDirection>) -> &'static str {
    match direction {
        Some(LinkDirection::Upstream) => "<- ",
        Some(LinkDirection::Downstream) => "-> ",
        None => "",
    }
}

/// Indented text rendering, one node per line.
pub fn render_tree(root: &TreeNode) -> String {
    let mut out = String::new();
    for node in root.iter() {
        let indent = "  ".repeat(node.level().saturating_sub(1));
        let _ = write!(
            out,
            "{}{} {}{} [{}]",
            indent,
            node.code,
            arrow(node.direction),
            node.name,
            node.class_type
        );
        if !node.found {
            out.push_str(" (not in catalog)");
        }
        out.push('\n');
    }
    out
}

pub fn render_links(links: &[LineageLink]) -> String {
    let mut out = String::new();
    for link in links {
        let _ = writeln!(
            out,
            "{}{} [{}] {}",
            arrow(Some(link.direction)),
            link.target_name,
            link.target_class_type,
            link.target_id
        );
    }
    out
}

pub fn render_asset(record: &AssetRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", record.name, record.class_type);
    let _ = writeln!(out, "  id: {}", record.id);
    if !record.description.is_empty() {
        let _ = writeln!(out, "  description: {}", record.description);
    }
    let _ = writeln!(
        out,
        "  links: {} upstream, {} downstream",
        record.src_links.len(),
        record.dst_links.len()
    );
    for fact in &record.facts {
        let _ = writeln!(out, "  {} = {}", fact.attribute_id, fact.value);
    }
    out
}

pub fn render_stats(stats: &BuildStatistics) -> String {
    let mut out = format!(
        "{} node(s) in {} ms, {} cache hit(s), {} fetch(es), {} API error(s), {} cycle(s) prevented",
        stats.nodes_created,
        stats.elapsed_ms,
        stats.cache_hits,
        stats.cache_misses,
        stats.api_errors,
        stats.cycles_prevented
    );
    if stats.synonyms_filtered > 0 || stats.invalid_links > 0 {
        let _ = write!(
            out,
            ", {} synonym(s) and {} invalid link(s) filtered",
            stats.synonyms_filtered, stats.invalid_links
        );
    }
    if stats.links_truncated > 0 {
        let _ = write!(out, ", {} link(s) past the sibling limit", stats.links_truncated);
    }
    if stats.budget_exhausted {
        out.push_str(", node budget exhausted");
    }
    if stats.cancelled {
        out.push_str(", cancelled");
    }
    out
}
