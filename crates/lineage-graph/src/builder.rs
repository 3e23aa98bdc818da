//! Bounded depth-first construction of lineage trees.
//!
//! The walk uses an explicit work stack instead of recursion. Items are
//! popped in the same order a recursive pre-order walk would visit them
//! (children pushed in reverse), so path codes, visit order and the
//! cycle policy match the recursive formulation exactly. Nodes are kept
//! in a flat arena with parent indices while the walk runs and are
//! assembled into an owned tree at the end.

use crate::node::{child_code, TreeNode, MAX_SIBLINGS, ROOT_CODE};
use crate::stats::BuildStatistics;
use lineage_catalog::{AssetRecord, CatalogClient, LineageLink};
use lineage_core::{CatalogError, LineageDirection, LinkDirection, TraversalConfig};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Traversal policy for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub direction: LineageDirection,
    /// Levels below the root are cut at this depth; the root sits at depth 0.
    pub max_depth: usize,
    /// Ceiling on materialized nodes for the whole build.
    pub max_total_nodes: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&TraversalConfig::default())
    }
}

impl From<&TraversalConfig> for BuildOptions {
    fn from(config: &TraversalConfig) -> Self {
        Self {
            direction: config.default_direction,
            max_depth: config.max_depth,
            max_total_nodes: config.max_total_nodes,
        }
    }
}

impl BuildOptions {
    pub fn new(direction: LineageDirection) -> Self {
        Self {
            direction,
            ..Default::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_total_nodes(mut self, max_total_nodes: usize) -> Self {
        self.max_total_nodes = max_total_nodes;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    /// None when the root itself could not be fetched.
    pub tree: Option<Arc<TreeNode>>,
    pub stats: BuildStatistics,
}

impl BuildResult {
    pub fn is_empty(&self) -> bool {
        self.tree.is_none()
    }
}

struct WorkItem {
    asset_id: String,
    parent: Option<usize>,
    depth: usize,
    code: String,
    /// Direction inherited from the root link; None on the root.
    follow: Option<LinkDirection>,
    via: Option<LineageLink>,
}

struct Slot {
    node: TreeNode,
    parent: Option<usize>,
}

/// Builds lineage trees over a shared [`CatalogClient`].
///
/// The builder holds no per-build state: the visited set, the arena and the
/// statistics belong to one call, so concurrent builds on one builder (or
/// several builders over one client) are independent apart from the
/// client's cache.
#[derive(Clone)]
pub struct LineageBuilder {
    client: Arc<CatalogClient>,
}

impl LineageBuilder {
    pub fn new(client: Arc<CatalogClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<CatalogClient> {
        &self.client
    }

    pub async fn build(&self, root_id: &str, options: &BuildOptions) -> BuildResult {
        self.build_with_cancellation(root_id, options, CancellationToken::new())
            .await
    }

    /// Like [`build`](Self::build), stopping at the next fetch once `cancel`
    /// fires. In-flight requests run to completion; the partial tree is
    /// returned with `stats.cancelled` set.
    pub async fn build_with_cancellation(
        &self,
        root_id: &str,
        options: &BuildOptions,
        cancel: CancellationToken,
    ) -> BuildResult {
        let span = info_span!(
            "lineage_build",
            root = %root_id,
            direction = %options.direction
        );
        self.walk(root_id, options, cancel).instrument(span).await
    }

    async fn walk(
        &self,
        root_id: &str,
        options: &BuildOptions,
        cancel: CancellationToken,
    ) -> BuildResult {
        let started = Instant::now();
        let mut stats = BuildStatistics::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut slots: Vec<Slot> = Vec::new();

        info!(
            "Building {} lineage for {} (max depth {}, max nodes {})",
            options.direction, root_id, options.max_depth, options.max_total_nodes
        );
        for &direction in options.direction.link_directions() {
            if !self.client.requests_links(direction) {
                warn!(
                    "Catalog lookups exclude {} links; {} branches will be empty",
                    direction, direction
                );
            }
        }

        let mut stack = vec![WorkItem {
            asset_id: root_id.to_string(),
            parent: None,
            depth: 0,
            code: ROOT_CODE.to_string(),
            follow: None,
            via: None,
        }];

        while let Some(item) = stack.pop() {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                warn!("Build cancelled with {} branch(es) pending", stack.len() + 1);
                break;
            }

            if visited.contains(&item.asset_id) {
                stats.cycles_prevented += 1;
                debug!("Already in tree, skipping {} at {}", item.asset_id, item.code);
                continue;
            }

            if item.depth >= options.max_depth {
                stats.depth_limited += 1;
                debug!("Depth limit reached at {}", item.asset_id);
                continue;
            }

            if stats.nodes_created >= options.max_total_nodes {
                stats.budget_exhausted = true;
                warn!(
                    "Node budget of {} reached, abandoning {} branch(es)",
                    options.max_total_nodes,
                    stack.len() + 1
                );
                break;
            }

            let outcome = match self.client.fetch_traced(&item.asset_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    stats.record_failed_fetch();
                    warn!("Dropping branch {} at {}: {}", item.asset_id, item.code, e);
                    continue;
                }
            };
            stats.record_fetch(&outcome);

            visited.insert(item.asset_id.clone());
            stats.nodes_created += 1;

            let slot = slots.len();
            let record = outcome.record;
            slots.push(Slot {
                node: TreeNode::from_record(&record, item.code.clone(), item.via.as_ref()),
                parent: item.parent,
            });

            let (children, truncated) = expand(&record, &item, slot, options.direction);
            if truncated > 0 {
                stats.links_truncated += truncated;
                warn!(
                    "{} has more than {} links; {} not expanded",
                    item.asset_id, MAX_SIBLINGS, truncated
                );
            }
            stack.extend(children.into_iter().rev());
        }

        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        let tree = assemble(slots).map(Arc::new);

        info!(
            "Lineage build finished: {} node(s), {} cycle(s) prevented, {} API error(s) in {} ms",
            stats.nodes_created, stats.cycles_prevented, stats.api_errors, stats.elapsed_ms
        );

        BuildResult { tree, stats }
    }

    /// Links of one asset without building a tree. `Both` yields upstream
    /// links followed by downstream links.
    pub async fn immediate_lineage(
        &self,
        asset_id: &str,
        direction: LineageDirection,
    ) -> Result<Vec<LineageLink>, CatalogError> {
        let record = self.client.fetch(asset_id).await?;
        Ok(direction
            .link_directions()
            .iter()
            .flat_map(|d| record.links(*d).iter().cloned())
            .collect())
    }

    pub async fn asset_metadata(&self, asset_id: &str) -> Result<Arc<AssetRecord>, CatalogError> {
        self.client.fetch(asset_id).await
    }

    pub fn clear_cache(&self) {
        self.client.clear_cache();
    }
}

/// Work items for the links of a freshly created node, in sibling order,
/// and the number of links past [`MAX_SIBLINGS`] that were left out.
fn expand(
    record: &AssetRecord,
    item: &WorkItem,
    slot: usize,
    requested: LineageDirection,
) -> (Vec<WorkItem>, usize) {
    let inherited;
    let directions: &[LinkDirection] = match item.follow {
        Some(direction) => {
            inherited = [direction];
            &inherited
        }
        None => requested.link_directions(),
    };

    let mut children = Vec::new();
    let mut truncated = 0;
    for (i, link) in directions.iter().flat_map(|d| record.links(*d)).enumerate() {
        let Some(code) = child_code(&item.code, i + 1) else {
            truncated += 1;
            continue;
        };
        children.push(WorkItem {
            asset_id: link.target_id.clone(),
            parent: Some(slot),
            depth: item.depth + 1,
            code,
            follow: Some(link.direction),
            via: Some(link.clone()),
        });
    }
    (children, truncated)
}

/// Turn the arena into an owned tree.
///
/// Every child sits at a higher index than its parent, so draining from the
/// back always finds the parent still in the arena. Children arrive in
/// reverse sibling order and are flipped before their parent is moved.
fn assemble(mut slots: Vec<Slot>) -> Option<TreeNode> {
    let mut root = None;

    while let Some(Slot { mut node, parent }) = slots.pop() {
        node.children.reverse();
        match parent.and_then(|p| slots.get_mut(p)) {
            Some(parent) => parent.node.children.push(node),
            None => root = Some(node),
        }
    }

    root
}
