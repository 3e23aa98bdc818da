use lineage_catalog::{AssetRecord, Fact, LineageLink};
use lineage_core::LinkDirection;
use serde::{Deserialize, Serialize};

/// Width of one path-code segment.
pub const CODE_SEGMENT_WIDTH: usize = 3;

/// Path code of every root.
pub const ROOT_CODE: &str = "001";

/// Largest sibling index a segment can hold.
pub const MAX_SIBLINGS: usize = 999;

/// Code of the `index`-th (1-based) child of `parent`, or None when the
/// index does not fit in one segment.
pub fn child_code(parent: &str, index: usize) -> Option<String> {
    if index == 0 || index > MAX_SIBLINGS {
        return None;
    }
    Some(format!("{}{:03}", parent, index))
}

/// One asset in a lineage tree.
///
/// Children are owned exclusively; a node is only appended to while its
/// build is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    /// Hierarchical position, e.g. `001002`
    pub code: String,
    pub name: String,
    pub description: String,
    pub class_type: String,
    /// Association of the link this node was reached through. None on the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<LinkDirection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facts: Vec<Fact>,
    /// False when the catalog had no record for this id.
    #[serde(default = "default_found")]
    pub found: bool,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

fn default_found() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStatistics {
    pub total_nodes: usize,
    pub max_depth: usize,
    pub direct_children: usize,
    pub terminal_nodes: usize,
}

impl TreeNode {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: String::new(),
            description: String::new(),
            class_type: String::new(),
            association: None,
            direction: None,
            facts: Vec::new(),
            found: true,
            children: Vec::new(),
        }
    }

    /// Node for a fetched record. `via` is the link followed to reach it.
    pub fn from_record(record: &AssetRecord, code: String, via: Option<&LineageLink>) -> Self {
        Self {
            id: record.id.clone(),
            code,
            name: record.name.clone(),
            description: record.description.clone(),
            class_type: record.class_type.clone(),
            association: via.and_then(|l| l.association.clone()),
            direction: via.map(|l| l.direction),
            facts: record.facts.clone(),
            found: record.found,
            children: Vec::new(),
        }
    }

    /// Append `child` unless a child with the same id is already present.
    pub fn add_child(&mut self, child: TreeNode) -> bool {
        if self.children.iter().any(|c| c.id == child.id) {
            return false;
        }
        self.children.push(child);
        true
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Levels in this subtree: 1 for a leaf.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TreeNode::depth).max().unwrap_or(0)
    }

    pub fn total_nodes(&self) -> usize {
        1 + self.children.iter().map(TreeNode::total_nodes).sum::<usize>()
    }

    /// Leaves in this subtree.
    pub fn terminal_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(TreeNode::terminal_count).sum()
        }
    }

    /// Position encoded by the path code; the root is level 1.
    pub fn level(&self) -> usize {
        self.code.len() / CODE_SEGMENT_WIDTH
    }

    pub fn statistics(&self) -> TreeStatistics {
        TreeStatistics {
            total_nodes: self.total_nodes(),
            max_depth: self.depth(),
            direct_children: self.children.len(),
            terminal_nodes: self.terminal_count(),
        }
    }

    /// Pre-order walk over this subtree.
    pub fn iter(&self) -> TreeIter<'_> {
        TreeIter { stack: vec![self] }
    }

    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        self.iter().find(|node| node.id == id)
    }

    pub fn find_by_code(&self, code: &str) -> Option<&TreeNode> {
        self.iter().find(|node| node.code == code)
    }
}

pub struct TreeIter<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
