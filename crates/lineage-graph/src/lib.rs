//! Lineage trees: the node model, per-build statistics and the bounded
//! traversal that builds trees from catalog records.

pub mod builder;
pub mod node;
pub mod stats;

pub use builder::{BuildOptions, BuildResult, LineageBuilder};
pub use node::{child_code, TreeNode, TreeStatistics, MAX_SIBLINGS, ROOT_CODE};
pub use stats::BuildStatistics;
