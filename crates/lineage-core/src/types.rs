use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a single lineage link relative to the asset that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    /// Source of the data (`srcLinks`).
    Upstream,
    /// Consumer of the data (`dstLinks`).
    Downstream,
}

impl fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkDirection::Upstream => write!(f, "upstream"),
            LinkDirection::Downstream => write!(f, "downstream"),
        }
    }
}

/// Direction requested for a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineageDirection {
    #[default]
    Upstream,
    Downstream,
    Both,
}

impl LineageDirection {
    /// Link sets to expand, in expansion order.
    pub fn link_directions(self) -> &'static [LinkDirection] {
        match self {
            LineageDirection::Upstream => &[LinkDirection::Upstream],
            LineageDirection::Downstream => &[LinkDirection::Downstream],
            LineageDirection::Both => &[LinkDirection::Upstream, LinkDirection::Downstream],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineageDirection::Upstream => "upstream",
            LineageDirection::Downstream => "downstream",
            LineageDirection::Both => "both",
        }
    }
}

impl From<LinkDirection> for LineageDirection {
    fn from(direction: LinkDirection) -> Self {
        match direction {
            LinkDirection::Upstream => LineageDirection::Upstream,
            LinkDirection::Downstream => LineageDirection::Downstream,
        }
    }
}

impl fmt::Display for LineageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineageDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upstream" | "up" => Ok(LineageDirection::Upstream),
            "downstream" | "down" => Ok(LineageDirection::Downstream),
            "both" => Ok(LineageDirection::Both),
            other => Err(format!(
                "Invalid lineage direction: {}. Must be one of: upstream, downstream, both",
                other
            )),
        }
    }
}
