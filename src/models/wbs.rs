//! Work-breakdown structure (WBS) tree.
//!
//! A project's WBS is a forest of nodes. A node with children is a group and
//! never becomes a milestone itself; a childless node is a leaf and maps to
//! exactly one synchronized milestone, matched by title.
//!
//! The wire format is the one the planning UI edits:
//!
//! ```json
//! [{"title": "A", "children": [{"title": "A1", "estimatedMinutes": 20}]}, {"title": "B"}]
//! ```
//!
//! A node with an empty `children` array is a leaf. Any estimate on a group
//! node is dropped.

use serde::{Deserialize, Serialize};

use super::DEFAULT_LEAF_MINUTES;
use crate::{Error, Result};

/// A node in the work-breakdown tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub enum WbsNode {
    Leaf {
        title: String,
        estimated_minutes: Option<u32>,
    },
    Group {
        title: String,
        children: Vec<WbsNode>,
    },
}

/// A flattened leaf: one future milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WbsLeaf {
    pub title: String,
    pub estimated_minutes: u32,
}

impl WbsNode {
    pub fn leaf(title: impl Into<String>, estimated_minutes: Option<u32>) -> Self {
        WbsNode::Leaf {
            title: title.into(),
            estimated_minutes,
        }
    }

    /// Build a group node. A group without children collapses into a leaf.
    pub fn group(title: impl Into<String>, children: Vec<WbsNode>) -> Self {
        if children.is_empty() {
            return WbsNode::leaf(title, None);
        }
        WbsNode::Group {
            title: title.into(),
            children,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            WbsNode::Leaf { title, .. } | WbsNode::Group { title, .. } => title,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, WbsNode::Leaf { .. })
    }
}

/// Flatten a tree into its leaves in pre-order, depth-first order.
///
/// Leaves without a positive estimate get [`DEFAULT_LEAF_MINUTES`].
pub fn flatten(nodes: &[WbsNode]) -> Vec<WbsLeaf> {
    let mut leaves = Vec::new();
    collect_leaves(nodes, &mut leaves);
    leaves
}

fn collect_leaves(nodes: &[WbsNode], acc: &mut Vec<WbsLeaf>) {
    for node in nodes {
        match node {
            WbsNode::Leaf {
                title,
                estimated_minutes,
            } => acc.push(WbsLeaf {
                title: title.clone(),
                estimated_minutes: estimated_minutes
                    .filter(|m| *m > 0)
                    .unwrap_or(DEFAULT_LEAF_MINUTES),
            }),
            WbsNode::Group { children, .. } => collect_leaves(children, acc),
        }
    }
}

/// Reject trees with blank titles anywhere.
pub fn validate(nodes: &[WbsNode]) -> Result<()> {
    for node in nodes {
        if node.title().trim().is_empty() {
            return Err(Error::Validation(
                "WBS node titles must not be empty".to_string(),
            ));
        }
        if let WbsNode::Group { children, .. } = node {
            validate(children)?;
        }
    }
    Ok(())
}

/// Parse a tree from its JSON wire format.
pub fn parse_tree(json: &str) -> Result<Vec<WbsNode>> {
    let nodes: Vec<WbsNode> = serde_json::from_str(json)
        .map_err(|e| Error::Validation(format!("Invalid WBS tree: {}", e)))?;
    validate(&nodes)?;
    Ok(nodes)
}

/// Serialize a tree to its JSON wire format.
pub fn to_json(nodes: &[WbsNode]) -> Result<String> {
    Ok(serde_json::to_string(nodes)?)
}

/// Untyped node as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNode {
    title: String,

    #[serde(
        rename = "estimatedMinutes",
        alias = "estimated_minutes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    estimated_minutes: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<RawNode>>,
}

impl TryFrom<RawNode> for WbsNode {
    type Error = String;

    fn try_from(raw: RawNode) -> std::result::Result<Self, Self::Error> {
        let children = raw.children.unwrap_or_default();
        if !children.is_empty() {
            let children = children
                .into_iter()
                .map(WbsNode::try_from)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            return Ok(WbsNode::Group {
                title: raw.title,
                children,
            });
        }

        let estimated_minutes = match raw.estimated_minutes {
            Some(m) if m < 0 => {
                return Err(format!(
                    "estimatedMinutes must not be negative (node \"{}\": {})",
                    raw.title, m
                ));
            }
            Some(m) if m > u32::MAX as i64 => {
                return Err(format!("estimatedMinutes out of range: {}", m));
            }
            Some(0) | None => None,
            Some(m) => Some(m as u32),
        };
        Ok(WbsNode::Leaf {
            title: raw.title,
            estimated_minutes,
        })
    }
}

impl From<WbsNode> for RawNode {
    fn from(node: WbsNode) -> Self {
        match node {
            WbsNode::Leaf {
                title,
                estimated_minutes,
            } => RawNode {
                title,
                estimated_minutes: estimated_minutes.map(i64::from),
                children: None,
            },
            WbsNode::Group { title, children } => RawNode {
                title,
                estimated_minutes: None,
                children: Some(children.into_iter().map(RawNode::from).collect()),
            },
        }
    }
}
