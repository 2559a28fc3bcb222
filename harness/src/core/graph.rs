//! Branch graph recording every reasoning step ever proposed.
//!
//! The structure is a tree of branches merged only at shared prefixes, so it
//! is kept as an arena of nodes addressed by `(row, col)` with an explicit
//! children index rather than a general graph library. Nodes and edges are
//! never deleted; rejection only changes status, leaving a permanent audit
//! trail of abandoned branches.

use std::collections::HashMap;
use std::fmt;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const NODE_LINK_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/thought_graph/v1.schema.json"
));

/// Composite node key: `row` is the branch lineage, `col` the 1-indexed
/// position along it. The root (system context) is `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub row: u32,
    pub col: u32,
}

impl NodeId {
    pub const ROOT: NodeId = NodeId { row: 0, col: 0 };

    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    fn parse(raw: &str) -> Result<Self> {
        let (row, col) = raw
            .split_once('.')
            .ok_or_else(|| anyhow!("malformed node id {raw:?}"))?;
        Ok(Self {
            row: row.parse().with_context(|| format!("parse row in {raw:?}"))?,
            col: col.parse().with_context(|| format!("parse col in {raw:?}"))?,
        })
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.row, self.col)
    }
}

/// Acceptance status of a reasoning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Proposed,
    Accepted,
    Rejected,
    Superseded,
    Terminal,
}

impl NodeStatus {
    /// Color used in the persisted node-link format. The mapping is a
    /// bijection so deserialization can reconstruct the status.
    pub fn as_color(self) -> &'static str {
        match self {
            NodeStatus::Proposed => "skyblue",
            NodeStatus::Accepted => "green",
            NodeStatus::Rejected => "red",
            NodeStatus::Superseded => "gray",
            NodeStatus::Terminal => "gold",
        }
    }

    pub fn from_color(color: &str) -> Option<Self> {
        match color {
            "skyblue" => Some(NodeStatus::Proposed),
            "green" => Some(NodeStatus::Accepted),
            "red" => Some(NodeStatus::Rejected),
            "gray" => Some(NodeStatus::Superseded),
            "gold" => Some(NodeStatus::Terminal),
            _ => None,
        }
    }
}

/// One reasoning step (or the root system context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtNode {
    pub id: NodeId,
    pub text: String,
    pub status: NodeStatus,
    pub refined: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeColor {
    Black,
    Red,
}

impl EdgeColor {
    fn as_str(self) -> &'static str {
        match self {
            EdgeColor::Black => "black",
            EdgeColor::Red => "red",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "black" => Some(EdgeColor::Black),
            "red" => Some(EdgeColor::Red),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    source: NodeId,
    target: NodeId,
    color: EdgeColor,
}

/// Graph invariant violations. Always a programming error in the caller;
/// never retried or recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    DuplicateNode(NodeId),
    UnknownNode(NodeId),
    NoPath { from: NodeId, to: NodeId },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DuplicateNode(id) => write!(f, "duplicate node {id}"),
            GraphError::UnknownNode(id) => write!(f, "unknown node {id}"),
            GraphError::NoPath { from, to } => write!(f, "no path from {from} to {to}"),
        }
    }
}

impl std::error::Error for GraphError {}

/// In-memory directed graph of reasoning steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThoughtGraph {
    nodes: Vec<ThoughtNode>,
    index: HashMap<NodeId, usize>,
    children: HashMap<NodeId, Vec<NodeId>>,
    edges: Vec<Edge>,
}

impl ThoughtGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &ThoughtNode> {
        self.nodes.iter()
    }

    pub fn node(&self, id: NodeId) -> Option<&ThoughtNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn add_node(
        &mut self,
        id: NodeId,
        text: impl Into<String>,
        status: NodeStatus,
        refined: bool,
    ) -> Result<(), GraphError> {
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.index.insert(id, self.nodes.len());
        self.nodes.push(ThoughtNode {
            id,
            text: text.into(),
            status,
            refined,
        });
        Ok(())
    }

    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        if !self.index.contains_key(&parent) {
            return Err(GraphError::UnknownNode(parent));
        }
        if !self.index.contains_key(&child) {
            return Err(GraphError::UnknownNode(child));
        }
        self.children.entry(parent).or_default().push(child);
        self.edges.push(Edge {
            source: parent,
            target: child,
            color: EdgeColor::Black,
        });
        Ok(())
    }

    /// Children of `id` in insertion order (empty for unknown or leaf nodes).
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_status(&mut self, id: NodeId, status: NodeStatus) -> Result<(), GraphError> {
        let &i = self.index.get(&id).ok_or(GraphError::UnknownNode(id))?;
        self.nodes[i].status = status;
        Ok(())
    }

    /// Node with the largest `col` on `row`, if any.
    pub fn last_on_row(&self, row: u32) -> Option<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.id.row == row)
            .map(|node| node.id)
            .max_by_key(|id| id.col)
    }

    /// Walk the unique path `from -> to` along existing edges and mark the
    /// start node rejected and every later node superseded. Edges along the
    /// path are recolored red. Returns the path.
    ///
    /// A missing path signals a bookkeeping bug in the caller and must be
    /// treated as fatal.
    pub fn mark_rejected_branch(
        &mut self,
        from: NodeId,
        to: NodeId,
    ) -> Result<Vec<NodeId>, GraphError> {
        if !self.index.contains_key(&from) {
            return Err(GraphError::UnknownNode(from));
        }
        if !self.index.contains_key(&to) {
            return Err(GraphError::UnknownNode(to));
        }
        let path = self
            .find_path(from, to)
            .ok_or(GraphError::NoPath { from, to })?;

        for (pos, &id) in path.iter().enumerate() {
            let status = if pos == 0 {
                NodeStatus::Rejected
            } else {
                NodeStatus::Superseded
            };
            self.set_status(id, status)?;
        }
        for pair in path.windows(2) {
            for edge in &mut self.edges {
                if edge.source == pair[0] && edge.target == pair[1] {
                    edge.color = EdgeColor::Red;
                }
            }
        }
        Ok(path)
    }

    fn find_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![from];
        if self.find_path_inner(from, to, &mut path) {
            return Some(path);
        }
        None
    }

    fn find_path_inner(&self, at: NodeId, to: NodeId, path: &mut Vec<NodeId>) -> bool {
        if at == to {
            return true;
        }
        for &child in self.children_of(at) {
            path.push(child);
            if self.find_path_inner(child, to, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// Export to the persisted node-link representation.
    pub fn to_node_link(&self) -> NodeLinkGraph {
        NodeLinkGraph {
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeRecord {
                    id: node.id.to_string(),
                    thought: node.text.clone(),
                    color: node.status.as_color().to_string(),
                    refined: node.refined,
                })
                .collect(),
            links: self
                .edges
                .iter()
                .map(|edge| LinkRecord {
                    source: edge.source.to_string(),
                    target: edge.target.to_string(),
                    color: edge.color.as_str().to_string(),
                })
                .collect(),
        }
    }

    /// Rebuild a graph from its node-link representation.
    pub fn from_node_link(node_link: &NodeLinkGraph) -> Result<Self> {
        let mut graph = ThoughtGraph::new();
        for record in &node_link.nodes {
            let id = NodeId::parse(&record.id)?;
            let status = NodeStatus::from_color(&record.color)
                .ok_or_else(|| anyhow!("unknown node color {:?}", record.color))?;
            graph.add_node(id, record.thought.clone(), status, record.refined)?;
        }
        for record in &node_link.links {
            let source = NodeId::parse(&record.source)?;
            let target = NodeId::parse(&record.target)?;
            let color = EdgeColor::parse(&record.color)
                .ok_or_else(|| anyhow!("unknown link color {:?}", record.color))?;
            graph.add_edge(source, target)?;
            if let Some(edge) = graph.edges.last_mut() {
                edge.color = color;
            }
        }
        Ok(graph)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&self.to_node_link()).context("serialize thought graph")
    }

    /// Parse and validate a persisted graph (schema conformance first, then
    /// structural reconstruction).
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("parse thought graph json")?;
        validate_schema(&value)?;
        let node_link: NodeLinkGraph =
            serde_json::from_value(value).context("deserialize node-link graph")?;
        Self::from_node_link(&node_link)
    }
}

/// Persisted node-link representation of a [`ThoughtGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub thought: String,
    pub color: String,
    pub refined: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
    pub color: String,
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(NODE_LINK_SCHEMA).context("parse bundled graph schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "graph schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
