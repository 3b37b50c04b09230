use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Node radius by kind. Domains render larger than addresses, so the
/// collision force needs more room around them.
const DOMAIN_RADIUS: f64 = 34.0;
const IP_RADIUS: f64 = 26.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Domain,
    Ip,
}

impl NodeKind {
    pub fn radius(&self) -> f64 {
        match self {
            NodeKind::Domain => DOMAIN_RADIUS,
            NodeKind::Ip => IP_RADIUS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Direct,
    ViaIp,
    #[serde(rename = "subnet")]
    SubnetLink,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A single vertex of the recon graph: either a hostname or an address.
/// `position` and `pinned` are produced by the layout engine; the server
/// never sends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub organization: Option<String>,
    pub radius: f64,
    pub position: Position,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    /// Discovery method the server attached to the link (dns, tls,
    /// reverse_dns). Presentational only.
    pub method: Option<String>,
}

/// Graph payload exactly as the server serializes it. Decoded strictly,
/// then sanitized into a [`GraphSnapshot`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphWire {
    #[serde(default)]
    pub nodes: Vec<WireNode>,
    #[serde(default)]
    pub edges: Vec<WireEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(default, rename = "label")]
    pub method: Option<String>,
}

/// The authoritative result of a completed scan. Immutable once built; a
/// new scan replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Builds a validated snapshot from a wire payload: duplicate node ids
    /// keep their first occurrence, and edges whose endpoints are missing
    /// from the node set are dropped rather than treated as fatal.
    pub fn from_wire(wire: GraphWire) -> Self {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut nodes = Vec::with_capacity(wire.nodes.len());
        for wn in wire.nodes {
            if seen.contains_key(&wn.id) {
                warn!("duplicate node id {}, keeping first occurrence", wn.id);
                continue;
            }
            seen.insert(wn.id.clone(), nodes.len());
            nodes.push(Node {
                radius: wn.kind.radius(),
                id: wn.id,
                kind: wn.kind,
                label: wn.label,
                organization: wn.organization,
                position: Position::default(),
                pinned: false,
            });
        }

        let total = wire.edges.len();
        let edges: Vec<Edge> = wire
            .edges
            .into_iter()
            .filter(|we| seen.contains_key(&we.source) && seen.contains_key(&we.target))
            .map(|we| Edge {
                id: we.id,
                source: we.source,
                target: we.target,
                kind: we.kind,
                method: we.method,
            })
            .collect();
        if edges.len() < total {
            warn!("dropped {} edge(s) with unknown endpoints", total - edges.len());
        }

        GraphSnapshot { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Submitted,
    Polling,
    Ready,
    Failed,
}

/// Correlates a scan submission with its eventual graph result. Never
/// reused across domains.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSession {
    pub domain: String,
    pub depth: u8,
    pub session_id: String,
    pub state: SessionState,
}
