// Tests for the layout engine's externally guaranteed properties:
// determinism, the pin invariant, ring placement, and non-overlap.

use netmap_core::layout::{LayoutEngine, LayoutParams, Viewport};
use netmap_core::model::{Edge, EdgeKind, GraphSnapshot, Node, NodeKind, Position};

const VIEWPORT: Viewport = Viewport {
    width: 1920.0,
    height: 1080.0,
};

fn node(id: &str, kind: NodeKind) -> Node {
    Node {
        id: id.to_string(),
        kind,
        label: id.to_string(),
        organization: None,
        radius: kind.radius(),
        position: Position::default(),
        pinned: false,
    }
}

fn edge(id: &str, source: &str, target: &str) -> Edge {
    Edge {
        id: id.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        kind: EdgeKind::Direct,
        method: None,
    }
}

/// Star topology: one domain root, a hop-1 domain and two hop-1 IPs, plus
/// one node two hops out.
fn star_snapshot() -> GraphSnapshot {
    GraphSnapshot {
        nodes: vec![
            node("example.com", NodeKind::Domain),
            node("www.example.com", NodeKind::Domain),
            node("93.184.216.34", NodeKind::Ip),
            node("93.184.216.35", NodeKind::Ip),
            node("mail.example.com", NodeKind::Domain),
        ],
        edges: vec![
            edge("e1", "example.com", "www.example.com"),
            edge("e2", "example.com", "93.184.216.34"),
            edge("e3", "example.com", "93.184.216.35"),
            edge("e4", "93.184.216.34", "mail.example.com"),
        ],
    }
}

fn distance(a: &Node, b: &Node) -> f64 {
    let dx = a.position.x - b.position.x;
    let dy = a.position.y - b.position.y;
    (dx * dx + dy * dy).sqrt()
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_layout_is_deterministic() {
    let engine = LayoutEngine::new();
    let snapshot = star_snapshot();
    let first = engine.layout(&snapshot, VIEWPORT, Some("example.com"));
    let second = engine.layout(&snapshot, VIEWPORT, Some("example.com"));
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.position, b.position, "node {} moved between runs", a.id);
        assert_eq!(a.pinned, b.pinned);
    }
}

#[test]
fn test_layout_deterministic_without_root() {
    let engine = LayoutEngine::new();
    let snapshot = star_snapshot();
    let first = engine.layout(&snapshot, VIEWPORT, None);
    let second = engine.layout(&snapshot, VIEWPORT, None);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.position, b.position);
    }
}

// ============================================================================
// Pin invariant
// ============================================================================

#[test]
fn test_root_is_pinned_exactly_at_center() {
    let engine = LayoutEngine::new();
    let out = engine.layout(&star_snapshot(), VIEWPORT, Some("example.com"));
    let root = out.iter().find(|n| n.label == "example.com").unwrap();
    assert!(root.pinned);
    assert_eq!(root.position.x, VIEWPORT.width / 2.0);
    assert_eq!(root.position.y, VIEWPORT.height / 2.0);
}

#[test]
fn test_only_the_root_is_pinned() {
    let engine = LayoutEngine::new();
    let out = engine.layout(&star_snapshot(), VIEWPORT, Some("example.com"));
    assert_eq!(out.iter().filter(|n| n.pinned).count(), 1);
}

#[test]
fn test_pin_holds_regardless_of_tick_budget() {
    for ticks in [1, 10, 1000] {
        let engine = LayoutEngine::with_params(LayoutParams {
            max_ticks: ticks,
            ..LayoutParams::default()
        });
        let out = engine.layout(&star_snapshot(), VIEWPORT, Some("example.com"));
        let root = out.iter().find(|n| n.label == "example.com").unwrap();
        assert_eq!(root.position.x, VIEWPORT.width / 2.0);
        assert_eq!(root.position.y, VIEWPORT.height / 2.0);
    }
}

// ============================================================================
// Ring placement
// ============================================================================

#[test]
fn test_hop1_neighbors_settle_nearer_than_outer_nodes() {
    let engine = LayoutEngine::new();
    let out = engine.layout(&star_snapshot(), VIEWPORT, Some("example.com"));
    let root = out.iter().find(|n| n.label == "example.com").unwrap();
    let hop1 = out.iter().find(|n| n.label == "www.example.com").unwrap();
    let hop2 = out.iter().find(|n| n.label == "mail.example.com").unwrap();
    assert!(
        distance(root, hop1) < distance(root, hop2),
        "hop-1 node ended further out ({} vs {})",
        distance(root, hop1),
        distance(root, hop2)
    );
}

// ============================================================================
// Non-overlap tendency
// ============================================================================

#[test]
fn test_no_structurally_separable_pair_overlaps() {
    let engine = LayoutEngine::new();
    let out = engine.layout(&star_snapshot(), VIEWPORT, Some("example.com"));
    for i in 0..out.len() {
        for j in (i + 1)..out.len() {
            let min_dist = out[i].radius + out[j].radius - 1.0;
            assert!(
                distance(&out[i], &out[j]) >= min_dist,
                "{} and {} overlap: {} < {}",
                out[i].id,
                out[j].id,
                distance(&out[i], &out[j]),
                min_dist
            );
        }
    }
}

#[test]
fn test_disconnected_nodes_do_not_overlap() {
    let snapshot = GraphSnapshot {
        nodes: (0..8)
            .map(|i| node(&format!("10.0.0.{i}"), NodeKind::Ip))
            .collect(),
        edges: vec![],
    };
    let engine = LayoutEngine::new();
    let out = engine.layout(&snapshot, VIEWPORT, None);
    for i in 0..out.len() {
        for j in (i + 1)..out.len() {
            assert!(distance(&out[i], &out[j]) >= out[i].radius + out[j].radius - 1.0);
        }
    }
}

// ============================================================================
// Contract details
// ============================================================================

#[test]
fn test_edges_pass_through_unchanged() {
    let snapshot = star_snapshot();
    let engine = LayoutEngine::new();
    let _ = engine.layout(&snapshot, VIEWPORT, Some("example.com"));
    // Layout borrows the snapshot; the edge set is untouched by contract.
    assert_eq!(snapshot.edges.len(), 4);
    assert_eq!(snapshot.edges[0].kind, EdgeKind::Direct);
}

#[test]
fn test_all_positions_are_finite() {
    let engine = LayoutEngine::new();
    let out = engine.layout(&star_snapshot(), VIEWPORT, Some("example.com"));
    for n in &out {
        assert!(n.position.x.is_finite() && n.position.y.is_finite());
    }
}
