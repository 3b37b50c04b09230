//! Deterministic force-directed layout for recon graphs.
//!
//! Converts an unordered node/edge set into stable screen coordinates:
//! springs along edges, pairwise charge repulsion, radial rings around a
//! pinned root, and collision separation. No randomness anywhere - the
//! same snapshot, viewport, and root always produce the same positions.

use crate::model::{GraphSnapshot, Node, Position};
use std::collections::HashSet;
use tracing::debug;

/// Golden angle in radians; drives the phyllotaxis initial placement and
/// the direction chosen for coincident points.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Distances below this are treated as coincident.
const MIN_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn center(&self) -> Position {
        Position {
            x: self.width / 2.0,
            y: self.height / 2.0,
        }
    }
}

/// Hand-tuned presentation constants. Defaults match the shipped look;
/// everything is adjustable because none of these are invariants.
#[derive(Debug, Clone)]
pub struct LayoutParams {
    /// Spring rest length for every edge.
    pub link_distance: f64,
    /// Spring stiffness, applied to the deviation from rest length.
    pub link_strength: f64,
    /// Charge constant; negative repels. Scales as 1/distance.
    pub charge_strength: f64,
    /// Ring radius for hop-1 neighbors of the pinned root.
    pub inner_ring: f64,
    /// Ring radius for everything further out.
    pub outer_ring: f64,
    /// Pull toward the target ring, per unit of radial deviation.
    pub ring_strength: f64,
    /// Extra clearance demanded on top of the two radii.
    pub collision_padding: f64,
    /// Hard tick budget; the simulation never runs longer than this.
    pub max_ticks: usize,
    /// Geometric cooldown factor applied each tick.
    pub cooldown_decay: f64,
    /// Temperature at which the simulation is considered converged.
    pub cooldown_floor: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            link_distance: 200.0,
            link_strength: 0.6,
            charge_strength: -300.0,
            inner_ring: 200.0,
            outer_ring: 500.0,
            ring_strength: 0.08,
            collision_padding: 20.0,
            max_ticks: 300,
            cooldown_decay: 0.99,
            cooldown_floor: 0.001,
        }
    }
}

/// Integration step: accumulated forces in, updated positions out. Kept
/// as a trait so tests can run the simulation without damping.
pub trait Integrator {
    /// Applies one tick of displacement to every unpinned node. Returns
    /// false once the simulation should stop early.
    fn step(&mut self, forces: &[(f64, f64)], nodes: &mut [Node]) -> bool;
}

/// Simulated-annealing style integrator: a global temperature starts at
/// 1.0 and decays geometrically until it hits the floor.
pub struct CooldownIntegrator {
    temperature: f64,
    decay: f64,
    floor: f64,
}

impl CooldownIntegrator {
    pub fn new(decay: f64, floor: f64) -> Self {
        Self {
            temperature: 1.0,
            decay,
            floor,
        }
    }
}

impl Integrator for CooldownIntegrator {
    fn step(&mut self, forces: &[(f64, f64)], nodes: &mut [Node]) -> bool {
        for (node, (fx, fy)) in nodes.iter_mut().zip(forces) {
            if node.pinned {
                continue;
            }
            node.position.x += fx * self.temperature;
            node.position.y += fy * self.temperature;
        }
        self.temperature *= self.decay;
        self.temperature > self.floor
    }
}

/// Applies forces at unit scale with no cooldown. Only terminates via the
/// engine's tick budget; useful for exercising the force model directly.
pub struct UnitIntegrator;

impl Integrator for UnitIntegrator {
    fn step(&mut self, forces: &[(f64, f64)], nodes: &mut [Node]) -> bool {
        for (node, (fx, fy)) in nodes.iter_mut().zip(forces) {
            if node.pinned {
                continue;
            }
            node.position.x += fx;
            node.position.y += fy;
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    params: LayoutParams,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: LayoutParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Lays out a snapshot for the given viewport. If `root_label` names a
    /// node, that node is pinned at the viewport center and everything
    /// else settles on rings around it. Edges pass through untouched.
    pub fn layout(
        &self,
        snapshot: &GraphSnapshot,
        viewport: Viewport,
        root_label: Option<&str>,
    ) -> Vec<Node> {
        let mut integrator = CooldownIntegrator::new(
            self.params.cooldown_decay,
            self.params.cooldown_floor,
        );
        self.layout_with(&mut integrator, snapshot, viewport, root_label)
    }

    /// Same as [`layout`](Self::layout) but with a caller-supplied
    /// integrator.
    pub fn layout_with(
        &self,
        integrator: &mut dyn Integrator,
        snapshot: &GraphSnapshot,
        viewport: Viewport,
        root_label: Option<&str>,
    ) -> Vec<Node> {
        let mut nodes = snapshot.nodes.clone();
        if nodes.is_empty() {
            return nodes;
        }

        let center = viewport.center();
        let root = root_label.and_then(|label| nodes.iter().position(|n| n.label == label));
        if let Some(r) = root {
            nodes[r].pinned = true;
            nodes[r].position = center;
        }

        // Deterministic phyllotaxis seeding; the simulation converges from
        // any placement, this one just avoids coincident starts.
        for (i, node) in nodes.iter_mut().enumerate() {
            if node.pinned {
                continue;
            }
            let radius = 10.0 * (i as f64).sqrt() + 1.0;
            let angle = i as f64 * GOLDEN_ANGLE;
            node.position.x = center.x + radius * angle.cos();
            node.position.y = center.y + radius * angle.sin();
        }

        // Edge endpoints resolved to indices once. Unknown ids were already
        // dropped at the snapshot boundary, so the filter is a guard only.
        let links: Vec<(usize, usize)> = snapshot
            .edges
            .iter()
            .filter_map(|e| {
                let a = nodes.iter().position(|n| n.id == e.source)?;
                let b = nodes.iter().position(|n| n.id == e.target)?;
                Some((a, b))
            })
            .collect();

        // Hop-1 adjacency to the root, computed once before the simulation.
        let hop1: HashSet<usize> = match root {
            Some(r) => links
                .iter()
                .filter_map(|&(a, b)| {
                    if a == r {
                        Some(b)
                    } else if b == r {
                        Some(a)
                    } else {
                        None
                    }
                })
                .collect(),
            None => HashSet::new(),
        };

        let n = nodes.len();
        let mut ticks = 0;
        for tick in 0..self.params.max_ticks {
            ticks = tick + 1;
            let mut forces = vec![(0.0_f64, 0.0_f64); n];

            self.apply_link_force(&nodes, &links, &mut forces);
            self.apply_charge_force(&nodes, &mut forces);
            if let Some(r) = root {
                self.apply_radial_force(&nodes, r, &hop1, center, &mut forces);
            }
            self.apply_collision_force(&nodes, &mut forces);

            if !integrator.step(&forces, &mut nodes) {
                break;
            }
        }
        debug!("layout settled after {} tick(s) for {} node(s)", ticks, n);

        nodes
    }

    /// Spring along each edge: zero at rest length, linear in the
    /// deviation, split evenly between the endpoints.
    fn apply_link_force(
        &self,
        nodes: &[Node],
        links: &[(usize, usize)],
        forces: &mut [(f64, f64)],
    ) {
        for &(a, b) in links {
            let (ux, uy, dist) = separation(&nodes[a].position, &nodes[b].position, a, b);
            let magnitude = (dist - self.params.link_distance) * self.params.link_strength;
            let (fx, fy) = (ux * magnitude * 0.5, uy * magnitude * 0.5);
            forces[a].0 += fx;
            forces[a].1 += fy;
            forces[b].0 -= fx;
            forces[b].1 -= fy;
        }
    }

    /// Pairwise charge across the whole node set, O(n^2) per tick. Falls
    /// off as 1/distance, so far nodes still drift apart slowly.
    fn apply_charge_force(&self, nodes: &[Node], forces: &mut [(f64, f64)]) {
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let (ux, uy, dist) = separation(&nodes[i].position, &nodes[j].position, i, j);
                let magnitude = self.params.charge_strength / dist.max(1.0);
                forces[i].0 += ux * magnitude;
                forces[i].1 += uy * magnitude;
                forces[j].0 -= ux * magnitude;
                forces[j].1 -= uy * magnitude;
            }
        }
    }

    /// Pulls every unpinned node toward its target ring around the root:
    /// hop-1 neighbors to the inner ring, everything else to the outer.
    fn apply_radial_force(
        &self,
        nodes: &[Node],
        root: usize,
        hop1: &HashSet<usize>,
        center: Position,
        forces: &mut [(f64, f64)],
    ) {
        for (i, node) in nodes.iter().enumerate() {
            if i == root || node.pinned {
                continue;
            }
            let target = if hop1.contains(&i) {
                self.params.inner_ring
            } else {
                self.params.outer_ring
            };
            let (ux, uy, dist) = separation(&center, &node.position, root, i);
            let magnitude = (target - dist) * self.params.ring_strength;
            forces[i].0 += ux * magnitude;
            forces[i].1 += uy * magnitude;
        }
    }

    /// Separates overlapping pairs: active only when centers are closer
    /// than the two radii plus padding.
    fn apply_collision_force(&self, nodes: &[Node], forces: &mut [(f64, f64)]) {
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let min_dist =
                    nodes[i].radius + nodes[j].radius + self.params.collision_padding;
                let (ux, uy, dist) = separation(&nodes[i].position, &nodes[j].position, i, j);
                if dist >= min_dist {
                    continue;
                }
                let overlap = (min_dist - dist) * 0.5;
                forces[i].0 -= ux * overlap;
                forces[i].1 -= uy * overlap;
                forces[j].0 += ux * overlap;
                forces[j].1 += uy * overlap;
            }
        }
    }
}

/// Unit vector from `a` to `b` plus the distance between them. Coincident
/// points get a direction derived from the pair's indices instead of a
/// random jitter, keeping the whole simulation deterministic.
fn separation(a: &Position, b: &Position, i: usize, j: usize) -> (f64, f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist > MIN_DISTANCE {
        (dx / dist, dy / dist, dist)
    } else {
        let angle = (i * 31 + j * 7) as f64 * GOLDEN_ANGLE;
        (angle.cos(), angle.sin(), MIN_DISTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, EdgeKind, Node, NodeKind, Position};

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

    #[test]
    fn test_empty_snapshot_yields_empty_layout() {
        let engine = LayoutEngine::new();
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
        };
        let out = engine.layout(&GraphSnapshot::default(), viewport, Some("example.com"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_root_label_pins_nothing() {
        let snapshot = GraphSnapshot {
            nodes: vec![node("a", NodeKind::Domain), node("b", NodeKind::Ip)],
            edges: vec![edge("e", "a", "b")],
        };
        let engine = LayoutEngine::new();
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
        };
        let out = engine.layout(&snapshot, viewport, Some("nope.invalid"));
        assert!(out.iter().all(|n| !n.pinned));
    }

    #[test]
    fn test_unit_integrator_respects_tick_budget() {
        let snapshot = GraphSnapshot {
            nodes: vec![node("a", NodeKind::Domain), node("b", NodeKind::Ip)],
            edges: vec![edge("e", "a", "b")],
        };
        let engine = LayoutEngine::with_params(LayoutParams {
            max_ticks: 5,
            ..LayoutParams::default()
        });
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
        };
        // UnitIntegrator never stops on its own; this terminates only if
        // the engine honors max_ticks.
        let mut integrator = UnitIntegrator;
        let out = engine.layout_with(&mut integrator, &snapshot, viewport, None);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_coincident_points_get_finite_direction() {
        let p = Position { x: 42.0, y: 42.0 };
        let (ux, uy, dist) = separation(&p, &p, 3, 7);
        assert!(ux.is_finite() && uy.is_finite());
        assert!((ux * ux + uy * uy - 1.0).abs() < 1e-9);
        assert_eq!(dist, MIN_DISTANCE);
        // Same pair, same direction.
        let again = separation(&p, &p, 3, 7);
        assert_eq!((ux, uy), (again.0, again.1));
    }
}
