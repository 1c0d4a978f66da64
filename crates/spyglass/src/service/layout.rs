//! Layered flowchart layout
//!
//! A small Sugiyama-style pass: break cycles with DFS back edges, assign
//! longest-path ranks, order each layer by first appearance and center the
//! layers on the cross axis. Coordinates are SVG user units.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, span, trace, Level};
use unicode_width::UnicodeWidthStr;

use super::FlowchartDatabase;
use crate::core::{EdgeType, NodeShape, Point};

#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Gap between nodes in the same layer
    pub node_sep: f64,
    /// Gap between layers
    pub rank_sep: f64,
    /// Margin around the whole drawing
    pub padding: f64,
    /// Advance of one terminal column of label text
    pub char_width: f64,
    pub line_height: f64,
    pub min_node_width: f64,
    /// Inset between a subgraph border and its members
    pub cluster_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_sep: 40.0,
            rank_sep: 60.0,
            padding: 20.0,
            char_width: 8.0,
            line_height: 20.0,
            min_node_width: 60.0,
            cluster_margin: 16.0,
        }
    }
}

/// A node with its center and box size
#[derive(Debug, Clone)]
pub struct PositionedNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    pub center: Point,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct PositionedEdge {
    pub from: String,
    pub to: String,
    pub edge_type: EdgeType,
    pub label: Option<String>,
    pub points: Vec<Point>,
}

/// A subgraph border, top-left anchored
#[derive(Debug, Clone)]
pub struct PositionedSubgraph {
    pub id: String,
    pub title: String,
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct FlowchartLayout {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<PositionedEdge>,
    pub subgraphs: Vec<PositionedSubgraph>,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Default)]
pub struct LayeredLayout {
    config: LayoutConfig,
}

impl LayeredLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }

    fn node_size(&self, label: &str, shape: NodeShape) -> (f64, f64) {
        let text_width = UnicodeWidthStr::width(label) as f64 * self.config.char_width;
        let width = (text_width + 32.0).max(self.config.min_node_width);
        let height = self.config.line_height + 20.0;

        match shape {
            NodeShape::Circle => {
                let d = width.max(height);
                (d, d)
            }
            NodeShape::Diamond => (width * 1.5, height * 1.6),
            NodeShape::Hexagon | NodeShape::Parallelogram | NodeShape::Trapezoid => {
                (width + height, height)
            }
            NodeShape::Asymmetric => (width + height / 2.0, height),
            NodeShape::Cylinder => (width, height + 12.0),
            NodeShape::Subroutine => (width + 16.0, height),
            NodeShape::Rectangle | NodeShape::RoundedRect => (width, height),
        }
    }

    pub fn layout(&self, db: &FlowchartDatabase) -> FlowchartLayout {
        let _span = span!(
            Level::DEBUG,
            "layout_flowchart",
            nodes = db.node_count(),
            edges = db.edge_count()
        )
        .entered();

        let ids: Vec<&str> = db.nodes().map(|n| n.id.as_str()).collect();
        let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let edges: Vec<(usize, usize)> = db
            .edges()
            .filter_map(|e| Some((*index.get(e.from.as_str())?, *index.get(e.to.as_str())?)))
            .collect();

        let back_edges = find_back_edges(ids.len(), &edges);
        let ranks = assign_ranks(ids.len(), &edges, &back_edges);
        trace!(?ranks, back_edges = back_edges.len(), "Assigned ranks");

        let layer_count = ranks.iter().copied().max().map_or(0, |r| r + 1);
        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
        for (node, &rank) in ranks.iter().enumerate() {
            layers[rank].push(node);
        }

        let direction = db.direction();
        let vertical = direction.is_vertical();
        let sizes: Vec<(f64, f64)> = db
            .nodes()
            .map(|n| self.node_size(&n.label, n.shape))
            .collect();
        // (main, cross) extents per node
        let along = |node: usize| {
            let (w, h) = sizes[node];
            if vertical {
                (h, w)
            } else {
                (w, h)
            }
        };

        let layer_thickness: Vec<f64> = layers
            .iter()
            .map(|layer| layer.iter().map(|&n| along(n).0).fold(0.0, f64::max))
            .collect();
        let layer_span: Vec<f64> = layers
            .iter()
            .map(|layer| {
                let total: f64 = layer.iter().map(|&n| along(n).1).sum();
                total + self.config.node_sep * layer.len().saturating_sub(1) as f64
            })
            .collect();
        let max_span = layer_span.iter().copied().fold(0.0, f64::max);
        let total_main = layer_thickness.iter().sum::<f64>()
            + self.config.rank_sep * layer_count.saturating_sub(1) as f64;

        let mut centers = vec![Point::ORIGIN; ids.len()];
        let mut main_offset = 0.0;
        for (rank, layer) in layers.iter().enumerate() {
            let mut cross = (max_span - layer_span[rank]) / 2.0;
            let mut main = main_offset + layer_thickness[rank] / 2.0;
            if direction.is_reversed() {
                main = total_main - main;
            }
            for &node in layer {
                let extent = along(node).1;
                let c = cross + extent / 2.0;
                centers[node] = if vertical {
                    Point::new(c, main)
                } else {
                    Point::new(main, c)
                };
                cross += extent + self.config.node_sep;
            }
            main_offset += layer_thickness[rank] + self.config.rank_sep;
        }

        let mut nodes: Vec<PositionedNode> = db
            .nodes()
            .enumerate()
            .map(|(i, n)| PositionedNode {
                id: n.id.clone(),
                label: n.label.clone(),
                shape: n.shape,
                center: centers[i],
                width: sizes[i].0,
                height: sizes[i].1,
            })
            .collect();

        let mut subgraphs = self.place_subgraphs(db, &nodes, &index);
        let (min, max) = bounds(&nodes, &subgraphs);
        let shift = Point::new(self.config.padding - min.x, self.config.padding - min.y);
        for node in &mut nodes {
            node.center = Point::new(node.center.x + shift.x, node.center.y + shift.y);
        }
        for subgraph in &mut subgraphs {
            subgraph.origin = Point::new(subgraph.origin.x + shift.x, subgraph.origin.y + shift.y);
        }

        let edges = db
            .edges()
            .filter_map(|e| {
                let from = &nodes[*index.get(e.from.as_str())?];
                let to = &nodes[*index.get(e.to.as_str())?];
                Some(PositionedEdge {
                    from: e.from.clone(),
                    to: e.to.clone(),
                    edge_type: e.edge_type,
                    label: e.label.clone(),
                    points: route(from, to),
                })
            })
            .collect();

        let width = max.x - min.x + 2.0 * self.config.padding;
        let height = max.y - min.y + 2.0 * self.config.padding;
        debug!(width, height, layers = layer_count, "Layout complete");

        FlowchartLayout {
            nodes,
            edges,
            subgraphs,
            width,
            height,
        }
    }

    fn place_subgraphs(
        &self,
        db: &FlowchartDatabase,
        nodes: &[PositionedNode],
        index: &HashMap<&str, usize>,
    ) -> Vec<PositionedSubgraph> {
        let margin = self.config.cluster_margin;
        db.subgraphs()
            .filter_map(|subgraph| {
                let members: Vec<&PositionedNode> = subgraph
                    .members
                    .iter()
                    .filter_map(|id| index.get(id.as_str()).map(|&i| &nodes[i]))
                    .collect();
                let (min, max) = bounds_of(members.iter().copied())?;
                let title_band = self.config.line_height;
                Some(PositionedSubgraph {
                    id: subgraph.id.clone(),
                    title: subgraph.title.clone(),
                    origin: Point::new(min.x - margin, min.y - margin - title_band),
                    width: max.x - min.x + 2.0 * margin,
                    height: max.y - min.y + 2.0 * margin + title_band,
                })
            })
            .collect()
    }
}

fn bounds_of<'a>(nodes: impl Iterator<Item = &'a PositionedNode>) -> Option<(Point, Point)> {
    nodes.fold(None, |acc, n| {
        let lo = Point::new(n.center.x - n.width / 2.0, n.center.y - n.height / 2.0);
        let hi = Point::new(n.center.x + n.width / 2.0, n.center.y + n.height / 2.0);
        Some(match acc {
            None => (lo, hi),
            Some((min, max)) => (
                Point::new(min.x.min(lo.x), min.y.min(lo.y)),
                Point::new(max.x.max(hi.x), max.y.max(hi.y)),
            ),
        })
    })
}

fn bounds(nodes: &[PositionedNode], subgraphs: &[PositionedSubgraph]) -> (Point, Point) {
    let (mut min, mut max) = bounds_of(nodes.iter()).unwrap_or((Point::ORIGIN, Point::ORIGIN));
    for s in subgraphs {
        min = Point::new(min.x.min(s.origin.x), min.y.min(s.origin.y));
        max = Point::new(
            max.x.max(s.origin.x + s.width),
            max.y.max(s.origin.y + s.height),
        );
    }
    (min, max)
}

/// Edges closing a cycle in a DFS visiting nodes in insertion order
fn find_back_edges(node_count: usize, edges: &[(usize, usize)]) -> HashSet<(usize, usize)> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Active,
        Done,
    }

    let mut adjacency = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        adjacency[from].push(to);
    }

    let mut marks = vec![Mark::Unvisited; node_count];
    let mut back = HashSet::new();

    for root in 0..node_count {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // Explicit stack of (node, next child index)
        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::Active;
        while let Some((node, child)) = stack.last_mut() {
            let node = *node;
            if let Some(&next) = adjacency[node].get(*child) {
                *child += 1;
                match marks[next] {
                    Mark::Unvisited => {
                        marks[next] = Mark::Active;
                        stack.push((next, 0));
                    }
                    Mark::Active => {
                        back.insert((node, next));
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }

    back
}

/// Longest-path ranks over the acyclic remainder of the graph
fn assign_ranks(
    node_count: usize,
    edges: &[(usize, usize)],
    back_edges: &HashSet<(usize, usize)>,
) -> Vec<usize> {
    let forward: Vec<(usize, usize)> = edges
        .iter()
        .copied()
        .filter(|e| e.0 != e.1 && !back_edges.contains(e))
        .collect();

    let mut in_degree = vec![0usize; node_count];
    let mut adjacency = vec![Vec::new(); node_count];
    for &(from, to) in &forward {
        in_degree[to] += 1;
        adjacency[from].push(to);
    }

    let mut queue: VecDeque<usize> = (0..node_count).filter(|&n| in_degree[n] == 0).collect();
    let mut ranks = vec![0usize; node_count];
    while let Some(node) = queue.pop_front() {
        for &next in &adjacency[node] {
            ranks[next] = ranks[next].max(ranks[node] + 1);
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }
    ranks
}

/// Clip the segment from a node's center toward `toward` to its box
fn boundary_point(node: &PositionedNode, toward: Point) -> Point {
    let d = toward - node.center;
    if d.x == 0.0 && d.y == 0.0 {
        return node.center;
    }
    let hw = node.width / 2.0;
    let hh = node.height / 2.0;
    let tx = if d.x != 0.0 { hw / d.x.abs() } else { f64::INFINITY };
    let ty = if d.y != 0.0 { hh / d.y.abs() } else { f64::INFINITY };
    let t = tx.min(ty);
    Point::new(node.center.x + d.x * t, node.center.y + d.y * t)
}

fn route(from: &PositionedNode, to: &PositionedNode) -> Vec<Point> {
    if from.id == to.id {
        let right = from.center.x + from.width / 2.0;
        let top = from.center.y - from.height / 4.0;
        let bottom = from.center.y + from.height / 4.0;
        return vec![
            Point::new(right, top),
            Point::new(right + 24.0, top),
            Point::new(right + 24.0, bottom),
            Point::new(right, bottom),
        ];
    }
    vec![
        boundary_point(from, to.center),
        boundary_point(to, from.center),
    ]
}
