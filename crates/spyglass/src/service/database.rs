//! Flowchart database
//!
//! Nodes, edges, subgraphs and class assignments collected from a parsed
//! [`Document`]. Insertion order is preserved so layout is deterministic.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::core::{Direction, EdgeData, NodeData};
use crate::syntax::{Directive, Document, Statement};

/// A subgraph container grouping related nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Subgraph {
    pub id: String,
    pub title: String,
    /// Node ids declared while this subgraph was the innermost open one
    pub members: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FlowchartDatabase {
    direction: Direction,
    nodes: HashMap<String, NodeData>,
    node_order: Vec<String>,
    edges: Vec<EdgeData>,
    subgraphs: Vec<Subgraph>,
    /// Class names per node id, from `:::name` and `class` directives
    node_classes: HashMap<String, Vec<String>>,
    /// `classDef` bodies, in declaration order
    class_defs: Vec<(String, String)>,
}

impl FlowchartDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_direction(direction: Direction) -> Self {
        Self {
            direction,
            ..Default::default()
        }
    }

    /// Populate a database from a parsed document
    pub fn from_document(document: &Document) -> Self {
        let mut db = Self::with_direction(document.direction);
        let mut open: Vec<usize> = Vec::new();

        for located in &document.statements {
            match &located.statement {
                Statement::SubgraphStart { id, title } => {
                    let id = id
                        .clone()
                        .unwrap_or_else(|| format!("subgraph_{}", db.subgraphs.len()));
                    trace!(subgraph_id = %id, title = %title, "Opening subgraph");
                    db.subgraphs.push(Subgraph {
                        id,
                        title: title.clone(),
                        members: Vec::new(),
                    });
                    open.push(db.subgraphs.len() - 1);
                }
                Statement::End => {
                    open.pop();
                }
                Statement::Directive(directive) => db.apply_directive(directive),
                statement => {
                    for node in statement.node_refs() {
                        let is_new = !db.has_node(&node.id);
                        match &node.shape {
                            Some((label, shape)) => {
                                db.add_node(NodeData::with_shape(&node.id, label, *shape))
                            }
                            None => db.ensure_node(&node.id),
                        }
                        if let Some(class) = &node.class {
                            db.apply_class(&node.id, class);
                        }
                        if is_new {
                            if let Some(&index) = open.last() {
                                db.subgraphs[index].members.push(node.id.clone());
                            }
                        }
                    }
                    for edge in statement.edges() {
                        db.add_edge(edge);
                    }
                }
            }
        }

        debug!(
            nodes = db.node_count(),
            edges = db.edge_count(),
            subgraphs = db.subgraphs.len(),
            "Built flowchart database"
        );
        db
    }

    fn apply_directive(&mut self, directive: &Directive) {
        match directive {
            Directive::ClassDef { name, style } => {
                self.class_defs.push((name.clone(), style.clone()));
            }
            Directive::Class { ids, class } => {
                for id in ids {
                    self.apply_class(id, class);
                }
            }
            Directive::Style { .. } | Directive::LinkStyle { .. } => {
                trace!(?directive, "Ignoring style directive");
            }
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Insert or replace a node; a later shaped declaration wins
    pub fn add_node(&mut self, node: NodeData) {
        if !self.nodes.contains_key(&node.id) {
            self.node_order.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    /// Ensure a node exists, labelled with its id if new
    pub fn ensure_node(&mut self, id: &str) {
        if !self.has_node(id) {
            self.add_node(NodeData::new(id, id));
        }
    }

    pub fn add_edge(&mut self, edge: EdgeData) {
        self.ensure_node(&edge.from);
        self.ensure_node(&edge.to);
        self.edges.push(edge);
    }

    pub fn apply_class(&mut self, node_id: &str, class: &str) {
        let classes = self.node_classes.entry(node_id.to_string()).or_default();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    pub fn get_node(&self, id: &str) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeData> {
        self.edges.iter()
    }

    pub fn subgraphs(&self) -> impl Iterator<Item = &Subgraph> {
        self.subgraphs.iter()
    }

    pub fn classes_of(&self, node_id: &str) -> &[String] {
        self.node_classes
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn class_defs(&self) -> &[(String, String)] {
        &self.class_defs
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Position of a node in insertion order
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_order.iter().position(|n| n == id)
    }
}
