//! Core type definitions shared across the viewer pipeline
//!
//! Diagram inputs, flowchart vocabulary (shapes, connectors, direction) and
//! the small geometry types used by the viewport.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of text a [`DiagramSource`] carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    /// Flowchart markup (`graph TD ...`)
    #[default]
    Graph,
    /// Pre-formatted directory tree dump
    Tree,
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagramKind::Graph => write!(f, "graph"),
            DiagramKind::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for DiagramKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "graph" => Ok(DiagramKind::Graph),
            "tree" => Ok(DiagramKind::Tree),
            _ => Err(format!("Unknown diagram kind: {}", s)),
        }
    }
}

/// Raw diagram text as supplied by the host
///
/// Immutable once created; the host replaces the whole value whenever new
/// analysis data arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramSource {
    pub raw_text: String,
    #[serde(default)]
    pub kind: DiagramKind,
}

impl DiagramSource {
    pub fn new(raw_text: impl Into<String>, kind: DiagramKind) -> Self {
        Self {
            raw_text: raw_text.into(),
            kind,
        }
    }

    /// Flowchart source
    pub fn graph(raw_text: impl Into<String>) -> Self {
        Self::new(raw_text, DiagramKind::Graph)
    }

    /// Tree dump source
    pub fn tree(raw_text: impl Into<String>) -> Self {
        Self::new(raw_text, DiagramKind::Tree)
    }

    /// True when there is nothing but whitespace to render
    pub fn is_blank(&self) -> bool {
        self.raw_text.trim().is_empty()
    }
}

/// Node shapes of the flowchart dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum NodeShape {
    /// `A[label]`
    #[default]
    Rectangle,
    /// `A(label)`
    RoundedRect,
    /// `A((label))`
    Circle,
    /// `A{label}`
    Diamond,
    /// `A{{label}}`
    Hexagon,
    /// `A[[label]]`
    Subroutine,
    /// `A[(label)]`
    Cylinder,
    /// `A>label]`
    Asymmetric,
    /// `A[/label/]`
    Parallelogram,
    /// `A[/label\]`
    Trapezoid,
}

impl fmt::Display for NodeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeShape::Rectangle => "rectangle",
            NodeShape::RoundedRect => "rounded",
            NodeShape::Circle => "circle",
            NodeShape::Diamond => "diamond",
            NodeShape::Hexagon => "hexagon",
            NodeShape::Subroutine => "subroutine",
            NodeShape::Cylinder => "cylinder",
            NodeShape::Asymmetric => "asymmetric",
            NodeShape::Parallelogram => "parallelogram",
            NodeShape::Trapezoid => "trapezoid",
        };
        f.write_str(name)
    }
}

/// Edge connectors of the flowchart dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum EdgeType {
    /// `-->`
    #[default]
    Arrow,
    /// `---`
    Line,
    /// `-.->`
    DottedArrow,
    /// `-.-`
    DottedLine,
    /// `==>`
    ThickArrow,
    /// `===`
    ThickLine,
    /// `~~~`
    Invisible,
    /// `--o`
    OpenArrow,
    /// `--x`
    CrossArrow,
}

impl EdgeType {
    /// Every connector token, longest first so prefix matching is unambiguous
    pub const TOKENS: [&'static str; 9] = [
        "-.->", "==>", "===", "-->", "---", "-.-", "--o", "--x", "~~~",
    ];

    /// Returns true if this edge type ends in an arrowhead
    pub fn has_arrow(&self) -> bool {
        matches!(
            self,
            EdgeType::Arrow | EdgeType::DottedArrow | EdgeType::ThickArrow
        )
    }

    pub fn is_dotted(&self) -> bool {
        matches!(self, EdgeType::DottedArrow | EdgeType::DottedLine)
    }

    pub fn is_thick(&self) -> bool {
        matches!(self, EdgeType::ThickArrow | EdgeType::ThickLine)
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            EdgeType::Arrow => "-->",
            EdgeType::Line => "---",
            EdgeType::DottedArrow => "-.->",
            EdgeType::DottedLine => "-.-",
            EdgeType::ThickArrow => "==>",
            EdgeType::ThickLine => "===",
            EdgeType::Invisible => "~~~",
            EdgeType::OpenArrow => "--o",
            EdgeType::CrossArrow => "--x",
        };
        f.write_str(token)
    }
}

/// Flow direction for the diagram layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Direction {
    /// TD or TB
    #[default]
    TopDown,
    LeftRight,
    RightLeft,
    BottomUp,
}

impl Direction {
    pub fn is_vertical(&self) -> bool {
        matches!(self, Direction::TopDown | Direction::BottomUp)
    }

    pub fn is_reversed(&self) -> bool {
        matches!(self, Direction::RightLeft | Direction::BottomUp)
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TD" | "TB" => Ok(Direction::TopDown),
            "LR" => Ok(Direction::LeftRight),
            "RL" => Ok(Direction::RightLeft),
            "BT" => Ok(Direction::BottomUp),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::TopDown => write!(f, "TD"),
            Direction::LeftRight => write!(f, "LR"),
            Direction::RightLeft => write!(f, "RL"),
            Direction::BottomUp => write!(f, "BT"),
        }
    }
}

/// A node with its display metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub id: String,
    /// Display label (defaults to the id)
    pub label: String,
    pub shape: NodeShape,
}

impl NodeData {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_shape(id, label, NodeShape::Rectangle)
    }

    pub fn with_shape(id: impl Into<String>, label: impl Into<String>, shape: NodeShape) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            shape,
        }
    }
}

/// A directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeData {
    pub from: String,
    pub to: String,
    pub edge_type: EdgeType,
    pub label: Option<String>,
}

impl EdgeData {
    pub fn new(from: impl Into<String>, to: impl Into<String>, edge_type: EdgeType) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A point in viewport or pointer coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Width and height of rendered content or of its container
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions strictly positive and finite
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}
