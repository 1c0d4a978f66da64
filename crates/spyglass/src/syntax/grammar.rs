//! Statement grammar using chumsky
//!
//! Parses one flowchart statement (the text between `;` separators on a line)
//! into a [`Statement`]. The grammar is deliberately strict: anything the
//! renderer would not draw faithfully is a parse error, which is what gives
//! the repair cascade something to repair.

use chumsky::prelude::*;

use crate::core::{EdgeData, EdgeType, NodeShape};

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Chumsky-based flowchart statement parser
#[derive(Debug, Default, Clone, Copy)]
pub struct StatementParser;

impl StatementParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a single statement, reporting chumsky's diagnostics on failure
    pub fn parse_statement(&self, input: &str) -> Result<Statement, String> {
        statement_parser()
            .then_ignore(end())
            .parse(input.trim())
            .into_result()
            .map_err(|errors| {
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            })
    }
}

/// A node occurrence, either standalone or as an edge endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub id: String,
    /// Label and shape when the occurrence carries a shape suffix
    pub shape: Option<(String, NodeShape)>,
    /// Class applied through `:::name`
    pub class: Option<String>,
}

/// Connector between two node references
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub edge_type: EdgeType,
    pub label: Option<String>,
}

/// Styling directives; accepted by the grammar, ignored by the renderer
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `classDef name fill:#f9f`
    ClassDef { name: String, style: String },
    /// `class a,b name`
    Class { ids: Vec<String>, class: String },
    /// `style a fill:#f9f`
    Style { ids: Vec<String>, style: String },
    /// `linkStyle 0,1 stroke:#ff3` or `linkStyle default ...`
    LinkStyle { targets: Vec<String>, style: String },
}

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `A`, `A[label]`, `A{label}:::hot`
    Node(NodeRef),
    /// `A --> B -.->|maybe| C`
    Chain { head: NodeRef, links: Vec<(Link, NodeRef)> },
    /// `subgraph title`, `subgraph id[title]`, `subgraph "title"`
    SubgraphStart { id: Option<String>, title: String },
    /// `end`
    End,
    Directive(Directive),
}

impl Statement {
    /// Every node reference in order of appearance
    pub fn node_refs(&self) -> Vec<&NodeRef> {
        match self {
            Statement::Node(node) => vec![node],
            Statement::Chain { head, links } => std::iter::once(head)
                .chain(links.iter().map(|(_, node)| node))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The edges a chain statement expands to
    pub fn edges(&self) -> Vec<EdgeData> {
        let Statement::Chain { head, links } = self else {
            return Vec::new();
        };

        let mut from = head;
        let mut edges = Vec::with_capacity(links.len());
        for (link, to) in links {
            let edge = EdgeData::new(&from.id, &to.id, link.edge_type);
            edges.push(match &link.label {
                Some(label) => edge.with_label(label.as_str()),
                None => edge,
            });
            from = to;
        }
        edges
    }
}

fn statement_parser<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
    directive_parser()
        .map(Statement::Directive)
        .or(subgraph_parser())
        .or(just("end").then(end().rewind()).to(Statement::End))
        .or(chain_parser())
        .or(node_ref_parser().map(Statement::Node))
}

fn inline_whitespace<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    one_of(" \t").repeated().ignored()
}

fn required_whitespace<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    one_of(" \t").repeated().at_least(1).ignored()
}

/// `[A-Za-z0-9_]+`
fn node_id<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .collect::<String>()
        .labelled("node identifier")
}

fn id_list<'src>() -> impl Parser<'src, &'src str, Vec<String>, Extra<'src>> + Clone {
    node_id()
        .separated_by(just(',').padded_by(inline_whitespace()))
        .at_least(1)
        .collect()
}

/// Everything up to the end of the statement
fn rest_of_statement<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    none_of("\n\r;")
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(|s| s.trim().to_string())
}

fn directive_parser<'src>() -> impl Parser<'src, &'src str, Directive, Extra<'src>> + Clone {
    let class_def = just("classDef")
        .then(required_whitespace())
        .ignore_then(node_id())
        .then_ignore(required_whitespace())
        .then(rest_of_statement())
        .map(|(name, style)| Directive::ClassDef { name, style });

    let class = just("class")
        .then(required_whitespace())
        .ignore_then(id_list())
        .then_ignore(required_whitespace())
        .then(node_id())
        .map(|(ids, class)| Directive::Class { ids, class });

    let style = just("style")
        .then(required_whitespace())
        .ignore_then(id_list())
        .then_ignore(required_whitespace())
        .then(rest_of_statement())
        .map(|(ids, style)| Directive::Style { ids, style });

    let link_target = just("default").to("default".to_string()).or(any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .collect::<String>());

    let link_style = just("linkStyle")
        .then(required_whitespace())
        .ignore_then(
            link_target
                .separated_by(just(',').padded_by(inline_whitespace()))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .then_ignore(required_whitespace())
        .then(rest_of_statement())
        .map(|(targets, style)| Directive::LinkStyle { targets, style });

    class_def.or(class).or(style).or(link_style)
}

/// Bare labels exclude shape delimiters, pipes, quotes and path separators;
/// anything else must be quoted.
fn label<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let quoted = just('"')
        .ignore_then(none_of("\"\n\r").repeated().at_least(1).collect::<String>())
        .then_ignore(just('"'));

    let bare = none_of("[](){}|\"/\\\n\r\t")
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(|s| s.trim().to_string());

    quoted.or(bare).labelled("label")
}

fn shape_suffix<'src>() -> impl Parser<'src, &'src str, (String, NodeShape), Extra<'src>> + Clone
{
    choice((
        delimited("[[", "]]", NodeShape::Subroutine),
        delimited("{{", "}}", NodeShape::Hexagon),
        delimited("((", "))", NodeShape::Circle),
        delimited("[(", ")]", NodeShape::Cylinder),
        delimited("[/", "/]", NodeShape::Parallelogram),
        delimited("[/", "\\]", NodeShape::Trapezoid),
        delimited("[", "]", NodeShape::Rectangle),
        delimited("(", ")", NodeShape::RoundedRect),
        delimited("{", "}", NodeShape::Diamond),
        delimited(">", "]", NodeShape::Asymmetric),
    ))
    .labelled("node shape")
}

fn delimited<'src>(
    open: &'static str,
    close: &'static str,
    shape: NodeShape,
) -> impl Parser<'src, &'src str, (String, NodeShape), Extra<'src>> + Clone {
    just(open)
        .ignore_then(label())
        .then_ignore(just(close))
        .map(move |label| (label, shape))
}

fn node_ref_parser<'src>() -> impl Parser<'src, &'src str, NodeRef, Extra<'src>> + Clone {
    let class_suffix = just(":::").ignore_then(node_id());

    node_id()
        .then(shape_suffix().or_not())
        .then(class_suffix.or_not())
        .map(|((id, shape), class)| NodeRef { id, shape, class })
        .labelled("node")
}

fn link_parser<'src>() -> impl Parser<'src, &'src str, Link, Extra<'src>> + Clone {
    let connector = choice((
        just("-.->").to(EdgeType::DottedArrow),
        just("-.-").to(EdgeType::DottedLine),
        just("==>").to(EdgeType::ThickArrow),
        just("===").to(EdgeType::ThickLine),
        just("-->").to(EdgeType::Arrow),
        just("---").to(EdgeType::Line),
        just("--o").to(EdgeType::OpenArrow),
        just("--x").to(EdgeType::CrossArrow),
        just("~~~").to(EdgeType::Invisible),
    ))
    .labelled("edge connector");

    let edge_label = just('|')
        .ignore_then(label())
        .then_ignore(just('|'))
        .then_ignore(inline_whitespace());

    connector
        .then_ignore(inline_whitespace())
        .then(edge_label.or_not())
        .map(|(edge_type, label)| Link { edge_type, label })
}

fn chain_parser<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
    let step = inline_whitespace()
        .ignore_then(link_parser())
        .then(node_ref_parser());

    node_ref_parser()
        .then(step.repeated().at_least(1).collect::<Vec<_>>())
        .map(|(head, links)| Statement::Chain { head, links })
        .labelled("edge")
}

fn subgraph_parser<'src>() -> impl Parser<'src, &'src str, Statement, Extra<'src>> + Clone {
    let with_id = node_id()
        .then(just('[').ignore_then(label()).then_ignore(just(']')).or_not())
        .then_ignore(end().rewind())
        .map(|(id, title)| match title {
            Some(title) => (Some(id), title),
            None => (Some(id.clone()), id),
        });

    let quoted = just('"')
        .ignore_then(none_of("\"\n\r").repeated().at_least(1).collect::<String>())
        .then_ignore(just('"'))
        .map(|title| (None, title));

    let free_text = rest_of_statement().map(|title| (None, title));

    just("subgraph")
        .then(required_whitespace())
        .ignore_then(with_id.or(quoted).or(free_text))
        .then_ignore(inline_whitespace())
        .map(|(id, title)| Statement::SubgraphStart { id, title })
        .labelled("subgraph")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Statement, String> {
        StatementParser::new().parse_statement(input)
    }

    #[test]
    fn test_bare_node() {
        let stmt = parse("A").unwrap();
        assert_eq!(
            stmt,
            Statement::Node(NodeRef {
                id: "A".to_string(),
                shape: None,
                class: None,
            })
        );
    }

    #[test]
    fn test_node_shapes() {
        let cases = [
            ("A[Label]", NodeShape::Rectangle),
            ("A(Label)", NodeShape::RoundedRect),
            ("A{Label}", NodeShape::Diamond),
            ("A((Label))", NodeShape::Circle),
            ("A[[Label]]", NodeShape::Subroutine),
            ("A{{Label}}", NodeShape::Hexagon),
            ("A[(Label)]", NodeShape::Cylinder),
            ("A[/Label/]", NodeShape::Parallelogram),
            ("A[/Label\\]", NodeShape::Trapezoid),
            ("A>Label]", NodeShape::Asymmetric),
        ];

        for (input, expected) in cases {
            match parse(input) {
                Ok(Statement::Node(NodeRef {
                    shape: Some((label, shape)),
                    ..
                })) => {
                    assert_eq!(label, "Label", "label for {}", input);
                    assert_eq!(shape, expected, "shape for {}", input);
                }
                other => panic!("Expected shaped node for {}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_quoted_label_allows_path_separators() {
        let stmt = parse(r#"A["src/index.js"]"#).unwrap();
        let Statement::Node(node) = stmt else {
            panic!("Expected node");
        };
        assert_eq!(
            node.shape,
            Some(("src/index.js".to_string(), NodeShape::Rectangle))
        );
    }

    #[test]
    fn test_unquoted_path_label_is_rejected() {
        assert!(parse("A[src/index.js]-->B").is_err());
    }

    #[test]
    fn test_edge_chain_with_labels() {
        let stmt = parse("A[Start] -->|go| B -.-> C{Done?}").unwrap();
        let edges = stmt.edges();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].from, "A");
        assert_eq!(edges[0].to, "B");
        assert_eq!(edges[0].label.as_deref(), Some("go"));
        assert_eq!(edges[1].edge_type, EdgeType::DottedArrow);
        assert_eq!(edges[1].label, None);
        assert_eq!(stmt.node_refs().len(), 3);
    }

    #[test]
    fn test_all_connectors() {
        let cases = [
            ("A --> B", EdgeType::Arrow),
            ("A --- B", EdgeType::Line),
            ("A -.-> B", EdgeType::DottedArrow),
            ("A -.- B", EdgeType::DottedLine),
            ("A ==> B", EdgeType::ThickArrow),
            ("A === B", EdgeType::ThickLine),
            ("A ~~~ B", EdgeType::Invisible),
            ("A --o B", EdgeType::OpenArrow),
            ("A --x B", EdgeType::CrossArrow),
            ("A-->B", EdgeType::Arrow),
        ];

        for (input, expected) in cases {
            let edges = parse(input).unwrap().edges();
            assert_eq!(edges[0].edge_type, expected, "connector in {}", input);
        }
    }

    #[test]
    fn test_spaced_arrow_is_rejected() {
        assert!(parse("A - -> B").is_err());
        assert!(parse("A -- > B").is_err());
    }

    #[test]
    fn test_identifier_with_punctuation_is_rejected() {
        assert!(parse("my-node --> B").is_err());
        assert!(parse("api.v2 --> B").is_err());
    }

    #[test]
    fn test_class_suffix() {
        let stmt = parse("A[Hot]:::warm --> B").unwrap();
        let refs = stmt.node_refs();
        assert_eq!(refs[0].class.as_deref(), Some("warm"));
    }

    #[test]
    fn test_subgraph_forms() {
        assert_eq!(
            parse("subgraph backend").unwrap(),
            Statement::SubgraphStart {
                id: Some("backend".to_string()),
                title: "backend".to_string(),
            }
        );
        assert_eq!(
            parse("subgraph api[Public API]").unwrap(),
            Statement::SubgraphStart {
                id: Some("api".to_string()),
                title: "Public API".to_string(),
            }
        );
        assert_eq!(
            parse(r#"subgraph "Data Layer""#).unwrap(),
            Statement::SubgraphStart {
                id: None,
                title: "Data Layer".to_string(),
            }
        );
        assert_eq!(
            parse("subgraph Data Layer").unwrap(),
            Statement::SubgraphStart {
                id: None,
                title: "Data Layer".to_string(),
            }
        );
        assert_eq!(parse("end").unwrap(), Statement::End);
    }

    #[test]
    fn test_malformed_subgraph_headers_rejected() {
        assert!(parse(r#"subgraph"Data""#).is_err());
        assert!(parse("Subgraph Data").is_err());
    }

    #[test]
    fn test_directives() {
        assert!(matches!(
            parse("classDef hot fill:#f96,stroke:#333").unwrap(),
            Statement::Directive(Directive::ClassDef { .. })
        ));
        assert!(matches!(
            parse("class A,B hot").unwrap(),
            Statement::Directive(Directive::Class { .. })
        ));
        assert!(matches!(
            parse("style A fill:#fff").unwrap(),
            Statement::Directive(Directive::Style { .. })
        ));
        assert!(matches!(
            parse("linkStyle 0,1 stroke:#ff3").unwrap(),
            Statement::Directive(Directive::LinkStyle { .. })
        ));
    }

    #[test]
    fn test_keyword_prefixed_identifiers_are_nodes() {
        let edges = parse("classic --> endpoint").unwrap().edges();
        assert_eq!(edges[0].from, "classic");
        assert_eq!(edges[0].to, "endpoint");
    }

    #[test]
    fn test_error_message_is_descriptive() {
        let err = parse("A[unterminated").unwrap_err();
        assert!(!err.is_empty());
    }
}
