//! Read-only document tree for rich clipboard fragments.
//!
//! The compiler only ever sees the [`DocumentNode`] trait: a kind, a tag name,
//! attributes, children and text. It never builds or mutates a tree itself.
//! [`FragmentNode`] is the owned implementation produced by [`parse_fragment`],
//! which runs the HTML through html5ever and copies the relevant parts out of
//! the `RcDom` so the result is plain data (`Send + Sync`, cheap to borrow
//! across await points).

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

/// Coarse node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Element,
    /// Comments, doctypes, processing instructions. Compiles to nothing.
    Other,
}

/// Opaque read-only view of an externally owned document node.
pub trait DocumentNode {
    fn kind(&self) -> NodeKind;

    /// Lowercase tag name for elements, `None` otherwise.
    fn tag_name(&self) -> Option<&str>;

    /// Attribute value by (lowercase) name.
    fn attribute(&self, name: &str) -> Option<&str>;

    fn children(&self) -> &[Self]
    where
        Self: Sized;

    /// Character content of a text node, `None` otherwise.
    fn text(&self) -> Option<&str>;

    /// Concatenated text of this node and all of its descendants, ignoring
    /// any element structure (the DOM `textContent`).
    fn flattened_text(&self) -> String
    where
        Self: Sized,
    {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text<N: DocumentNode>(node: &N, out: &mut String) {
    match node.kind() {
        NodeKind::Text => out.push_str(node.text().unwrap_or_default()),
        NodeKind::Element => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
        NodeKind::Other => {}
    }
}

/// Owned document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentNode {
    Text(String),
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<FragmentNode>,
    },
    Other,
}

impl FragmentNode {
    pub fn text_node(content: impl Into<String>) -> Self {
        FragmentNode::Text(content.into())
    }

    pub fn element(tag: impl Into<String>) -> Self {
        FragmentNode::Element {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute (no-op on non-elements).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let FragmentNode::Element { attributes, .. } = &mut self {
            attributes.push((name.into().to_ascii_lowercase(), value.into()));
        }
        self
    }

    /// Append a child (no-op on non-elements).
    pub fn with_child(mut self, child: FragmentNode) -> Self {
        if let FragmentNode::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    /// Depth-first search for the first element with the given tag.
    pub fn find_element(&self, tag: &str) -> Option<&FragmentNode> {
        if self.tag_name() == Some(tag) {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find_element(tag))
    }
}

impl DocumentNode for FragmentNode {
    fn kind(&self) -> NodeKind {
        match self {
            FragmentNode::Text(_) => NodeKind::Text,
            FragmentNode::Element { .. } => NodeKind::Element,
            FragmentNode::Other => NodeKind::Other,
        }
    }

    fn tag_name(&self) -> Option<&str> {
        match self {
            FragmentNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            FragmentNode::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn children(&self) -> &[Self] {
        match self {
            FragmentNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            FragmentNode::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Parse a clipboard HTML fragment and return the node to compile from.
///
/// Clipboard HTML is usually a bare fragment preceded by `<meta>` and
/// sometimes `<style>`; html5ever builds a full document around it and moves
/// those into `<head>`. Compilation starts at `<body>` so head content never
/// leaks into the text. Parsing is infallible: html5ever recovers from any
/// malformed input the way a browser would.
pub fn parse_fragment(html: &str) -> FragmentNode {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let document = convert(&dom.document);
    match document.find_element("body") {
        Some(body) => {
            debug!("Parsed fragment: {} top-level body nodes", body.children().len());
            body.clone()
        }
        None => document,
    }
}

fn convert(handle: &Handle) -> FragmentNode {
    match &handle.data {
        NodeData::Document => FragmentNode::Element {
            tag: "#document".to_string(),
            attributes: Vec::new(),
            children: convert_children(handle),
        },
        NodeData::Element { name, attrs, .. } => FragmentNode::Element {
            tag: name.local.to_string().to_ascii_lowercase(),
            attributes: attrs
                .borrow()
                .iter()
                .map(|a| {
                    (
                        a.name.local.to_string().to_ascii_lowercase(),
                        a.value.to_string(),
                    )
                })
                .collect(),
            children: convert_children(handle),
        },
        NodeData::Text { contents } => FragmentNode::Text(contents.borrow().to_string()),
        _ => FragmentNode::Other,
    }
}

fn convert_children(handle: &Handle) -> Vec<FragmentNode> {
    handle.children.borrow().iter().map(convert).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_returns_body() {
        let root = parse_fragment("<meta charset=\"utf-8\"><p>Hi</p>");
        assert_eq!(root.tag_name(), Some("body"));
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].tag_name(), Some("p"));
    }

    #[test]
    fn head_content_is_excluded() {
        let root = parse_fragment("<style>p{color:red}</style><title>T</title><p>x</p>");
        assert_eq!(root.flattened_text(), "x");
    }

    #[test]
    fn comments_become_other() {
        let root = parse_fragment("<!--StartFragment--><p>x</p><!--EndFragment-->");
        assert!(root.children().iter().any(|c| c.kind() == NodeKind::Other));
        assert_eq!(root.flattened_text(), "x");
    }

    #[test]
    fn attributes_are_case_insensitive() {
        let root = parse_fragment(r#"<IMG SRC="blob:abc" Data-Src="x">"#);
        let img = root.find_element("img").unwrap();
        assert_eq!(img.attribute("src"), Some("blob:abc"));
        assert_eq!(img.attribute("data-src"), Some("x"));
        assert_eq!(img.attribute("href"), None);
    }

    #[test]
    fn uppercase_markup_is_lowercased() {
        let root = parse_fragment(r#"<DIV CLASS="x"><H2>T</H2></DIV>"#);
        let div = root.find_element("div").unwrap();
        assert_eq!(div.tag_name(), Some("div"));
        assert_eq!(div.attribute("class"), Some("x"));
        assert!(root.find_element("h2").is_some());
    }

    #[test]
    fn flattened_text_ignores_structure() {
        let node = FragmentNode::element("h2")
            .with_child(FragmentNode::text_node("A"))
            .with_child(FragmentNode::element("b").with_child(FragmentNode::text_node("B")));
        assert_eq!(node.flattened_text(), "AB");
    }

    #[test]
    fn builder_helpers_ignore_non_elements() {
        let t = FragmentNode::text_node("x")
            .with_attr("a", "b")
            .with_child(FragmentNode::Other);
        assert_eq!(t, FragmentNode::Text("x".into()));
        assert!(t.children().is_empty());
    }
}
