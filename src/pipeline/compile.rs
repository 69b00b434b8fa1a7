//! Tree compiler: document tree → Markdown-dialect text + pending images.
//!
//! Compilation is a pure, synchronous walk. Image nodes are not resolved here;
//! each one gets a numbered placeholder token in the text and an
//! [`ImagePlaceholder`] entry recording the token's byte span, and
//! [`crate::pipeline::placeholders`] splices the real references in at those
//! spans afterwards. Keeping the network out of the walk means the compiler is
//! testable with nothing but a parsed tree.
//!
//! Substitution is positional, so pasted text that happens to contain a
//! token-shaped string is never mistaken for a placeholder.
//!
//! ## Block vs. inline
//!
//! Block containers (`p`, `div`, list items) recurse into their children.
//! Headings and inline emphasis (`b`, `i`, `code`, links) use the node's
//! flattened text instead, so `<h2>A<b>B</b></h2>` becomes `## AB`, not
//! `## A**B**`. Stored documents depend on that shape.

use crate::dom::{DocumentNode, NodeKind};
use crate::markers::placeholder_token;
use std::ops::Range;

/// An image node waiting to be resolved.
#[derive(Debug, Clone)]
pub struct ImagePlaceholder<'a, N> {
    /// 1-based position in document order.
    pub index: usize,
    /// Marker standing in for the image inside the compiled text.
    pub token: String,
    /// Byte range of this placeholder's token in [`CompiledFragment::text`].
    pub span: Range<usize>,
    pub node: &'a N,
}

/// Output of [`compile`].
#[derive(Debug, Clone)]
pub struct CompiledFragment<'a, N> {
    pub text: String,
    /// In document order; spans are ascending and disjoint.
    pub placeholders: Vec<ImagePlaceholder<'a, N>>,
}

/// Compile a tree rooted at `root`.
pub fn compile<N: DocumentNode>(root: &N) -> CompiledFragment<'_, N> {
    let mut compiler = TreeCompiler {
        out: String::new(),
        placeholders: Vec::new(),
    };
    compiler.node(root);
    CompiledFragment {
        text: compiler.out,
        placeholders: compiler.placeholders,
    }
}

/// Appends to one buffer in document order so placeholder offsets are final
/// the moment they are recorded.
struct TreeCompiler<'a, N> {
    out: String,
    placeholders: Vec<ImagePlaceholder<'a, N>>,
}

impl<'a, N: DocumentNode> TreeCompiler<'a, N> {
    fn node(&mut self, node: &'a N) {
        match node.kind() {
            NodeKind::Text => self.out.push_str(node.text().unwrap_or_default()),
            NodeKind::Element => self.element(node),
            NodeKind::Other => {}
        }
    }

    fn children(&mut self, node: &'a N) {
        for child in node.children() {
            self.node(child);
        }
    }

    fn element(&mut self, node: &'a N) {
        let tag = node.tag_name().unwrap_or_default();
        match tag {
            "p" | "div" => {
                self.children(node);
                self.out.push_str("\n\n");
            }
            "h1" | "h2" | "h3" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                self.out.push_str(&format!(
                    "{} {}\n\n",
                    "#".repeat(level),
                    node.flattened_text()
                ));
            }
            "b" if is_editor_wrapper(node) => self.children(node),
            "strong" | "b" => self.out.push_str(&format!("**{}**", node.flattened_text())),
            "em" | "i" => self.out.push_str(&format!("*{}*", node.flattened_text())),
            "a" => self.out.push_str(&format!(
                "[{}]({})",
                node.flattened_text(),
                node.attribute("href").unwrap_or_default()
            )),
            "ul" => self.list(node, |_| "- ".to_string()),
            "ol" => self.list(node, |n| format!("{n}. ")),
            "img" => self.image(node),
            "code" => self.out.push_str(&format!("`{}`", node.flattened_text())),
            "pre" => self
                .out
                .push_str(&format!("```\n{}\n```\n\n", node.flattened_text())),
            "br" => self.out.push('\n'),
            _ => self.children(node),
        }
    }

    fn list(&mut self, node: &'a N, marker: impl Fn(usize) -> String) {
        let items = node
            .children()
            .iter()
            .filter(|c| c.tag_name() == Some("li"));
        for (i, li) in items.enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.out.push_str(&marker(i + 1));
            self.children(li);
        }
        self.out.push_str("\n\n");
    }

    fn image(&mut self, node: &'a N) {
        let index = self.placeholders.len() + 1;
        let token = placeholder_token(index);
        let start = self.out.len();
        self.out.push_str(&token);
        self.placeholders.push(ImagePlaceholder {
            index,
            token,
            span: start..self.out.len(),
            node,
        });
    }
}

/// The collaborative editor wraps a whole copied document in
/// `<b id="docs-internal-guid-…" style="font-weight:normal">`; that element is
/// a container, not bold text.
fn is_editor_wrapper<N: DocumentNode>(node: &N) -> bool {
    node.attribute("id")
        .is_some_and(|id| id.starts_with("docs-internal-guid"))
}
