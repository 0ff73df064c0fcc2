//! Rich-text documents.
//!
//! The API delivers long-form fields as a JSON tree of typed nodes:
//!
//! ```json
//! { "nodeType": "document", "data": {}, "content": [
//!     { "nodeType": "paragraph", "data": {}, "content": [
//!         { "nodeType": "text", "value": "Whisk the ", "marks": [], "data": {} },
//!         { "nodeType": "text", "value": "eggs", "marks": [{ "type": "bold" }], "data": {} }
//!     ] }
//! ] }
//! ```
//!
//! Parsing lowers that wire shape into [`Node`], a closed tagged-variant tree.
//! Node types this module does not know keep their children as
//! [`Node::Unknown`] and render transparently, so a new block type in the CMS
//! degrades to its text instead of failing the page.
//!
//! Embedded assets are resolved against the response includes at parse time;
//! rendering never touches the network.

use crate::types::AssetRef;
use maud::{Markup, html};
use serde::Deserialize;
use serde_json::Value;

/// A parsed rich-text document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Paragraph(Vec<Node>),
    /// Level 1-6.
    Heading(u8, Vec<Node>),
    UnorderedList(Vec<Node>),
    OrderedList(Vec<Node>),
    ListItem(Vec<Node>),
    Quote(Vec<Node>),
    Rule,
    Table(Vec<Node>),
    TableRow(Vec<Node>),
    TableCell(Vec<Node>),
    TableHeaderCell(Vec<Node>),
    Hyperlink {
        uri: String,
        content: Vec<Node>,
    },
    /// Links and embeds that point at other entries. Rendered as a labelled
    /// placeholder; this site has no page for arbitrary entries.
    EntryReference {
        kind: EntryReferenceKind,
        target: String,
        content: Vec<Node>,
    },
    AssetHyperlink {
        target: String,
        content: Vec<Node>,
    },
    EmbeddedAsset {
        target: String,
        asset: Option<AssetRef>,
    },
    Text {
        value: String,
        marks: Vec<Mark>,
    },
    Unknown {
        node_type: String,
        content: Vec<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryReferenceKind {
    Hyperlink,
    EmbeddedBlock,
    EmbeddedInline,
}

impl EntryReferenceKind {
    fn node_type(self) -> &'static str {
        match self {
            Self::Hyperlink => "entry-hyperlink",
            Self::EmbeddedBlock => "embedded-entry-block",
            Self::EmbeddedInline => "embedded-entry-inline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Code,
    Superscript,
    Subscript,
    Strikethrough,
}

impl Mark {
    fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "bold" => Some(Self::Bold),
            "italic" => Some(Self::Italic),
            "underline" => Some(Self::Underline),
            "code" => Some(Self::Code),
            "superscript" => Some(Self::Superscript),
            "subscript" => Some(Self::Subscript),
            "strikethrough" => Some(Self::Strikethrough),
            _ => None,
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    node_type: String,
    #[serde(default)]
    content: Vec<RawNode>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    marks: Vec<RawMark>,
}

#[derive(Debug, Deserialize)]
struct RawMark {
    #[serde(rename = "type")]
    kind: String,
}

impl Document {
    /// Parse a document from its JSON value.
    ///
    /// `resolve_asset` maps an asset id to its reference, for embedded
    /// asset blocks.
    pub fn from_value(
        value: &Value,
        resolve_asset: impl Fn(&str) -> Option<AssetRef>,
    ) -> Result<Self, serde_json::Error> {
        let raw = RawNode::deserialize(value)?;
        let content = if raw.node_type == "document" {
            lower_all(raw.content, &resolve_asset)
        } else {
            // A bare block where a document was expected
            vec![lower(raw, &resolve_asset)]
        };
        Ok(Self { content })
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

fn lower_all(nodes: Vec<RawNode>, resolve_asset: &dyn Fn(&str) -> Option<AssetRef>) -> Vec<Node> {
    nodes.into_iter().map(|n| lower(n, resolve_asset)).collect()
}

/// `data.target.sys.id`, empty when absent.
fn target_id(data: &Value) -> String {
    data.pointer("/target/sys/id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn lower(raw: RawNode, resolve_asset: &dyn Fn(&str) -> Option<AssetRef>) -> Node {
    let RawNode {
        node_type,
        content,
        data,
        value,
        marks,
    } = raw;

    if node_type == "text" {
        return Node::Text {
            value: value.unwrap_or_default(),
            marks: marks
                .iter()
                .filter_map(|m| {
                    let mark = Mark::from_type(&m.kind);
                    if mark.is_none() {
                        tracing::debug!(mark = %m.kind, "ignoring unknown rich-text mark");
                    }
                    mark
                })
                .collect(),
        };
    }

    let children = || lower_all(content, resolve_asset);
    match node_type.as_str() {
        "paragraph" => Node::Paragraph(children()),
        "heading-1" | "heading-2" | "heading-3" | "heading-4" | "heading-5" | "heading-6" => {
            let level = node_type.as_bytes()[8] - b'0';
            Node::Heading(level, children())
        }
        "unordered-list" => Node::UnorderedList(children()),
        "ordered-list" => Node::OrderedList(children()),
        "list-item" => Node::ListItem(children()),
        "blockquote" => Node::Quote(children()),
        "hr" => Node::Rule,
        "table" => Node::Table(children()),
        "table-row" => Node::TableRow(children()),
        "table-cell" => Node::TableCell(children()),
        "table-header-cell" => Node::TableHeaderCell(children()),
        "hyperlink" => Node::Hyperlink {
            uri: data
                .get("uri")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            content: children(),
        },
        "entry-hyperlink" => Node::EntryReference {
            kind: EntryReferenceKind::Hyperlink,
            target: target_id(&data),
            content: children(),
        },
        "embedded-entry-block" => Node::EntryReference {
            kind: EntryReferenceKind::EmbeddedBlock,
            target: target_id(&data),
            content: children(),
        },
        "embedded-entry-inline" => Node::EntryReference {
            kind: EntryReferenceKind::EmbeddedInline,
            target: target_id(&data),
            content: children(),
        },
        "asset-hyperlink" => Node::AssetHyperlink {
            target: target_id(&data),
            content: children(),
        },
        "embedded-asset-block" => {
            let target = target_id(&data);
            let asset = resolve_asset(&target);
            Node::EmbeddedAsset { target, asset }
        }
        _ => Node::Unknown {
            node_type,
            content: children(),
        },
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render a document to markup. All text is escaped.
pub fn render_document(document: &Document) -> Markup {
    render_nodes(&document.content)
}

fn render_nodes(nodes: &[Node]) -> Markup {
    html! {
        @for node in nodes {
            (render_node(node))
        }
    }
}

/// Relative URIs and http, https and mailto links. Anything else (e.g.
/// `javascript:`) renders as plain text.
fn is_safe_uri(uri: &str) -> bool {
    // Browsers ignore whitespace and control characters inside a scheme
    let compact: String = uri
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    let scheme_end = compact.find(|c| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(i) if compact[i..].starts_with(':') => {
            let scheme = compact[..i].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto")
        }
        _ => true,
    }
}

/// Placeholder for references this site cannot render.
fn reference_placeholder(node_type: &str, target: &str) -> Markup {
    html! {
        span { "type: " (node_type) " id: " (target) }
    }
}

fn render_node(node: &Node) -> Markup {
    match node {
        Node::Paragraph(c) => html! { p { (render_nodes(c)) } },
        Node::Heading(level, c) => {
            let inner = render_nodes(c);
            match level {
                1 => html! { h1 { (inner) } },
                2 => html! { h2 { (inner) } },
                3 => html! { h3 { (inner) } },
                4 => html! { h4 { (inner) } },
                5 => html! { h5 { (inner) } },
                _ => html! { h6 { (inner) } },
            }
        }
        Node::UnorderedList(c) => html! { ul { (render_nodes(c)) } },
        Node::OrderedList(c) => html! { ol { (render_nodes(c)) } },
        Node::ListItem(c) => html! { li { (render_nodes(c)) } },
        Node::Quote(c) => html! { blockquote { (render_nodes(c)) } },
        Node::Rule => html! { hr; },
        Node::Table(c) => html! { table { tbody { (render_nodes(c)) } } },
        Node::TableRow(c) => html! { tr { (render_nodes(c)) } },
        Node::TableCell(c) => html! { td { (render_nodes(c)) } },
        Node::TableHeaderCell(c) => html! { th { (render_nodes(c)) } },
        Node::Hyperlink { uri, content } if is_safe_uri(uri) => {
            html! { a href=(uri) { (render_nodes(content)) } }
        }
        Node::Hyperlink { content, .. } => render_nodes(content),
        Node::EntryReference { kind, target, .. } => {
            let placeholder = reference_placeholder(kind.node_type(), target);
            match kind {
                EntryReferenceKind::EmbeddedBlock => html! { div { (placeholder) } },
                _ => placeholder,
            }
        }
        Node::AssetHyperlink { target, .. } => reference_placeholder("asset-hyperlink", target),
        Node::EmbeddedAsset { target, asset } => match asset {
            Some(asset) => html! {
                figure.embedded-asset {
                    img src=(asset.image_src()) width=(asset.width) height=(asset.height)
                        alt=(asset.title.as_deref().unwrap_or_default()) loading="lazy";
                }
            },
            None => reference_placeholder("embedded-asset-block", target),
        },
        Node::Text { value, marks } => render_marks(render_text(value), marks),
        Node::Unknown { content, .. } => render_nodes(content),
    }
}

/// Text with line breaks preserved as `<br>`.
fn render_text(value: &str) -> Markup {
    html! {
        @for (i, line) in value.split('\n').enumerate() {
            @if i > 0 { br; }
            (line)
        }
    }
}

/// Wrap text in its marks; the first mark is innermost.
fn render_marks(text: Markup, marks: &[Mark]) -> Markup {
    marks.iter().fold(text, |inner, mark| match mark {
        Mark::Bold => html! { b { (inner) } },
        Mark::Italic => html! { i { (inner) } },
        Mark::Underline => html! { u { (inner) } },
        Mark::Code => html! { code { (inner) } },
        Mark::Superscript => html! { sup { (inner) } },
        Mark::Subscript => html! { sub { (inner) } },
        Mark::Strikethrough => html! { s { (inner) } },
    })
}
