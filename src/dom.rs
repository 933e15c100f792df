/*!
The document tree.

A [`Document`] owns every node in an arena; a [`NodeId`] is an opaque handle into that
arena. Handles give O(1) parent/child navigation without reference counting or interior
mutability, and make it impossible to build a cyclic tree. Nodes are appended, never
silently reparented; dropping the document drops the whole tree.

# Example

```rust
use xmq::{Document, QName};

let mut document = Document::new();
let root = document.root();
let greeting = document.append_element(root, QName::local("greeting"));
document.append_text(greeting, "hello world");
assert_eq!(document.children(root).len(), 1);
```
*/

use std::fmt::{Display, Formatter};

use crate::detect::ContentType;
use crate::error::{Error, Result, Warning};
use crate::syntax::XMQ_NS_SEPARATOR;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

///
/// An opaque handle to a node inside a [`Document`] arena. Handles are only meaningful
/// for the document that produced them.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

///
/// A qualified name: an optional namespace prefix and a local name.
///
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QName {
    /// The namespace prefix, `xsl` in `xsl:template`.
    pub prefix: Option<String>,
    /// The local part of the name.
    pub local: String,
}

///
/// One fragment of an attribute value. Values are short lists of fragments so that
/// character entities survive inside attribute values.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrPart {
    /// Literal text.
    Text(String),
    /// An entity reference by name, `nbsp` or `#10`.
    EntityRef(String),
}

///
/// An attribute, owned by exactly one element. An attribute without a value prints as a
/// bare key in XMQ and HTML.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name, possibly prefixed.
    pub name: QName,
    /// The value fragments, or `None` for a standalone attribute.
    pub value: Option<Vec<AttrPart>>,
}

///
/// A namespace binding declared on an element, lexically scoped to its subtree.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NsDecl {
    /// The bound prefix, or `None` for the default namespace.
    pub prefix: Option<String>,
    /// The namespace URI; may be empty while the binding is provisional.
    pub uri: String,
}

///
/// The variants a node can take. Every node is exactly one of these.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The document's virtual root; owns the top-level forest.
    Root,
    /// A named element with attributes, namespace declarations and children.
    Element {
        /// The element name.
        name: QName,
        /// Attributes in source order.
        attributes: Vec<Attribute>,
        /// Namespace bindings declared on this element.
        namespaces: Vec<NsDecl>,
    },
    /// Character data.
    Text(String),
    /// A comment.
    Comment(String),
    /// An entity reference: `amp`, `#10`, `#x1F600`.
    EntityRef(String),
    /// A processing instruction.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI payload.
        data: Option<String>,
    },
    /// The `<!DOCTYPE ...>` head, stored as its payload string.
    DocType(String),
    /// A CDATA section; on output this is emitted as quoted text.
    CData(String),
}

///
/// A document: an arena of nodes under a virtual root, the detected content type of the
/// source it was parsed from, and any warnings collected while parsing.
///
#[derive(Clone, Debug)]
pub struct Document {
    pub(crate) i_nodes: Vec<NodeData>,
    pub(crate) i_source_type: ContentType,
    pub(crate) i_warnings: Vec<Warning>,
}

///
/// Internal container for node data; only handles escape this module.
///
#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub(crate) i_parent: Option<NodeId>,
    pub(crate) i_children: Vec<NodeId>,
    pub(crate) i_kind: NodeKind,
}

// ------------------------------------------------------------------------------------------------
// Implementations
// ------------------------------------------------------------------------------------------------

impl QName {
    /// A name with no prefix.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    /// A name with a prefix.
    pub fn prefixed(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }

    /// Split a `prefix:local` string.
    pub fn parse(name: &str) -> Self {
        match name.split_once(XMQ_NS_SEPARATOR) {
            Some((prefix, local)) if !prefix.is_empty() => Self::prefixed(prefix, local),
            _ => Self::local(name),
        }
    }
}

impl Display for QName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}{}{}", prefix, XMQ_NS_SEPARATOR, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

// ------------------------------------------------------------------------------------------------

impl Attribute {
    ///
    /// The value as a single string: numeric entity fragments are decoded to their
    /// character form, named entity fragments are kept in `&name;` form. A standalone
    /// attribute yields `None`.
    ///
    pub fn value_string(&self) -> Option<String> {
        self.value.as_ref().map(|parts| {
            let mut out = String::new();
            for part in parts {
                match part {
                    AttrPart::Text(text) => out.push_str(text),
                    AttrPart::EntityRef(name) => match decode_numeric_entity(name) {
                        Ok(Some(c)) => out.push(c),
                        _ => {
                            out.push('&');
                            out.push_str(name);
                            out.push(';');
                        }
                    },
                }
            }
            out
        })
    }
}

// ------------------------------------------------------------------------------------------------

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the virtual root.
    pub fn new() -> Self {
        Self {
            i_nodes: vec![NodeData {
                i_parent: None,
                i_children: Vec::new(),
                i_kind: NodeKind::Root,
            }],
            i_source_type: ContentType::Xmq,
            i_warnings: Vec::new(),
        }
    }

    /// The virtual root handle.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The content type the source buffer was detected as.
    pub fn source_type(&self) -> ContentType {
        self.i_source_type
    }

    pub(crate) fn set_source_type(&mut self, content_type: ContentType) {
        self.i_source_type = content_type;
    }

    /// Warnings collected while the document was parsed.
    pub fn warnings(&self) -> &[Warning] {
        &self.i_warnings
    }

    pub(crate) fn push_warning(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.i_warnings.push(warning);
    }

    // --------------------------------------------------------------------------------------------

    /// The kind of a node.
    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.i_nodes[node.0].i_kind
    }

    /// Mutable access to the kind of a node.
    pub fn kind_mut(&mut self, node: NodeId) -> &mut NodeKind {
        &mut self.i_nodes[node.0].i_kind
    }

    /// The parent of a node; only the virtual root has none.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.i_nodes[node.0].i_parent
    }

    /// The ordered children of a node.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.i_nodes[node.0].i_children
    }

    /// The last child of a node.
    pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.i_nodes[node.0].i_children.last().copied()
    }

    /// The first child of a node.
    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.i_nodes[node.0].i_children.first().copied()
    }

    // --------------------------------------------------------------------------------------------

    /// Append a node of the given kind under `parent` and return its handle.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.i_nodes.len());
        self.i_nodes.push(NodeData {
            i_parent: Some(parent),
            i_children: Vec::new(),
            i_kind: kind,
        });
        self.i_nodes[parent.0].i_children.push(id);
        id
    }

    /// Append an element.
    pub fn append_element(&mut self, parent: NodeId, name: QName) -> NodeId {
        self.append(
            parent,
            NodeKind::Element {
                name,
                attributes: Vec::new(),
                namespaces: Vec::new(),
            },
        )
    }

    /// Append a text node.
    pub fn append_text(&mut self, parent: NodeId, data: &str) -> NodeId {
        self.append(parent, NodeKind::Text(data.to_string()))
    }

    ///
    /// Append text, merging into the previous sibling when that sibling is also text.
    /// Returns the node that now holds the data.
    ///
    pub fn append_text_merged(&mut self, parent: NodeId, data: &str) -> NodeId {
        if let Some(last) = self.last_child(parent) {
            if let NodeKind::Text(existing) = &mut self.i_nodes[last.0].i_kind {
                existing.push_str(data);
                return last;
            }
        }
        self.append_text(parent, data)
    }

    /// Append a comment.
    pub fn append_comment(&mut self, parent: NodeId, data: &str) -> NodeId {
        self.append(parent, NodeKind::Comment(data.to_string()))
    }

    /// Append an entity reference by name, without the `&` and `;`.
    pub fn append_entity_ref(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.append(parent, NodeKind::EntityRef(name.to_string()))
    }

    /// Append a processing instruction.
    pub fn append_processing_instruction(
        &mut self,
        parent: NodeId,
        target: &str,
        data: Option<&str>,
    ) -> NodeId {
        self.append(
            parent,
            NodeKind::ProcessingInstruction {
                target: target.to_string(),
                data: data.map(String::from),
            },
        )
    }

    /// Append a document type declaration.
    pub fn append_doctype(&mut self, parent: NodeId, data: &str) -> NodeId {
        self.append(parent, NodeKind::DocType(data.to_string()))
    }

    /// Append a CDATA section.
    pub fn append_cdata(&mut self, parent: NodeId, data: &str) -> NodeId {
        self.append(parent, NodeKind::CData(data.to_string()))
    }

    ///
    /// Detach a node from its parent. The node data stays in the arena but is no longer
    /// reachable from the root.
    ///
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.i_nodes[node.0].i_parent.take() {
            self.i_nodes[parent.0].i_children.retain(|child| *child != node);
        }
    }

    // --------------------------------------------------------------------------------------------

    /// The name of an element node.
    pub fn element_name(&self, node: NodeId) -> Option<&QName> {
        match self.kind(node) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The attributes of an element node.
    pub fn attributes(&self, node: NodeId) -> &[Attribute] {
        match self.kind(node) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Find an attribute by its unprefixed key.
    pub fn attribute(&self, node: NodeId, key: &str) -> Option<&Attribute> {
        self.attributes(node)
            .iter()
            .find(|a| a.name.prefix.is_none() && a.name.local == key)
    }

    /// Add an attribute to an element node.
    pub fn add_attribute(&mut self, node: NodeId, attribute: Attribute) {
        if let NodeKind::Element { attributes, .. } = self.kind_mut(node) {
            attributes.push(attribute);
        }
    }

    /// The namespace declarations of an element node.
    pub fn namespaces(&self, node: NodeId) -> &[NsDecl] {
        match self.kind(node) {
            NodeKind::Element { namespaces, .. } => namespaces,
            _ => &[],
        }
    }

    /// Declare a namespace binding on an element node, completing a provisional one.
    pub fn declare_namespace(&mut self, node: NodeId, prefix: Option<&str>, uri: &str) {
        if let NodeKind::Element { namespaces, .. } = self.kind_mut(node) {
            if let Some(existing) = namespaces
                .iter_mut()
                .find(|decl| decl.prefix.as_deref() == prefix)
            {
                existing.uri = uri.to_string();
            } else {
                namespaces.push(NsDecl {
                    prefix: prefix.map(String::from),
                    uri: uri.to_string(),
                });
            }
        }
    }

    ///
    /// Resolve a namespace prefix from `node` by walking to the nearest ancestor that
    /// declares it. `None` as prefix resolves the default namespace.
    ///
    pub fn resolve_prefix(&self, node: NodeId, prefix: Option<&str>) -> Option<&str> {
        let mut current = Some(node);
        while let Some(id) = current {
            for decl in self.namespaces(id) {
                if decl.prefix.as_deref() == prefix && !decl.uri.is_empty() {
                    return Some(&decl.uri);
                }
            }
            current = self.parent(id);
        }
        None
    }

    // --------------------------------------------------------------------------------------------

    ///
    /// Structural equality: same shape, names, attributes, namespace declarations and
    /// character data under the root. Warnings and source type are not compared.
    ///
    pub fn structural_eq(&self, other: &Document) -> bool {
        self.subtree_eq(self.root(), other, other.root())
    }

    fn subtree_eq(&self, node: NodeId, other: &Document, other_node: NodeId) -> bool {
        if self.kind(node) != other.kind(other_node) {
            return false;
        }
        let ours = self.children(node);
        let theirs = other.children(other_node);
        ours.len() == theirs.len()
            && ours
                .iter()
                .zip(theirs.iter())
                .all(|(a, b)| self.subtree_eq(*a, other, *b))
    }
}

// ------------------------------------------------------------------------------------------------
// Public Functions
// ------------------------------------------------------------------------------------------------

///
/// Decode a numeric entity name (`#10` or `#x1F600`) to its character. Named entities
/// yield `None`. A reference outside `0..=0x10FFFF` or inside the surrogate range is an
/// error.
///
pub fn decode_numeric_entity(name: &str) -> Result<Option<char>> {
    let Some(number) = name.strip_prefix('#') else {
        return Ok(None);
    };
    let value = if let Some(hex) = number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
        u32::from_str_radix(hex, 16)
    } else {
        number.parse::<u32>()
    }
    .map_err(|_| Error::BadCharacterReference(name.to_string()))?;
    match char::from_u32(value) {
        Some(c) => Ok(Some(c)),
        None => Err(Error::BadCharacterReference(name.to_string())),
    }
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_navigate() {
        let mut document = Document::new();
        let root = document.root();
        let config = document.append_element(root, QName::local("config"));
        let timeout = document.append_element(config, QName::local("timeout"));
        document.append_text(timeout, "30");

        assert_eq!(document.children(root), &[config]);
        assert_eq!(document.parent(timeout), Some(config));
        assert_eq!(document.element_name(config).unwrap().local, "config");
        assert_eq!(
            document.kind(document.first_child(timeout).unwrap()),
            &NodeKind::Text("30".to_string())
        );
    }

    #[test]
    fn test_text_merging() {
        let mut document = Document::new();
        let root = document.root();
        let element = document.append_element(root, QName::local("x"));
        let first = document.append_text_merged(element, "alfa ");
        let second = document.append_text_merged(element, "beta");
        assert_eq!(first, second);
        assert_eq!(
            document.kind(first),
            &NodeKind::Text("alfa beta".to_string())
        );
    }

    #[test]
    fn test_namespace_resolution() {
        let mut document = Document::new();
        let root = document.root();
        let outer = document.append_element(root, QName::local("outer"));
        document.declare_namespace(outer, Some("dc"), "http://purl.org/dc/elements/1.1/");
        let inner = document.append_element(outer, QName::prefixed("dc", "title"));
        assert_eq!(
            document.resolve_prefix(inner, Some("dc")),
            Some("http://purl.org/dc/elements/1.1/")
        );
        assert_eq!(document.resolve_prefix(inner, Some("xsl")), None);
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_numeric_entity("#10").unwrap(), Some('\n'));
        assert_eq!(decode_numeric_entity("#x1F600").unwrap(), Some('😀'));
        assert_eq!(decode_numeric_entity("nbsp").unwrap(), None);
        assert!(decode_numeric_entity("#xD800").is_err());
        assert!(decode_numeric_entity("#1114112").is_err());
    }

    #[test]
    fn test_structural_equality() {
        let mut a = Document::new();
        let root = a.root();
        let x = a.append_element(root, QName::local("x"));
        a.append_text(x, "1");
        let mut b = a.clone();
        assert!(a.structural_eq(&b));
        let x_in_b = b.first_child(b.root()).unwrap();
        b.append_text(x_in_b, "2");
        assert!(!a.structural_eq(&b));
    }
}
