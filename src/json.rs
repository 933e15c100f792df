/*!
The JSON bridge.

JSON maps onto the element tree with two marker attributes: `A` tags an element whose
children form a JSON array, `S` tags a value that must stay a string even though it
looks like a number or keyword. Anonymous values become elements named `_`, and an
object key that is not a valid XMQ name moves into an `_` attribute on such an element.
Object member order is preserved in both directions.
*/

use crate::detect::ContentType;
use crate::dom::{decode_numeric_entity, Attribute, Document, NodeId, NodeKind, QName};
use crate::error::{Error, Result};
use crate::parser::ParseOptions;
use crate::printer::OutputSettings;
use crate::syntax::*;

// ------------------------------------------------------------------------------------------------
// Ingestion
// ------------------------------------------------------------------------------------------------

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        error!("serde_json::Error: {}", err);
        Error::JsonReader(err.to_string())
    }
}

///
/// Parse a JSON buffer into a document. A top-level object contributes its members
/// directly as the document forest, matching the object braces that are implicit at
/// the top of an XMQ file.
///
pub(crate) fn parse_json_document(src: &str, _options: &ParseOptions) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_str(src)?;
    let mut doc = Document::new();
    doc.set_source_type(ContentType::Json);
    let root = doc.root();

    match &value {
        serde_json::Value::Object(members) => {
            for (key, member) in members {
                build_value(&mut doc, root, Some(key), member);
            }
        }
        other => build_value(&mut doc, root, None, other),
    }
    Ok(doc)
}

fn element_for_key(doc: &mut Document, parent: NodeId, key: Option<&str>) -> NodeId {
    match key {
        Some(key) if !key.is_empty() && is_xmq_name(key) => {
            doc.append_element(parent, QName::parse(key))
        }
        Some(key) if !key.is_empty() => {
            // The key cannot be an element name; park it in a `_` attribute.
            let element = doc.append_element(parent, QName::local(JSON_ANONYMOUS_NAME));
            doc.add_attribute(
                element,
                Attribute {
                    name: QName::local(JSON_KEY_ATTRIBUTE),
                    value: Some(vec![crate::dom::AttrPart::Text(key.to_string())]),
                },
            );
            element
        }
        _ => doc.append_element(parent, QName::local(JSON_ANONYMOUS_NAME)),
    }
}

fn add_marker(doc: &mut Document, element: NodeId, marker: &str) {
    doc.add_attribute(
        element,
        Attribute {
            name: QName::local(marker),
            value: None,
        },
    );
}

fn build_value(doc: &mut Document, parent: NodeId, key: Option<&str>, value: &serde_json::Value) {
    let element = element_for_key(doc, parent, key);
    match value {
        serde_json::Value::Object(members) => {
            for (key, member) in members {
                build_value(doc, element, Some(key), member);
            }
        }
        serde_json::Value::Array(items) => {
            add_marker(doc, element, JSON_ARRAY_MARKER);
            for item in items {
                build_value(doc, element, None, item);
            }
        }
        serde_json::Value::String(s) => {
            // A string that reads back as a number or keyword keeps a marker so the
            // round trip stays a string.
            if !s.is_empty() && (is_json_number(s) || is_json_keyword(s)) {
                add_marker(doc, element, JSON_STRING_MARKER);
            }
            let _ = doc.append_text(element, s);
        }
        serde_json::Value::Number(n) => {
            let _ = doc.append_text(element, &n.to_string());
        }
        serde_json::Value::Bool(b) => {
            let _ = doc.append_text(element, if *b { "true" } else { "false" });
        }
        serde_json::Value::Null => {
            let _ = doc.append_text(element, "null");
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Emission
// ------------------------------------------------------------------------------------------------

impl Document {
    ///
    /// Serialize this document as JSON. Elements carrying the `A` marker become
    /// arrays, the `S` marker forces string values, `_` element names vanish.
    /// Comments and processing instructions have no JSON form and are dropped.
    ///
    pub fn to_json(&self, _settings: &OutputSettings) -> String {
        let elements: Vec<NodeId> = self
            .children(self.root())
            .iter()
            .copied()
            .filter(|id| matches!(self.kind(*id), NodeKind::Element { .. }))
            .collect();

        let mut out = String::new();
        match elements.as_slice() {
            [single]
                if self
                    .element_name(*single)
                    .map(|n| n.prefix.is_none() && n.local == JSON_ANONYMOUS_NAME)
                    .unwrap_or(false) =>
            {
                self.write_json_value(&mut out, *single);
            }
            members => {
                out.push('{');
                let mut first = true;
                for member in members {
                    if !first {
                        out.push(',');
                    }
                    self.write_json_member(&mut out, *member);
                    first = false;
                }
                out.push('}');
            }
        }
        out
    }

    fn json_key_of(&self, node: NodeId) -> String {
        if let Some(attr) = self.attribute(node, JSON_KEY_ATTRIBUTE) {
            if let Some(original) = attr.value_string() {
                return original;
            }
        }
        match self.element_name(node) {
            Some(name) => name.to_string(),
            None => JSON_ANONYMOUS_NAME.to_string(),
        }
    }

    fn write_json_member(&self, out: &mut String, node: NodeId) {
        write_json_string(out, &self.json_key_of(node));
        out.push(':');
        self.write_json_value(out, node);
    }

    fn write_json_value(&self, out: &mut String, node: NodeId) {
        let has_array_marker = self.attribute(node, JSON_ARRAY_MARKER).is_some();
        let force_string = self.attribute(node, JSON_STRING_MARKER).is_some();

        if has_array_marker {
            out.push('[');
            let mut first = true;
            for child in self.children(node) {
                if !matches!(self.kind(*child), NodeKind::Element { .. }) {
                    continue;
                }
                if !first {
                    out.push(',');
                }
                self.write_json_value(out, *child);
                first = false;
            }
            out.push(']');
            return;
        }

        let extra_attrs: Vec<&Attribute> = self
            .attributes(node)
            .iter()
            .filter(|a| {
                a.name.prefix.is_some()
                    || !matches!(
                        a.name.local.as_str(),
                        JSON_ARRAY_MARKER | JSON_STRING_MARKER | JSON_KEY_ATTRIBUTE
                    )
            })
            .collect();

        let element_children: Vec<NodeId> = self
            .children(node)
            .iter()
            .copied()
            .filter(|id| matches!(self.kind(*id), NodeKind::Element { .. }))
            .collect();

        if !element_children.is_empty() || !extra_attrs.is_empty() {
            out.push('{');
            let mut first = true;
            for attr in &extra_attrs {
                if !first {
                    out.push(',');
                }
                write_json_string(out, &format!("_{}", attr.name));
                out.push(':');
                match attr.value_string() {
                    Some(value) => write_json_string(out, &value),
                    None => out.push_str("null"),
                }
                first = false;
            }
            for child in element_children {
                if !first {
                    out.push(',');
                }
                self.write_json_member(out, child);
                first = false;
            }
            out.push('}');
            return;
        }

        match self.json_content_of(node) {
            None => out.push_str("{}"),
            Some(content) => {
                if !force_string && (is_json_number(&content) || is_json_keyword(&content)) {
                    out.push_str(&content);
                } else {
                    write_json_string(out, &content);
                }
            }
        }
    }

    ///
    /// The scalar content of an element: its text, CDATA and entity children joined.
    /// `None` when the element has no content children at all.
    ///
    fn json_content_of(&self, node: NodeId) -> Option<String> {
        let mut content = String::new();
        let mut found = false;
        for child in self.children(node) {
            match self.kind(*child) {
                NodeKind::Text(text) | NodeKind::CData(text) => {
                    content.push_str(text);
                    found = true;
                }
                NodeKind::EntityRef(name) => {
                    match decode_numeric_entity(name) {
                        Ok(Some(c)) => content.push(c),
                        _ => {
                            content.push('&');
                            content.push_str(name);
                            content.push(';');
                        }
                    }
                    found = true;
                }
                _ => {}
            }
        }
        if found {
            Some(content)
        } else {
            None
        }
    }
}

///
/// Write a JSON string literal. Characters outside the basic multilingual plane are
/// escaped as UTF-16 surrogate pairs; everything printable stays as UTF-8.
///
fn write_json_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c if (c as u32) > 0xFFFF => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

// ------------------------------------------------------------------------------------------------
// JSON Lexical Checks
// ------------------------------------------------------------------------------------------------

///
/// Is the whole string a JSON number per RFC 8259?
///
pub(crate) fn is_json_number(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    let mut i = 0;
    if bytes[i] == b'-' {
        i += 1;
    }
    // Integer part: a single zero, or a nonzero digit run.
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(c) if c.is_ascii_digit() => {
            while matches!(bytes.get(i), Some(c) if c.is_ascii_digit()) {
                i += 1;
            }
        }
        _ => return false,
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        if !matches!(bytes.get(i), Some(c) if c.is_ascii_digit()) {
            return false;
        }
        while matches!(bytes.get(i), Some(c) if c.is_ascii_digit()) {
            i += 1;
        }
    }
    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        if !matches!(bytes.get(i), Some(c) if c.is_ascii_digit()) {
            return false;
        }
        while matches!(bytes.get(i), Some(c) if c.is_ascii_digit()) {
            i += 1;
        }
    }
    i == bytes.len()
}

pub(crate) fn is_json_keyword(s: &str) -> bool {
    matches!(s, "true" | "false" | "null")
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------
