/*!
The XML and HTML bridge.

Ingestion reads XML (and, leniently, HTML) through `quick-xml` events into the arena
document, preserving entity references as nodes so that round-trips keep them. Emission
walks the tree and writes XML or HTML text directly: text is entity-escaped, comments
go through the `--` escape, CDATA comes back out as escaped text, and HTML output knows
about void elements and the `<!DOCTYPE html>` head.
*/

use crate::dom::{AttrPart, Document, NodeId, NodeKind, QName};
use crate::printer::OutputSettings;
use crate::quoting::escape_comment;
use crate::syntax::*;

#[cfg(feature = "quick_parser")]
use crate::detect::ContentType;
#[cfg(feature = "quick_parser")]
use crate::dom::{decode_numeric_entity, Attribute};
#[cfg(feature = "quick_parser")]
use crate::error::{Error, Result};
#[cfg(feature = "quick_parser")]
use crate::parser::{ParseOptions, TrimMode};
#[cfg(feature = "quick_parser")]
use crate::quoting::{heuristic_trim, unescape_comment};
#[cfg(feature = "quick_parser")]
use quick_xml::events::Event;
#[cfg(feature = "quick_parser")]
use quick_xml::Reader;

// ------------------------------------------------------------------------------------------------
// Ingestion
// ------------------------------------------------------------------------------------------------

#[cfg(feature = "quick_parser")]
impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        error!("quick_xml::Error: {:?}", err);
        Error::XmlReader(err.to_string())
    }
}

///
/// Parse an XML or HTML buffer into a document. HTML parsing tolerates unmatched end
/// tags; everything else is the same pipeline.
///
#[cfg(feature = "quick_parser")]
pub(crate) fn parse_xml_document(
    src: &str,
    options: &ParseOptions,
    content_type: ContentType,
) -> Result<Document> {
    let mut reader = Reader::from_str(src);
    let lenient = content_type == ContentType::Html;
    if lenient {
        reader.check_end_names(false);
    }

    let mut doc = Document::new();
    doc.set_source_type(content_type);
    let root = doc.root();
    let mut stack: Vec<NodeId> = vec![root];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let parent = *stack.last().expect("stack holds the root");
                let element = start_element(&mut doc, parent, &e, options)?;
                if lenient && is_html_void_element(doc.element_name(element)) {
                    continue;
                }
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let parent = *stack.last().expect("stack holds the root");
                let _ = start_element(&mut doc, parent, &e, options)?;
            }
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    let _ = stack.pop();
                }
            }
            Ok(Event::Text(e)) => {
                let parent = *stack.last().expect("stack holds the root");
                let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                append_xml_text(&mut doc, parent, &raw, options)?;
            }
            Ok(Event::CData(e)) => {
                let parent = *stack.last().expect("stack holds the root");
                let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                let _ = doc.append_cdata(parent, &raw);
            }
            Ok(Event::Comment(e)) => {
                let parent = *stack.last().expect("stack holds the root");
                let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                let content = unescape_comment(&normalize_end_of_lines(&raw));
                let _ = doc.append_comment(parent, &content);
            }
            Ok(Event::PI(e)) => {
                let parent = *stack.last().expect("stack holds the root");
                let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                let (target, content) = match raw.find(|c: char| c.is_whitespace()) {
                    Some(idx) => (raw[..idx].to_owned(), raw[idx..].to_owned()),
                    None => (raw.clone(), String::new()),
                };
                let data = content.trim();
                let data = if data.is_empty() { None } else { Some(data) };
                let _ = doc.append_processing_instruction(parent, &target, data);
            }
            Ok(Event::DocType(e)) => {
                let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                let _ = doc.append_doctype(root, raw.trim());
            }
            Ok(Event::Decl(_)) => {}
            Ok(Event::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    if options.effective_trim(content_type) == TrimMode::Heuristic {
        trim_whitespace(&mut doc);
    }
    Ok(doc)
}

#[cfg(feature = "quick_parser")]
fn start_element(
    doc: &mut Document,
    parent: NodeId,
    e: &quick_xml::events::BytesStart<'_>,
    options: &ParseOptions,
) -> Result<NodeId> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let element = doc.append_element(parent, QName::parse(&name));

    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|err| Error::XmlReader(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let key = key.as_str();
        let raw_value = String::from_utf8_lossy(&attr.value).into_owned();
        let raw_value = raw_value.as_str();

        if key == XMLNS_ATTRIBUTE {
            let uri = flatten_attr_parts(&parse_attr_value(raw_value, options)?);
            doc.declare_namespace(element, None, &uri);
        } else if let Some(prefix) = key.strip_prefix(XMLNS_ATTRIBUTE_PREFIX) {
            let uri = flatten_attr_parts(&parse_attr_value(raw_value, options)?);
            doc.declare_namespace(element, Some(prefix), &uri);
        } else {
            let value = parse_attr_value(raw_value, options)?;
            doc.add_attribute(
                element,
                Attribute {
                    name: QName::parse(key),
                    value: Some(value),
                },
            );
        }
    }
    Ok(element)
}

///
/// Split raw character data on entity references, decoding the predefined and numeric
/// ones and keeping other named references as nodes.
///
#[cfg(feature = "quick_parser")]
fn append_xml_text(
    doc: &mut Document,
    parent: NodeId,
    raw: &str,
    options: &ParseOptions,
) -> Result<()> {
    let normalized = normalize_end_of_lines(raw);
    for piece in split_entities(&normalized) {
        match piece {
            EntityPiece::Text(text) => {
                if options.merge_text {
                    let _ = doc.append_text_merged(parent, text);
                } else {
                    let _ = doc.append_text(parent, text);
                }
            }
            EntityPiece::Entity(name) => match predefined_entity(name) {
                Some(c) => {
                    let s = c.to_string();
                    if options.merge_text {
                        let _ = doc.append_text_merged(parent, &s);
                    } else {
                        let _ = doc.append_text(parent, &s);
                    }
                }
                None => match decode_numeric_entity(name)? {
                    Some(c) if options.merge_text => {
                        let _ = doc.append_text_merged(parent, &c.to_string());
                    }
                    _ => {
                        let _ = doc.append_entity_ref(parent, name);
                    }
                },
            },
        }
    }
    Ok(())
}

#[cfg(feature = "quick_parser")]
fn parse_attr_value(raw: &str, options: &ParseOptions) -> Result<Vec<AttrPart>> {
    // XML attribute-value normalization maps literal whitespace to plain spaces.
    let normalized: String = normalize_end_of_lines(raw)
        .chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect();
    let mut parts: Vec<AttrPart> = Vec::new();
    for piece in split_entities(&normalized) {
        let push_text = |parts: &mut Vec<AttrPart>, text: &str| {
            if let Some(AttrPart::Text(existing)) = parts.last_mut() {
                existing.push_str(text);
            } else {
                parts.push(AttrPart::Text(text.to_string()));
            }
        };
        match piece {
            EntityPiece::Text(text) => push_text(&mut parts, text),
            EntityPiece::Entity(name) => match predefined_entity(name) {
                Some(c) => push_text(&mut parts, &c.to_string()),
                None => match decode_numeric_entity(name)? {
                    Some(c) if options.merge_text => push_text(&mut parts, &c.to_string()),
                    _ => parts.push(AttrPart::EntityRef(name.to_string())),
                },
            },
        }
    }
    Ok(parts)
}

#[cfg(feature = "quick_parser")]
fn flatten_attr_parts(parts: &[AttrPart]) -> String {
    Attribute {
        name: QName::local(XMLNS_ATTRIBUTE),
        value: Some(parts.to_vec()),
    }
    .value_string()
    .unwrap_or_default()
}

#[cfg(feature = "quick_parser")]
enum EntityPiece<'a> {
    Text(&'a str),
    Entity(&'a str),
}

///
/// Split `&name;` and `&#...;` references out of character data. An ampersand that
/// does not form a reference stays in the text.
///
#[cfg(feature = "quick_parser")]
fn split_entities(raw: &str) -> Vec<EntityPiece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = raw;
    while let Some(amp) = rest.find(XMQ_AMP_CHAR) {
        let after = &rest[amp + 1..];
        let name_len = after
            .char_indices()
            .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '#')
            .count();
        if name_len > 0 && after[name_len..].starts_with(';') {
            if amp > 0 {
                pieces.push(EntityPiece::Text(&rest[..amp]));
            }
            pieces.push(EntityPiece::Entity(&after[..name_len]));
            rest = &after[name_len + 1..];
        } else {
            pieces.push(EntityPiece::Text(&rest[..amp + 1]));
            rest = after;
        }
    }
    if !rest.is_empty() {
        pieces.push(EntityPiece::Text(rest));
    }
    pieces
}

#[cfg(feature = "quick_parser")]
fn predefined_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

///
/// The end-of-line normalization of XML 1.1 §2.11: carriage returns, NEL and the
/// Unicode line separator all become a single newline.
///
#[cfg(feature = "quick_parser")]
pub(crate) fn normalize_end_of_lines(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let line_ends = regex::Regex::new(r"\u{0D}\u{0A}?|\u{85}|\u{2028}").unwrap();
    line_ends.replace_all(value, "\u{0A}").to_string()
}

///
/// The heuristic ingestion trim: all-whitespace text vanishes, the rest loses
/// incidental indentation. Comments are trimmed the same way.
///
#[cfg(feature = "quick_parser")]
pub(crate) fn trim_whitespace(doc: &mut Document) {
    let mut work = vec![doc.root()];
    let mut drop_list = Vec::new();
    while let Some(node) = work.pop() {
        work.extend(doc.children(node).iter().copied());
        match doc.kind(node) {
            NodeKind::Text(text) => {
                let trimmed = heuristic_trim(text);
                if trimmed.is_empty() {
                    drop_list.push(node);
                } else {
                    *doc.kind_mut(node) = NodeKind::Text(trimmed);
                }
            }
            NodeKind::Comment(text) => {
                let trimmed = heuristic_trim(text);
                *doc.kind_mut(node) = NodeKind::Comment(trimmed);
            }
            _ => {}
        }
    }
    for node in drop_list {
        doc.detach(node);
    }
}

// ------------------------------------------------------------------------------------------------
// Emission
// ------------------------------------------------------------------------------------------------

const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

fn is_html_void_element(name: Option<&QName>) -> bool {
    match name {
        Some(name) => {
            name.prefix.is_none() && HTML_VOID_ELEMENTS.contains(&name.local.to_lowercase().as_str())
        }
        None => false,
    }
}

impl Document {
    ///
    /// Serialize this document as XML. The `<?xml ...?>` declaration is included
    /// unless the settings omit it; output ends with a newline.
    ///
    pub fn to_xml(&self, settings: &OutputSettings) -> String {
        let mut out = String::new();
        if !settings.omit_decl {
            out.push_str(XML_DECLARATION);
            out.push('\n');
        }
        for child in self.children(self.root()) {
            self.write_xml_node(&mut out, *child, false);
        }
        out.push('\n');
        out
    }

    ///
    /// Serialize this document as HTML: a `<!DOCTYPE html>` head, void elements
    /// without end tags, standalone attributes without values.
    ///
    pub fn to_html(&self, _settings: &OutputSettings) -> String {
        let mut out = String::new();
        let has_doctype = self
            .children(self.root())
            .iter()
            .any(|id| matches!(self.kind(*id), NodeKind::DocType(_)));
        if !has_doctype {
            out.push_str(HTML_DOCTYPE);
            out.push('\n');
        }
        for child in self.children(self.root()) {
            self.write_xml_node(&mut out, *child, true);
        }
        out.push('\n');
        out
    }

    fn write_xml_node(&self, out: &mut String, node: NodeId, html: bool) {
        match self.kind(node) {
            NodeKind::Root => {}
            NodeKind::Element { name, .. } => {
                out.push('<');
                write_qname(out, name);
                for decl in self.namespaces(node) {
                    out.push(' ');
                    out.push_str(XMLNS_ATTRIBUTE);
                    if let Some(prefix) = &decl.prefix {
                        out.push(':');
                        out.push_str(prefix);
                    }
                    out.push_str("=\"");
                    escape_xml_into(out, &decl.uri, true);
                    out.push('"');
                }
                for attribute in self.attributes(node) {
                    out.push(' ');
                    write_qname(out, &attribute.name);
                    match &attribute.value {
                        None if html => {}
                        None => out.push_str("=\"\""),
                        Some(parts) => {
                            out.push_str("=\"");
                            for part in parts {
                                match part {
                                    AttrPart::Text(text) => escape_xml_into(out, text, true),
                                    AttrPart::EntityRef(entity) => {
                                        out.push('&');
                                        out.push_str(entity);
                                        out.push(';');
                                    }
                                }
                            }
                            out.push('"');
                        }
                    }
                }
                let children = self.children(node);
                if children.is_empty() {
                    if html {
                        out.push('>');
                        if !is_html_void_element(Some(name)) {
                            out.push_str("</");
                            write_qname(out, name);
                            out.push('>');
                        }
                    } else {
                        out.push_str("/>");
                    }
                } else {
                    out.push('>');
                    for child in children {
                        self.write_xml_node(out, *child, html);
                    }
                    out.push_str("</");
                    write_qname(out, name);
                    out.push('>');
                }
            }
            NodeKind::Text(text) => escape_xml_into(out, text, false),
            NodeKind::CData(text) => escape_xml_into(out, text, false),
            NodeKind::Comment(text) => {
                out.push_str(XML_COMMENT_START);
                out.push_str(&escape_comment(text));
                out.push_str(XML_COMMENT_END);
            }
            NodeKind::EntityRef(name) => {
                out.push('&');
                out.push_str(name);
                out.push(';');
            }
            NodeKind::ProcessingInstruction { target, data } => {
                out.push_str("<?");
                out.push_str(target);
                if let Some(data) = data {
                    out.push(' ');
                    out.push_str(data);
                }
                out.push_str("?>");
            }
            NodeKind::DocType(content) => {
                out.push_str(XML_DOCTYPE_START);
                out.push(' ');
                out.push_str(content);
                out.push('>');
            }
        }
    }
}

fn write_qname(out: &mut String, name: &QName) {
    if let Some(prefix) = &name.prefix {
        out.push_str(prefix);
        out.push(':');
    }
    out.push_str(&name.local);
}

fn escape_xml_into(out: &mut String, text: &str, in_attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\n' if in_attribute => out.push_str("&#10;"),
            _ => out.push(c),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_xmq_document, ParseOptions};

    fn xml_of(xmq: &str) -> String {
        let doc = parse_xmq_document(xmq, &ParseOptions::default()).unwrap();
        let settings = OutputSettings {
            omit_decl: true,
            ..Default::default()
        };
        doc.to_xml(&settings).trim_end().to_string()
    }

    #[test]
    fn test_greeting_to_xml() {
        let doc = parse_xmq_document("greeting = 'hello world'\n", &ParseOptions::default())
            .unwrap();
        assert_eq!(
            doc.to_xml(&OutputSettings::default()),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<greeting>hello world</greeting>\n"
        );
    }

    #[test]
    fn test_attributes_to_xml() {
        assert_eq!(
            xml_of("config(mode=fast) { timeout = 30 }"),
            "<config mode=\"fast\"><timeout>30</timeout></config>"
        );
    }

    #[test]
    fn test_escaping_to_xml() {
        assert_eq!(xml_of("x = 'a < b & c'"), "<x>a &lt; b &amp; c</x>");
    }

    #[test]
    fn test_comment_dashes_escaped() {
        assert_eq!(
            xml_of("x { // a -- b\n }"),
            "<x><!--a -\u{2410}- b--></x>"
        );
    }

    #[test]
    fn test_entity_preserved_to_xml() {
        assert_eq!(xml_of("x { &nbsp; }"), "<x>&nbsp;</x>");
    }

    #[cfg(feature = "quick_parser")]
    mod ingest {
        use super::super::*;
        use crate::detect::ContentType;

        fn parse(xml: &str) -> Document {
            parse_xml_document(xml, &ParseOptions::default(), ContentType::Xml).unwrap()
        }

        #[test]
        fn test_simple_document() {
            let doc = parse("<greeting>hello world</greeting>");
            let greeting = doc.children(doc.root())[0];
            assert_eq!(doc.element_name(greeting).unwrap().local, "greeting");
            assert_eq!(
                doc.kind(doc.children(greeting)[0]),
                &NodeKind::Text("hello world".to_string())
            );
        }

        #[test]
        fn test_attributes_and_namespaces() {
            let doc = parse(
                "<x:r xmlns:x=\"urn:x\" a=\"1\" b=\"two &amp; three\"><c/></x:r>",
            );
            let r = doc.children(doc.root())[0];
            let name = doc.element_name(r).unwrap();
            assert_eq!(name.prefix.as_deref(), Some("x"));
            assert_eq!(doc.resolve_prefix(r, Some("x")), Some("urn:x"));
            let attrs = doc.attributes(r);
            assert_eq!(attrs.len(), 2);
            assert_eq!(attrs[1].value_string().unwrap(), "two & three");
        }

        #[test]
        fn test_entities_kept_as_nodes() {
            let doc = parse("<p>a&nbsp;b</p>");
            let p = doc.children(doc.root())[0];
            let children = doc.children(p);
            assert_eq!(children.len(), 3);
            assert_eq!(
                doc.kind(children[1]),
                &NodeKind::EntityRef("nbsp".to_string())
            );
        }

        #[test]
        fn test_numeric_entities_substituted() {
            let doc = parse("<p>a&#32;b</p>");
            let p = doc.children(doc.root())[0];
            assert_eq!(
                doc.kind(doc.children(p)[0]),
                &NodeKind::Text("a b".to_string())
            );
        }

        #[test]
        fn test_cdata() {
            let doc = parse("<s><![CDATA[h1 { color: red; }]]></s>");
            let s = doc.children(doc.root())[0];
            assert_eq!(
                doc.kind(doc.children(s)[0]),
                &NodeKind::CData("h1 { color: red; }".to_string())
            );
        }

        #[test]
        fn test_heuristic_trim() {
            let doc = parse("<x>\n    alfa\n    beta\n</x>");
            let x = doc.children(doc.root())[0];
            assert_eq!(
                doc.kind(doc.children(x)[0]),
                &NodeKind::Text("alfa\nbeta".to_string())
            );
        }

        #[test]
        fn test_trim_none_keeps_whitespace() {
            let options = ParseOptions {
                trim: TrimMode::None,
                ..Default::default()
            };
            let doc = parse_xml_document("<x> a </x>", &options, ContentType::Xml).unwrap();
            let x = doc.children(doc.root())[0];
            assert_eq!(doc.kind(doc.children(x)[0]), &NodeKind::Text(" a ".to_string()));
        }

        #[test]
        fn test_round_trip_through_xmq() {
            let xml = "<config mode=\"fast\"><timeout>30</timeout></config>";
            let doc = parse(xml);
            let xmq = doc.to_xmq(&OutputSettings::default());
            assert_eq!(xmq, "config(mode = fast)\n{\n    timeout = 30\n}\n");
        }
    }
}
