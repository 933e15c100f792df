/*!
An implementation of the [XMQ](https://libxmq.org/) notation: a human-friendly textual
syntax that losslessly represents the data model shared by XML, HTML and JSON.

The crate parses XMQ source into a document tree, serializes trees back to XMQ, bridges
to and from XML, HTML and JSON, and renders coloured XMQ source for terminals, HTML
viewers and TeX. Everything operates on in-memory buffers; file handling and command
line concerns belong to callers.

# Example

```rust
use xmq::{parse, OutputSettings, ParseOptions};

let doc = parse("greeting = 'hello world'\n", &ParseOptions::default()).unwrap();
assert_eq!(
    doc.to_xml(&OutputSettings::default()),
    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<greeting>hello world</greeting>\n"
);
assert_eq!(
    doc.to_xmq(&OutputSettings::default()),
    "greeting = 'hello world'\n"
);
```

# Content detection

[`parse`] sniffs the leading bytes of its input and dispatches to the XMQ parser or to
one of the bridges; [`ParseOptions::content_type`] asserts a type instead, and a wrong
assertion is reported as [`Error::FormatMismatch`].

# Round trips

Parsing the printed form of a document yields a structurally equal document, see
[`Document::structural_eq`]. Multi-line values lose only incidental indentation, which
is restored on printing.
*/

#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

#[macro_use]
extern crate log;

// ------------------------------------------------------------------------------------------------
// Public Modules
// ------------------------------------------------------------------------------------------------

mod detect;
pub use detect::{detect_content_type, ContentType};

mod dom;
pub use dom::{
    decode_numeric_entity, AttrPart, Attribute, Document, NodeId, NodeKind, NsDecl, QName,
};

mod error;
pub use error::{Error, InputError, LexErrorKind, Position, Result, SyntaxErrorKind, Warning};

mod parser;
pub use parser::{ParseOptions, TrimMode};

mod printer;
pub use printer::{colorize, OutputSettings};

mod theme;
pub use theme::{Role, RenderFormat, Theme};

mod token;
pub use token::{Token, TokenKind, Tokenizer};

// ------------------------------------------------------------------------------------------------
// Private Modules
// ------------------------------------------------------------------------------------------------

#[cfg(feature = "json_bridge")]
mod json;

mod quoting;

mod syntax;

mod xml;

// ------------------------------------------------------------------------------------------------
// Public Functions
// ------------------------------------------------------------------------------------------------

///
/// Parse a buffer into a [`Document`], detecting whether it holds XMQ, XML, HTML or
/// JSON. An empty buffer parses to an empty document.
///
pub fn parse(source: &str, options: &ParseOptions) -> Result<Document> {
    if options.trim == TrimMode::Exact {
        return Err(Error::Unsupported("trim mode `exact` is reserved".to_string()));
    }
    let detected = detect_content_type(source.as_bytes())?;
    let content_type = resolve_content_type(options.content_type, detected)?;
    let source = source.trim_start_matches('\u{FEFF}');

    match content_type {
        ContentType::Xmq | ContentType::Unknown => {
            let mut doc = parser::parse_xmq_document(source, options)?;
            doc.set_source_type(ContentType::Xmq);
            Ok(doc)
        }
        #[cfg(feature = "quick_parser")]
        ContentType::Xml | ContentType::Html => {
            xml::parse_xml_document(source, options, content_type)
        }
        #[cfg(not(feature = "quick_parser"))]
        ContentType::Xml | ContentType::Html => Err(Error::Unsupported(
            "xml and html parsing require the `quick_parser` feature".to_string(),
        )),
        #[cfg(feature = "json_bridge")]
        ContentType::Json => json::parse_json_document(source, options),
        #[cfg(not(feature = "json_bridge"))]
        ContentType::Json => Err(Error::Unsupported(
            "json parsing requires the `json_bridge` feature".to_string(),
        )),
    }
}

///
/// [`parse`] over raw bytes: validates UTF-8 and strips a UTF-8 byte order mark;
/// UTF-16 marks are rejected.
///
pub fn parse_bytes(source: &[u8], options: &ParseOptions) -> Result<Document> {
    let source = detect::skip_byte_order_mark(source)?;
    let source =
        std::str::from_utf8(source).map_err(|_| Error::Input(InputError::InvalidUtf8))?;
    parse(source, options)
}

///
/// A lazy token iterator over XMQ source; the tokens reference byte ranges of the
/// input and decode nothing.
///
pub fn tokenize(source: &str) -> Tokenizer<'_> {
    Tokenizer::new(source)
}

// ------------------------------------------------------------------------------------------------
// Private Functions
// ------------------------------------------------------------------------------------------------

///
/// Reconcile an asserted content type with the detected one. Asserting XMQ always
/// wins; HTML may be asserted over detected XML; everything else must agree.
///
fn resolve_content_type(
    asserted: Option<ContentType>,
    detected: ContentType,
) -> Result<ContentType> {
    let Some(asserted) = asserted else {
        return Ok(detected);
    };
    let ok = match asserted {
        ContentType::Xmq | ContentType::Unknown => true,
        ContentType::Xml | ContentType::Html => matches!(
            detected,
            ContentType::Xml | ContentType::Html | ContentType::Unknown
        ),
        ContentType::Json => matches!(detected, ContentType::Json | ContentType::Unknown),
    };
    if ok {
        Ok(asserted)
    } else {
        Err(Error::FormatMismatch {
            expected: asserted,
            found: detected,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------
