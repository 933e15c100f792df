//! End-to-end scenarios exercising the full parse/print pipeline.

use xmq::{detect_content_type, ContentType, OutputSettings, ParseOptions};

pub mod common;
use common::{compact, parse_default, pretty};

#[test]
fn test_greeting_to_xml() {
    let doc = parse_default("greeting = 'hello world'\n");
    assert_eq!(
        doc.to_xml(&OutputSettings::default()),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<greeting>hello world</greeting>\n"
    );
}

#[test]
fn test_attributes_and_nesting_to_xml() {
    let doc = parse_default("config(mode=fast) { timeout = 30 }\n");
    let settings = OutputSettings {
        omit_decl: true,
        ..Default::default()
    };
    assert_eq!(
        doc.to_xml(&settings).trim_end(),
        "<config mode=\"fast\"><timeout>30</timeout></config>"
    );
}

#[test]
fn test_quote_depth_compact() {
    let doc = parse_default("msg = '''he said 'hi' '''\n");
    assert_eq!(compact(&doc), "msg='''he said 'hi' '''");
}

#[test]
fn test_incidental_indent_scenario() {
    let source = "poem = '\n    rose\n    violet\n    '\n";
    let doc = parse_default(source);
    let poem = doc.children(doc.root())[0];
    assert_eq!(
        doc.kind(doc.children(poem)[0]),
        &xmq::NodeKind::Text("rose\nviolet\n".to_string())
    );
    // Re-printing keeps the hanging literal form.
    let printed = pretty(&doc);
    assert_eq!(printed, "poem = '\n       rose\n       violet\n       '\n");
    assert!(doc.structural_eq(&parse_default(&printed)));
}

#[cfg(feature = "json_bridge")]
#[test]
fn test_json_bridge_scenario() {
    let doc = parse_default("{\"a\":1,\"b\":[2,3]}");
    assert_eq!(compact(&doc), "a=1 b(A){_=2 _=3}");
    assert_eq!(
        pretty(&doc),
        "a = 1\nb(A)\n{\n    _ = 2\n    _ = 3\n}\n"
    );
    // Order is preserved back to JSON.
    assert_eq!(doc.to_json(&OutputSettings::default()), "{\"a\":1,\"b\":[2,3]}");
}

#[test]
fn test_content_type_detection_scenario() {
    assert_eq!(detect_content_type(b"<?xml").unwrap(), ContentType::Xml);
    assert_eq!(detect_content_type(b"{\"x\":1}").unwrap(), ContentType::Json);
    assert_eq!(detect_content_type(b"greeting {").unwrap(), ContentType::Xmq);
    assert_eq!(detect_content_type(b"<html>").unwrap(), ContentType::Html);
}

#[test]
fn test_implicit_root_scenario() {
    let options = ParseOptions {
        implicit_root: Some("config".to_string()),
        ..Default::default()
    };
    let doc = xmq::parse("timeout = 30\nretries = 2\n", &options).unwrap();
    assert_eq!(
        pretty(&doc),
        "config {\n    timeout = 30\n    retries = 2\n}\n"
    );
}
