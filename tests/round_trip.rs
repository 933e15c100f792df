use xmq::{parse, Document, NodeKind, OutputSettings, ParseOptions};

pub mod common;
use common::{assert_compact_round_trip, assert_round_trip, parse_default, pretty};

#[test]
fn test_simple_documents_round_trip() {
    let sources = [
        "x",
        "x = ''",
        "greeting = 'hello world'",
        "timeout = 30",
        "config(mode=fast) { timeout = 30 }",
        "a { b { c = 1 } }",
        "x { 'standalone content' }",
        "x { &nbsp; }",
        "html(xmlns = http://www.w3.org/1999/xhtml)",
        "// comment\nx",
        "x { // inner\n y = 2 }",
    ];
    for source in sources {
        let _ = assert_round_trip(source);
        let _ = assert_compact_round_trip(source);
    }
}

#[test]
fn test_tricky_values_round_trip() {
    let sources = [
        "msg = '''he said 'hi' '''",
        "v = 'leading  space kept'",
        "v = '  '",
        "v = 'multi\n     line\n     value'",
        "v = ( 'a' &#10; 'b' )",
        "v = 'ends with newline\n     '",
        "url = http://example.com/a/b.html",
        "v = 'tab\tinside'",
        "amp = 'M&M'",
    ];
    for source in sources {
        let _ = assert_round_trip(source);
        let _ = assert_compact_round_trip(source);
    }
}

#[test]
fn test_printed_form_is_stable() {
    // Printing a parsed document and printing its re-parse must agree byte for byte.
    let sources = [
        "config(mode=fast) { timeout = 30 }",
        "poem = '\n    rose\n    violet\n    '",
        "x { a = 1 bee = 2 'text' }",
    ];
    for source in sources {
        let printed = pretty(&parse_default(source));
        let again = pretty(&parse_default(&printed));
        assert_eq!(printed, again, "unstable print for {:?}", source);
    }
}

#[test]
fn test_empty_element_boundary() {
    let doc = parse_default("x");
    let x = doc.children(doc.root())[0];
    assert_eq!(doc.element_name(x).unwrap().local, "x");
    assert!(doc.children(x).is_empty());
    assert_eq!(pretty(&doc), "x\n");
}

#[test]
fn test_empty_value_boundary() {
    let doc = parse_default("x = ''");
    let x = doc.children(doc.root())[0];
    assert_eq!(doc.kind(doc.children(x)[0]), &NodeKind::Text(String::new()));
    assert_eq!(pretty(&doc), "x = ''\n");
}

#[test]
fn test_merge_flag_boundary() {
    let doc = parse_default("x { 'a' 'b' }");
    let x = doc.children(doc.root())[0];
    assert_eq!(doc.children(x).len(), 1);

    let options = ParseOptions {
        merge_text: false,
        ..Default::default()
    };
    let doc = parse("x { 'a' 'b' }", &options).unwrap();
    let x = doc.children(doc.root())[0];
    assert_eq!(doc.children(x).len(), 2);
}

#[test]
fn test_incidental_indent_round_trip() {
    let doc = parse_default("poem = '\n    rose\n    violet\n    '");
    let poem = doc.children(doc.root())[0];
    assert_eq!(
        doc.kind(doc.children(poem)[0]),
        &NodeKind::Text("rose\nviolet\n".to_string())
    );

    // The printed form uses the same hanging shape and survives another parse.
    let printed = pretty(&doc);
    let again = parse_default(&printed);
    assert!(doc.structural_eq(&again));
}

#[test]
fn test_quotes_never_collide_with_delimiters() {
    // The delimiter count always exceeds the longest interior run.
    for content in ["a'b", "a''b", "a'''b", "'leading", "mid''dle"] {
        let mut doc = Document::new();
        let root = doc.root();
        let x = doc.append_element(root, xmq::QName::local("x"));
        let _ = doc.append_text(x, content);
        let printed = doc.to_xmq(&OutputSettings::default());
        let again = parse_default(&printed);
        assert!(
            doc.structural_eq(&again),
            "content {:?} printed as {:?}",
            content,
            printed
        );
    }
}

#[test]
fn test_programmatic_document_round_trip() {
    let mut doc = Document::new();
    let root = doc.root();
    let config = doc.append_element(root, xmq::QName::local("config"));
    doc.add_attribute(
        config,
        xmq::Attribute {
            name: xmq::QName::local("mode"),
            value: Some(vec![xmq::AttrPart::Text("fast".to_string())]),
        },
    );
    let timeout = doc.append_element(config, xmq::QName::local("timeout"));
    let _ = doc.append_text(timeout, "30");

    let printed = doc.to_xmq(&OutputSettings::default());
    assert_eq!(printed, "config(mode = fast)\n{\n    timeout = 30\n}\n");
    assert!(doc.structural_eq(&parse_default(&printed)));
}
