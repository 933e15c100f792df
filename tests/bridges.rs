//! Cross-format conversions through the XML, HTML and JSON bridges.

#![cfg(feature = "quick_parser")]

use xmq::{parse, NodeKind, OutputSettings, ParseOptions, TrimMode};

pub mod common;
use common::{parse_default, pretty};

#[test]
fn test_xml_to_xmq_and_back() {
    let xml = "<shiporder orderid=\"889923\"><orderperson>John Smith</orderperson></shiporder>";
    let doc = parse_default(xml);
    assert_eq!(
        pretty(&doc),
        "shiporder(orderid = 889923)\n{\n    orderperson = 'John Smith'\n}\n"
    );
    let back = doc.to_xml(&OutputSettings {
        omit_decl: true,
        ..Default::default()
    });
    assert_eq!(back.trim_end(), xml);
}

#[test]
fn test_xml_comment_escape_involution() {
    let xml = "<x><!--a -\u{2410}- b--></x>";
    let doc = parse_default(xml);
    let x = doc.children(doc.root())[0];
    // The escape mark is removed on ingestion...
    assert_eq!(
        doc.kind(doc.children(x)[0]),
        &NodeKind::Comment("a -- b".to_string())
    );
    // ...and restored on emission.
    let back = doc.to_xml(&OutputSettings {
        omit_decl: true,
        ..Default::default()
    });
    assert_eq!(back.trim_end(), xml);
}

#[test]
fn test_xml_trim_modes() {
    let xml = "<x>\n    alfa\n    beta\n</x>";
    let trimmed = parse_default(xml);
    let x = trimmed.children(trimmed.root())[0];
    assert_eq!(
        trimmed.kind(trimmed.children(x)[0]),
        &NodeKind::Text("alfa\nbeta".to_string())
    );

    let options = ParseOptions {
        trim: TrimMode::None,
        ..Default::default()
    };
    let untrimmed = parse(xml, &options).unwrap();
    let x = untrimmed.children(untrimmed.root())[0];
    assert_eq!(
        untrimmed.kind(untrimmed.children(x)[0]),
        &NodeKind::Text("\n    alfa\n    beta\n".to_string())
    );
}

#[test]
fn test_html_detection_and_doctype() {
    let doc = parse_default("<!DOCTYPE html><html><body><br><p>hi</p></body></html>");
    let html = doc.to_html(&OutputSettings::default());
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<br>"));
    assert!(!html.contains("<br/>"));
    assert!(html.contains("<p>hi</p>"));
}

#[test]
fn test_void_elements_not_self_closed() {
    let doc = parse_default("img(src = pic.png)");
    let html = doc.to_html(&OutputSettings::default());
    assert!(html.contains("<img src=\"pic.png\">"));
    let xml = doc.to_xml(&OutputSettings {
        omit_decl: true,
        ..Default::default()
    });
    assert!(xml.contains("<img src=\"pic.png\"/>"));
}

#[cfg(feature = "json_bridge")]
mod json {
    use super::*;

    #[test]
    fn test_json_to_xmq_to_json() {
        let src = "{\"name\":\"xmq\",\"version\":\"1\",\"tags\":[\"xml\",\"json\"],\"count\":3}";
        let doc = parse_default(src);
        assert_eq!(doc.to_json(&OutputSettings::default()), src);
    }

    #[test]
    fn test_json_through_xmq_text() {
        let doc = parse_default("{\"a\":1,\"b\":[2,3]}");
        let xmq_text = pretty(&doc);
        let again = parse_default(&xmq_text);
        assert!(doc.structural_eq(&again));
        assert_eq!(again.to_json(&OutputSettings::default()), "{\"a\":1,\"b\":[2,3]}");
    }

    #[test]
    fn test_xml_to_json() {
        let doc = parse_default("<r><a>1</a><b>text</b></r>");
        assert_eq!(
            doc.to_json(&OutputSettings::default()),
            "{\"r\":{\"a\":1,\"b\":\"text\"}}"
        );
    }
}
