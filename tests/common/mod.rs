#![allow(dead_code)]

use xmq::{parse, Document, OutputSettings, ParseOptions};

pub fn parse_default(source: &str) -> Document {
    parse(source, &ParseOptions::default())
        .unwrap_or_else(|err| panic!("could not parse {:?}: {}", source, err))
}

pub fn pretty(doc: &Document) -> String {
    doc.to_xmq(&OutputSettings::default())
}

pub fn compact(doc: &Document) -> String {
    doc.to_xmq(&OutputSettings::compact())
}

///
/// Parse, print, re-parse, and require the two documents to be structurally equal.
/// Returns the printed form for further checks.
///
pub fn assert_round_trip(source: &str) -> String {
    let first = parse_default(source);
    let printed = pretty(&first);
    let second = parse_default(&printed);
    assert!(
        first.structural_eq(&second),
        "round trip changed the document\nsource:  {:?}\nprinted: {:?}",
        source,
        printed
    );
    printed
}

///
/// The same check through the compact form.
///
pub fn assert_compact_round_trip(source: &str) -> String {
    let first = parse_default(source);
    let printed = compact(&first);
    let second = parse_default(&printed);
    assert!(
        first.structural_eq(&second),
        "compact round trip changed the document\nsource:  {:?}\nprinted: {:?}",
        source,
        printed
    );
    printed
}
