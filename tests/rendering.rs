//! Coloured rendering of XMQ source for terminals, HTML and TeX.

use xmq::{colorize, OutputSettings, RenderFormat, Theme};

pub mod common;
use common::parse_default;

#[test]
fn test_plain_render_is_identity() {
    let source = "config(mode = fast)\n{\n    timeout = 30\n}\n";
    let settings = OutputSettings::default();
    assert_eq!(colorize(source, &settings).unwrap(), source);
}

#[test]
fn test_terminal_render_wraps_tokens() {
    let source = "greeting = 'hello world'\n";
    let settings = OutputSettings::terminal(true);
    let out = colorize(source, &settings).unwrap();
    // The element key is blue, the quote green, and every colour is reset.
    assert!(out.contains("\x1b[94mgreeting\x1b[0m"));
    assert!(out.contains("\x1b[32m'hello world'\x1b[0m"));
    // Stripping the codes recovers the source exactly.
    let stripped = strip_ansi(&out);
    assert_eq!(stripped, source);
}

#[test]
fn test_light_theme_differs() {
    let source = "x = 1\n";
    let dark = colorize(source, &OutputSettings::terminal(true)).unwrap();
    let light = colorize(source, &OutputSettings::terminal(false)).unwrap();
    assert_ne!(dark, light);
}

#[test]
fn test_html_render() {
    let source = "x = 'a < b'\n";
    let settings = OutputSettings::html(true);
    let out = colorize(source, &settings).unwrap();
    assert!(out.starts_with("<style>"));
    assert!(out.contains("<pre class=\"xmq xmq_dark\">"));
    assert!(out.contains("<span class=\"xmqEK\">x</span>"));
    // Body text is HTML-escaped.
    assert!(out.contains("'a &lt; b'"));
    assert!(out.ends_with("</pre>\n"));
}

#[test]
fn test_tex_render_escapes() {
    let source = "under_score = 'a & b'\n";
    let settings = OutputSettings::tex();
    let out = colorize(source, &settings).unwrap();
    assert!(out.contains("\\xmqEK{under\\_score}"));
    assert!(out.contains("a \\& b"));
}

#[test]
fn test_rendered_document_output() {
    let doc = parse_default("x = 1");
    let out = doc.to_xmq(&OutputSettings::terminal(true));
    assert_eq!(strip_ansi(&out), "x = 1\n");
}

#[test]
fn test_theme_overrides() {
    let mut theme = Theme::none();
    theme.set(xmq::Role::ElementKey, "<".to_string(), ">".to_string());
    let settings = OutputSettings {
        render: RenderFormat::Terminal,
        theme,
        ..Default::default()
    };
    let out = colorize("x = 1\n", &settings).unwrap();
    assert_eq!(out, "<x> = 1\n");
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
