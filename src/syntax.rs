#![allow(dead_code)]

// ------------------------------------------------------------------------------------------------
// Pure Syntactic Tokens
// ------------------------------------------------------------------------------------------------

pub(crate) const XMQ_QUOTE_CHAR: char = '\'';
pub(crate) const XMQ_EQUALS_CHAR: char = '=';
pub(crate) const XMQ_BRACE_LEFT_CHAR: char = '{';
pub(crate) const XMQ_BRACE_RIGHT_CHAR: char = '}';
pub(crate) const XMQ_PAREN_LEFT_CHAR: char = '(';
pub(crate) const XMQ_PAREN_RIGHT_CHAR: char = ')';
pub(crate) const XMQ_DQUOTE_CHAR: char = '"';
pub(crate) const XMQ_AMP_CHAR: char = '&';
pub(crate) const XMQ_SLASH_CHAR: char = '/';

pub(crate) const XMQ_NS_SEPARATOR: char = ':';

pub(crate) const XMQ_ENTITY_START: &str = "&";
pub(crate) const XMQ_ENTITY_END: &str = ";";
pub(crate) const XMQ_NUMBERED_ENTITY_START: &str = "&#";
pub(crate) const XMQ_HEX_NUMBERED_ENTITY_START: &str = "&#x";

pub(crate) const XMQ_SINGLE_COMMENT_START: &str = "//";
pub(crate) const XMQ_MULTI_COMMENT_START: &str = "/*";
pub(crate) const XMQ_MULTI_COMMENT_END: &str = "*/";

// ------------------------------------------------------------------------------------------------
// Reserved Names
// ------------------------------------------------------------------------------------------------

pub(crate) const XMQ_DOCTYPE_NAME: &str = "!DOCTYPE";
pub(crate) const XMQ_PI_PREFIX: char = '?';

pub(crate) const XMLNS_ATTRIBUTE: &str = "xmlns";
pub(crate) const XMLNS_ATTRIBUTE_PREFIX: &str = "xmlns:";

// ------------------------------------------------------------------------------------------------
// JSON Bridge Marker Attributes
// ------------------------------------------------------------------------------------------------

pub(crate) const JSON_ARRAY_MARKER: &str = "A";
pub(crate) const JSON_STRING_MARKER: &str = "S";
pub(crate) const JSON_ANONYMOUS_NAME: &str = "_";
pub(crate) const JSON_KEY_ATTRIBUTE: &str = "_";

// ------------------------------------------------------------------------------------------------
// XML Output
// ------------------------------------------------------------------------------------------------

pub(crate) const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>";
pub(crate) const XML_COMMENT_START: &str = "<!--";
pub(crate) const XML_COMMENT_END: &str = "-->";
pub(crate) const XML_DOCTYPE_START: &str = "<!DOCTYPE";
pub(crate) const HTML_DOCTYPE: &str = "<!DOCTYPE html>";

///
/// The mark inserted after a `-` to keep `--` sequences out of emitted XML comments. The
/// escape is an involution, see `quoting::escape_comment` and `quoting::unescape_comment`.
///
pub(crate) const COMMENT_ESCAPE_MARK: char = '\u{2410}';

// ------------------------------------------------------------------------------------------------
// Character Classification
// ------------------------------------------------------------------------------------------------

///
/// Whitespace that separates tokens: ASCII space, tab, carriage return and newline.
///
pub(crate) fn is_xmq_whitespace(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r' || c == '\n'
}

///
/// A character that may appear in an unquoted XMQ text token: any non-whitespace,
/// non-control character that is not one of the reserved characters. `&` and `/` are
/// safe inside a token (`http://…` and `M&M` stay bare); they are special only where a
/// token starts, see [`is_unsafe_start`].
///
pub(crate) fn is_safe_char(c: char) -> bool {
    if is_xmq_whitespace(c) || c.is_control() {
        return false;
    }
    !matches!(
        c,
        XMQ_EQUALS_CHAR
            | XMQ_BRACE_LEFT_CHAR
            | XMQ_BRACE_RIGHT_CHAR
            | XMQ_PAREN_LEFT_CHAR
            | XMQ_PAREN_RIGHT_CHAR
            | XMQ_QUOTE_CHAR
            | XMQ_DQUOTE_CHAR
    )
}

///
/// Text starting with any of these must be quoted even if every character is safe.
///
pub(crate) fn is_unsafe_start(c: char, next: Option<char>) -> bool {
    c == XMQ_EQUALS_CHAR
        || c == XMQ_AMP_CHAR
        || (c == XMQ_SLASH_CHAR && matches!(next, Some('/') | Some('*')))
}

///
/// ```ebnf
/// ident ::= (letter | '_') (letter | digit | '_' | '-' | '.')*
/// ```
///
/// where letter is any Unicode alphabetic character.
///
pub(crate) fn is_xmq_ident_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_xmq_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

pub(crate) fn is_xmq_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_xmq_ident_start_char(c) => chars.all(is_xmq_ident_char),
        _ => false,
    }
}

///
/// A `prefix:local` pair where both sides satisfy the identifier grammar. A single
/// identifier is also a valid name.
///
pub(crate) fn is_xmq_name(s: &str) -> bool {
    match s.split_once(XMQ_NS_SEPARATOR) {
        Some((prefix, local)) => is_xmq_ident(prefix) && is_xmq_ident(local),
        None => is_xmq_ident(s),
    }
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------
