/*!
Content-type detection from the leading bytes of a buffer.

The detector gates dispatch: callers hand it an arbitrary byte buffer and it decides
whether the buffer should be read as XMQ, XML, HTML or JSON. Detection never scans more
of the buffer than necessary.
*/

use std::fmt::{Display, Formatter};

use crate::error::{InputError, Result};

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

///
/// The content types that [`detect_content_type`] can classify, plus [`Unknown`] for a
/// buffer with nothing significant in it.
///
/// [`Unknown`]: ContentType::Unknown
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    /// The XMQ notation itself.
    Xmq,
    /// XML, or anything else starting with `<`.
    Xml,
    /// HTML, detected from `<html` or `<!DOCTYPE html`.
    Html,
    /// JSON per RFC 8259.
    Json,
    /// Nothing but whitespace was found.
    Unknown,
}

// ------------------------------------------------------------------------------------------------
// Public Functions
// ------------------------------------------------------------------------------------------------

///
/// Classify a byte buffer from its first significant bytes.
///
/// An optional UTF-8 byte order mark is skipped. A UTF-16 byte order mark is an error
/// since only UTF-8 buffers can be parsed. A buffer that is empty, or all whitespace,
/// is [`ContentType::Unknown`] and the caller decides what to do with it.
///
pub fn detect_content_type(buffer: &[u8]) -> Result<ContentType> {
    let buffer = skip_byte_order_mark(buffer)?;
    let mut i = 0;

    while i < buffer.len() {
        let c = buffer[i];
        if is_ws(c) {
            i += 1;
            continue;
        }
        if c == b'<' {
            if buffer[i..].starts_with(b"<?xml") {
                debug!("content detected as xml since <?xml found");
                return Ok(ContentType::Xml);
            }
            if buffer[i..].starts_with(b"<!--") {
                // A comment, zip past it and look again.
                match find_subslice(&buffer[i + 4..], b"-->") {
                    Some(end) => {
                        i += 4 + end + 3;
                        continue;
                    }
                    None => {
                        debug!("content detected as xml since comment start found");
                        return Ok(ContentType::Xml);
                    }
                }
            }
            if find_word_ignore_case(&buffer[i + 1..], b"html").is_some() {
                debug!("content detected as html since html found");
                return Ok(ContentType::Html);
            }
            if let Some(after) = find_word_ignore_case(&buffer[i..], b"<!doctype") {
                if find_word_ignore_case(&buffer[after..], b"html").is_some() {
                    debug!("content detected as html since doctype html found");
                    return Ok(ContentType::Html);
                }
            }
            debug!("content assumed to be xml");
            return Ok(ContentType::Xml);
        }
        if c == b'{' || c == b'[' || c == b'"' || c.is_ascii_digit() {
            debug!("content detected as json");
            return Ok(ContentType::Json);
        }
        // A single true/false/null standing alone is strictly speaking valid xmq as
        // well, but a one-element document with such a tag must be very rare.
        if is_lone_json_keyword(&buffer[i..]) {
            debug!("content detected as json since true/false/null found");
            return Ok(ContentType::Json);
        }
        debug!("content assumed to be xmq");
        return Ok(ContentType::Xmq);
    }

    debug!("empty content has no detectable type");
    Ok(ContentType::Unknown)
}

///
/// Skip an optional leading UTF-8 byte order mark; reject the UTF-16 marks.
///
pub(crate) fn skip_byte_order_mark(buffer: &[u8]) -> Result<&[u8]> {
    if buffer.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Ok(&buffer[3..])
    } else if buffer.starts_with(&[0xFF, 0xFE]) || buffer.starts_with(&[0xFE, 0xFF]) {
        Err(InputError::Utf16ByteOrderMark.into())
    } else {
        Ok(buffer)
    }
}

// ------------------------------------------------------------------------------------------------
// Implementations
// ------------------------------------------------------------------------------------------------

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ContentType::Xmq => "xmq",
                ContentType::Xml => "xml",
                ContentType::Html => "html",
                ContentType::Json => "json",
                ContentType::Unknown => "unknown",
            }
        )
    }
}

// ------------------------------------------------------------------------------------------------
// Private Functions
// ------------------------------------------------------------------------------------------------

fn is_ws(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b'\r' || c == b'\n'
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

///
/// Skip whitespace, then match `word` case-insensitively. The match must be terminated
/// by the end of the buffer or a non-alphanumeric byte. Returns the offset just after
/// the matched word.
///
fn find_word_ignore_case(buffer: &[u8], word: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < buffer.len() && is_ws(buffer[i]) {
        i += 1;
    }
    let rest = &buffer[i..];
    if rest.len() < word.len() {
        return None;
    }
    if !rest[..word.len()].eq_ignore_ascii_case(word) {
        return None;
    }
    match rest.get(word.len()) {
        None => Some(i + word.len()),
        Some(c) if !c.is_ascii_alphanumeric() => Some(i + word.len()),
        Some(_) => None,
    }
}

fn is_lone_json_keyword(buffer: &[u8]) -> bool {
    for keyword in [&b"true"[..], &b"false"[..], &b"null"[..]] {
        if buffer.starts_with(keyword) {
            let rest = &buffer[keyword.len()..];
            if rest.is_empty() || rest == b"\n" {
                return true;
            }
        }
    }
    false
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, InputError};

    #[test]
    fn test_detect_xml() {
        assert_eq!(detect_content_type(b"<?xml").unwrap(), ContentType::Xml);
        assert_eq!(detect_content_type(b"  <config/>").unwrap(), ContentType::Xml);
        assert_eq!(
            detect_content_type(b"<!-- hi --><root/>").unwrap(),
            ContentType::Xml
        );
    }

    #[test]
    fn test_detect_html() {
        assert_eq!(detect_content_type(b"<html>").unwrap(), ContentType::Html);
        assert_eq!(detect_content_type(b"< HTML >").unwrap(), ContentType::Html);
        assert_eq!(
            detect_content_type(b"<!DOCTYPE html><html/>").unwrap(),
            ContentType::Html
        );
        assert_eq!(
            detect_content_type(b"<!DOCTYPE note>").unwrap(),
            ContentType::Xml
        );
    }

    #[test]
    fn test_detect_json() {
        assert_eq!(detect_content_type(b"{\"x\":1}").unwrap(), ContentType::Json);
        assert_eq!(detect_content_type(b"[1,2]").unwrap(), ContentType::Json);
        assert_eq!(detect_content_type(b"\"str\"").unwrap(), ContentType::Json);
        assert_eq!(detect_content_type(b"42").unwrap(), ContentType::Json);
        assert_eq!(detect_content_type(b"true").unwrap(), ContentType::Json);
        assert_eq!(detect_content_type(b"null\n").unwrap(), ContentType::Json);
        // Word-like but not standing alone.
        assert_eq!(detect_content_type(b"true { }").unwrap(), ContentType::Xmq);
    }

    #[test]
    fn test_detect_xmq() {
        assert_eq!(detect_content_type(b"greeting {").unwrap(), ContentType::Xmq);
        assert_eq!(detect_content_type(b"alfa = 1").unwrap(), ContentType::Xmq);
    }

    #[test]
    fn test_detect_empty() {
        assert_eq!(detect_content_type(b"").unwrap(), ContentType::Unknown);
        assert_eq!(detect_content_type(b"  \n\t ").unwrap(), ContentType::Unknown);
    }

    #[test]
    fn test_byte_order_marks() {
        assert_eq!(
            detect_content_type(b"\xEF\xBB\xBF<?xml").unwrap(),
            ContentType::Xml
        );
        assert_eq!(
            detect_content_type(b"\xFF\xFEx\0").unwrap_err(),
            Error::Input(InputError::Utf16ByteOrderMark)
        );
        assert_eq!(
            detect_content_type(b"\xFE\xFF\0x").unwrap_err(),
            Error::Input(InputError::Utf16ByteOrderMark)
        );
    }
}
