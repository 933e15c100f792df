/*!
The quote/indent normalizer.

Pure string algorithmics shared by ingestion and emission. On the way in it strips
incidental indentation from multi-line quote and comment bodies; on the way out it
decides how many quotes a literal needs, whether the literal must hang on its own lines,
and whether it must fall back to a compound value. Nothing here touches the tree or
performs I/O.

The central trimming rules for a multi-line quote body:

1. a whitespace-only first line is dropped entirely, and the indent baseline moves to
   the second line;
2. whitespace after the final newline is dropped, the newline itself is kept;
3. the incidental indent is the smallest leading-space count over the non-blank lines,
   a tab counting as eight;
4. every line loses exactly the incidental indent, and line-ending whitespace;
5. if the first line's own indent exceeds the incidental indent, the difference is
   restored as pad spaces.
*/

use crate::syntax::*;

// ------------------------------------------------------------------------------------------------
// Public (crate) Types
// ------------------------------------------------------------------------------------------------

///
/// How a text literal must be encoded on output.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct QuoteShape {
    /// Number of surrounding quotes; zero means the text is safe bare.
    pub(crate) quotes: usize,
    /// The literal must hang: opening quotes, newline, body, closing quotes.
    pub(crate) hanging: bool,
    /// The literal cannot be expressed as one quote and must be compounded.
    pub(crate) compound: bool,
}

///
/// Escaping requested by the caller, beyond what round-tripping itself requires.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct EscapeFlags {
    pub(crate) newlines: bool,
    pub(crate) non_7bit: bool,
}

// ------------------------------------------------------------------------------------------------
// Ingestion
// ------------------------------------------------------------------------------------------------

///
/// Remove incidental indentation from the body of a quote. `indent` is the 0-based
/// column of the first body character on its line, which seeds the incidental indent
/// for the first line.
///
pub(crate) fn unquote(content: &str, indent: usize) -> String {
    if !content.contains('\n') {
        return content.to_string();
    }

    let mut body = content;

    // Whitespace after the final newline belongs to the closing quote, not the text.
    if let Some(last_nl) = body.rfind('\n') {
        let tail = &body[last_nl + 1..];
        if !tail.is_empty() && is_blank(tail) {
            body = &body[..last_nl + 1];
        }
    }

    // A whitespace-only first line belongs to the opening quote.
    let mut ignore_first_indent = false;
    if let Some(first_nl) = body.find('\n') {
        if is_blank(&body[..first_nl]) {
            body = &body[first_nl + 1..];
            ignore_first_indent = true;
        }
    }

    // Find the incidental indent over all non-blank lines. The first line's source
    // indent is the quote column unless the first line was dropped above.
    let mut incidental = if ignore_first_indent {
        usize::MAX
    } else {
        indent
    };
    for (index, line) in body.split_inclusive('\n').enumerate() {
        if index == 0 && !ignore_first_indent {
            continue;
        }
        let line = line.strip_suffix('\n').unwrap_or(line);
        if !is_blank(line) {
            incidental = incidental.min(leading_indent(line));
        }
    }
    if incidental == usize::MAX {
        incidental = 0;
    }

    let prepend_spaces = if !ignore_first_indent && indent >= incidental {
        indent - incidental
    } else {
        0
    };

    let mut out = String::with_capacity(body.len() + prepend_spaces);
    for _ in 0..prepend_spaces {
        out.push(' ');
    }
    for (index, line) in body.split_inclusive('\n').enumerate() {
        let (line, has_nl) = match line.strip_suffix('\n') {
            Some(stripped) => (stripped, true),
            None => (line, false),
        };
        let mut rest = line;
        if index > 0 || ignore_first_indent {
            rest = strip_indent(rest, incidental);
        }
        if has_nl {
            out.push_str(rest.trim_end_matches([' ', '\t', '\r']));
            out.push('\n');
        } else {
            // The final line keeps its trailing whitespace.
            out.push_str(rest);
        }
    }
    out
}

///
/// Decode a whole quote token, delimiters included, into the logical string. The token
/// may be a continuation chain of several quote literals. `start_col` is the 1-based
/// column of the opening quote.
///
pub(crate) fn decode_quote(token: &str, start_col: u32) -> String {
    let mut out = String::new();
    let mut cur = ColCursor::new(token, start_col);

    loop {
        let quote_col = cur.col as usize;
        let open = cur.eat_run(XMQ_QUOTE_CHAR);
        debug_assert!(open > 0);

        if open != 2 {
            let body_start = cur.pos;
            let mut body_stop = body_start;
            loop {
                match cur.peek() {
                    Some(XMQ_QUOTE_CHAR) => {
                        body_stop = cur.pos;
                        let run = cur.eat_run(XMQ_QUOTE_CHAR);
                        if run == open {
                            break;
                        }
                    }
                    Some(_) => {
                        let _ = cur.advance();
                    }
                    None => {
                        body_stop = cur.pos;
                        break;
                    }
                }
            }
            out.push_str(&unquote(
                &token[body_start..body_stop],
                quote_col - 1 + open,
            ));
        }

        // A backslash joins the next quote literal; `\n` also inserts a newline.
        if cur.peek() != Some('\\') {
            break;
        }
        let _ = cur.advance();
        if cur.peek() == Some('n') {
            let _ = cur.advance();
            out.push('\n');
        }
        let _ = cur.advance(); // the literal newline
        while matches!(cur.peek(), Some(c) if is_xmq_whitespace(c)) {
            let _ = cur.advance();
        }
    }
    out
}

///
/// Decode a whole comment token into its logical content. Single-line `//` comments
/// lose one leading space and all trailing spaces. Block comments lose their framing,
/// one optional space inside each end, and incidental indentation; chained blocks are
/// joined with newlines.
///
pub(crate) fn decode_comment(token: &str, start_col: u32) -> String {
    let slashes = token.chars().take_while(|c| *c == XMQ_SLASH_CHAR).count();
    let after = &token[slashes..];

    if !after.starts_with('*') {
        // Single line. All slashes means the content is the run minus the marker.
        if after.is_empty() {
            return token[2..].to_string();
        }
        let content = after.strip_prefix(' ').unwrap_or(after);
        return content.trim_end_matches(' ').to_string();
    }

    let mut out = String::new();
    let mut cur = ColCursor::new(token, start_col);
    let _ = cur.eat_run(XMQ_SLASH_CHAR);
    let mut first = true;

    loop {
        let _ = cur.advance(); // *
        // One space of padding inside the block is framing, not content.
        if cur.peek() == Some(' ') {
            let _ = cur.advance();
        }
        let body_start = cur.pos;
        let body_col = cur.col as usize;
        let mut body_stop;
        loop {
            match cur.peek() {
                Some('*') => {
                    let mark = (cur.pos, cur.col, cur.line_breaks);
                    let _ = cur.advance();
                    let run = cur.eat_run(XMQ_SLASH_CHAR);
                    if run >= slashes {
                        body_stop = mark.0;
                        break;
                    }
                    cur.restore(mark);
                    let _ = cur.advance();
                }
                Some(_) => {
                    let _ = cur.advance();
                }
                None => {
                    body_stop = cur.pos;
                    break;
                }
            }
        }
        let mut body = &token[body_start..body_stop];
        body = body.strip_suffix(' ').unwrap_or(body);
        if !first {
            out.push('\n');
        }
        out.push_str(&unquote(body, body_col - 1));
        first = false;

        // Chained blocks: a `*` restarts directly, or the same opening follows on the
        // next line.
        if cur.peek() == Some('*') {
            continue;
        }
        while matches!(cur.peek(), Some(c) if is_xmq_whitespace(c)) {
            let _ = cur.advance();
        }
        if cur.at_end() {
            break;
        }
        let _ = cur.eat_run(XMQ_SLASH_CHAR);
    }
    out
}

///
/// The heuristic whitespace trim used when ingesting XML and HTML: all-whitespace text
/// vanishes, other text loses incidental indentation with the baseline taken from its
/// second line.
///
pub(crate) fn heuristic_trim(text: &str) -> String {
    if text.chars().all(is_xmq_whitespace) {
        return String::new();
    }
    let trimmed = text.trim_matches(' ');
    // Seed the baseline from the second line so that any leading indentation style
    // round-trips gracefully.
    let baseline = match trimmed.find('\n') {
        Some(nl) => leading_indent(&trimmed[nl + 1..]),
        None => 0,
    };
    unquote(trimmed, baseline)
}

// ------------------------------------------------------------------------------------------------
// Emission
// ------------------------------------------------------------------------------------------------

///
/// Scan the content to determine how it must be quoted, or whether it can remain bare.
///
pub(crate) fn quote_shape(content: &str, compact: bool, escapes: EscapeFlags) -> QuoteShape {
    debug_assert!(!content.is_empty());

    let compound = needs_compound(content, compact, escapes);
    let quotes = count_necessary_quotes(content);
    let hanging = !compound
        && !compact
        && (content.starts_with(XMQ_QUOTE_CHAR) || content.ends_with('\n') || quotes >= 4);

    QuoteShape {
        quotes,
        hanging,
        compound,
    }
}

///
/// The number of quotes needed to delimit `content`: one more than the longest interior
/// run, at least one when any character is unsafe, never exactly two since `''` is the
/// empty string literal.
///
pub(crate) fn count_necessary_quotes(content: &str) -> usize {
    let mut max = 0;
    let mut curr = 0;
    let mut all_safe = true;

    let mut chars = content.chars().peekable();
    let mut first = true;
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        if first && is_unsafe_start(c, next) {
            all_safe = false;
        }
        first = false;
        if c == XMQ_QUOTE_CHAR {
            curr += 1;
            max = max.max(curr);
        } else {
            curr = 0;
            all_safe &= is_safe_char(c);
        }
    }
    if max > 0 {
        max += 1;
    }
    if max == 0 && !all_safe {
        max = 1;
    }
    if max == 2 {
        max = 3;
    }
    max
}

///
/// Decide early whether a quoted form cannot express the content losslessly and a
/// compound is required instead.
///
pub(crate) fn needs_compound(content: &str, compact: bool, escapes: EscapeFlags) -> bool {
    // A single escapable character becomes a single entity, no compound around it.
    let mut chars = content.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if matches!(c, '\'' | '\n' | '\r' | '\t') {
            return false;
        }
    }

    if leading_ws_nl_region(content).is_some() {
        return true;
    }
    if let Some(region) = trailing_ws_nl_region(content) {
        // A run of pure newlines at the end survives a hanging quote; mixed
        // whitespace does not.
        if !content[region..].chars().all(|c| c == '\n') {
            return true;
        }
        if compact {
            return true;
        }
    }
    if content.ends_with(XMQ_QUOTE_CHAR) {
        return true;
    }
    if compact && (content.starts_with(XMQ_QUOTE_CHAR) || content.contains('\n')) {
        return true;
    }
    content.chars().any(|c| {
        (escapes.newlines && c == '\n')
            || (escapes.non_7bit && (c as u32) > 126)
            || ((c as u32) < 32 && c != '\n')
    })
}

///
/// Does this character force a split into entity references when emitting a value?
/// Control characters other than the newline always do.
///
pub(crate) fn char_needs_escape(c: char, escapes: EscapeFlags) -> bool {
    (escapes.newlines && c == '\n')
        || (escapes.non_7bit && (c as u32) > 126)
        || ((c as u32) < 32 && c != '\n')
}

///
/// Find the byte index of the next character that must be escaped, or the end. When
/// `edge_quotes` is set, a quote as the very first character and the trailing quote run
/// are escaped too.
pub(crate) fn find_next_escape(
    content: &str,
    escapes: EscapeFlags,
    edge_quotes: bool,
) -> usize {
    let mut trailing_run_start = content.len();
    if edge_quotes && content.ends_with(XMQ_QUOTE_CHAR) {
        trailing_run_start = content.trim_end_matches(XMQ_QUOTE_CHAR).len();
    }
    for (i, c) in content.char_indices() {
        if edge_quotes && c == XMQ_QUOTE_CHAR && (i == 0 || i >= trailing_run_start) {
            return i;
        }
        if char_needs_escape(c, escapes) {
            return i;
        }
    }
    content.len()
}

///
/// Is this text safe to print bare as an element or attribute value?
///
pub(crate) fn is_safe_text_value(content: &str) -> bool {
    let mut chars = content.chars().peekable();
    let mut first = true;
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        if first && is_unsafe_start(c, next) {
            return false;
        }
        first = false;
        if !is_safe_char(c) {
            return false;
        }
    }
    !content.is_empty()
}

// ------------------------------------------------------------------------------------------------
// Comments
// ------------------------------------------------------------------------------------------------

///
/// How many slashes must frame a multi-line comment: one more than the longest run of
/// slashes appearing after an asterisk in the content.
///
pub(crate) fn count_necessary_slashes(content: &str) -> usize {
    let mut max = 0;
    let mut curr = 0;
    let mut counting = false;
    for c in content.chars() {
        if counting {
            if c == XMQ_SLASH_CHAR {
                curr += 1;
                max = max.max(curr);
            } else {
                counting = false;
            }
        }
        if !counting && c == '*' {
            counting = true;
            curr = 0;
        }
    }
    max + 1
}

///
/// Escape a comment for embedding in an XML comment: insert U+2410 after every `-`
/// that is followed by `-` or by U+2410. The transformation is an involution with
/// [`unescape_comment`].
///
pub(crate) fn escape_comment(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '-' && matches!(chars.peek(), Some('-') | Some(&COMMENT_ESCAPE_MARK)) {
            out.push(COMMENT_ESCAPE_MARK);
        }
    }
    out
}

///
/// Remove the U+2410 marks inserted by [`escape_comment`].
///
pub(crate) fn unescape_comment(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '-' && chars.peek() == Some(&COMMENT_ESCAPE_MARK) {
            let _ = chars.next();
        }
    }
    out
}

// ------------------------------------------------------------------------------------------------
// Character Classes over Whole Strings
// ------------------------------------------------------------------------------------------------

pub(crate) fn all_quotes(content: &str) -> bool {
    !content.is_empty() && content.chars().all(|c| c == XMQ_QUOTE_CHAR)
}

pub(crate) fn all_spaces(content: &str) -> bool {
    !content.is_empty() && content.chars().all(|c| c == ' ')
}

pub(crate) fn all_whitespace(content: &str) -> bool {
    !content.is_empty() && content.chars().all(is_xmq_whitespace)
}

///
/// The byte index just past the leading whitespace when that whitespace contains a
/// newline; `None` otherwise.
///
pub(crate) fn leading_ws_nl_region(content: &str) -> Option<usize> {
    let rest = content.trim_start_matches(is_xmq_whitespace);
    let region = &content[..content.len() - rest.len()];
    if region.contains('\n') {
        Some(region.len())
    } else {
        None
    }
}

///
/// The byte index where the trailing whitespace begins when that whitespace contains a
/// newline; `None` otherwise.
///
pub(crate) fn trailing_ws_nl_region(content: &str) -> Option<usize> {
    let rest = content.trim_end_matches(is_xmq_whitespace);
    let region = &content[rest.len()..];
    if region.contains('\n') {
        Some(rest.len())
    } else {
        None
    }
}

// ------------------------------------------------------------------------------------------------
// Private Types and Functions
// ------------------------------------------------------------------------------------------------

///
/// A cursor over a token slice tracking the physical column, tabs counting as eight.
///
struct ColCursor<'a> {
    src: &'a str,
    pos: usize,
    col: u32,
    line_breaks: u32,
}

impl<'a> ColCursor<'a> {
    fn new(src: &'a str, start_col: u32) -> Self {
        Self {
            src,
            pos: 0,
            col: start_col,
            line_breaks: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        match c {
            '\n' => {
                self.col = 1;
                self.line_breaks += 1;
            }
            '\t' => self.col += 8,
            _ => self.col += 1,
        }
        Some(c)
    }

    fn eat_run(&mut self, expected: char) -> usize {
        let mut n = 0;
        while self.peek() == Some(expected) {
            let _ = self.advance();
            n += 1;
        }
        n
    }

    fn restore(&mut self, mark: (usize, u32, u32)) {
        self.pos = mark.0;
        self.col = mark.1;
        self.line_breaks = mark.2;
    }
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '\t' || c == '\r')
}

///
/// Leading whitespace of a line in columns, a tab counting as eight.
///
fn leading_indent(line: &str) -> usize {
    let mut n = 0;
    for c in line.chars() {
        match c {
            ' ' => n += 1,
            '\t' => n += 8,
            _ => break,
        }
    }
    n
}

///
/// Strip up to `incidental` columns of leading whitespace.
///
fn strip_indent(line: &str, incidental: usize) -> &str {
    let mut budget = incidental;
    let mut offset = 0;
    for c in line.chars() {
        if budget == 0 {
            break;
        }
        match c {
            ' ' => {
                budget -= 1;
                offset += 1;
            }
            '\t' => {
                if budget >= 8 {
                    budget -= 8;
                    offset += 1;
                } else {
                    break;
                }
            }
            _ => break,
        }
    }
    &line[offset..]
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote_single_line() {
        assert_eq!(unquote("hello world", 4), "hello world");
        assert_eq!(unquote("  padded  ", 4), "  padded  ");
    }

    #[test]
    fn test_unquote_incidental() {
        // poem = '
        //     rose
        //     violet
        //     '
        assert_eq!(unquote("\n    rose\n    violet\n    ", 7), "rose\nviolet\n");
        // x = 'alfa
        //      beta'
        assert_eq!(unquote("alfa\n     beta", 5), "alfa\nbeta");
    }

    #[test]
    fn test_unquote_keeps_relative_indent() {
        // The first line sits deeper than a later line; restore the difference.
        assert_eq!(unquote("alfa\n  beta", 5), "   alfa\nbeta");
    }

    #[test]
    fn test_unquote_trailing_blank_lines() {
        assert_eq!(unquote("a\n\n\n", 0), "a\n\n\n");
        assert_eq!(unquote("a\n\n  ", 0), "a\n\n");
        assert_eq!(unquote("  \n  a\n  b", 0), "a\nb");
    }

    #[test]
    fn test_unquote_line_ending_whitespace() {
        assert_eq!(unquote("a  \nb", 0), "a\nb");
        assert_eq!(unquote("a\nb  ", 0), "a\nb  ");
    }

    #[test]
    fn test_decode_quote() {
        assert_eq!(decode_quote("'hello'", 1), "hello");
        assert_eq!(decode_quote("''", 1), "");
        assert_eq!(decode_quote("'''he said 'hi' '''", 1), "he said 'hi' ");
        assert_eq!(decode_quote("'a'\\\n'b'", 1), "ab");
        assert_eq!(decode_quote("'a'\\n\n'b'", 1), "a\nb");
    }

    #[test]
    fn test_decode_quote_round_trip_of_indent() {
        // msg = 'first
        //        second'
        let token = "'first\n       second'";
        assert_eq!(decode_quote(token, 7), "first\nsecond");
    }

    #[test]
    fn test_decode_comment_single_line() {
        assert_eq!(decode_comment("// hello", 1), "hello");
        assert_eq!(decode_comment("//hello  ", 1), "hello");
        assert_eq!(decode_comment("////", 1), "//");
    }

    #[test]
    fn test_decode_comment_block() {
        assert_eq!(decode_comment("/* hello */", 1), "hello");
        assert_eq!(decode_comment("/*hello*/", 1), "hello");
        assert_eq!(decode_comment("///* has */ here *///", 1), "has */ here");
        assert_eq!(decode_comment("/*a*/*b*/", 1), "a\nb");
        assert_eq!(decode_comment("///* one *///\n///* two *///", 1), "one\ntwo");
    }

    #[test]
    fn test_decode_comment_multi_line_block() {
        let token = "/* alfa\n   beta */";
        assert_eq!(decode_comment(token, 1), "alfa\nbeta");
    }

    #[test]
    fn test_count_necessary_quotes() {
        assert_eq!(count_necessary_quotes("hello"), 0);
        assert_eq!(count_necessary_quotes("hello world"), 1);
        assert_eq!(count_necessary_quotes("he said 'hi'"), 3);
        assert_eq!(count_necessary_quotes("a''b"), 3);
        assert_eq!(count_necessary_quotes("a'''b"), 4);
        assert_eq!(count_necessary_quotes("=x"), 1);
        assert_eq!(count_necessary_quotes("//x"), 1);
        assert_eq!(count_necessary_quotes("/x"), 0);
    }

    #[test]
    fn test_quote_shape() {
        let flags = EscapeFlags::default();
        let shape = quote_shape("hello world", false, flags);
        assert_eq!(shape, QuoteShape { quotes: 1, hanging: false, compound: false });

        // Trailing newline hangs in pretty mode, compounds in compact.
        let shape = quote_shape("rose\nviolet\n", false, flags);
        assert!(shape.hanging && !shape.compound);
        let shape = quote_shape("rose\nviolet\n", true, flags);
        assert!(shape.compound);

        // Leading quote hangs, ending quote compounds.
        let shape = quote_shape("'hi there", false, flags);
        assert!(shape.hanging && !shape.compound);
        let shape = quote_shape("hi there'", false, flags);
        assert!(shape.compound);

        // Mixed trailing whitespace always compounds.
        assert!(quote_shape("a\n  ", false, flags).compound);
        assert!(quote_shape("  \na", false, flags).compound);

        // A lone newline is a single entity, not a compound.
        assert!(!quote_shape("\n", false, flags).compound);
    }

    #[test]
    fn test_count_necessary_slashes() {
        assert_eq!(count_necessary_slashes("plain"), 1);
        assert_eq!(count_necessary_slashes("has */ inside"), 2);
        assert_eq!(count_necessary_slashes("a *// b */// c"), 4);
    }

    #[test]
    fn test_comment_escape_involution() {
        let cases = ["a -- b", "---", "-\u{2410}-", "no dashes", "- - -"];
        for case in cases {
            assert_eq!(unescape_comment(&escape_comment(case)), case);
        }
        assert_eq!(escape_comment("a--b"), "a-\u{2410}-b");
    }

    #[test]
    fn test_quote_unquote_round_trip() {
        let safe_strings = [
            "hello",
            "hello world",
            "one\ntwo\nthree",
            "tail\n",
            "he said 'hi'",
            "  leading spaces",
        ];
        for s in safe_strings {
            for k in 0..=16usize {
                let shape = quote_shape(s, false, EscapeFlags::default());
                if shape.compound {
                    continue;
                }
                let encoded = encode_for_test(s, k, &shape);
                let decoded = decode_quote(&encoded, k as u32 + 1);
                assert_eq!(decoded, s, "k={} encoded={:?}", k, encoded);
            }
        }
    }

    // A miniature quote emitter matching the printer's layout, used to close the loop
    // with `decode_quote` without dragging the whole print state in.
    fn encode_for_test(s: &str, indent: usize, shape: &QuoteShape) -> String {
        let quotes = shape.quotes.max(1);
        let mut out = String::new();
        for _ in 0..quotes {
            out.push('\'');
        }
        let inner_indent = if shape.hanging {
            indent
        } else {
            indent + quotes
        };
        if shape.hanging {
            out.push('\n');
            out.push_str(&" ".repeat(inner_indent));
        }
        for (i, line) in s.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
                if !line.is_empty() || shape.hanging {
                    out.push_str(&" ".repeat(inner_indent));
                }
            }
            out.push_str(line);
        }
        for _ in 0..quotes {
            out.push('\'');
        }
        out
    }
}
