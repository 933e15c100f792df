/*!
The XMQ tokenizer.

[`Tokenizer`] is a lazy sequence of typed tokens over an in-memory buffer. A token is a
category plus the 1-based line and column where it starts and the byte range it covers;
the body of a quote or comment is not interpreted here, only its range is returned (see
the `quoting` module for decoding). The same token stream drives both tree construction
and token colouring.
*/

use crate::error::{Error, LexErrorKind, Position, Result};
use crate::syntax::*;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

///
/// The lexical categories of XMQ.
///
/// The two parenthesis roles (attribute list and compound value) share the same lexical
/// category here; the parser disambiguates them by position.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Spaces, tabs, carriage returns and newlines.
    Whitespace,
    /// `=`
    Equals,
    /// `{`
    BraceLeft,
    /// `}`
    BraceRight,
    /// `(`
    ParenLeft,
    /// `)`
    ParenRight,
    /// `'...'`, `''`, `'''...'''`, including any continuation chain.
    Quote,
    /// `&name;`, `&#10;`, `&#x1F600;`
    Entity,
    /// `//...` or a `/*...*/` block chain.
    Comment,
    /// A run of safe characters.
    Text,
}

///
/// One token: its category, the position where it starts and the byte range it covers
/// in the source buffer.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    /// The lexical category.
    pub kind: TokenKind,
    /// 1-based line of the first byte.
    pub line: u32,
    /// 1-based column of the first byte, tabs counting as eight.
    pub col: u32,
    /// Byte offset of the first byte.
    pub start: usize,
    /// Byte offset one past the last byte.
    pub stop: usize,
}

///
/// A lazy iterator of [`Token`]s over a source buffer. Yields `Err` once on the first
/// lexical error and then ends.
///
#[derive(Clone, Debug)]
pub struct Tokenizer<'a> {
    cursor: Cursor<'a>,
    errored: bool,
    suspicious_quote_end: Option<Position>,
}

// ------------------------------------------------------------------------------------------------
// Private Types
// ------------------------------------------------------------------------------------------------

///
/// A character cursor tracking byte offset and physical line/column.
///
#[derive(Clone, Debug)]
pub(crate) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    col: u32,
}

// ------------------------------------------------------------------------------------------------
// Implementations
// ------------------------------------------------------------------------------------------------

impl Token {
    /// The slice of `source` this token covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.stop]
    }

    /// The position of the first byte.
    pub fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }
}

// ------------------------------------------------------------------------------------------------

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    pub(crate) fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        let _ = chars.next();
        chars.next()
    }

    pub(crate) fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        match c {
            '\n' => {
                self.line += 1;
                self.col = 1;
            }
            '\t' => self.col += 8,
            _ => self.col += 1,
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            let _ = self.advance();
            true
        } else {
            false
        }
    }

    ///
    /// Count and consume a run of `c`, returning its length.
    ///
    fn eat_run(&mut self, c: char) -> usize {
        let mut n = 0;
        while self.peek() == Some(c) {
            let _ = self.advance();
            n += 1;
        }
        n
    }
}

// ------------------------------------------------------------------------------------------------

impl<'a> Tokenizer<'a> {
    /// A tokenizer over the whole of `src`.
    pub fn new(src: &'a str) -> Self {
        Self {
            cursor: Cursor::new(src),
            errored: false,
            suspicious_quote_end: None,
        }
    }

    /// The current position of the tokenizer.
    pub fn position(&self) -> Position {
        self.cursor.position()
    }

    ///
    /// The position of the most recent quote that ended flush against following text,
    /// which often indicates a mis-counted quote run in the source.
    ///
    pub fn suspicious_quote_end(&self) -> Option<Position> {
        self.suspicious_quote_end
    }

    fn token(&mut self, kind: TokenKind, start: usize, line: u32, col: u32) -> Token {
        Token {
            kind,
            line,
            col,
            start,
            stop: self.cursor.pos(),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        let c = match self.cursor.peek() {
            None => return Ok(None),
            Some(c) => c,
        };
        let start = self.cursor.pos();
        let line = self.cursor.line;
        let col = self.cursor.col;

        let kind = if is_xmq_whitespace(c) {
            while matches!(self.cursor.peek(), Some(c) if is_xmq_whitespace(c)) {
                let _ = self.cursor.advance();
            }
            TokenKind::Whitespace
        } else if c == XMQ_EQUALS_CHAR {
            let _ = self.cursor.advance();
            TokenKind::Equals
        } else if c == XMQ_BRACE_LEFT_CHAR {
            let _ = self.cursor.advance();
            TokenKind::BraceLeft
        } else if c == XMQ_BRACE_RIGHT_CHAR {
            let _ = self.cursor.advance();
            TokenKind::BraceRight
        } else if c == XMQ_PAREN_LEFT_CHAR {
            let _ = self.cursor.advance();
            TokenKind::ParenLeft
        } else if c == XMQ_PAREN_RIGHT_CHAR {
            let _ = self.cursor.advance();
            TokenKind::ParenRight
        } else if c == XMQ_QUOTE_CHAR {
            self.lex_quote_chain()?;
            if matches!(self.cursor.peek(), Some(c) if is_safe_char(c)) {
                self.suspicious_quote_end = Some(self.cursor.position());
            }
            TokenKind::Quote
        } else if c == XMQ_AMP_CHAR {
            self.lex_entity()?;
            TokenKind::Entity
        } else if c == XMQ_SLASH_CHAR
            && matches!(self.cursor.peek_second(), Some('/') | Some('*'))
        {
            self.lex_comment()?;
            TokenKind::Comment
        } else if is_safe_char(c) {
            while matches!(self.cursor.peek(), Some(c) if is_safe_char(c)) {
                let _ = self.cursor.advance();
            }
            TokenKind::Text
        } else {
            return Err(Error::lex(
                LexErrorKind::StrayCharacter(c),
                Position::new(line, col),
            ));
        };

        Ok(Some(self.token(kind, start, line, col)))
    }

    ///
    /// Lex one quote literal plus any `\`/`\n` continuation suffixes joining further
    /// quote literals into the same token.
    ///
    fn lex_quote_chain(&mut self) -> Result<()> {
        loop {
            self.lex_single_quote()?;
            if self.cursor.peek() != Some('\\') {
                return Ok(());
            }
            let continuation_pos = self.cursor.position();
            let _ = self.cursor.advance();
            match self.cursor.peek() {
                Some('\n') => {
                    let _ = self.cursor.advance();
                }
                Some('n') => {
                    let _ = self.cursor.advance();
                    if !self.cursor.eat('\n') {
                        return Err(Error::lex(LexErrorKind::BadContinuation, continuation_pos));
                    }
                }
                _ => return Err(Error::lex(LexErrorKind::BadContinuation, continuation_pos)),
            }
            while matches!(self.cursor.peek(), Some(c) if is_xmq_whitespace(c)) {
                let _ = self.cursor.advance();
            }
            if self.cursor.peek() != Some(XMQ_QUOTE_CHAR) {
                return Err(Error::lex(LexErrorKind::BadContinuation, continuation_pos));
            }
        }
    }

    fn lex_single_quote(&mut self) -> Result<()> {
        let open_pos = self.cursor.position();
        let open = self.cursor.eat_run(XMQ_QUOTE_CHAR);
        debug_assert!(open > 0);

        // A run of exactly two quotes is the empty string literal.
        if open == 2 {
            return Ok(());
        }

        loop {
            match self.cursor.peek() {
                None => return Err(Error::lex(LexErrorKind::UnterminatedQuote, open_pos)),
                Some(XMQ_QUOTE_CHAR) => {
                    let run = self.cursor.eat_run(XMQ_QUOTE_CHAR);
                    if run == open {
                        return Ok(());
                    }
                    if run > open {
                        return Err(Error::lex(LexErrorKind::TooManyQuotes, open_pos));
                    }
                }
                Some(_) => {
                    let _ = self.cursor.advance();
                }
            }
        }
    }

    fn lex_entity(&mut self) -> Result<()> {
        let start_pos = self.cursor.position();
        let _ = self.cursor.advance(); // &
        loop {
            match self.cursor.peek() {
                Some(';') => {
                    let _ = self.cursor.advance();
                    return Ok(());
                }
                Some(c) if c.is_ascii_alphanumeric() || c == '#' => {
                    let _ = self.cursor.advance();
                }
                _ => return Err(Error::lex(LexErrorKind::UnterminatedEntity, start_pos)),
            }
        }
    }

    ///
    /// Lex a comment. `//` runs to end of line. A block comment opened by N slashes and
    /// an asterisk runs to an asterisk followed by N slashes; adjacent blocks joined by
    /// `*` directly or separated by a single newline continue the same token.
    ///
    fn lex_comment(&mut self) -> Result<()> {
        let start_pos = self.cursor.position();
        let slashes = self.cursor.eat_run(XMQ_SLASH_CHAR);

        if self.cursor.peek() != Some('*') {
            // Single line comment, up to but not including the newline.
            while matches!(self.cursor.peek(), Some(c) if c != '\n') {
                let _ = self.cursor.advance();
            }
            return Ok(());
        }

        let _ = self.cursor.advance(); // *
        loop {
            self.lex_comment_body(slashes, start_pos)?;
            // A `*` straight after the closing run restarts the block (the compact
            // join); a single newline followed by the same opening does too.
            if self.cursor.eat('*') {
                continue;
            }
            let mark = self.cursor.clone();
            while matches!(self.cursor.peek(), Some(' ') | Some('\t')) {
                let _ = self.cursor.advance();
            }
            if self.cursor.eat('\n') {
                while matches!(self.cursor.peek(), Some(' ') | Some('\t')) {
                    let _ = self.cursor.advance();
                }
                if self.comment_reopens(slashes) {
                    let _ = self.cursor.eat_run(XMQ_SLASH_CHAR);
                    let _ = self.cursor.advance(); // *
                    continue;
                }
            }
            self.cursor = mark;
            return Ok(());
        }
    }

    fn comment_reopens(&self, slashes: usize) -> bool {
        let rest = &self.cursor.src[self.cursor.pos()..];
        let run = rest.chars().take_while(|c| *c == XMQ_SLASH_CHAR).count();
        run == slashes && rest[run..].starts_with('*')
    }

    fn lex_comment_body(&mut self, slashes: usize, start_pos: Position) -> Result<()> {
        loop {
            match self.cursor.peek() {
                None => return Err(Error::lex(LexErrorKind::UnterminatedComment, start_pos)),
                Some('*') => {
                    let mark = self.cursor.clone();
                    let _ = self.cursor.advance();
                    let run = self.cursor.eat_run(XMQ_SLASH_CHAR);
                    if run >= slashes {
                        return Ok(());
                    }
                    // Not a closing run, keep it as content.
                    self.cursor = mark;
                    let _ = self.cursor.advance();
                }
                Some(_) => {
                    let _ = self.cursor.advance();
                }
            }
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => None,
            Err(err) => {
                self.errored = true;
                Some(Err(err))
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Tokenizer::new(src)
            .map(|t| t.unwrap().kind)
            .collect::<Vec<_>>()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("greeting = 'hello world'\n"),
            vec![
                TokenKind::Text,
                TokenKind::Whitespace,
                TokenKind::Equals,
                TokenKind::Whitespace,
                TokenKind::Quote,
                TokenKind::Whitespace,
            ]
        );
        assert_eq!(
            kinds("config(mode=fast) { timeout = 30 }"),
            vec![
                TokenKind::Text,
                TokenKind::ParenLeft,
                TokenKind::Text,
                TokenKind::Equals,
                TokenKind::Text,
                TokenKind::ParenRight,
                TokenKind::Whitespace,
                TokenKind::BraceLeft,
                TokenKind::Whitespace,
                TokenKind::Text,
                TokenKind::Whitespace,
                TokenKind::Equals,
                TokenKind::Whitespace,
                TokenKind::Text,
                TokenKind::Whitespace,
                TokenKind::BraceRight,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Tokenizer::new("a {\n    b\n}")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let b = tokens.iter().find(|t| t.start == 8).unwrap();
        assert_eq!((b.line, b.col), (2, 5));
        assert_eq!(b.kind, TokenKind::Text);
    }

    #[test]
    fn test_tab_counts_as_eight() {
        let tokens = Tokenizer::new("\tx").collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(tokens[1].col, 9);
    }

    #[test]
    fn test_quotes() {
        assert_eq!(kinds("''"), vec![TokenKind::Quote]);
        assert_eq!(
            kinds("'a' 'b'"),
            vec![TokenKind::Quote, TokenKind::Whitespace, TokenKind::Quote]
        );
        assert_eq!(kinds("'''he said 'hi' '''"), vec![TokenKind::Quote]);
        let err = Tokenizer::new("'open").last().unwrap().unwrap_err();
        assert_eq!(
            err,
            Error::lex(LexErrorKind::UnterminatedQuote, Position::new(1, 1))
        );
        let err = Tokenizer::new("'a''").last().unwrap().unwrap_err();
        assert_eq!(
            err,
            Error::lex(LexErrorKind::TooManyQuotes, Position::new(1, 1))
        );
    }

    #[test]
    fn test_quote_continuation() {
        assert_eq!(kinds("'a'\\\n'b'"), vec![TokenKind::Quote]);
        assert_eq!(kinds("'a'\\n\n'b'"), vec![TokenKind::Quote]);
        let err = Tokenizer::new("'a'\\x").last().unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Lex {
                kind: LexErrorKind::BadContinuation,
                ..
            }
        ));
    }

    #[test]
    fn test_entities() {
        assert_eq!(kinds("&nbsp;"), vec![TokenKind::Entity]);
        assert_eq!(kinds("&#x1F600;"), vec![TokenKind::Entity]);
        // An ampersand inside a text run stays text; entities start at token starts.
        assert_eq!(kinds("a&#10;b"), vec![TokenKind::Text]);
        assert_eq!(kinds("'q'&#10;"), vec![TokenKind::Quote, TokenKind::Entity]);
        let err = Tokenizer::new("&nbsp").last().unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Lex {
                kind: LexErrorKind::UnterminatedEntity,
                ..
            }
        ));
    }

    #[test]
    fn test_comments() {
        assert_eq!(kinds("// hi"), vec![TokenKind::Comment]);
        assert_eq!(
            kinds("// hi\nx"),
            vec![TokenKind::Comment, TokenKind::Whitespace, TokenKind::Text]
        );
        assert_eq!(kinds("/* block */"), vec![TokenKind::Comment]);
        assert_eq!(kinds("///* has */ inside *///"), vec![TokenKind::Comment]);
        assert_eq!(kinds("/*a*/*b*/"), vec![TokenKind::Comment]);
        assert_eq!(
            kinds("///* one *///\n///* two *///"),
            vec![TokenKind::Comment]
        );
        let err = Tokenizer::new("/* open").last().unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Lex {
                kind: LexErrorKind::UnterminatedComment,
                ..
            }
        ));
    }

    #[test]
    fn test_stray_characters() {
        let err = Tokenizer::new("\"text\"").next().unwrap().unwrap_err();
        assert_eq!(
            err,
            Error::lex(LexErrorKind::StrayCharacter('"'), Position::new(1, 1))
        );
    }

    #[test]
    fn test_suspicious_quote_end() {
        let mut tokenizer = Tokenizer::new("'hi'next");
        let _ = tokenizer.next();
        assert!(tokenizer.suspicious_quote_end().is_some());
    }
}
