/*!
The XMQ parser.

The parser pulls tokens from the tokenizer, assigns each one its grammar *role*, and
dispatches role-tagged tokens to a [`TokenSink`]. Tree construction and token colouring
are both sinks; swapping the sink swaps the output with no change to the grammar. All
parser state lives in the [`Parser`] value, errors unwind to the caller as typed
results.
*/

use crate::detect::ContentType;
use crate::dom::{decode_numeric_entity, AttrPart, Attribute, Document, NodeId, NodeKind, QName};
use crate::error::{Error, Position, Result, SyntaxErrorKind, Warning};
use crate::quoting::{decode_comment, decode_quote};
use crate::syntax::*;
use crate::theme::Role;
use crate::token::{Token, TokenKind, Tokenizer};

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

///
/// How whitespace inside ingested text is treated.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrimMode {
    /// Heuristic for XML and HTML sources, nothing extra for XMQ and JSON.
    #[default]
    Default,
    /// Keep every byte of character data.
    None,
    /// Remove incidental indentation from all multi-line text.
    Heuristic,
    /// Reserved; rejected at runtime.
    Exact,
}

///
/// Options accepted by every parse entry point.
///
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Merge adjacent text and substitute numeric character entities. Default on.
    pub merge_text: bool,
    /// Whitespace trimming on ingestion.
    pub trim: TrimMode,
    /// Wrap the parse in an element of this name when the source does not already
    /// have that single root.
    pub implicit_root: Option<String>,
    /// Assert the content type instead of trusting detection.
    pub content_type: Option<ContentType>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            merge_text: true,
            trim: TrimMode::Default,
            implicit_root: None,
            content_type: None,
        }
    }
}

impl ParseOptions {
    ///
    /// The trim mode that actually applies to a source of the given type: the default
    /// is heuristic for XML and HTML and nothing extra for XMQ and JSON, whose
    /// syntaxes carry their own whitespace rules.
    ///
    pub fn effective_trim(&self, content_type: ContentType) -> TrimMode {
        match self.trim {
            TrimMode::Default => match content_type {
                ContentType::Xml | ContentType::Html => TrimMode::Heuristic,
                _ => TrimMode::None,
            },
            other => other,
        }
    }
}

///
/// A consumer of role-tagged tokens. The parser calls `token` for every token in
/// source order, whitespace included, and `done` at the end of input.
///
pub(crate) trait TokenSink {
    fn token(&mut self, role: Role, token: &Token, text: &str) -> Result<()>;

    fn done(&mut self) -> Result<()> {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Public (crate) Functions
// ------------------------------------------------------------------------------------------------

///
/// Parse XMQ source into a document tree.
///
pub(crate) fn parse_xmq_document(src: &str, options: &ParseOptions) -> Result<Document> {
    let wrap = match &options.implicit_root {
        Some(root) if needs_implicit_root(src, root) => Some(root.clone()),
        _ => None,
    };
    let allow_multiple_roots = wrap.is_some();

    let mut builder = TreeBuilder::new(options, wrap.as_deref());
    let mut parser = Parser::new(src, allow_multiple_roots);
    parser.parse(&mut builder)?;

    let mut document = builder.finish();
    if let Some(pos) = parser.suspicious_quote_end() {
        document.push_warning(Warning::AmbiguousQuoting(pos));
    }
    Ok(document)
}

///
/// Drive an arbitrary sink over XMQ source; used by the token colorizer.
///
pub(crate) fn parse_xmq_tokens<S: TokenSink>(src: &str, sink: &mut S) -> Result<()> {
    let mut parser = Parser::new(src, true);
    parser.parse(sink)
}

// ------------------------------------------------------------------------------------------------
// The Parser
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ValueLevel {
    Element,
    Attr,
}

impl ValueLevel {
    fn text_role(self) -> Role {
        match self {
            ValueLevel::Element => Role::ElementValueText,
            ValueLevel::Attr => Role::AttrValueText,
        }
    }
    fn quote_role(self) -> Role {
        match self {
            ValueLevel::Element => Role::ElementValueQuote,
            ValueLevel::Attr => Role::AttrValueQuote,
        }
    }
    fn entity_role(self) -> Role {
        match self {
            ValueLevel::Element => Role::ElementValueEntity,
            ValueLevel::Attr => Role::AttrValueEntity,
        }
    }
    fn compound_quote_role(self) -> Role {
        match self {
            ValueLevel::Element => Role::ElementValueCompoundQuote,
            ValueLevel::Attr => Role::AttrValueCompoundQuote,
        }
    }
    fn compound_entity_role(self) -> Role {
        match self {
            ValueLevel::Element => Role::ElementValueCompoundEntity,
            ValueLevel::Attr => Role::AttrValueCompoundEntity,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParsedNode {
    Element,
    DocType,
    Pi,
}

pub(crate) struct Parser<'a> {
    src: &'a str,
    tokens: Tokenizer<'a>,
    peeked: Option<Token>,
    allow_multiple_roots: bool,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str, allow_multiple_roots: bool) -> Self {
        Self {
            src,
            tokens: Tokenizer::new(src),
            peeked: None,
            allow_multiple_roots,
        }
    }

    pub(crate) fn suspicious_quote_end(&self) -> Option<Position> {
        self.tokens.suspicious_quote_end()
    }

    fn text_of(&self, token: &Token) -> &'a str {
        token.text(self.src)
    }

    ///
    /// Peek the next significant token, forwarding whitespace to the sink so that the
    /// sink sees every byte of the source in order.
    ///
    fn peek<S: TokenSink>(&mut self, sink: &mut S) -> Result<Option<Token>> {
        while self.peeked.is_none() {
            match self.tokens.next() {
                None => return Ok(None),
                Some(Err(err)) => return Err(err),
                Some(Ok(token)) if token.kind == TokenKind::Whitespace => {
                    sink.token(Role::Whitespace, &token, self.text_of(&token))?;
                }
                Some(Ok(token)) => self.peeked = Some(token),
            }
        }
        Ok(self.peeked)
    }

    fn take(&mut self) -> Token {
        self.peeked.take().expect("token was peeked")
    }

    fn emit<S: TokenSink>(&self, sink: &mut S, role: Role, token: &Token) -> Result<()> {
        sink.token(role, token, self.text_of(token))
    }

    pub(crate) fn parse<S: TokenSink>(&mut self, sink: &mut S) -> Result<()> {
        let mut roots = 0usize;
        loop {
            let token = match self.peek(sink)? {
                None => break,
                Some(token) => token,
            };
            match token.kind {
                TokenKind::Comment => {
                    let token = self.take();
                    self.emit(sink, Role::Comment, &token)?;
                }
                TokenKind::Text => {
                    let at_limit = !self.allow_multiple_roots && roots >= 1;
                    let pos = token.position();
                    let parsed = self.parse_node(sink)?;
                    if parsed == ParsedNode::Element {
                        if at_limit {
                            return Err(Error::syntax(SyntaxErrorKind::MultipleRoots, pos));
                        }
                        roots += 1;
                    }
                }
                TokenKind::Quote => {
                    if !self.allow_multiple_roots && roots >= 1 {
                        return Err(Error::syntax(
                            SyntaxErrorKind::MultipleRoots,
                            token.position(),
                        ));
                    }
                    roots += 1;
                    let token = self.take();
                    self.emit(sink, Role::Quote, &token)?;
                }
                TokenKind::Entity => {
                    if !self.allow_multiple_roots && roots >= 1 {
                        return Err(Error::syntax(
                            SyntaxErrorKind::MultipleRoots,
                            token.position(),
                        ));
                    }
                    roots += 1;
                    let token = self.take();
                    self.emit(sink, Role::Entity, &token)?;
                }
                TokenKind::BraceRight => {
                    return Err(Error::syntax(
                        SyntaxErrorKind::UnexpectedClosingBrace,
                        token.position(),
                    ));
                }
                TokenKind::ParenRight => {
                    return Err(Error::syntax(
                        SyntaxErrorKind::UnexpectedClosingParen,
                        token.position(),
                    ));
                }
                _ => {
                    return Err(Error::syntax(
                        SyntaxErrorKind::Unexpected("token at top level"),
                        token.position(),
                    ));
                }
            }
        }
        sink.done()
    }

    fn parse_node<S: TokenSink>(&mut self, sink: &mut S) -> Result<ParsedNode> {
        let token = self.take();
        debug_assert_eq!(token.kind, TokenKind::Text);
        let text = self.text_of(&token);

        if text == XMQ_DOCTYPE_NAME {
            self.emit(sink, Role::ElementKey, &token)?;
            self.expect_equals(sink)?;
            self.parse_value(sink, ValueLevel::Element)?;
            return Ok(ParsedNode::DocType);
        }

        if let Some(target) = text.strip_prefix(XMQ_PI_PREFIX) {
            if !is_xmq_ident(target) {
                return Err(Error::syntax(
                    SyntaxErrorKind::InvalidName(text.to_string()),
                    token.position(),
                ));
            }
            self.emit(sink, Role::ElementKey, &token)?;
            if matches!(self.peek(sink)?, Some(t) if t.kind == TokenKind::Equals) {
                let equals = self.take();
                self.emit(sink, Role::Equals, &equals)?;
                self.parse_value(sink, ValueLevel::Element)?;
            }
            return Ok(ParsedNode::Pi);
        }

        // An element; a `=` straight after the name makes it a key.
        let is_key = matches!(self.peek(sink)?, Some(t) if t.kind == TokenKind::Equals);
        let name_role = if is_key {
            Role::ElementKey
        } else {
            Role::ElementName
        };
        self.emit_name(sink, &token, text, Role::ElementNs, name_role)?;

        if matches!(self.peek(sink)?, Some(t) if t.kind == TokenKind::ParenLeft) {
            self.parse_attributes(sink)?;
        }

        match self.peek(sink)? {
            Some(t) if t.kind == TokenKind::BraceLeft => {
                let brace = self.take();
                self.emit(sink, Role::BraceLeft, &brace)?;
                self.parse_children(sink, brace.position())?;
            }
            Some(t) if t.kind == TokenKind::Equals => {
                let equals = self.take();
                self.emit(sink, Role::Equals, &equals)?;
                self.parse_value(sink, ValueLevel::Element)?;
            }
            _ => {}
        }
        Ok(ParsedNode::Element)
    }

    fn parse_children<S: TokenSink>(&mut self, sink: &mut S, open: Position) -> Result<()> {
        loop {
            let token = match self.peek(sink)? {
                None => {
                    return Err(Error::syntax(SyntaxErrorKind::MissingClosing('{'), open));
                }
                Some(token) => token,
            };
            match token.kind {
                TokenKind::BraceRight => {
                    let token = self.take();
                    self.emit(sink, Role::BraceRight, &token)?;
                    return Ok(());
                }
                TokenKind::Comment => {
                    let token = self.take();
                    self.emit(sink, Role::Comment, &token)?;
                }
                TokenKind::Text => {
                    let _ = self.parse_node(sink)?;
                }
                TokenKind::Quote => {
                    let token = self.take();
                    self.emit(sink, Role::Quote, &token)?;
                }
                TokenKind::Entity => {
                    let token = self.take();
                    self.emit(sink, Role::Entity, &token)?;
                }
                _ => {
                    return Err(Error::syntax(
                        SyntaxErrorKind::Unexpected("token inside braces"),
                        token.position(),
                    ));
                }
            }
        }
    }

    fn parse_attributes<S: TokenSink>(&mut self, sink: &mut S) -> Result<()> {
        let open = self.take();
        debug_assert_eq!(open.kind, TokenKind::ParenLeft);
        self.emit(sink, Role::AparLeft, &open)?;

        loop {
            let token = match self.peek(sink)? {
                None => {
                    return Err(Error::syntax(
                        SyntaxErrorKind::MissingClosing('('),
                        open.position(),
                    ));
                }
                Some(token) => token,
            };
            match token.kind {
                TokenKind::ParenRight => {
                    let token = self.take();
                    self.emit(sink, Role::AparRight, &token)?;
                    return Ok(());
                }
                TokenKind::Text => {
                    let token = self.take();
                    let text = self.text_of(&token);
                    if text == XMLNS_ATTRIBUTE {
                        self.emit(sink, Role::NsDeclaration, &token)?;
                    } else if let Some(prefix) = text.strip_prefix(XMLNS_ATTRIBUTE_PREFIX) {
                        if !is_xmq_ident(prefix) {
                            return Err(Error::syntax(
                                SyntaxErrorKind::InvalidName(text.to_string()),
                                token.position(),
                            ));
                        }
                        let (keyword, colon, local) =
                            split_name_token(&token, XMLNS_ATTRIBUTE.len());
                        self.emit(sink, Role::NsDeclaration, &keyword)?;
                        self.emit(sink, Role::NsColon, &colon)?;
                        self.emit(sink, Role::AttrNs, &local)?;
                    } else {
                        self.emit_name(sink, &token, text, Role::AttrNs, Role::AttrKey)?;
                    }
                    if matches!(self.peek(sink)?, Some(t) if t.kind == TokenKind::Equals) {
                        let equals = self.take();
                        self.emit(sink, Role::Equals, &equals)?;
                        self.parse_value(sink, ValueLevel::Attr)?;
                    }
                }
                _ => {
                    return Err(Error::syntax(
                        SyntaxErrorKind::ExpectedAttributeName,
                        token.position(),
                    ));
                }
            }
        }
    }

    fn parse_value<S: TokenSink>(&mut self, sink: &mut S, level: ValueLevel) -> Result<()> {
        let token = match self.peek(sink)? {
            None => {
                return Err(Error::syntax(
                    SyntaxErrorKind::ExpectedValue,
                    self.tokens.position(),
                ));
            }
            Some(token) => token,
        };
        match token.kind {
            TokenKind::Text => {
                let token = self.take();
                self.emit(sink, level.text_role(), &token)
            }
            TokenKind::Quote => {
                let token = self.take();
                self.emit(sink, level.quote_role(), &token)
            }
            TokenKind::Entity => {
                let token = self.take();
                self.emit(sink, level.entity_role(), &token)
            }
            TokenKind::ParenLeft => {
                let open = self.take();
                self.emit(sink, Role::CparLeft, &open)?;
                loop {
                    let token = match self.peek(sink)? {
                        None => {
                            return Err(Error::syntax(
                                SyntaxErrorKind::MissingClosing('('),
                                open.position(),
                            ));
                        }
                        Some(token) => token,
                    };
                    match token.kind {
                        TokenKind::ParenRight => {
                            let token = self.take();
                            self.emit(sink, Role::CparRight, &token)?;
                            return Ok(());
                        }
                        TokenKind::Quote => {
                            let token = self.take();
                            self.emit(sink, level.compound_quote_role(), &token)?;
                        }
                        TokenKind::Entity => {
                            let token = self.take();
                            self.emit(sink, level.compound_entity_role(), &token)?;
                        }
                        TokenKind::Text => {
                            let token = self.take();
                            self.emit(sink, level.text_role(), &token)?;
                        }
                        _ => {
                            return Err(Error::syntax(
                                SyntaxErrorKind::ExpectedValue,
                                token.position(),
                            ));
                        }
                    }
                }
            }
            _ => Err(Error::syntax(
                SyntaxErrorKind::ExpectedValue,
                token.position(),
            )),
        }
    }

    fn expect_equals<S: TokenSink>(&mut self, sink: &mut S) -> Result<()> {
        match self.peek(sink)? {
            Some(t) if t.kind == TokenKind::Equals => {
                let equals = self.take();
                self.emit(sink, Role::Equals, &equals)
            }
            Some(t) => Err(Error::syntax(SyntaxErrorKind::ExpectedValue, t.position())),
            None => Err(Error::syntax(
                SyntaxErrorKind::ExpectedValue,
                self.tokens.position(),
            )),
        }
    }

    ///
    /// Emit a possibly prefixed name as its role-tagged parts, validating the
    /// identifier grammar.
    ///
    fn emit_name<S: TokenSink>(
        &mut self,
        sink: &mut S,
        token: &Token,
        text: &str,
        ns_role: Role,
        name_role: Role,
    ) -> Result<()> {
        match text.split_once(XMQ_NS_SEPARATOR) {
            Some((prefix, local)) => {
                if !is_xmq_ident(prefix) || !is_xmq_ident(local) {
                    return Err(Error::syntax(
                        SyntaxErrorKind::InvalidName(text.to_string()),
                        token.position(),
                    ));
                }
                let (prefix_tok, colon_tok, local_tok) = split_name_token(token, prefix.len());
                self.emit(sink, ns_role, &prefix_tok)?;
                self.emit(sink, Role::NsColon, &colon_tok)?;
                self.emit(sink, name_role, &local_tok)
            }
            None => {
                if !is_xmq_ident(text) {
                    return Err(Error::syntax(
                        SyntaxErrorKind::InvalidName(text.to_string()),
                        token.position(),
                    ));
                }
                self.emit(sink, name_role, token)
            }
        }
    }
}

///
/// Split a `prefix:local` text token into three sub-tokens at the given prefix byte
/// length. Names are ASCII-safe enough that byte length equals column width here only
/// when the prefix is ASCII; count characters to keep columns honest.
///
fn split_name_token(token: &Token, prefix_len: usize) -> (Token, Token, Token) {
    let prefix_cols = prefix_len as u32; // prefixes are identifiers, one column per char
    let prefix = Token {
        kind: TokenKind::Text,
        line: token.line,
        col: token.col,
        start: token.start,
        stop: token.start + prefix_len,
    };
    let colon = Token {
        kind: TokenKind::Text,
        line: token.line,
        col: token.col + prefix_cols,
        start: token.start + prefix_len,
        stop: token.start + prefix_len + 1,
    };
    let local = Token {
        kind: TokenKind::Text,
        line: token.line,
        col: token.col + prefix_cols + 1,
        start: token.start + prefix_len + 1,
        stop: token.stop,
    };
    (prefix, colon, local)
}

///
/// Does the source need wrapping in the implicit root? Scan past whitespace, comments
/// and a document type declaration; the answer is no only when the first element is
/// already named `root`.
///
fn needs_implicit_root(src: &str, root: &str) -> bool {
    let mut tokens = Tokenizer::new(src);
    let mut skip_value = false;
    while let Some(Ok(token)) = tokens.next() {
        match token.kind {
            TokenKind::Whitespace | TokenKind::Comment => {}
            TokenKind::Equals if skip_value => {}
            TokenKind::Text | TokenKind::Quote if skip_value => {
                skip_value = false;
            }
            TokenKind::Text => {
                let text = token.text(src);
                if text == XMQ_DOCTYPE_NAME {
                    skip_value = true;
                    continue;
                }
                return text != root;
            }
            _ => return true,
        }
    }
    true
}

// ------------------------------------------------------------------------------------------------
// The Tree Builder
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
    Element,
    DocType(Option<NodeId>),
    Pi(NodeId),
}

#[derive(Clone, Debug)]
struct PendingAttr {
    name: QName,
    is_ns_decl: bool,
    ns_decl_prefix: Option<String>,
    value: Option<Vec<AttrPart>>,
}

///
/// The sink that builds a [`Document`] from role-tagged tokens.
///
pub(crate) struct TreeBuilder<'o> {
    options: &'o ParseOptions,
    doc: Document,
    stack: Vec<NodeId>,
    current: Option<NodeId>,
    pending: Pending,
    pending_prefix: Option<String>,
    pending_attr_prefix: Option<String>,
    attr: Option<PendingAttr>,
}

impl<'o> TreeBuilder<'o> {
    pub(crate) fn new(options: &'o ParseOptions, implicit_root: Option<&str>) -> Self {
        let mut doc = Document::new();
        let root = doc.root();
        let top = match implicit_root {
            Some(name) => doc.append_element(root, QName::parse(name)),
            None => root,
        };
        Self {
            options,
            doc,
            stack: vec![top],
            current: None,
            pending: Pending::Element,
            pending_prefix: None,
            pending_attr_prefix: None,
            attr: None,
        }
    }

    pub(crate) fn finish(self) -> Document {
        self.doc
    }

    fn top(&self) -> NodeId {
        *self.stack.last().expect("parent stack is never empty")
    }

    ///
    /// Append character data under `parent`, merging with an adjacent text sibling
    /// when merging is on.
    ///
    fn append_text_data(&mut self, parent: NodeId, data: &str) {
        if self.options.merge_text {
            let _ = self.doc.append_text_merged(parent, data);
        } else {
            let _ = self.doc.append_text(parent, data);
        }
    }

    ///
    /// Append an entity reference under `parent`. Numeric references are validated
    /// always and substituted into text when merging is on.
    ///
    fn append_entity_data(&mut self, parent: NodeId, name: &str) -> Result<()> {
        match decode_numeric_entity(name)? {
            Some(c) if self.options.merge_text => {
                self.append_text_data(parent, &c.to_string());
            }
            _ => {
                let _ = self.doc.append_entity_ref(parent, name);
            }
        }
        Ok(())
    }

    fn push_attr_part(&mut self, part: AttrPart) {
        if let Some(attr) = &mut self.attr {
            let parts = attr.value.get_or_insert_with(Vec::new);
            match (&part, parts.last_mut()) {
                (AttrPart::Text(text), Some(AttrPart::Text(existing))) => {
                    existing.push_str(text);
                }
                _ => parts.push(part),
            }
        }
    }

    fn push_attr_entity(&mut self, name: &str) -> Result<()> {
        match decode_numeric_entity(name)? {
            Some(c) if self.options.merge_text => {
                self.push_attr_part(AttrPart::Text(c.to_string()));
            }
            _ => {
                if let Some(attr) = &mut self.attr {
                    let parts = attr.value.get_or_insert_with(Vec::new);
                    parts.push(AttrPart::EntityRef(name.to_string()));
                }
            }
        }
        Ok(())
    }

    fn flush_attr(&mut self) {
        let Some(attr) = self.attr.take() else {
            return;
        };
        let Some(element) = self.current else {
            return;
        };
        if attr.is_ns_decl {
            let uri = Attribute {
                name: attr.name,
                value: attr.value,
            }
            .value_string()
            .unwrap_or_default();
            self.doc
                .declare_namespace(element, attr.ns_decl_prefix.as_deref(), &uri);
        } else {
            self.doc.add_attribute(
                element,
                Attribute {
                    name: attr.name,
                    value: attr.value,
                },
            );
        }
    }

    ///
    /// Resolve a decoded value string into the tree for the pending node kind. A
    /// doctype or pi stays pending so that further compound pieces append to it.
    ///
    fn element_value_text(&mut self, data: &str) {
        match self.pending {
            Pending::DocType(None) => {
                let root = self.doc.root();
                let doctype = self.doc.append_doctype(root, data);
                self.pending = Pending::DocType(Some(doctype));
            }
            Pending::DocType(Some(doctype)) => {
                if let NodeKind::DocType(content) = self.doc.kind_mut(doctype) {
                    content.push_str(data);
                }
            }
            Pending::Pi(pi) => {
                if let NodeKind::ProcessingInstruction { data: slot, .. } = self.doc.kind_mut(pi) {
                    match slot {
                        Some(existing) => existing.push_str(data),
                        None => *slot = Some(data.to_string()),
                    }
                }
            }
            Pending::Element => {
                if let Some(element) = self.current {
                    self.append_text_data(element, data);
                }
            }
        }
    }
}

impl<'o> TokenSink for TreeBuilder<'o> {
    fn token(&mut self, role: Role, token: &Token, text: &str) -> Result<()> {
        match role {
            Role::Whitespace => {}
            Role::Comment | Role::CommentContinuation => {
                let content = decode_comment(text, token.col);
                let top = self.top();
                let _ = self.doc.append_comment(top, &content);
            }
            Role::ElementNs => {
                self.pending_prefix = Some(text.to_string());
            }
            Role::NsColon => {}
            Role::ElementName | Role::ElementKey => {
                if text == XMQ_DOCTYPE_NAME {
                    self.pending = Pending::DocType(None);
                    self.current = None;
                } else if let Some(target) = text.strip_prefix(XMQ_PI_PREFIX) {
                    let top = self.top();
                    let pi = self.doc.append_processing_instruction(top, target, None);
                    self.pending = Pending::Pi(pi);
                    self.current = None;
                } else {
                    let name = QName {
                        prefix: self.pending_prefix.take(),
                        local: text.to_string(),
                    };
                    let top = self.top();
                    self.current = Some(self.doc.append_element(top, name));
                    self.pending = Pending::Element;
                }
            }
            Role::AparLeft => {}
            Role::AparRight => {
                self.flush_attr();
            }
            Role::NsDeclaration => {
                self.flush_attr();
                self.attr = Some(PendingAttr {
                    name: QName::local(XMLNS_ATTRIBUTE),
                    is_ns_decl: true,
                    ns_decl_prefix: None,
                    value: None,
                });
            }
            Role::AttrNs => {
                if let Some(attr) = &mut self.attr {
                    if attr.is_ns_decl {
                        attr.ns_decl_prefix = Some(text.to_string());
                        return Ok(());
                    }
                }
                self.pending_attr_prefix = Some(text.to_string());
            }
            Role::AttrKey => {
                self.flush_attr();
                self.attr = Some(PendingAttr {
                    name: QName {
                        prefix: self.pending_attr_prefix.take(),
                        local: text.to_string(),
                    },
                    is_ns_decl: false,
                    ns_decl_prefix: None,
                    value: None,
                });
            }
            Role::Equals => {
                if let Some(attr) = &mut self.attr {
                    attr.value.get_or_insert_with(Vec::new);
                }
            }
            Role::AttrValueText => {
                self.push_attr_part(AttrPart::Text(text.to_string()));
            }
            Role::AttrValueQuote | Role::AttrValueCompoundQuote => {
                let decoded = decode_quote(text, token.col);
                self.push_attr_part(AttrPart::Text(decoded));
            }
            Role::AttrValueEntity | Role::AttrValueCompoundEntity => {
                let name = entity_name(text);
                self.push_attr_entity(&name)?;
            }
            Role::CparLeft | Role::CparRight => {}
            Role::ElementValueText => {
                self.element_value_text(text);
            }
            Role::ElementValueQuote | Role::ElementValueCompoundQuote => {
                let decoded = decode_quote(text, token.col);
                self.element_value_text(&decoded);
            }
            Role::ElementValueEntity | Role::ElementValueCompoundEntity => {
                let name = entity_name(text);
                match self.pending {
                    Pending::Element => {
                        if let Some(element) = self.current {
                            self.append_entity_data(element, &name)?;
                        }
                    }
                    _ => {
                        // A doctype or pi value piece written as an entity; decode it
                        // into the pending node's text.
                        let decoded = decode_numeric_entity(&name)?
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| format!("&{};", name));
                        self.element_value_text(&decoded);
                    }
                }
            }
            Role::BraceLeft => {
                if let Some(element) = self.current.take() {
                    self.stack.push(element);
                }
            }
            Role::BraceRight => {
                if self.stack.len() > 1 {
                    let _ = self.stack.pop();
                }
            }
            Role::Quote => {
                let decoded = decode_quote(text, token.col);
                let top = self.top();
                self.append_text_data(top, &decoded);
            }
            Role::Entity => {
                let name = entity_name(text);
                let top = self.top();
                self.append_entity_data(top, &name)?;
            }
            Role::UnicodeWhitespace => {}
        }
        Ok(())
    }
}

fn entity_name(text: &str) -> String {
    text.trim_start_matches(XMQ_AMP_CHAR)
        .trim_end_matches(';')
        .to_string()
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;

    fn parse(src: &str) -> Document {
        parse_xmq_document(src, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_empty_element() {
        let doc = parse("x");
        let root = doc.root();
        assert_eq!(doc.children(root).len(), 1);
        let x = doc.children(root)[0];
        assert_eq!(doc.element_name(x).unwrap().local, "x");
        assert!(doc.children(x).is_empty());
    }

    #[test]
    fn test_empty_string_value() {
        let doc = parse("x = ''");
        let x = doc.children(doc.root())[0];
        let children = doc.children(x);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.kind(children[0]), &NodeKind::Text(String::new()));
    }

    #[test]
    fn test_attributes_and_nesting() {
        let doc = parse("config(mode=fast) { timeout = 30 }");
        let config = doc.children(doc.root())[0];
        let attrs = doc.attributes(config);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name.local, "mode");
        assert_eq!(attrs[0].value_string().unwrap(), "fast");
        let timeout = doc.children(config)[0];
        assert_eq!(doc.element_name(timeout).unwrap().local, "timeout");
        assert_eq!(
            doc.kind(doc.children(timeout)[0]),
            &NodeKind::Text("30".to_string())
        );
    }

    #[test]
    fn test_standalone_attribute() {
        let doc = parse("input(checked)");
        let input = doc.children(doc.root())[0];
        assert_eq!(doc.attributes(input)[0].value, None);
    }

    #[test]
    fn test_quote_depth() {
        let doc = parse("msg = '''he said 'hi' '''");
        let msg = doc.children(doc.root())[0];
        assert_eq!(
            doc.kind(doc.children(msg)[0]),
            &NodeKind::Text("he said 'hi' ".to_string())
        );
    }

    #[test]
    fn test_incidental_indent() {
        let doc = parse("poem = '\n    rose\n    violet\n    '");
        let poem = doc.children(doc.root())[0];
        assert_eq!(
            doc.kind(doc.children(poem)[0]),
            &NodeKind::Text("rose\nviolet\n".to_string())
        );
    }

    #[test]
    fn test_text_merging_on_and_off() {
        let doc = parse("x { 'a' 'b' }");
        let x = doc.children(doc.root())[0];
        assert_eq!(doc.children(x).len(), 1);
        assert_eq!(doc.kind(doc.children(x)[0]), &NodeKind::Text("ab".to_string()));

        let options = ParseOptions {
            merge_text: false,
            ..Default::default()
        };
        let doc = parse_xmq_document("x { 'a' 'b' }", &options).unwrap();
        let x = doc.children(doc.root())[0];
        assert_eq!(doc.children(x).len(), 2);
    }

    #[test]
    fn test_entity_substitution() {
        let doc = parse("x = ( 'a' &#10; 'b' )");
        let x = doc.children(doc.root())[0];
        assert_eq!(
            doc.kind(doc.children(x)[0]),
            &NodeKind::Text("a\nb".to_string())
        );

        let doc = parse("x { &nbsp; }");
        let x = doc.children(doc.root())[0];
        assert_eq!(
            doc.kind(doc.children(x)[0]),
            &NodeKind::EntityRef("nbsp".to_string())
        );
    }

    #[test]
    fn test_namespaces() {
        let doc = parse("xsl:template(xmlns:xsl=http://www.w3.org/1999/XSL/Transform match=/)");
        let t = doc.children(doc.root())[0];
        let name = doc.element_name(t).unwrap();
        assert_eq!(name.prefix.as_deref(), Some("xsl"));
        assert_eq!(name.local, "template");
        assert_eq!(
            doc.resolve_prefix(t, Some("xsl")),
            Some("http://www.w3.org/1999/XSL/Transform")
        );
        // The marker attribute list holds only the real attribute.
        assert_eq!(doc.attributes(t).len(), 1);
        assert_eq!(doc.attributes(t)[0].name.local, "match");
    }

    #[test]
    fn test_implicit_root() {
        let options = ParseOptions {
            implicit_root: Some("config".to_string()),
            ..Default::default()
        };
        let doc = parse_xmq_document("a = 1\nb = 2", &options).unwrap();
        let config = doc.children(doc.root())[0];
        assert_eq!(doc.element_name(config).unwrap().local, "config");
        assert_eq!(doc.children(config).len(), 2);

        // Already rooted: no extra wrapping.
        let doc = parse_xmq_document("config { a = 1 }", &options).unwrap();
        let config = doc.children(doc.root())[0];
        assert_eq!(doc.element_name(config).unwrap().local, "config");
        assert_eq!(doc.children(config).len(), 1);
    }

    #[test]
    fn test_multiple_roots_error() {
        let err = parse_xmq_document("a = 1\nb = 2", &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Syntax {
                kind: SyntaxErrorKind::MultipleRoots,
                ..
            }
        ));
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = parse_xmq_document("}", &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Syntax {
                kind: SyntaxErrorKind::UnexpectedClosingBrace,
                ..
            }
        ));
        let err = parse_xmq_document("a {", &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Syntax {
                kind: SyntaxErrorKind::MissingClosing('{'),
                ..
            }
        ));
    }

    #[test]
    fn test_doctype_and_pi() {
        let doc = parse_xmq_document(
            "!DOCTYPE = html\nhtml { body }",
            &ParseOptions {
                implicit_root: None,
                ..Default::default()
            },
        )
        .unwrap();
        let children = doc.children(doc.root());
        assert_eq!(doc.kind(children[0]), &NodeKind::DocType("html".to_string()));
        assert_eq!(doc.element_name(children[1]).unwrap().local, "html");

        let doc = parse("x { ?print = 'now' }");
        let x = doc.children(doc.root())[0];
        assert_eq!(
            doc.kind(doc.children(x)[0]),
            &NodeKind::ProcessingInstruction {
                target: "print".to_string(),
                data: Some("now".to_string()),
            }
        );
    }

    #[test]
    fn test_comments() {
        let doc = parse("// heading\nx");
        let children = doc.children(doc.root());
        assert_eq!(doc.kind(children[0]), &NodeKind::Comment("heading".to_string()));
        assert_eq!(doc.element_name(children[1]).unwrap().local, "x");
    }

    #[test]
    fn test_invalid_name() {
        let err = parse_xmq_document("9lives", &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Syntax {
                kind: SyntaxErrorKind::InvalidName(_),
                ..
            }
        ));
    }
}
