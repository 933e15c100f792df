/*!
The XMQ serializer.

A depth-first walk over a document emitting XMQ source. The print state is explicit:
current column, the indent that a fresh line restarts at, and the last emitted character
which decides whether a separator is needed before the next token. Pretty mode lays
children out one per line and aligns `=` signs; compact mode emits a single line and
escapes newlines inside values.

Coloured output is produced by printing plain source and re-tokenizing it through the
colorizer, so this module emits plain bytes only.
*/

use crate::dom::{AttrPart, Attribute, Document, NodeId, NodeKind, NsDecl};
use crate::error::Result;
use crate::parser::{parse_xmq_tokens, TokenSink};
use crate::token::Token;
use crate::quoting::{
    all_quotes, all_spaces, all_whitespace, count_necessary_slashes, find_next_escape,
    is_safe_text_value, leading_ws_nl_region, needs_compound, quote_shape,
    trailing_ws_nl_region, EscapeFlags,
};
use crate::syntax::*;
use crate::theme::{write_safe_html, write_safe_tex, RenderFormat, Role, Theme};

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

///
/// Settings consulted by every print entry point.
///
#[derive(Clone, Debug)]
pub struct OutputSettings {
    /// Single line output, no indentation, newlines in values become `&#10;`.
    pub compact: bool,
    /// Indentation step for children in pretty mode.
    pub add_indent: usize,
    /// Escape newlines inside values as `&#10;` even in pretty mode.
    pub escape_newlines: bool,
    /// Escape every non-7-bit character as a character entity.
    pub escape_non_7bit: bool,
    /// Escape tabs as `&#9;`; tabs are control characters so this is always on in
    /// practice and kept for API symmetry.
    pub escape_tabs: bool,
    /// Leave out the `<?xml ...?>` declaration when printing XML.
    pub omit_decl: bool,
    /// Where rendered output goes; decides colouring and body escaping.
    pub render: RenderFormat,
    /// The theme used when `render` is not plain.
    pub theme: Theme,
    /// Pick dark-background colours for the generated HTML stylesheet.
    pub dark_background: bool,
    /// The string emitted for one step of indentation whitespace.
    pub indentation_space: String,
    /// The string emitted for an explicit space inside quotes.
    pub explicit_space: String,
    /// The string emitted for a newline.
    pub explicit_nl: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            compact: false,
            add_indent: 4,
            escape_newlines: false,
            escape_non_7bit: false,
            escape_tabs: false,
            omit_decl: false,
            render: RenderFormat::Plain,
            theme: Theme::none(),
            dark_background: true,
            indentation_space: " ".to_string(),
            explicit_space: " ".to_string(),
            explicit_nl: "\n".to_string(),
        }
    }
}

impl OutputSettings {
    /// Settings for compact single-line output.
    pub fn compact() -> Self {
        Self {
            compact: true,
            ..Default::default()
        }
    }

    /// Settings for ANSI-coloured terminal output with a built-in theme.
    pub fn terminal(dark_mode: bool) -> Self {
        Self {
            render: RenderFormat::Terminal,
            theme: if dark_mode {
                Theme::darkbg()
            } else {
                Theme::lightbg()
            },
            ..Default::default()
        }
    }

    /// Settings for HTML-rendered output.
    pub fn html(dark_mode: bool) -> Self {
        Self {
            render: RenderFormat::Html,
            theme: Theme::html(),
            dark_background: dark_mode,
            ..Default::default()
        }
    }

    /// Settings for TeX-rendered output.
    pub fn tex() -> Self {
        Self {
            render: RenderFormat::Tex,
            theme: Theme::tex(),
            dark_background: false,
            ..Default::default()
        }
    }

    fn escape_flags(&self) -> EscapeFlags {
        EscapeFlags {
            newlines: self.escape_newlines || self.compact,
            non_7bit: self.escape_non_7bit,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Print Levels
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Level {
    Xmq,
    ElementValue,
    ElementValueCompound,
    AttrValue,
    AttrValueCompound,
}

impl Level {
    fn compound(self) -> Level {
        match self {
            Level::ElementValue | Level::ElementValueCompound => Level::ElementValueCompound,
            Level::AttrValue | Level::AttrValueCompound => Level::AttrValueCompound,
            Level::Xmq => Level::Xmq,
        }
    }

    fn is_compound(self) -> bool {
        matches!(self, Level::ElementValueCompound | Level::AttrValueCompound)
    }

    fn allows_bare_text(self) -> bool {
        matches!(self, Level::ElementValue | Level::AttrValue)
    }
}

// ------------------------------------------------------------------------------------------------
// The Print State
// ------------------------------------------------------------------------------------------------

pub(crate) struct PrintState<'a> {
    doc: &'a Document,
    os: &'a OutputSettings,
    out: String,
    current_indent: usize,
    line_indent: usize,
    last_char: char,
}

impl<'a> PrintState<'a> {
    pub(crate) fn new(doc: &'a Document, os: &'a OutputSettings) -> Self {
        Self {
            doc,
            os,
            out: String::new(),
            current_indent: 0,
            line_indent: 0,
            last_char: '\0',
        }
    }

    pub(crate) fn into_output(self) -> String {
        self.out
    }

    fn write(&mut self, fragment: &str) {
        self.current_indent += fragment.chars().count();
        if let Some(c) = fragment.chars().last() {
            self.last_char = c;
        }
        self.out.push_str(fragment);
    }

    fn print_white_spaces(&mut self, num: usize) {
        for _ in 0..num {
            self.out.push_str(&self.os.indentation_space);
        }
        self.current_indent += num;
    }

    fn print_nl_and_indent(&mut self) {
        self.out.push_str(&self.os.explicit_nl);
        self.current_indent = 0;
        self.last_char = '\0';
        let indent = self.line_indent;
        self.print_white_spaces(indent);
    }

    fn print_nl(&mut self) {
        self.out.push_str(&self.os.explicit_nl);
        self.current_indent = 0;
        self.last_char = '\0';
    }

    fn print_quotes(&mut self, num: usize) {
        for _ in 0..num {
            self.out.push('\'');
        }
        self.current_indent += num;
        self.last_char = '\'';
    }

    fn print_quoted_spaces(&mut self, num: usize) {
        self.out.push('\'');
        for _ in 0..num {
            self.out.push_str(&self.os.explicit_space);
        }
        self.out.push('\'');
        self.current_indent += num + 2;
        self.last_char = '\'';
    }

    fn print_char_entity(&mut self, c: char) {
        let entity = format!("{}{}{}", XMQ_NUMBERED_ENTITY_START, c as u32, XMQ_ENTITY_END);
        self.current_indent += entity.chars().count();
        self.out.push_str(&entity);
        self.last_char = ';';
    }

    fn print_slashes(&mut self, pre: Option<char>, post: Option<char>, num: usize) {
        if let Some(c) = pre {
            self.out.push(c);
            self.current_indent += 1;
        }
        for _ in 0..num {
            self.out.push('/');
        }
        self.current_indent += num;
        if let Some(c) = post {
            self.out.push(c);
            self.current_indent += 1;
        }
        self.last_char = post.unwrap_or('/');
    }

    // --------------------------------------------------------------------------------------------
    // Separation before the next token, driven by the last emitted character.
    // --------------------------------------------------------------------------------------------

    fn need_separation_before_name(&self) -> bool {
        let c = self.last_char;
        c != '\0' && c != '\'' && c != '{' && c != '}' && c != ';' && c != ')' && c != '/'
    }

    fn need_separation_before_entity(&self) -> bool {
        let c = self.last_char;
        c != '\0' && c != '=' && c != '\'' && c != '{' && c != '}' && c != ';' && c != '(' && c != ')'
    }

    fn need_separation_before_quote(&self) -> bool {
        self.last_char == '\''
    }

    fn need_separation_before_attribute(&self) -> bool {
        let c = self.last_char;
        c != '\0' && c != '\'' && c != '(' && c != ')' && c != ';'
    }

    fn need_separation_before_comment(&self) -> bool {
        let c = self.last_char;
        c != '\0' && c != '\'' && c != '{' && c != ')' && c != '}' && c != ';'
    }

    fn check_space_before_key(&mut self) {
        if self.last_char == '\0' {
            return;
        }
        if !self.os.compact {
            self.print_nl_and_indent();
        } else if self.need_separation_before_name() {
            self.print_white_spaces(1);
        }
    }

    fn check_space_before_attribute(&mut self) {
        if self.last_char == '(' {
            return;
        }
        if !self.os.compact {
            self.print_nl_and_indent();
        } else if self.need_separation_before_attribute() {
            self.print_white_spaces(1);
        }
    }

    fn check_space_before_entity_node(&mut self) {
        if self.last_char == '(' {
            return;
        }
        if !self.os.compact && self.last_char != '=' {
            self.print_nl_and_indent();
        } else if self.need_separation_before_entity() {
            self.print_white_spaces(1);
        }
    }

    fn check_space_before_quote(&mut self, level: Level) {
        let c = self.last_char;
        if c == '\0' {
            return;
        }
        if !self.os.compact && (c != '=' || level == Level::Xmq) && c != '(' {
            self.print_nl_and_indent();
        } else if self.need_separation_before_quote() {
            self.print_white_spaces(1);
        }
    }

    fn check_space_before_opening_brace(&mut self) {
        if !self.os.compact {
            if self.last_char == ')' {
                self.print_nl_and_indent();
            } else {
                self.print_white_spaces(1);
            }
        }
    }

    fn check_space_before_closing_brace(&mut self) {
        if !self.os.compact {
            self.print_nl_and_indent();
        }
    }

    fn check_space_before_comment(&mut self) {
        if self.last_char == '\0' {
            return;
        }
        if !self.os.compact {
            self.print_nl_and_indent();
        } else if self.need_separation_before_comment() {
            self.print_white_spaces(1);
        }
    }

    // --------------------------------------------------------------------------------------------
    // Node classification
    // --------------------------------------------------------------------------------------------

    fn is_content_node(&self, node: NodeId) -> bool {
        matches!(self.doc.kind(node), NodeKind::Text(_) | NodeKind::CData(_))
    }

    fn content_of(&self, node: NodeId) -> &'a str {
        match self.doc.kind(node) {
            NodeKind::Text(text) | NodeKind::CData(text) => text,
            _ => "",
        }
    }

    ///
    /// An element whose single child is character data prints as `key = value`.
    ///
    fn is_key_value_node(&self, node: NodeId) -> bool {
        match self.doc.kind(node) {
            NodeKind::Element { .. } => {
                let children = self.doc.children(node);
                children.len() == 1 && self.is_content_node(children[0])
            }
            _ => false,
        }
    }

    fn is_leaf_node(&self, node: NodeId) -> bool {
        matches!(self.doc.kind(node), NodeKind::Element { .. })
            && self.doc.children(node).is_empty()
    }

    fn name_width(&self, node: NodeId) -> usize {
        match self.doc.element_name(node) {
            Some(name) => {
                name.local.chars().count()
                    + name
                        .prefix
                        .as_ref()
                        .map(|p| p.chars().count() + 1)
                        .unwrap_or(0)
            }
            None => 0,
        }
    }

    // --------------------------------------------------------------------------------------------
    // Nodes
    // --------------------------------------------------------------------------------------------

    pub(crate) fn print_nodes(&mut self, children: &[NodeId]) {
        let mut align = 0;
        if !self.os.compact {
            align = children
                .iter()
                .filter(|id| self.is_key_value_node(**id))
                .map(|id| self.name_width(*id))
                .max()
                .unwrap_or(0);
        }
        for child in children {
            self.print_node(*child, align);
        }
    }

    fn print_node(&mut self, node: NodeId, align: usize) {
        match self.doc.kind(node) {
            NodeKind::Text(_) | NodeKind::CData(_) => {
                let content = self.content_of(node);
                self.print_value_internal_text(content, Level::Xmq);
            }
            NodeKind::EntityRef(_) => self.print_entity_node(node),
            NodeKind::Comment(_) => self.print_comment_node(node),
            NodeKind::ProcessingInstruction { .. } => self.print_pi_node(node),
            NodeKind::DocType(_) => self.print_doctype_node(node),
            NodeKind::Element { .. } => {
                if self.is_leaf_node(node) {
                    self.print_element_name_and_attributes(node);
                } else if self.is_key_value_node(node) {
                    self.print_key_node(node, align);
                } else {
                    self.print_element_with_children(node);
                }
            }
            NodeKind::Root => {}
        }
    }

    fn print_element_name_and_attributes(&mut self, node: NodeId) {
        self.check_space_before_key();

        let name = match self.doc.element_name(node) {
            Some(name) => name.clone(),
            None => return,
        };
        if let Some(prefix) = &name.prefix {
            self.write(prefix);
            self.write(":");
        }
        self.write(&name.local);

        let has_ns = !self.doc.namespaces(node).is_empty();
        if !self.doc.attributes(node).is_empty() || has_ns {
            self.write("(");
            self.print_attributes(node);
            self.write(")");
        }
    }

    fn print_key_node(&mut self, node: NodeId, align: usize) {
        self.print_element_name_and_attributes(node);

        if !self.os.compact {
            let len = self.current_indent - self.line_indent;
            let pad = if len < align { 1 + align - len } else { 1 };
            self.print_white_spaces(pad);
        }
        self.write("=");
        if !self.os.compact {
            self.print_white_spaces(1);
        }
        let children = self.doc.children(node).to_vec();
        self.print_value(&children, Level::ElementValue);
    }

    fn print_element_with_children(&mut self, node: NodeId) {
        self.print_element_name_and_attributes(node);

        self.check_space_before_opening_brace();
        self.write("{");
        self.line_indent += self.os.add_indent;
        let children = self.doc.children(node).to_vec();
        self.print_nodes(&children);
        self.line_indent -= self.os.add_indent;
        self.check_space_before_closing_brace();
        self.write("}");
    }

    fn print_attributes(&mut self, node: NodeId) {
        let attributes = self.doc.attributes(node).to_vec();
        let namespaces = self.doc.namespaces(node).to_vec();

        let mut align = 0;
        if !self.os.compact {
            align = attributes
                .iter()
                .map(attr_width)
                .chain(namespaces.iter().map(ns_width))
                .max()
                .unwrap_or(0);
        }

        let line_indent = self.line_indent;
        self.line_indent = self.current_indent;
        for attribute in &attributes {
            self.print_attribute(attribute, align);
        }
        for decl in &namespaces {
            self.print_namespace_declaration(decl, align);
        }
        self.line_indent = line_indent;
    }

    fn print_attribute(&mut self, attribute: &Attribute, align: usize) {
        self.check_space_before_attribute();

        let width = attr_width(attribute);
        if let Some(prefix) = &attribute.name.prefix {
            self.write(prefix);
            self.write(":");
        }
        self.write(&attribute.name.local);

        if let Some(parts) = &attribute.value {
            if !self.os.compact {
                self.print_white_spaces(1 + align - width);
            }
            self.write("=");
            if !self.os.compact {
                self.print_white_spaces(1);
            }
            self.print_attr_value(parts);
        }
    }

    fn print_namespace_declaration(&mut self, decl: &NsDecl, align: usize) {
        self.check_space_before_attribute();

        let width = ns_width(decl);
        self.write(XMLNS_ATTRIBUTE);
        if let Some(prefix) = &decl.prefix {
            self.write(":");
            self.write(prefix);
        }
        if !decl.uri.is_empty() {
            if !self.os.compact {
                self.print_white_spaces(1 + align - width);
            }
            self.write("=");
            if !self.os.compact {
                self.print_white_spaces(1);
            }
            let uri = decl.uri.clone();
            self.print_value_text(&uri, Level::AttrValue);
        }
    }

    ///
    /// Print one text value, falling back to a compound when a single quoted form
    /// cannot express it losslessly.
    ///
    fn print_value_text(&mut self, content: &str, level: Level) {
        if !content.is_empty() && needs_compound(content, self.os.compact, self.os.escape_flags())
        {
            let level = level.compound();
            let content = content.to_string();
            self.print_compound(|ps| ps.print_value_internal_text(&content, level));
        } else {
            self.print_value_internal_text(content, level);
        }
    }

    fn print_attr_value(&mut self, parts: &[AttrPart]) {
        let single_text = match parts {
            [AttrPart::Text(text)] => Some(text.clone()),
            _ => None,
        };
        match single_text {
            Some(text) if text.is_empty() => {
                self.check_space_before_quote(Level::AttrValue);
                self.write("''");
            }
            Some(text) => {
                self.print_value_text(&text, Level::AttrValue);
            }
            None => {
                let parts = parts.to_vec();
                self.print_compound(|ps| {
                    for part in &parts {
                        match part {
                            AttrPart::Text(text) => {
                                ps.print_value_internal_text(text, Level::AttrValueCompound)
                            }
                            AttrPart::EntityRef(name) => ps.print_entity(name),
                        }
                    }
                });
            }
        }
    }

    // --------------------------------------------------------------------------------------------
    // Comments
    // --------------------------------------------------------------------------------------------

    fn print_comment_node(&mut self, node: NodeId) {
        let content = match self.doc.kind(node) {
            NodeKind::Comment(content) => content.clone(),
            _ => return,
        };
        self.check_space_before_comment();

        if !content.contains('\n') {
            if self.os.compact {
                self.write("/*");
                self.write(&content);
                self.write("*/");
            } else {
                self.write("// ");
                self.write(&content);
                self.last_char = '\u{1}';
            }
        } else {
            self.print_comment_lines(&content);
        }
    }

    fn print_comment_lines(&mut self, content: &str) {
        let compact = self.os.compact;
        let num_slashes = count_necessary_slashes(content);

        self.print_slashes(None, Some('*'), num_slashes);
        if !compact && !content.starts_with('\n') {
            self.print_white_spaces(1);
        }

        let prev_line_indent = self.line_indent;
        self.line_indent = self.current_indent;

        let mut first = true;
        for line in content.split('\n') {
            if !first {
                if compact {
                    self.print_slashes(Some('*'), Some('*'), num_slashes);
                } else if line.is_empty() {
                    // An empty line inside the comment is not indented.
                    self.print_nl();
                } else {
                    self.print_nl_and_indent();
                }
            }
            if !line.is_empty() || compact {
                self.write(line);
            }
            first = false;
        }

        if !compact {
            self.print_white_spaces(1);
        }
        self.print_slashes(Some('*'), None, num_slashes);
        self.last_char = '/';
        self.line_indent = prev_line_indent;
    }

    // --------------------------------------------------------------------------------------------
    // Entities, processing instructions, doctype
    // --------------------------------------------------------------------------------------------

    fn print_entity_node(&mut self, node: NodeId) {
        if let NodeKind::EntityRef(name) = self.doc.kind(node) {
            let name = name.clone();
            self.print_entity(&name);
        }
    }

    fn print_entity(&mut self, name: &str) {
        self.check_space_before_entity_node();
        self.write(XMQ_ENTITY_START);
        self.write(name);
        self.write(XMQ_ENTITY_END);
    }

    fn print_pi_node(&mut self, node: NodeId) {
        let (target, data) = match self.doc.kind(node) {
            NodeKind::ProcessingInstruction { target, data } => (target.clone(), data.clone()),
            _ => return,
        };
        self.check_space_before_key();
        self.write("?");
        self.write(&target);
        if let Some(data) = data {
            let data = if self.os.compact {
                data.replace('\n', " ")
            } else {
                data
            };
            if !self.os.compact {
                self.print_white_spaces(1);
            }
            self.write("=");
            if !self.os.compact {
                self.print_white_spaces(1);
            }
            self.print_value_text(&data, Level::ElementValue);
        }
    }

    fn print_doctype_node(&mut self, node: NodeId) {
        let content = match self.doc.kind(node) {
            NodeKind::DocType(content) => content.clone(),
            _ => return,
        };
        self.check_space_before_key();
        self.write(XMQ_DOCTYPE_NAME);
        if !self.os.compact {
            self.print_white_spaces(1);
        }
        self.write("=");
        if !self.os.compact {
            self.print_white_spaces(1);
        }
        let content = if self.os.compact {
            content.replace('\n', " ")
        } else {
            content
        };
        self.print_value_text(&content, Level::ElementValue);
    }

    // --------------------------------------------------------------------------------------------
    // Values
    // --------------------------------------------------------------------------------------------

    fn print_compound(&mut self, body: impl FnOnce(&mut Self)) {
        let old_line_indent = self.line_indent;
        self.write("(");
        if !self.os.compact {
            self.print_white_spaces(1);
        }
        self.line_indent = self.current_indent;
        body(self);
        if !self.os.compact {
            self.print_white_spaces(1);
        }
        self.write(")");
        self.line_indent = old_line_indent;
    }

    ///
    /// Print the value of a key node: the element's content children.
    ///
    fn print_value(&mut self, children: &[NodeId], level: Level) {
        let is_compound = match children {
            [] => false,
            [single] => {
                !matches!(self.doc.kind(*single), NodeKind::EntityRef(_))
                    && !self.content_of(*single).is_empty()
                    && needs_compound(
                        self.content_of(*single),
                        self.os.compact,
                        self.os.escape_flags(),
                    )
            }
            _ => true,
        };

        if is_compound {
            let level = level.compound();
            let children = children.to_vec();
            self.print_compound(|ps| {
                for child in &children {
                    ps.print_value_internal(*child, level);
                }
            });
        } else {
            for child in children {
                self.print_value_internal(*child, level);
            }
        }
    }

    fn print_value_internal(&mut self, node: NodeId, level: Level) {
        match self.doc.kind(node) {
            NodeKind::EntityRef(name) => {
                let name = name.clone();
                self.print_entity(&name);
            }
            _ => {
                let content = self.content_of(node).to_string();
                self.print_value_internal_text(&content, level);
            }
        }
    }

    ///
    /// Print content as the shape it needs: `''`, a bare text, one quote, quoted
    /// spaces, entities, or a split mixture of quotes and entities.
    ///
    fn print_value_internal_text(&mut self, content: &str, level: Level) {
        if content.is_empty() {
            self.check_space_before_quote(level);
            self.write("''");
            return;
        }

        if all_quotes(content) {
            // A text of only single quotes is printed as &apos; entities; quoting it
            // with n+1 quotes and newlines reads far worse.
            self.check_space_before_entity_node();
            for _ in content.chars() {
                self.write("&apos;");
            }
            return;
        }

        if all_spaces(content) {
            self.check_space_before_quote(level);
            self.print_quoted_spaces(content.chars().count());
            return;
        }

        if all_whitespace(content) {
            self.print_all_whitespace(content, level);
            return;
        }

        if is_safe_text_value(content) && level.allows_bare_text() {
            self.write(content);
            return;
        }

        let mut rest = content;
        if let Some(end) = leading_ws_nl_region(rest) {
            let (region, tail) = rest.split_at(end);
            self.print_all_whitespace(region, level);
            rest = tail;
        }
        let mut trailing = "";
        if let Some(start) = trailing_ws_nl_region(rest) {
            let (head, region) = rest.split_at(start);
            if !region.chars().all(|c| c == '\n') || self.os.compact || level.is_compound() {
                rest = head;
                trailing = region;
            }
        }

        // Split the remaining content at characters that must become entities.
        let escapes = self.os.escape_flags();
        let edge_quotes = self.os.compact || level.is_compound() || level == Level::Xmq;
        let mut from = rest;
        while !from.is_empty() {
            let split = find_next_escape(from, escapes, edge_quotes);
            if split == 0 {
                let mut chars = from.chars();
                let c = chars.next().expect("nonempty");
                self.check_space_before_entity_node();
                self.print_char_entity(c);
                if c == '\n' && !self.os.compact {
                    self.print_nl_and_indent();
                }
                from = chars.as_str();
            } else {
                let (piece, tail) = from.split_at(split);
                if piece == content {
                    self.check_space_before_quote(level);
                    self.print_quoted_block(piece);
                } else if is_decomposable(piece) {
                    self.print_value_internal_text(piece, level);
                } else {
                    self.check_space_before_quote(level);
                    self.print_quoted_block(piece);
                }
                from = tail;
            }
        }

        if !trailing.is_empty() {
            self.print_all_whitespace(trailing, level);
        }
    }

    ///
    /// Whitespace printed explicitly: runs of plain spaces as `'   '`, every other
    /// whitespace character as an entity.
    ///
    fn print_all_whitespace(&mut self, content: &str, level: Level) {
        let mut rest = content;
        while let Some(c) = rest.chars().next() {
            if c == ' ' {
                let run = rest.len() - rest.trim_start_matches(' ').len();
                self.check_space_before_quote(level);
                self.print_quoted_spaces(run);
                rest = &rest[run..];
            } else {
                self.check_space_before_entity_node();
                self.print_char_entity(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    ///
    /// Emit one quoted literal. The quote count exceeds every interior run; the
    /// literal hangs on its own lines when the content starts with a quote, ends with
    /// a newline, or needs four or more delimiter quotes.
    ///
    fn print_quoted_block(&mut self, content: &str) {
        let shape = quote_shape(content, self.os.compact, self.os.escape_flags());
        let numq = shape.quotes.max(1);
        let hanging = shape.hanging;

        let old_line_indent = self.line_indent;
        if hanging {
            self.line_indent = self.current_indent;
        }
        self.print_quotes(numq);
        if !hanging {
            self.line_indent = self.current_indent;
        }
        if hanging {
            self.print_nl_and_indent();
        }

        self.print_quote_lines(content);

        // Content ending in a newline has already broken the line; the closing run
        // sits on the fresh line at the quote column. Everything else closes flush so
        // that re-parsing does not gain a newline.
        self.print_quotes(numq);
        self.line_indent = old_line_indent;
    }

    fn print_quote_lines(&mut self, content: &str) {
        let mut first = true;
        for line in content.split('\n') {
            if !first {
                self.print_nl_and_indent();
            }
            if !line.is_empty() {
                self.write(line);
            }
            first = false;
        }
    }
}

///
/// Can this piece be decomposed further by `print_value_internal_text`, or must it be
/// quoted as-is to guarantee progress?
///
fn is_decomposable(piece: &str) -> bool {
    all_quotes(piece)
        || all_whitespace(piece)
        || leading_ws_nl_region(piece).is_some()
        || trailing_ws_nl_region(piece).is_some()
}

fn attr_width(attribute: &Attribute) -> usize {
    attribute.name.local.chars().count()
        + attribute
            .name
            .prefix
            .as_ref()
            .map(|p| p.chars().count() + 1)
            .unwrap_or(0)
}

fn ns_width(decl: &NsDecl) -> usize {
    XMLNS_ATTRIBUTE.len()
        + decl
            .prefix
            .as_ref()
            .map(|p| p.chars().count() + 1)
            .unwrap_or(0)
}

// ------------------------------------------------------------------------------------------------
// Public Functions
// ------------------------------------------------------------------------------------------------

impl Document {
    ///
    /// Serialize this document as XMQ source using the given settings. Rendered
    /// formats are produced by colouring the plain source through the theme.
    ///
    pub fn to_xmq(&self, settings: &OutputSettings) -> String {
        let mut state = PrintState::new(self, settings);
        let children = self.children(self.root()).to_vec();
        state.print_nodes(&children);
        let mut plain = state.into_output();
        if !settings.compact && !plain.is_empty() {
            plain.push('\n');
        }
        match settings.render {
            RenderFormat::Plain => plain,
            _ => colorize(&plain, settings).unwrap_or(plain),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// The Token Colorizer
// ------------------------------------------------------------------------------------------------

///
/// The sink that renders role-tagged tokens as themed text without building a tree.
///
struct Colorizer<'o> {
    os: &'o OutputSettings,
    out: String,
}

impl<'o> TokenSink for Colorizer<'o> {
    fn token(&mut self, role: Role, _token: &Token, text: &str) -> Result<()> {
        let (pre, post) = self.os.theme.pair(role);
        self.out.push_str(pre);
        match self.os.render {
            RenderFormat::Html => write_safe_html(&mut self.out, text),
            RenderFormat::Tex => write_safe_tex(&mut self.out, text),
            _ => self.out.push_str(text),
        }
        self.out.push_str(post);
        Ok(())
    }
}

///
/// Render XMQ source as coloured text for the configured target. No tree is built;
/// the source tokens are themed in place, so formatting is preserved exactly. HTML
/// output is wrapped in a `<pre>` block with a matching stylesheet.
///
pub fn colorize(source: &str, settings: &OutputSettings) -> Result<String> {
    let mut sink = Colorizer {
        os: settings,
        out: String::new(),
    };
    parse_xmq_tokens(source, &mut sink)?;
    let body = sink.out;
    Ok(match settings.render {
        RenderFormat::Html => {
            let mode = if settings.dark_background {
                "xmq_dark"
            } else {
                "xmq_light"
            };
            format!(
                "<style>\n{}</style>\n<pre class=\"xmq {}\">{}</pre>\n",
                Theme::html_stylesheet(settings.dark_background),
                mode,
                body
            )
        }
        _ => body,
    })
}

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------
