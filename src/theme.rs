/*!
Colour theming for rendered XMQ.

Every fragment the serializer or the token colorizer emits is classified with a
syntactic [`Role`]; a [`Theme`] maps each role to a prefix/suffix string pair. Plain
output uses empty pairs, terminal output ANSI SGR sequences, HTML output `<span>`
elements backed by a generated stylesheet, and TeX output macro wrappers. Theme tables
are plain data and fully caller-controlled; `darkbg` and `lightbg` are provided as
built-in defaults.
*/

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

///
/// The syntactic roles that can be themed. The same roles classify parser callbacks, so
/// a single table drives both tree-building diagnostics and colouring.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Role {
    /// Inter-token whitespace.
    Whitespace,
    /// Whitespace that is not plain ASCII space, highlighted as suspicious.
    UnicodeWhitespace,
    /// `=`
    Equals,
    /// `{`
    BraceLeft,
    /// `}`
    BraceRight,
    /// `(` opening an attribute list.
    AparLeft,
    /// `)` closing an attribute list.
    AparRight,
    /// `(` opening a compound value.
    CparLeft,
    /// `)` closing a compound value.
    CparRight,
    /// A standalone quote.
    Quote,
    /// A standalone entity reference.
    Entity,
    /// A comment.
    Comment,
    /// A continuation block of a multi-block comment.
    CommentContinuation,
    /// An element namespace prefix.
    ElementNs,
    /// The `:` between a namespace prefix and a local name.
    NsColon,
    /// An element name, `alfa` in `alfa { ... }`.
    ElementName,
    /// An element key, `alfa` in `alfa = 1`.
    ElementKey,
    /// A bare element value.
    ElementValueText,
    /// A quoted element value.
    ElementValueQuote,
    /// An entity element value.
    ElementValueEntity,
    /// A quote inside a compound element value.
    ElementValueCompoundQuote,
    /// An entity inside a compound element value.
    ElementValueCompoundEntity,
    /// An attribute namespace prefix.
    AttrNs,
    /// An attribute key.
    AttrKey,
    /// A bare attribute value.
    AttrValueText,
    /// A quoted attribute value.
    AttrValueQuote,
    /// An entity attribute value.
    AttrValueEntity,
    /// A quote inside a compound attribute value.
    AttrValueCompoundQuote,
    /// An entity inside a compound attribute value.
    AttrValueCompoundEntity,
    /// The `xmlns` keyword of a namespace declaration.
    NsDeclaration,
}

///
/// Where rendered output is going; decides body escaping and which theme pairs make
/// sense.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderFormat {
    /// No theming, raw XMQ source.
    #[default]
    Plain,
    /// ANSI SGR sequences for terminals.
    Terminal,
    /// `<span>` wrappers and a stylesheet header.
    Html,
    /// TeX macro wrappers.
    Tex,
}

///
/// A table mapping every [`Role`] to a prefix/suffix pair emitted around fragments of
/// that role. Empty strings mean no decoration.
///
#[derive(Clone, Debug, Default)]
pub struct Theme {
    pairs: [(String, String); ROLE_COUNT],
    name: &'static str,
}

// ------------------------------------------------------------------------------------------------
// Implementations
// ------------------------------------------------------------------------------------------------

const ROLE_COUNT: usize = Role::NsDeclaration as usize + 1;

const ANSI_RESET: &str = "\x1b[0m";

impl Theme {
    /// The undecorated theme used for plain output.
    pub fn none() -> Self {
        Self {
            pairs: Default::default(),
            name: "none",
        }
    }

    /// The built-in theme for dark terminal backgrounds.
    pub fn darkbg() -> Self {
        let mut theme = Self::none();
        theme.name = "darkbg";
        theme.install_ansi(&[
            (Role::Comment, "\x1b[36m"),
            (Role::CommentContinuation, "\x1b[36m"),
            (Role::Quote, "\x1b[32m"),
            (Role::Entity, "\x1b[35m"),
            (Role::ElementNs, "\x1b[90m"),
            (Role::ElementName, "\x1b[34m"),
            (Role::ElementKey, "\x1b[94m"),
            (Role::ElementValueText, "\x1b[32m"),
            (Role::ElementValueQuote, "\x1b[32m"),
            (Role::ElementValueEntity, "\x1b[35m"),
            (Role::ElementValueCompoundQuote, "\x1b[32m"),
            (Role::ElementValueCompoundEntity, "\x1b[35m"),
            (Role::AttrNs, "\x1b[90m"),
            (Role::AttrKey, "\x1b[33m"),
            (Role::AttrValueText, "\x1b[92m"),
            (Role::AttrValueQuote, "\x1b[92m"),
            (Role::AttrValueEntity, "\x1b[35m"),
            (Role::AttrValueCompoundQuote, "\x1b[92m"),
            (Role::AttrValueCompoundEntity, "\x1b[35m"),
            (Role::CparLeft, "\x1b[35m"),
            (Role::CparRight, "\x1b[35m"),
            (Role::NsDeclaration, "\x1b[90m"),
            (Role::UnicodeWhitespace, "\x1b[41m"),
        ]);
        theme
    }

    /// The built-in theme for light terminal backgrounds.
    pub fn lightbg() -> Self {
        let mut theme = Self::none();
        theme.name = "lightbg";
        theme.install_ansi(&[
            (Role::Comment, "\x1b[2;36m"),
            (Role::CommentContinuation, "\x1b[2;36m"),
            (Role::Quote, "\x1b[2;32m"),
            (Role::Entity, "\x1b[2;35m"),
            (Role::ElementNs, "\x1b[2;37m"),
            (Role::ElementName, "\x1b[34m"),
            (Role::ElementKey, "\x1b[2;34m"),
            (Role::ElementValueText, "\x1b[2;32m"),
            (Role::ElementValueQuote, "\x1b[2;32m"),
            (Role::ElementValueEntity, "\x1b[2;35m"),
            (Role::ElementValueCompoundQuote, "\x1b[2;32m"),
            (Role::ElementValueCompoundEntity, "\x1b[2;35m"),
            (Role::AttrNs, "\x1b[2;37m"),
            (Role::AttrKey, "\x1b[2;33m"),
            (Role::AttrValueText, "\x1b[32m"),
            (Role::AttrValueQuote, "\x1b[32m"),
            (Role::AttrValueEntity, "\x1b[2;35m"),
            (Role::AttrValueCompoundQuote, "\x1b[32m"),
            (Role::AttrValueCompoundEntity, "\x1b[2;35m"),
            (Role::CparLeft, "\x1b[2;35m"),
            (Role::CparRight, "\x1b[2;35m"),
            (Role::NsDeclaration, "\x1b[2;37m"),
            (Role::UnicodeWhitespace, "\x1b[41m"),
        ]);
        theme
    }

    /// Look up a built-in theme by name.
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "darkbg" => Some(Self::darkbg()),
            "lightbg" => Some(Self::lightbg()),
            "none" => Some(Self::none()),
            _ => None,
        }
    }

    ///
    /// The `<span class>` theme used for HTML rendering; colours come from the
    /// stylesheet returned by [`Theme::html_stylesheet`].
    ///
    pub fn html() -> Self {
        let mut theme = Self::none();
        theme.name = "html";
        for (role, class) in HTML_CLASSES {
            theme.set(
                *role,
                format!("<span class=\"{}\">", class),
                "</span>".to_string(),
            );
        }
        theme
    }

    /// The TeX macro theme.
    pub fn tex() -> Self {
        let mut theme = Self::none();
        theme.name = "tex";
        for (role, class) in HTML_CLASSES {
            theme.set(*role, format!("\\{}{{", class), "}".to_string());
        }
        theme
    }

    /// The theme name, `darkbg`, `lightbg`, `html`, `tex` or `none`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Override the pair for one role.
    pub fn set(&mut self, role: Role, pre: String, post: String) {
        self.pairs[role as usize] = (pre, post);
    }

    /// The prefix/suffix pair for a role.
    pub fn pair(&self, role: Role) -> (&str, &str) {
        let (pre, post) = &self.pairs[role as usize];
        (pre, post)
    }

    fn install_ansi(&mut self, colors: &[(Role, &str)]) {
        for (role, pre) in colors {
            self.set(*role, (*pre).to_string(), ANSI_RESET.to_string());
        }
    }

    ///
    /// A stylesheet matching [`Theme::html`], for the requested background mode.
    ///
    pub fn html_stylesheet(dark_mode: bool) -> String {
        let (bg, fg, name, key, value, comment, entity, ns) = if dark_mode {
            ("#1e1e1e", "#d4d4d4", "#569cd6", "#9cdcfe", "#6a9955", "#2aa198", "#c586c0", "#808080")
        } else {
            ("#ffffff", "#222222", "#1c3db8", "#2a6fbb", "#137813", "#2aa198", "#882088", "#888888")
        };
        format!(
            "pre.xmq {{ background-color:{}; color:{}; border-radius:2px; padding:8px; \
             display:inline-block; }}\n\
             .xmqEN {{ color:{}; }}\n\
             .xmqEK {{ color:{}; }}\n\
             .xmqEKV, .xmqQ {{ color:{}; }}\n\
             .xmqAK {{ color:{}; }}\n\
             .xmqAKV {{ color:{}; }}\n\
             .xmqC {{ color:{}; font-style:italic; }}\n\
             .xmqE {{ color:{}; }}\n\
             .xmqCP {{ color:{}; }}\n\
             .xmqNS, .xmqNSD {{ color:{}; }}\n\
             .xmqUW {{ background-color:#c40000; }}\n",
            bg, fg, name, key, value, key, value, comment, entity, entity, ns
        )
    }
}

///
/// Escape a fragment for embedding in rendered HTML.
///
pub(crate) fn write_safe_html(out: &mut String, fragment: &str) {
    for c in fragment.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

///
/// Escape a fragment for embedding in rendered TeX.
///
pub(crate) fn write_safe_tex(out: &mut String, fragment: &str) {
    for c in fragment.chars() {
        match c {
            '&' => out.push_str("\\&"),
            '\\' => out.push_str("\\\\"),
            '_' => out.push_str("\\_"),
            _ => out.push(c),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Private Values
// ------------------------------------------------------------------------------------------------

///
/// Role to class-name mapping shared by the HTML and TeX themes.
///
const HTML_CLASSES: &[(Role, &str)] = &[
    (Role::Comment, "xmqC"),
    (Role::CommentContinuation, "xmqC"),
    (Role::Quote, "xmqQ"),
    (Role::Entity, "xmqE"),
    (Role::ElementNs, "xmqNS"),
    (Role::ElementName, "xmqEN"),
    (Role::ElementKey, "xmqEK"),
    (Role::ElementValueText, "xmqEKV"),
    (Role::ElementValueQuote, "xmqEKV"),
    (Role::ElementValueEntity, "xmqE"),
    (Role::ElementValueCompoundQuote, "xmqEKV"),
    (Role::ElementValueCompoundEntity, "xmqE"),
    (Role::AttrNs, "xmqNS"),
    (Role::AttrKey, "xmqAK"),
    (Role::AttrValueText, "xmqAKV"),
    (Role::AttrValueQuote, "xmqAKV"),
    (Role::AttrValueEntity, "xmqE"),
    (Role::AttrValueCompoundQuote, "xmqAKV"),
    (Role::AttrValueCompoundEntity, "xmqE"),
    (Role::CparLeft, "xmqCP"),
    (Role::CparRight, "xmqCP"),
    (Role::NsDeclaration, "xmqNSD"),
    (Role::UnicodeWhitespace, "xmqUW"),
];

// ------------------------------------------------------------------------------------------------
// Unit Tests
// ------------------------------------------------------------------------------------------------
