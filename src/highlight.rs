//! Syntax highlighting for code blocks, and the stylesheet that colors them.
//!
//! Code is tokenized with [`syntect`]; every token becomes a `<span>` whose
//! classes are its scope names with a [`CLASS_PREFIX`] (e.g.,
//! `hl-string hl-quoted`). [`stylesheet`] renders [`THEME`] against the same
//! class scheme, so the CSS always matches the emitted spans.

use std::fmt;
use std::sync::LazyLock;
use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// The CSS class of the container every code block is wrapped in.
pub const CONTAINER_CLASS: &str = "codehilite";

/// Prepended to every token class so they can't clash with the site's own.
pub const CLASS_PREFIX: &str = "hl-";

/// The bundled theme the stylesheet is generated from.
pub const THEME: &str = "InspiredGitHub";

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed {
    prefix: CLASS_PREFIX,
};

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Renders the highlighting stylesheet: a rule for the container followed by
/// the token rules of [`THEME`].
pub fn stylesheet() -> Result<String> {
    let theme = THEMES
        .themes
        .get(THEME)
        .ok_or_else(|| Error::MissingTheme(THEME.to_owned()))?;
    let tokens = css_for_theme_with_class_style(theme, CLASS_STYLE)
        .map_err(|err| Error::Syntect(err.to_string()))?;
    Ok(format!(
        ".{} pre {{ padding: 0.5em; overflow-x: auto; }}\n{}",
        CONTAINER_CLASS, tokens
    ))
}

/// Renders a code block. `lang` is the first word of a fenced block's info
/// string, if any; unknown languages are rendered as plain text.
pub fn code_block(lang: Option<&str>, code: &str) -> Result<String> {
    let lang = lang.filter(|lang| !lang.is_empty());
    let syntax = lang
        .and_then(|lang| SYNTAXES.find_syntax_by_token(lang))
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| Error::Syntect(err.to_string()))?;
    }

    let mut html = format!(r#"<div class="{}"><pre><code"#, CONTAINER_CLASS);
    if let Some(lang) = lang {
        html.push_str(&format!(r#" class="language-{}""#, escape_html(lang)));
    }
    html.push('>');
    html.push_str(&generator.finalize());
    html.push_str("</code></pre></div>\n");
    Ok(html)
}

/// Escapes the characters that are significant in HTML text and attribute
/// values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to highlight code or render the stylesheet.
#[derive(Debug)]
pub enum Error {
    /// Returned when [`THEME`] isn't among the bundled themes.
    MissingTheme(String),

    /// Returned when syntect fails to tokenize or render.
    Syntect(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingTheme(name) => write!(f, "Missing highlighting theme '{}'", name),
            Error::Syntect(err) => write!(f, "Highlighting: {}", err),
        }
    }
}

impl std::error::Error for Error {}
