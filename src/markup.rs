//! Converts entry bodies into HTML fragments. Two markup languages are
//! supported, selected once per run: Markdown (the default) and
//! reStructuredText.

use crate::highlight;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::fmt;
use std::str::FromStr;

/// The markup language entry bodies are written in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Markup {
    /// Markdown with code highlighting and definition lists.
    #[default]
    Markdown,

    /// reStructuredText. Only the document body is kept.
    ReStructuredText,
}

impl Markup {
    /// The names accepted on the command line, in their canonical spelling.
    pub const NAMES: [&'static str; 2] = ["reST", "Markdown"];

    /// Renders `text` into an HTML fragment.
    pub fn render(self, text: &str) -> Result<String> {
        match self {
            Markup::Markdown => markdown(text),
            Markup::ReStructuredText => restructured_text(text),
        }
    }
}

impl FromStr for Markup {
    type Err = Error;

    /// Parses a markup name case-insensitively.
    fn from_str(s: &str) -> Result<Markup> {
        match s.to_lowercase().as_str() {
            "markdown" => Ok(Markup::Markdown),
            "rest" => Ok(Markup::ReStructuredText),
            _ => Err(Error::UnknownMarkup(s.to_owned())),
        }
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Markup::Markdown => "Markdown",
            Markup::ReStructuredText => "reST",
        })
    }
}

struct CodeBlock {
    lang: Option<String>,
    code: String,
}

fn markdown(text: &str) -> Result<String> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_DEFINITION_LIST);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    // Code blocks are collected whole and replaced by a single raw HTML event
    // so they can be wrapped for highlighting.
    let mut events: Vec<Event> = Vec::new();
    let mut block: Option<CodeBlock> = None;
    for event in Parser::new_ext(text, options) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                block = Some(CodeBlock {
                    lang: match kind {
                        CodeBlockKind::Fenced(info) => {
                            info.split_whitespace().next().map(str::to_owned)
                        }
                        CodeBlockKind::Indented => None,
                    },
                    code: String::new(),
                });
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = block.take() {
                    let html = highlight::code_block(block.lang.as_deref(), &block.code)?;
                    events.push(Event::Html(CowStr::from(html)));
                }
            }
            Event::Text(text) => match block.as_mut() {
                Some(block) => block.code.push_str(&text),
                None => events.push(Event::Text(text)),
            },
            event => events.push(event),
        }
    }

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    Ok(out)
}

fn restructured_text(text: &str) -> Result<String> {
    let document = rst_parser::parse(text).map_err(|err| Error::Rst(err.to_string()))?;
    let mut out: Vec<u8> = Vec::new();
    rst_renderer::render_html(&document, &mut out, false)
        .map_err(|err| Error::Rst(err.to_string()))?;
    Ok(String::from_utf8(out)?)
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to select a markup language or to render a body.
#[derive(Debug)]
pub enum Error {
    /// Returned when a markup name is neither `reST` nor `Markdown`.
    UnknownMarkup(String),

    /// Returned when the reStructuredText parser or renderer fails.
    Rst(String),

    /// Returned when a Markdown code block can't be highlighted.
    Highlight(highlight::Error),

    /// Returned when a renderer produces invalid UTF-8.
    Utf8(std::string::FromUtf8Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownMarkup(name) => write!(
                f,
                "unknown markup `{}`; choices are `reST` and `Markdown`",
                name
            ),
            Error::Rst(err) => write!(f, "rendering reStructuredText: {}", err),
            Error::Highlight(err) => err.fmt(f),
            Error::Utf8(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UnknownMarkup(_) => None,
            Error::Rst(_) => None,
            Error::Highlight(err) => Some(err),
            Error::Utf8(err) => Some(err),
        }
    }
}

impl From<highlight::Error> for Error {
    fn from(err: highlight::Error) -> Error {
        Error::Highlight(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Error {
        Error::Utf8(err)
    }
}
