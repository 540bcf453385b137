//! Loads the site's templates and renders the four kinds of page: the root
//! index, the per-tag indices, the per-entry detail pages, and the 404 page.
//!
//! Templates use Go template syntax (see [`gtmpl`]). Each page template is
//! compiled from three files concatenated in this order:
//!
//! 1. [`ENTRY_PARTIAL`], which defines the `entry` template
//! 2. the page file ([`LIST`], [`DETAIL`], or [`NOT_FOUND`]), which defines
//!    the `content` template
//! 3. [`BASE`], the document itself, which invokes `{{template "content" .}}`
//!
//! The root and tag indices share [`LIST`]; a tag index can be told apart by
//! its non-nil `active_tag`.

use crate::config::Site;
use crate::context::RenderContext;
use crate::entry::Entry;
use chrono::FixedOffset;
use gtmpl::{Context, Template};
use std::fmt;
use std::path::{Path, PathBuf};

pub const BASE: &str = "base.html";
pub const LIST: &str = "list.html";
pub const DETAIL: &str = "detail.html";
pub const ENTRY_PARTIAL: &str = "_entry.html";
pub const NOT_FOUND: &str = "404.html";

/// The compiled page templates and the raw stylesheet source.
pub struct Templates {
    list: Template,
    detail: Template,
    not_found: Template,
    stylesheet: String,
}

impl Templates {
    /// Reads and compiles every template in `dir`. `stylesheet` is the file
    /// name of the hand-authored stylesheet, also read from `dir`.
    pub fn load(dir: &Path, stylesheet: &str) -> Result<Templates> {
        let base = read_template(dir, BASE)?;
        let entry = read_template(dir, ENTRY_PARTIAL)?;
        let compile = |name: &str| -> Result<Template> {
            let page = read_template(dir, name)?;
            parse_template(name, &[&entry, &page, &base])
        };

        Ok(Templates {
            list: compile(LIST)?,
            detail: compile(DETAIL)?,
            not_found: compile(NOT_FOUND)?,
            stylesheet: read_template(dir, stylesheet)?,
        })
    }

    /// The hand-authored stylesheet, dedented and stripped.
    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }
}

// Reads a template file, removing common indentation and surrounding
// whitespace.
fn read_template(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    let contents = std::fs::read_to_string(&path)
        .map_err(|err| Error::OpenTemplateFile { path, err })?;
    Ok(dedent(&contents).trim().to_owned())
}

// Concatenates the sources and parses the result into a template.
fn parse_template(name: &str, sources: &[&str]) -> Result<Template> {
    let mut template = Template::default();
    template
        .parse(sources.concat())
        .map_err(|err| Error::ParseTemplate {
            name: name.to_owned(),
            err: err.to_string(),
        })?;
    Ok(template)
}

/// Removes the whitespace prefix shared by every non-blank line. Blank lines
/// become empty.
fn dedent(text: &str) -> String {
    let indent = |line: &str| line.len() - line.trim_start_matches([' ', '\t']).len();
    let common = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..indent(line)])
        .reduce(|a, b| {
            let shared = a
                .bytes()
                .zip(b.bytes())
                .take_while(|(x, y)| x == y)
                .count();
            &a[..shared]
        })
        .unwrap_or("");

    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if !line.trim().is_empty() {
            out.push_str(&line[common.len()..]);
        }
        out.push('\n');
    }
    out
}

/// Renders pages. Responsible only for building each page's
/// [`RenderContext`] and choosing its template.
pub struct PageBuilder<'a> {
    templates: &'a Templates,
    site: &'a Site,
    offset: FixedOffset,
}

impl<'a> PageBuilder<'a> {
    pub fn new(templates: &'a Templates, site: &'a Site, offset: FixedOffset) -> PageBuilder<'a> {
        PageBuilder {
            templates,
            site,
            offset,
        }
    }

    /// Renders the root index listing `entries`.
    pub fn render_index(&self, entries: &[&Entry], feed_url: &str) -> Result<String> {
        self.render(
            &self.templates.list,
            "index",
            RenderContext::index(self.site, self.offset, entries.to_vec(), feed_url.to_owned()),
        )
    }

    /// Renders the index for `tag`, listing `entries`.
    pub fn render_tag_index(&self, tag: &str, entries: &[&Entry], feed_url: &str) -> Result<String> {
        self.render(
            &self.templates.list,
            tag,
            RenderContext::tag_index(
                self.site,
                self.offset,
                tag,
                entries.to_vec(),
                feed_url.to_owned(),
            ),
        )
    }

    /// Renders the detail page of `entry`.
    pub fn render_detail(&self, entry: &Entry) -> Result<String> {
        self.render(
            &self.templates.detail,
            &entry.slug,
            RenderContext::detail(self.site, self.offset, entry),
        )
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.render(
            &self.templates.not_found,
            "404",
            RenderContext::not_found(self.site, self.offset),
        )
    }

    fn render(&self, template: &Template, page: &str, context: RenderContext) -> Result<String> {
        let context = Context::from(context.to_value());
        let mut out: Vec<u8> = Vec::new();
        template
            .execute(&mut out, &context)
            .map_err(|err| Error::Execute {
                page: page.to_owned(),
                err: err.to_string(),
            })?;
        Ok(String::from_utf8(out)?)
    }
}

/// The result of a fallible template operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading templates or rendering a page.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate { name: String, err: String },

    /// Returned for errors while executing a template.
    Execute { page: String, err: String },

    /// Returned when a template produces invalid UTF-8.
    Utf8(std::string::FromUtf8Error),
}

impl Error {
    /// Whether the error comes from the template files themselves (as opposed
    /// to rendering a particular page).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::OpenTemplateFile { .. } | Error::ParseTemplate { .. }
        )
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate { name, err } => {
                write!(f, "Parsing template '{}': {}", name, err)
            }
            Error::Execute { page, err } => write!(f, "Rendering page '{}': {}", page, err),
            Error::Utf8(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { err, .. } => Some(err),
            Error::ParseTemplate { .. } => None,
            Error::Execute { .. } => None,
            Error::Utf8(err) => Some(err),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Error {
        Error::Utf8(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::{date, entry, site, utc, write_templates};

    #[test]
    fn test_dedent() {
        assert_eq!("a\n  b\n\nc\n", dedent("    a\n      b\n  \n    c"));
        assert_eq!("a\nb\n", dedent("a\nb"));
        assert_eq!("x\n", dedent("\tx"));
    }

    #[test]
    fn test_missing_template() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        write_templates(dir.path())?;
        std::fs::remove_file(dir.path().join(DETAIL))?;
        match Templates::load(dir.path(), "style.css") {
            Err(err @ Error::OpenTemplateFile { .. }) => assert!(err.is_configuration()),
            Err(err) => panic!("wanted OpenTemplateFile; found {}", err),
            Ok(_) => panic!("wanted OpenTemplateFile; found Ok"),
        }
        Ok(())
    }

    #[test]
    fn test_missing_stylesheet() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        write_templates(dir.path())?;
        assert!(Templates::load(dir.path(), "other.css").is_err());
        Ok(())
    }

    #[test]
    fn test_render_pages() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        write_templates(dir.path())?;
        let templates = Templates::load(dir.path(), "style.css")?;
        assert_eq!("body { margin: 0; }", templates.stylesheet());

        let site = site();
        let pages = PageBuilder::new(&templates, &site, utc());
        let second = entry("second-post", date(2023, 2, 10), &["go"]);
        let hello = entry("hello-world", date(2023, 1, 5), &["go", "rust"]);

        let index = pages.render_index(&[&second, &hello], "http://example.org/index.atom")?;
        assert!(index.contains("<title>Jane</title>"));
        assert!(index.contains(r#"href="http://example.org/index.atom""#));
        assert!(index.contains(r#"href="/style.css""#));
        assert!(!index.contains(r#"class="tag""#));
        let (first, rest) = index
            .split_once(r#"<article id="second-post">"#)
            .ok_or("missing second-post")?;
        assert!(!first.contains("hello-world"));
        assert!(rest.contains(r#"<article id="hello-world"><h2>hello-world</h2><p>hello-world</p></article>"#));

        let tag = pages.render_tag_index("rust", &[&hello], "http://example.org/tags/rust.atom")?;
        assert!(tag.contains("<title>Jane: rust</title>"));
        assert!(tag.contains(r#"<p class="tag">rust</p>"#));
        assert!(tag.contains(r#"<article id="hello-world">"#));
        assert!(!tag.contains("second-post"));

        let detail = pages.render_detail(&hello)?;
        assert!(detail.contains("<title>Jane: hello-world</title>"));
        assert!(detail.contains(r#"<article id="hello-world">"#));
        assert!(!detail.contains("rel=\"alternate\""));

        let not_found = pages.render_not_found()?;
        assert!(not_found.contains("<p>Not found</p>"));
        assert!(not_found.contains("<h1>Jane Doe</h1>"));
        Ok(())
    }
}
