//! Defines the [`Entry`], [`Parser`], and [`Error`] types, and the logic for
//! reading entries from the source directory.
//!
//! An entry lives in a single file named `YYYY.MM.DD.Raw.Title` (month and
//! day may be one or two digits). The file holds an email-style message:
//! `Key: value` header lines (at least `Tags`), a blank line, and the body.
//!
//! ```text
//! Tags: rust release
//!
//! The body, in Markdown or reStructuredText.
//! ```
//!
//! Files whose names don't follow the pattern are skipped silently. A file
//! whose name follows the pattern but can't be parsed aborts the run; these
//! two behaviors are deliberately different.

use crate::markup::{self, Markup};
use crate::typography;
use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// One published entry. Immutable once parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub date: NaiveDate,

    /// The URL-safe identifier, also the entry's output file name (less the
    /// `.html` extension). See [`slugify`].
    pub slug: String,

    /// The human-readable title. See [`title`].
    pub title: String,

    /// The tags in header order. Duplicates are kept.
    pub tags: Vec<String>,

    /// The body exactly as written.
    pub body_raw: String,

    /// The body rendered to HTML and prettified.
    pub content_html: String,
}

impl Entry {
    /// The date as `YYYY-MM-DD`.
    pub fn display_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Midnight on the entry's date as a naive ISO 8601 date-time.
    pub fn iso8601(&self) -> String {
        self.date.format("%Y-%m-%dT00:00:00").to_string()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

static FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4})\.([0-9]{1,2})\.([0-9]{1,2})\.(.+)$").unwrap()
});

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_\s-]").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Derives a slug from a raw title: lowercase, periods read as spaces, every
/// character other than `[a-z0-9_]`, whitespace, and `-` dropped, and each
/// run of whitespace replaced by a single hyphen.
pub fn slugify(raw_title: &str) -> String {
    let lowered = raw_title.to_lowercase().replace('.', " ");
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE.replace_all(&stripped, "-").into_owned()
}

/// Derives a display title from a raw title by reading periods as spaces.
pub fn title(raw_title: &str) -> String {
    raw_title.replace('.', " ")
}

/// Slugs whose detail pages would overwrite a generated page.
pub const RESERVED_SLUGS: &[&str] = &["index", "404"];

/// Tags name files under `tags/`, so they must stay a single path component.
fn is_valid_tag(tag: &str) -> bool {
    !tag.contains(['/', '\\']) && tag != "." && tag != ".."
}

/// The parts of a file name that follows the entry pattern.
#[derive(Debug, PartialEq)]
struct FileName<'a> {
    year: &'a str,
    month: &'a str,
    day: &'a str,
    raw_title: &'a str,
}

fn match_file_name(file_name: &str) -> Option<FileName<'_>> {
    let captures = FILE_NAME.captures(file_name)?;
    Some(FileName {
        year: captures.get(1)?.as_str(),
        month: captures.get(2)?.as_str(),
        day: captures.get(3)?.as_str(),
        raw_title: captures.get(4)?.as_str(),
    })
}

/// An email-style message: header fields and a payload.
#[derive(Debug, PartialEq)]
struct Message<'a> {
    headers: Vec<(&'a str, String)>,
    body: &'a str,
}

impl<'a> Message<'a> {
    /// Splits `input` into headers and body. The header block ends at the
    /// first empty line (which is consumed) or at the first line that is
    /// neither a header nor a continuation (which starts the body).
    fn parse(input: &'a str) -> Message<'a> {
        let mut headers: Vec<(&str, String)> = Vec::new();
        let mut offset = 0;
        for line in input.split_inclusive('\n') {
            let content = line.trim_end_matches(|c| c == '\r' || c == '\n');
            if content.is_empty() {
                offset += line.len();
                break;
            }

            if content.starts_with(|c| c == ' ' || c == '\t') {
                match headers.last_mut() {
                    Some((_, value)) => {
                        value.push(' ');
                        value.push_str(content.trim());
                    }
                    None => break,
                }
            } else {
                match content.split_once(':') {
                    Some((name, value))
                        if !name.is_empty() && !name.contains(char::is_whitespace) =>
                    {
                        headers.push((name, value.trim().to_owned()))
                    }
                    _ => break,
                }
            }
            offset += line.len();
        }

        Message {
            headers,
            body: &input[offset..],
        }
    }

    /// Looks up a header by case-insensitive name.
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Lists the files in the source directory in reverse-lexicographic file-name
/// order. Nothing is filtered out here.
pub fn list_source_files(source_directory: &Path) -> Result<Vec<PathBuf>> {
    let source_error = |err| Error::SourceDirectory {
        path: source_directory.to_owned(),
        err,
    };

    let mut paths = Vec::new();
    for result in std::fs::read_dir(source_directory).map_err(source_error)? {
        paths.push(result.map_err(source_error)?.path());
    }
    paths.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(paths)
}

/// Parses [`Entry`] objects from source files.
pub struct Parser {
    markup: Markup,
}

impl Parser {
    /// Constructs a parser that renders every body with `markup`.
    pub fn new(markup: Markup) -> Parser {
        Parser { markup }
    }

    /// Parses every entry in `source_directory`. Files that don't follow the
    /// entry naming pattern are skipped; any other failure aborts.
    pub fn parse_entries(&self, source_directory: &Path) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for path in list_source_files(source_directory)? {
            if let Some(entry) = self.parse(&path)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Parses a single source file. Returns `Ok(None)` if the file name
    /// doesn't follow the entry pattern.
    pub fn parse(&self, path: &Path) -> Result<Option<Entry>> {
        let name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => {
                debug!(path = %path.display(), "skipping source file with a non-UTF-8 name");
                return Ok(None);
            }
        };
        let name = match match_file_name(name) {
            Some(name) => name,
            None => {
                debug!(path = %path.display(), "skipping source file without a date prefix");
                return Ok(None);
            }
        };

        let date = parse_date(&name).ok_or_else(|| Error::InvalidDate {
            path: path.to_owned(),
            date: format!("{}.{}.{}", name.year, name.month, name.day),
        })?;

        let slug = slugify(name.raw_title);
        if slug.is_empty() || RESERVED_SLUGS.contains(&slug.as_str()) {
            return Err(Error::InvalidSlug {
                path: path.to_owned(),
                slug,
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|err| Error::Read {
            path: path.to_owned(),
            err,
        })?;
        let message = Message::parse(&contents);
        let tags: Vec<String> = message
            .header("Tags")
            .ok_or_else(|| Error::MissingTags(path.to_owned()))?
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        if let Some(tag) = tags.iter().find(|tag| !is_valid_tag(tag)) {
            return Err(Error::InvalidTag {
                path: path.to_owned(),
                tag: tag.clone(),
            });
        }

        let html = self
            .markup
            .render(message.body)
            .map_err(|err| Error::Markup {
                path: path.to_owned(),
                err,
            })?;

        Ok(Some(Entry {
            date,
            slug,
            title: title(name.raw_title),
            tags,
            body_raw: message.body.to_owned(),
            content_html: typography::prettify(&html),
        }))
    }
}

fn parse_date(name: &FileName) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        name.year.parse().ok()?,
        name.month.parse().ok()?,
        name.day.parse().ok()?,
    )
}

/// Represents the result of an [`Entry`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading or parsing entries.
#[derive(Debug)]
pub enum Error {
    /// Returned when the source directory can't be listed.
    SourceDirectory { path: PathBuf, err: std::io::Error },

    /// Returned when an entry file can't be read.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when an entry's file name holds a date that doesn't exist,
    /// e.g., month 13.
    InvalidDate { path: PathBuf, date: String },

    /// Returned when an entry's slug is empty or would overwrite a generated
    /// page (see [`RESERVED_SLUGS`]).
    InvalidSlug { path: PathBuf, slug: String },

    /// Returned when an entry has no `Tags` header.
    MissingTags(PathBuf),

    /// Returned when a tag isn't usable as a file name, e.g., `../x`.
    InvalidTag { path: PathBuf, tag: String },

    /// Returned when an entry's body can't be rendered.
    Markup { path: PathBuf, err: markup::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::SourceDirectory { path, err } => {
                write!(f, "Listing source directory '{}': {}", path.display(), err)
            }
            Error::Read { path, err } => {
                write!(f, "Reading entry '{}': {}", path.display(), err)
            }
            Error::InvalidDate { path, date } => {
                write!(f, "Parsing entry '{}': invalid date `{}`", path.display(), date)
            }
            Error::InvalidSlug { path, slug } => write!(
                f,
                "Parsing entry '{}': slug `{}` is empty or reserved",
                path.display(),
                slug
            ),
            Error::MissingTags(path) => {
                write!(f, "Parsing entry '{}': missing `Tags` header", path.display())
            }
            Error::InvalidTag { path, tag } => {
                write!(f, "Parsing entry '{}': invalid tag `{}`", path.display(), tag)
            }
            Error::Markup { path, err } => {
                write!(f, "Rendering entry '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SourceDirectory { err, .. } => Some(err),
            Error::Read { err, .. } => Some(err),
            Error::InvalidDate { .. } => None,
            Error::InvalidSlug { .. } => None,
            Error::MissingTags(_) => None,
            Error::InvalidTag { .. } => None,
            Error::Markup { err, .. } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::Catalog;
    use std::fs;

    #[test]
    fn test_slugify() {
        assert_eq!("hello-world", slugify("Hello.World"));
        assert_eq!("second-post", slugify("Second.Post"));
        assert_eq!("c-rust-a-k-a-fun", slugify("C++ & Rust: a.k.a. fun"));
        assert_eq!("under_score-and-hyphen", slugify("Under_score and-hyphen"));
        assert_eq!("trailing-", slugify("Trailing."));
        assert_eq!("caf", slugify("Café"));
    }

    #[test]
    fn test_slugify_alphabet() {
        for raw in ["Héllo.Wörld!!", "A\tB\n\nC", "¿Qué?", "x.y.z", "  spaced  "] {
            let slug = slugify(raw);
            assert!(
                slug.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'),
                "slug `{}` for `{}`",
                slug,
                raw
            );
        }
    }

    #[test]
    fn test_title() {
        assert_eq!("Hello World", title("Hello.World"));
        assert_eq!("Already spaced", title("Already spaced"));
    }

    #[test]
    fn test_match_file_name() {
        assert_eq!(
            Some(FileName {
                year: "2023",
                month: "1",
                day: "05",
                raw_title: "Hello.World",
            }),
            match_file_name("2023.1.05.Hello.World"),
        );
        assert_eq!(None, match_file_name("notes.txt"));
        assert_eq!(None, match_file_name("23.01.05.Short.Year"));
        assert_eq!(None, match_file_name("2023.001.05.Long.Month"));
        assert_eq!(None, match_file_name("2023.01.05."));
    }

    #[test]
    fn test_parse_message() {
        let message = Message::parse("Tags: go rust\r\nSubject: a\n  folded\n\nBody\n\nMore: not a header\n");
        assert_eq!(
            vec![("Tags", "go rust".to_owned()), ("Subject", "a folded".to_owned())],
            message.headers
        );
        assert_eq!("Body\n\nMore: not a header\n", message.body);
        assert_eq!(Some("go rust"), message.header("tags"));
        assert_eq!(None, message.header("Date"));
    }

    #[test]
    fn test_parse_message_without_blank_line() {
        let message = Message::parse("Tags: a\nThis line starts the body.\n");
        assert_eq!(Some("a"), message.header("Tags"));
        assert_eq!("This line starts the body.\n", message.body);

        let message = Message::parse("Tags: a\n");
        assert_eq!("", message.body);
    }

    #[test]
    fn test_parse_entry() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("2023.01.05.Hello.World");
        fs::write(&path, "Tags: go rust go\n\nIt's *here*...\n")?;

        let entry = Parser::new(Markup::Markdown)
            .parse(&path)?
            .ok_or("entry was skipped")?;
        assert_eq!(NaiveDate::from_ymd_opt(2023, 1, 5), Some(entry.date));
        assert_eq!("hello-world", entry.slug);
        assert_eq!("Hello World", entry.title);
        assert_eq!(vec!["go", "rust", "go"], entry.tags);
        assert_eq!("It's *here*...\n", entry.body_raw);
        assert_eq!("<p>It&#8217;s <em>here</em>&#8230;</p>\n", entry.content_html);
        assert_eq!("2023-01-05", entry.display_date());
        assert_eq!("2023-01-05T00:00:00", entry.iso8601());
        assert!(entry.has_tag("rust"));
        assert!(!entry.has_tag("python"));
        Ok(())
    }

    #[test]
    fn test_parse_skips_unmatched_names() -> Result<()> {
        // Skipped before the file is ever opened.
        let path = Path::new("/nonexistent/notes.txt");
        assert_eq!(None, Parser::new(Markup::Markdown).parse(path)?);
        Ok(())
    }

    #[test]
    fn test_parse_invalid_date() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("2023.13.01.Bad");
        fs::write(&path, "Tags: a\n\nbody\n")?;
        match Parser::new(Markup::Markdown).parse(&path) {
            Err(Error::InvalidDate { date, .. }) => assert_eq!("2023.13.01", date),
            other => panic!("wanted InvalidDate; found {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_parse_missing_tags() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("2023.01.01.Untagged");
        fs::write(&path, "Subject: none\n\nbody\n")?;
        assert!(matches!(
            Parser::new(Markup::Markdown).parse(&path),
            Err(Error::MissingTags(_))
        ));
        Ok(())
    }

    #[test]
    fn test_parse_entries() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("2023.01.05.Hello.World"), "Tags: go rust\n\nHello\n")?;
        fs::write(dir.path().join("2023.02.10.Second.Post"), "Tags: go\n\nSecond\n")?;
        fs::write(dir.path().join("notes.txt"), "not an entry")?;

        let entries = Parser::new(Markup::Markdown).parse_entries(dir.path())?;
        let slugs: Vec<&str> = entries.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(vec!["second-post", "hello-world"], slugs);
        Ok(())
    }

    #[test]
    fn test_same_date_entries_keep_reverse_file_order(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("2023.01.05.A"), "Tags: x\n\nA\n")?;
        fs::write(dir.path().join("2023.01.05.B"), "Tags: x\n\nB\n")?;
        fs::write(dir.path().join("2023.01.04.C"), "Tags: x\n\nC\n")?;

        let names: Vec<String> = list_source_files(dir.path())?
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        assert_eq!(vec!["2023.01.05.B", "2023.01.05.A", "2023.01.04.C"], names);

        let catalog = Catalog::new(Parser::new(Markup::Markdown).parse_entries(dir.path())?);
        let slugs: Vec<&str> = catalog.entries().iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(vec!["b", "a", "c"], slugs);
        Ok(())
    }

    #[test]
    fn test_parse_invalid_tags() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        for tags in ["../../escaped", "a/b", "a\\b", "..", "ok ."] {
            let path = dir.path().join("2023.01.01.Post");
            fs::write(&path, format!("Tags: {}\n\nbody\n", tags))?;
            assert!(
                matches!(
                    Parser::new(Markup::Markdown).parse(&path),
                    Err(Error::InvalidTag { .. })
                ),
                "tags `{}` were accepted",
                tags
            );
        }
        Ok(())
    }

    #[test]
    fn test_parse_reserved_slugs() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["2023.01.01.Index", "2023.01.01.404", "2023.01.01.!!!"] {
            let path = dir.path().join(name);
            fs::write(&path, "Tags: a\n\nbody\n")?;
            assert!(
                matches!(
                    Parser::new(Markup::Markdown).parse(&path),
                    Err(Error::InvalidSlug { .. })
                ),
                "`{}` was accepted",
                name
            );
        }
        Ok(())
    }

    #[test]
    fn test_list_source_files_missing_directory() {
        assert!(matches!(
            list_source_files(Path::new("/definitely/not/a/directory")),
            Err(Error::SourceDirectory { .. })
        ));
    }
}
