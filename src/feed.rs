//! Support for creating Atom feeds from a list of entries.
//!
//! Feed and entry ids are `tag:` URIs built from the host of the canonical
//! URL. Timestamps are written as `YYYY-MM-DDTHH:MM:SSZ`, computed by shifting
//! midnight of the entry's date by the UTC offset in effect when the site is
//! generated (see [`rfc3339`]).

use crate::config::Site;
use crate::entry::Entry;
use chrono::{Duration, FixedOffset, Local, NaiveDate, NaiveTime};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use std::fmt;

/// The Atom XML namespace.
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// The date in the feed-level `tag:` id. This is a fixed constant; changing it
/// changes the feed's identity for every subscriber.
pub const FEED_EPOCH: &str = "2009-03-04";

/// The local UTC offset right now, including any daylight-saving adjustment.
pub fn local_offset() -> FixedOffset {
    *Local::now().offset()
}

/// Formats a date as an Atom timestamp: midnight on `date`, shifted by
/// `offset`, with a literal `Z` suffix.
///
/// This is not true UTC midnight. Feeds generated before and after a
/// daylight-saving change will disagree by an hour; existing subscribers
/// depend on this exact value.
pub fn rfc3339(date: NaiveDate, offset: FixedOffset) -> String {
    let shifted = date.and_time(NaiveTime::MIN)
        + Duration::seconds(i64::from(offset.local_minus_utc()));
    shifted.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// The feed-level id, e.g., `tag:example.org,2009-03-04:/`.
pub fn feed_id(site: &Site) -> String {
    format!("tag:{},{}:/", site.domain(), FEED_EPOCH)
}

/// The id of an entry, e.g., `tag:example.org,2023-01-05:/hello-world`.
pub fn entry_id(site: &Site, entry: &Entry) -> String {
    format!("tag:{},{}:/{}", site.domain(), entry.display_date(), entry.slug)
}

/// Builds Atom documents for the site.
pub struct FeedBuilder<'a> {
    site: &'a Site,
    offset: FixedOffset,
}

impl<'a> FeedBuilder<'a> {
    /// Constructs a builder. `offset` is the UTC offset applied to every
    /// timestamp (normally [`local_offset`]).
    pub fn new(site: &'a Site, offset: FixedOffset) -> FeedBuilder<'a> {
        FeedBuilder { site, offset }
    }

    /// Builds a feed from `entries`, which must be ordered most recent first.
    /// The feed's `updated` is taken from the first entry, so an empty list
    /// is an error.
    pub fn build(&self, entries: &[&Entry], feed_url: &str) -> Result<String> {
        let newest = entries.first().ok_or(Error::Empty)?;

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer
            .create_element("feed")
            .with_attribute(("xmlns", ATOM_NS))
            .write_inner_content(|w| {
                w.create_element("author").write_inner_content(|w| {
                    w.create_element("name")
                        .write_text_content(BytesText::new(&self.site.author.name))?;
                    Ok(())
                })?;
                w.create_element("id")
                    .write_text_content(BytesText::new(&feed_id(self.site)))?;
                w.create_element("title")
                    .write_text_content(BytesText::new(&self.site.title))?;
                w.create_element("link")
                    .with_attribute(("href", self.site.root()))
                    .write_empty()?;
                w.create_element("link")
                    .with_attribute(("href", feed_url))
                    .with_attribute(("rel", "self"))
                    .write_empty()?;
                w.create_element("updated")
                    .write_text_content(BytesText::new(&rfc3339(newest.date, self.offset)))?;
                for entry in entries {
                    self.write_entry(w, entry)?;
                }
                Ok(())
            })?;

        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn write_entry(&self, w: &mut Writer<Vec<u8>>, entry: &Entry) -> std::io::Result<()> {
        let link = format!("{}/{}", self.site.root(), entry.slug);
        w.create_element("entry").write_inner_content(|w| {
            w.create_element("id")
                .write_text_content(BytesText::new(&entry_id(self.site, entry)))?;
            w.create_element("title")
                .write_text_content(BytesText::new(&entry.title))?;
            w.create_element("link")
                .with_attribute(("href", link.as_str()))
                .write_empty()?;
            w.create_element("updated")
                .write_text_content(BytesText::new(&rfc3339(entry.date, self.offset)))?;
            w.create_element("content")
                .with_attribute(("type", "html"))
                .write_text_content(BytesText::new(&entry.content_html))?;
            Ok(())
        })?;
        Ok(())
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when asked to build a feed with no entries.
    Empty,

    /// Returned when writing the XML fails.
    Io(std::io::Error),

    /// Returned when the XML writer produces invalid UTF-8.
    Utf8(std::string::FromUtf8Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Empty => write!(f, "can't build a feed with no entries"),
            Error::Io(err) => err.fmt(f),
            Error::Utf8(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Empty => None,
            Error::Io(err) => Some(err),
            Error::Utf8(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
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
    use crate::test_helpers::{date, site, utc};

    fn entry(slug: &str, title: &str, date: NaiveDate, html: &str) -> Entry {
        Entry {
            title: title.to_owned(),
            content_html: html.to_owned(),
            ..crate::test_helpers::entry(slug, date, &[])
        }
    }

    #[test]
    fn test_rfc3339() {
        assert_eq!("2023-02-10T00:00:00Z", rfc3339(date(2023, 2, 10), utc()));
        assert_eq!(
            "2023-02-10T01:00:00Z",
            rfc3339(date(2023, 2, 10), FixedOffset::east_opt(3600).unwrap())
        );
        assert_eq!(
            "2023-02-09T20:00:00Z",
            rfc3339(date(2023, 2, 10), FixedOffset::west_opt(4 * 3600).unwrap())
        );
    }

    #[test]
    fn test_ids() {
        let site = site();
        let hello = entry("hello-world", "Hello World", date(2023, 1, 5), "");
        assert_eq!("tag:example.org,2009-03-04:/", feed_id(&site));
        assert_eq!("tag:example.org,2023-01-05:/hello-world", entry_id(&site, &hello));
    }

    #[test]
    fn test_build() -> Result<()> {
        let site = site();
        let second = entry("second-post", "Second Post", date(2023, 2, 10), "<p>Two &amp; more</p>");
        let hello = entry("hello-world", "Hello World", date(2023, 1, 5), "<p>One</p>");
        let feed = FeedBuilder::new(&site, utc())
            .build(&[&second, &hello], "http://example.org/index.atom")?;

        assert!(feed.contains(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#));
        assert!(feed.contains("<name>Jane Doe</name>"));
        assert!(feed.contains("<id>tag:example.org,2009-03-04:/</id>"));
        assert!(feed.contains("<title>Web</title>"));
        assert!(feed.contains(r#"<link href="http://example.org"/>"#));
        assert!(feed.contains(r#"<link href="http://example.org/index.atom" rel="self"/>"#));
        assert!(feed.contains(r#"<link href="http://example.org/second-post"/>"#));
        assert!(feed.contains("<id>tag:example.org,2023-01-05:/hello-world</id>"));
        assert!(feed.contains(
            r#"<content type="html">&lt;p&gt;Two &amp;amp; more&lt;/p&gt;</content>"#
        ));
        assert_eq!(2, feed.matches("<entry>").count());

        // The feed's `updated` comes first and matches the newest entry.
        let first_updated = feed
            .split("<updated>")
            .nth(1)
            .and_then(|rest| rest.split("</updated>").next());
        assert_eq!(Some("2023-02-10T00:00:00Z"), first_updated);
        Ok(())
    }

    #[test]
    fn test_build_empty() {
        let site = site();
        assert!(matches!(
            FeedBuilder::new(&site, utc()).build(&[], "http://example.org/index.atom"),
            Err(Error::Empty)
        ));
    }
}
