//! Typed render contexts. Each page kind gets its own constructor on
//! [`RenderContext`], which merges the site-wide facts with the page's own
//! fields. [`RenderContext::to_value`] turns the result into the [`Value`]
//! handed to the template.
//!
//! Every context exposes the same set of keys; the ones a page kind doesn't
//! use are nil so templates shared between pages (e.g., `base.html`) can test
//! for them.

use crate::config::{Author, Site};
use crate::entry::Entry;
use crate::feed::rfc3339;
use chrono::FixedOffset;
use gtmpl_value::Value;
use std::collections::HashMap;

/// The page-specific part of a [`RenderContext`].
#[derive(Debug)]
pub enum Page<'a> {
    /// The root index: every entry.
    Index {
        entries: Vec<&'a Entry>,
        feed_url: String,
    },

    /// The index for one tag.
    TagIndex {
        tag: &'a str,
        entries: Vec<&'a Entry>,
        feed_url: String,
    },

    /// A single entry.
    Detail { entry: &'a Entry },

    /// The 404 page.
    NotFound,
}

/// Everything a template sees when rendering one page.
#[derive(Debug)]
pub struct RenderContext<'a> {
    pub site: &'a Site,

    /// The `<title>` of the page: the site's head title, suffixed with the
    /// tag or entry title where there is one.
    pub head_title: String,

    pub page: Page<'a>,

    /// The UTC offset used for the entries' `rfc3339` timestamps.
    pub offset: FixedOffset,
}

impl<'a> RenderContext<'a> {
    pub fn index(
        site: &'a Site,
        offset: FixedOffset,
        entries: Vec<&'a Entry>,
        feed_url: String,
    ) -> RenderContext<'a> {
        RenderContext {
            site,
            head_title: site.head_title.clone(),
            page: Page::Index { entries, feed_url },
            offset,
        }
    }

    pub fn tag_index(
        site: &'a Site,
        offset: FixedOffset,
        tag: &'a str,
        entries: Vec<&'a Entry>,
        feed_url: String,
    ) -> RenderContext<'a> {
        RenderContext {
            site,
            head_title: format!("{}: {}", site.head_title, tag),
            page: Page::TagIndex {
                tag,
                entries,
                feed_url,
            },
            offset,
        }
    }

    pub fn detail(site: &'a Site, offset: FixedOffset, entry: &'a Entry) -> RenderContext<'a> {
        RenderContext {
            site,
            head_title: format!("{}: {}", site.head_title, entry.title),
            page: Page::Detail { entry },
            offset,
        }
    }

    pub fn not_found(site: &'a Site, offset: FixedOffset) -> RenderContext<'a> {
        RenderContext {
            site,
            head_title: site.head_title.clone(),
            page: Page::NotFound,
            offset,
        }
    }

    /// Converts the context into a template [`Value`]. See the module docs
    /// for the set of keys.
    pub fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("author".to_owned(), author_value(&self.site.author));
        m.insert("title".to_owned(), string(&self.site.title));
        m.insert("url".to_owned(), string(self.site.root()));
        m.insert("head_title".to_owned(), string(&self.head_title));
        m.insert("body_title".to_owned(), string(&self.site.body_title));
        m.insert("analytics".to_owned(), optional(self.site.analytics.as_deref()));
        m.insert("stylesheet".to_owned(), string(&self.site.stylesheet));

        let (entries, entry, feed_url, active_tag) = match &self.page {
            Page::Index { entries, feed_url } => (Some(entries), None, Some(feed_url), None),
            Page::TagIndex {
                tag,
                entries,
                feed_url,
            } => (Some(entries), None, Some(feed_url), Some(*tag)),
            Page::Detail { entry } => (None, Some(*entry), None, None),
            Page::NotFound => (None, None, None, None),
        };
        m.insert(
            "entries".to_owned(),
            match entries {
                Some(entries) => Value::Array(
                    entries
                        .iter()
                        .map(|entry| entry_value(entry, self.offset))
                        .collect(),
                ),
                None => Value::Nil,
            },
        );
        m.insert(
            "entry".to_owned(),
            entry.map_or(Value::Nil, |entry| entry_value(entry, self.offset)),
        );
        m.insert("feed_url".to_owned(), optional(feed_url.map(String::as_str)));
        m.insert("active_tag".to_owned(), optional(active_tag));
        Value::Object(m)
    }
}

fn string(s: &str) -> Value {
    Value::String(s.to_owned())
}

fn optional(s: Option<&str>) -> Value {
    s.map_or(Value::Nil, string)
}

fn author_value(author: &Author) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("name".to_owned(), string(&author.name));
    m.insert("email".to_owned(), optional(author.email.as_deref()));
    m.insert("url".to_owned(), optional(author.url.as_deref()));
    m.insert(
        "elsewhere".to_owned(),
        Value::Object(
            author
                .elsewhere
                .iter()
                .map(|(name, url)| (name.clone(), string(url)))
                .collect(),
        ),
    );
    Value::Object(m)
}

/// Converts an [`Entry`] into a template value with fields `slug`, `title`,
/// `tags`, `content_html`, and `date` (itself holding `iso8601`, `rfc3339`,
/// and `display`).
fn entry_value(entry: &Entry, offset: FixedOffset) -> Value {
    let mut date: HashMap<String, Value> = HashMap::new();
    date.insert("iso8601".to_owned(), Value::String(entry.iso8601()));
    date.insert("rfc3339".to_owned(), Value::String(rfc3339(entry.date, offset)));
    date.insert("display".to_owned(), Value::String(entry.display_date()));

    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("slug".to_owned(), string(&entry.slug));
    m.insert("title".to_owned(), string(&entry.title));
    m.insert(
        "tags".to_owned(),
        Value::Array(entry.tags.iter().map(|tag| string(tag)).collect()),
    );
    m.insert("content_html".to_owned(), string(&entry.content_html));
    m.insert("date".to_owned(), Value::Object(date));
    Value::Object(m)
}
