//! Shared test fixtures: a site, hand-built entries, and a minimal template
//! set written to disk.

use crate::config::{Author, Site};
use crate::entry::Entry;
use chrono::{FixedOffset, NaiveDate};
use std::path::Path;
use url::Url;

pub fn site() -> Site {
    Site {
        title: String::from("Web"),
        url: Url::parse("http://example.org").unwrap(),
        author: Author {
            name: String::from("Jane Doe"),
            email: Some(String::from("jane@example.org")),
            url: None,
            elsewhere: [(String::from("github"), String::from("http://github.com/jane/"))]
                .into_iter()
                .collect(),
        },
        head_title: String::from("Jane"),
        body_title: String::from("Jane Doe"),
        analytics: Some(String::from("UA-1")),
        stylesheet: String::from("style.css"),
    }
}

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// An entry whose title is its slug and whose body is `<p>{slug}</p>`.
pub fn entry(slug: &str, date: NaiveDate, tags: &[&str]) -> Entry {
    Entry {
        date,
        slug: slug.to_owned(),
        title: slug.to_owned(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        body_raw: slug.to_owned(),
        content_html: format!("<p>{}</p>", slug),
    }
}

pub const BASE: &str = r#"
    <html><head><title>{{.head_title}}</title>
    {{if .feed_url}}<link rel="alternate" href="{{.feed_url}}">{{end}}
    <link rel="stylesheet" href="/{{.stylesheet}}"></head>
    <body><h1>{{.body_title}}</h1>{{template "content" .}}</body></html>
"#;

pub const ENTRY_PARTIAL: &str = r#"
    {{define "entry"}}<article id="{{.slug}}"><h2>{{.title}}</h2>{{.content_html}}</article>{{end}}
"#;

pub const LIST: &str = r#"
    {{define "content"}}{{if .active_tag}}<p class="tag">{{.active_tag}}</p>{{end}}{{range .entries}}{{template "entry" .}}{{end}}{{end}}
"#;

pub const DETAIL: &str = r#"
    {{define "content"}}{{template "entry" .entry}}{{end}}
"#;

pub const NOT_FOUND: &str = r#"
    {{define "content"}}<p>Not found</p>{{end}}
"#;

pub const STYLESHEET: &str = "
    body { margin: 0; }
";

/// Writes the fixture template set into `dir`.
pub fn write_templates(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for (name, contents) in [
        ("base.html", BASE),
        ("_entry.html", ENTRY_PARTIAL),
        ("list.html", LIST),
        ("detail.html", DETAIL),
        ("404.html", NOT_FOUND),
        ("style.css", STYLESHEET),
    ] {
        std::fs::write(dir.join(name), contents)?;
    }
    Ok(())
}
