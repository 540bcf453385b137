//! Exports the [`build_site`] function which stitches together the high-level
//! steps of publishing the site: loading templates ([`crate::page`]), parsing
//! the entries ([`crate::entry`]), copying the static assets, rendering pages
//! and feeds into a staging directory, and finally swapping the staging
//! directory into the public location.
//!
//! Everything before the swap only touches the staging directory, so a
//! failure at any point leaves the previously published site as it was. The
//! swap itself renames the old public directory aside, renames the staging
//! directory into place, and only then deletes the old tree.

use crate::catalog::Catalog;
use crate::config::{Config, Site};
use crate::entry::{Error as ParseError, Parser as EntryParser};
use crate::feed::{local_offset, Error as FeedError, FeedBuilder};
use crate::highlight;
use crate::markup::Markup;
use crate::page::{Error as PageError, PageBuilder, Templates};
use chrono::FixedOffset;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// The subdirectory holding the per-tag pages and feeds.
pub const TAGS_DIRECTORY: &str = "tags";

/// Builds and publishes the site described by `config`, rendering entry
/// bodies with `markup`. Timestamps use the current local UTC offset.
pub fn build_site(config: &Config, markup: Markup) -> Result<()> {
    build_site_with_offset(config, markup, local_offset())
}

/// Like [`build_site`] but with an explicit UTC offset for timestamps.
pub fn build_site_with_offset(config: &Config, markup: Markup, offset: FixedOffset) -> Result<()> {
    let build = &config.directories.build;

    // A staging directory left behind by an earlier run is stale.
    rmdir(build)?;

    match stage(config, markup, offset) {
        Ok(()) => {}
        Err(err) => {
            if let Err(cleanup) = rmdir(build) {
                warn!(error = %cleanup, "couldn't remove the staging directory");
            }
            return Err(err);
        }
    }

    info!(public = %config.directories.public.display(), "publishing");
    swap(build, &config.directories.public)?;

    // Normally a no-op since the staging directory was just renamed away.
    rmdir(build)
}

// Populates the staging directory.
fn stage(config: &Config, markup: Markup, offset: FixedOffset) -> Result<()> {
    let dirs = &config.directories;
    let site = &config.site;

    info!(templates = %dirs.templates.display(), "loading templates");
    let templates = Templates::load(&dirs.templates, &site.stylesheet)?;

    info!(source = %dirs.source.display(), %markup, "parsing entries");
    let catalog = Catalog::new(EntryParser::new(markup).parse_entries(&dirs.source)?);
    info!(entries = catalog.entries().len(), "parsed entries");

    if !dirs.assets.is_dir() {
        return Err(Error::MissingDirectory {
            kind: "assets",
            path: dirs.assets.clone(),
        });
    }
    copy_dir(&dirs.assets, &dirs.build)?;

    let writer = Writer {
        pages: PageBuilder::new(&templates, site, offset),
        feeds: FeedBuilder::new(site, offset),
        site,
        output_directory: &dirs.build,
    };
    writer.write_index(&catalog)?;
    writer.write_tag_indices(&catalog)?;
    writer.write_details(&catalog)?;
    writer.write_not_found()?;
    writer.write_stylesheet(&templates)?;
    Ok(())
}

/// Renders pages and feeds into the output directory.
struct Writer<'a> {
    pages: PageBuilder<'a>,
    feeds: FeedBuilder<'a>,
    site: &'a Site,
    output_directory: &'a Path,
}

impl Writer<'_> {
    fn write_index(&self, catalog: &Catalog) -> Result<()> {
        let entries: Vec<_> = catalog.entries().iter().collect();
        let feed_url = format!("{}/index.atom", self.site.root());
        self.write_file(
            Path::new("index.html"),
            &self.pages.render_index(&entries, &feed_url)?,
        )?;
        if catalog.is_empty() {
            warn!("no entries; skipping index.atom");
            return Ok(());
        }
        self.write_file(
            Path::new("index.atom"),
            &self.feeds.build(&entries, &feed_url)?,
        )
    }

    fn write_tag_indices(&self, catalog: &Catalog) -> Result<()> {
        let tags_directory = self.output_directory.join(TAGS_DIRECTORY);
        std::fs::create_dir(&tags_directory).map_err(|err| Error::Write {
            path: tags_directory,
            err,
        })?;

        for tag in catalog.tags() {
            // Never empty: `tag` came from one of these entries.
            let entries = catalog.by_tag(tag);
            let feed_url = format!("{}/{}/{}.atom", self.site.root(), TAGS_DIRECTORY, tag);
            let dir = Path::new(TAGS_DIRECTORY);
            self.write_file(
                &dir.join(format!("{}.html", tag)),
                &self.pages.render_tag_index(tag, &entries, &feed_url)?,
            )?;
            self.write_file(
                &dir.join(format!("{}.atom", tag)),
                &self.feeds.build(&entries, &feed_url)?,
            )?;
        }
        Ok(())
    }

    fn write_details(&self, catalog: &Catalog) -> Result<()> {
        for entry in catalog.entries() {
            self.write_file(
                Path::new(&format!("{}.html", entry.slug)),
                &self.pages.render_detail(entry)?,
            )?;
        }
        Ok(())
    }

    fn write_not_found(&self) -> Result<()> {
        self.write_file(Path::new("404.html"), &self.pages.render_not_found()?)
    }

    // The hand-authored stylesheet followed by the highlighting rules.
    fn write_stylesheet(&self, templates: &Templates) -> Result<()> {
        let css = [templates.stylesheet(), "\n\n", highlight::stylesheet()?.as_str()].concat();
        self.write_file(Path::new(&self.site.stylesheet), &css)
    }

    fn write_file(&self, relative: &Path, contents: &str) -> Result<()> {
        let path = self.output_directory.join(relative);
        debug!(path = %path.display(), "writing");
        std::fs::write(&path, contents).map_err(|err| Error::Write { path, err })
    }
}

/// Makes `build` the new `public` directory. The old public directory is first
/// renamed aside, so there is no moment at which neither tree exists under a
/// known name, and deleted only after `build` is in place.
fn swap(build: &Path, public: &Path) -> Result<()> {
    let old = aside(public);
    rmdir(&old)?;

    let publish_error = |err| Error::Publish {
        path: public.to_owned(),
        err,
    };
    let had_public = public.exists();
    if had_public {
        std::fs::rename(public, &old).map_err(publish_error)?;
    }
    if let Err(err) = std::fs::rename(build, public) {
        if had_public {
            // Put the old site back so the failure isn't visible.
            if let Err(restore) = std::fs::rename(&old, public) {
                warn!(error = %restore, "couldn't restore the previous public directory");
            }
        }
        return Err(publish_error(err));
    }
    rmdir(&old)
}

/// The sibling path the old public directory is moved to during a swap.
fn aside(public: &Path) -> PathBuf {
    let mut name = public
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("public"));
    name.push(".old");
    public.with_file_name(name)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    for result in WalkDir::new(src) {
        let entry = result?;
        // `entry` is always under `src`.
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        let copy_error = |err| Error::Copy {
            src: entry.path().to_owned(),
            dst: target.clone(),
            err,
        };
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(copy_error)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(copy_error)?;
        }
    }

    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The broad classes of failure. All of them are fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unreadable templates, assets, or source directory.
    Configuration,

    /// A malformed or unreadable entry.
    Parse,

    /// A template, markup, or feed failure.
    Render,

    /// A filesystem failure while staging or publishing.
    Io,
}

/// The error type for building a site. Errors can be during parsing,
/// rendering, cleaning, copying, writing, and publishing.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors reading or parsing entries.
    Parse(ParseError),

    /// Returned for errors loading templates or rendering pages.
    Page(PageError),

    /// Returned for errors building feeds.
    Feed(FeedError),

    /// Returned when the highlighting stylesheet can't be rendered.
    Highlight(highlight::Error),

    /// Returned when a required input directory doesn't exist.
    MissingDirectory { kind: &'static str, path: PathBuf },

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while copying assets.
    Copy {
        src: PathBuf,
        dst: PathBuf,
        err: std::io::Error,
    },

    /// Returned for walkdir errors while copying assets.
    WalkDir(walkdir::Error),

    /// Returned for I/O problems while writing output files.
    Write { path: PathBuf, err: std::io::Error },

    /// Returned when the staging directory can't be moved into place.
    Publish { path: PathBuf, err: std::io::Error },
}

impl Error {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(ParseError::SourceDirectory { .. }) => ErrorKind::Configuration,
            Error::Parse(ParseError::Markup { .. }) => ErrorKind::Render,
            Error::Parse(_) => ErrorKind::Parse,
            Error::Page(err) if err.is_configuration() => ErrorKind::Configuration,
            Error::Page(_) => ErrorKind::Render,
            Error::Feed(_) => ErrorKind::Render,
            Error::Highlight(_) => ErrorKind::Render,
            Error::MissingDirectory { .. } => ErrorKind::Configuration,
            Error::WalkDir(_) => ErrorKind::Configuration,
            Error::Clean { .. }
            | Error::Copy { .. }
            | Error::Write { .. }
            | Error::Publish { .. } => ErrorKind::Io,
        }
    }
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Page(err) => err.fmt(f),
            Error::Feed(err) => write!(f, "Building feed: {}", err),
            Error::Highlight(err) => err.fmt(f),
            Error::MissingDirectory { kind, path } => {
                write!(f, "Missing {} directory '{}'", kind, path.display())
            }
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Copy { src, dst, err } => write!(
                f,
                "Copying '{}' to '{}': {}",
                src.display(),
                dst.display(),
                err
            ),
            Error::WalkDir(err) => write!(f, "Copying assets: {}", err),
            Error::Write { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
            Error::Publish { path, err } => {
                write!(f, "Publishing to '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Page(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Highlight(err) => Some(err),
            Error::MissingDirectory { .. } => None,
            Error::Clean { err, .. } => Some(err),
            Error::Copy { err, .. } => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Write { err, .. } => Some(err),
            Error::Publish { err, .. } => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<PageError> for Error {
    /// Converts [`PageError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: PageError) -> Error {
        Error::Page(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

impl From<highlight::Error> for Error {
    fn from(err: highlight::Error) -> Error {
        Error::Highlight(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}
