//! Loads the project configuration from a `reprise.yaml` file. The
//! configuration carries both the site-wide facts threaded into every render
//! ([`Site`]) and the directory layout the publisher works against
//! ([`Directories`]).

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "reprise.yaml";

/// The identity of the site's author.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Other places the author can be found, keyed by a short label (e.g.,
    /// `github`).
    #[serde(default)]
    pub elsewhere: BTreeMap<String, String>,
}

/// The invariant site-wide facts. Constructed once per run and never mutated.
#[derive(Clone, Debug)]
pub struct Site {
    /// The title of the Atom feeds.
    pub title: String,

    /// The canonical URL root, e.g., `http://example.org`.
    pub url: Url,

    pub author: Author,

    /// The `<title>` prefix for every page.
    pub head_title: String,

    /// The heading shown at the top of every page.
    pub body_title: String,

    /// The analytics token, if any.
    pub analytics: Option<String>,

    /// The file name of the combined stylesheet, both as a template source
    /// and as an output file.
    pub stylesheet: String,
}

impl Site {
    /// The canonical URL root as a string without a trailing slash, so that
    /// `{root}/{slug}` is well-formed.
    pub fn root(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }

    /// The host portion of the canonical URL, used in atom `tag:` ids.
    pub fn domain(&self) -> &str {
        // `Config::from_project_file` refuses URLs without a host.
        self.url.host_str().unwrap_or_default()
    }
}

/// The directories a run reads from and writes to. Relative paths in the
/// project file have already been resolved against the file's directory.
#[derive(Clone, Debug)]
pub struct Directories {
    pub source: PathBuf,
    pub build: PathBuf,
    pub public: PathBuf,
    pub assets: PathBuf,
    pub templates: PathBuf,
}

pub struct Config {
    pub site: Site,
    pub directories: Directories,
}

#[derive(Deserialize)]
struct Project {
    title: String,
    url: Url,
    author: Author,

    #[serde(default = "default_stylesheet")]
    stylesheet: String,

    #[serde(default)]
    analytics: Option<String>,

    #[serde(default)]
    head_title: Option<String>,

    #[serde(default)]
    body_title: Option<String>,

    #[serde(default)]
    directories: Layout,
}

fn default_stylesheet() -> String {
    String::from("style.css")
}

#[derive(Deserialize)]
#[serde(default)]
struct Layout {
    source: PathBuf,
    build: PathBuf,
    public: PathBuf,
    assets: PathBuf,
    templates: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            source: PathBuf::from("entries"),
            build: PathBuf::from("build"),
            public: PathBuf::from("public"),
            assets: PathBuf::from("assets"),
            templates: PathBuf::from("templates"),
        }
    }
}

impl Config {
    /// Searches `dir` and then each of its ancestors for a [`PROJECT_FILE`]
    /// and loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path).context("Loading configuration")
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    /// Loads a project file. Relative directories are resolved against the
    /// directory containing the file.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Opening project file `{}`: {}", path.display(), e))?;
        let root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;
        Config::from_yaml(&yaml, root)
            .with_context(|| format!("Parsing project file `{}`", path.display()))
    }

    /// Parses a project file's contents. `root` is the directory against which
    /// relative directories are resolved.
    pub fn from_yaml(yaml: &str, root: &Path) -> Result<Config> {
        Config::from_project(serde_yaml::from_str(yaml)?, root)
    }

    fn from_project(project: Project, root: &Path) -> Result<Config> {
        if project.url.host_str().is_none() {
            return Err(anyhow!("Site URL `{}` has no host", project.url));
        }

        let layout = project.directories;
        Ok(Config {
            site: Site {
                head_title: project
                    .head_title
                    .unwrap_or_else(|| project.author.name.clone()),
                body_title: project
                    .body_title
                    .unwrap_or_else(|| project.author.name.clone()),
                title: project.title,
                url: project.url,
                author: project.author,
                analytics: project.analytics,
                stylesheet: project.stylesheet,
            },
            directories: Directories {
                source: root.join(layout.source),
                build: root.join(layout.build),
                public: root.join(layout.public),
                assets: root.join(layout.assets),
                templates: root.join(layout.templates),
            },
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MINIMAL: &str = "
title: Web
url: http://example.org
author:
  name: Jane Doe
";

    #[test]
    fn test_defaults() -> Result<()> {
        let config = Config::from_yaml(MINIMAL, Path::new("/site"))?;
        assert_eq!("Jane Doe", config.site.head_title);
        assert_eq!("Jane Doe", config.site.body_title);
        assert_eq!("style.css", config.site.stylesheet);
        assert_eq!(None, config.site.analytics);
        assert_eq!("example.org", config.site.domain());
        assert_eq!("http://example.org", config.site.root());
        assert_eq!(Path::new("/site/entries"), config.directories.source);
        assert_eq!(Path::new("/site/public"), config.directories.public);
        assert_eq!(Path::new("/site/templates"), config.directories.templates);
        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let yaml = "
title: Web
url: http://example.org/blog/
stylesheet: site.css
analytics: UA-1
head_title: Notes
author:
  name: Jane Doe
  email: jane@example.org
  elsewhere:
    github: http://github.com/jane/
directories:
  public: /srv/www
";
        let config = Config::from_yaml(yaml, Path::new("/site"))?;
        assert_eq!("Notes", config.site.head_title);
        assert_eq!("Jane Doe", config.site.body_title);
        assert_eq!("site.css", config.site.stylesheet);
        assert_eq!(Some("UA-1".to_owned()), config.site.analytics);
        assert_eq!("http://example.org/blog", config.site.root());
        assert_eq!(
            Some("http://github.com/jane/"),
            config.site.author.elsewhere.get("github").map(String::as_str)
        );
        assert_eq!(Path::new("/srv/www"), config.directories.public);
        assert_eq!(Path::new("/site/build"), config.directories.build);
        Ok(())
    }

    #[test]
    fn test_url_without_host() {
        let yaml = "
title: Web
url: mailto:jane@example.org
author:
  name: Jane Doe
";
        assert!(Config::from_yaml(yaml, Path::new("/site")).is_err());
    }

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let root = tempfile::tempdir()?;
        std::fs::write(root.path().join(PROJECT_FILE), MINIMAL)?;
        let nested = root.path().join("entries").join("drafts");
        std::fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested)?;
        assert_eq!(root.path().join("build"), config.directories.build);
        Ok(())
    }
}
