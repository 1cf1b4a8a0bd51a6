//! Loads the build [`Config`] from a `site.yaml` project file. Every key is
//! optional; a project without the file builds with the defaults.

use crate::markdown::Extension;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "site.yaml";

#[derive(Deserialize)]
struct IndexSize(usize);
impl Default for IndexSize {
    fn default() -> Self {
        IndexSize(5)
    }
}

#[derive(Deserialize)]
struct FeedSize(usize);
impl Default for FeedSize {
    fn default() -> Self {
        FeedSize(10)
    }
}

fn default_title() -> String {
    String::from("My Technical Blog")
}

fn default_url() -> Url {
    // A literal; can't fail.
    Url::parse("https://yourblog.com/").unwrap()
}

fn default_description() -> String {
    String::from("A blog about programming, mathematics, and technology")
}

fn default_author() -> String {
    String::from("Your Name")
}

fn default_language() -> String {
    String::from("en-us")
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    #[serde(default = "default_title")]
    title: String,

    #[serde(default = "default_url")]
    url: Url,

    #[serde(default = "default_description")]
    description: String,

    #[serde(default = "default_author")]
    author: String,

    #[serde(default = "default_language")]
    language: String,

    #[serde(default = "content_directory")]
    content_directory: PathBuf,

    #[serde(default = "templates_directory")]
    templates_directory: PathBuf,

    #[serde(default = "static_directory")]
    static_directory: PathBuf,

    #[serde(default = "output_directory")]
    output_directory: PathBuf,

    #[serde(default = "Extension::defaults")]
    extensions: Vec<Extension>,

    #[serde(default)]
    index_size: IndexSize,

    #[serde(default)]
    feed_size: FeedSize,
}

fn content_directory() -> PathBuf {
    PathBuf::from("content")
}

fn templates_directory() -> PathBuf {
    PathBuf::from("templates")
}

fn static_directory() -> PathBuf {
    PathBuf::from("static")
}

fn output_directory() -> PathBuf {
    PathBuf::from("output")
}

impl Default for Project {
    fn default() -> Self {
        Project {
            title: default_title(),
            url: default_url(),
            description: default_description(),
            author: default_author(),
            language: default_language(),
            content_directory: content_directory(),
            templates_directory: templates_directory(),
            static_directory: static_directory(),
            output_directory: output_directory(),
            extensions: Extension::defaults(),
            index_size: IndexSize::default(),
            feed_size: FeedSize::default(),
        }
    }
}

/// Site-wide values shown in pages and the feed.
#[derive(Clone, Debug)]
pub struct Site {
    pub title: String,

    /// The absolute URL of the site root. Always ends in `/`.
    pub url: Url,

    pub description: String,
    pub author: String,
    pub language: String,
}

impl Site {
    /// The root-relative path of the site root (e.g. `/` or `/blog/`), used
    /// as the prefix for links between pages.
    pub fn root(&self) -> &str {
        self.url.path()
    }

    /// The absolute URL of the post with the given slug.
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}{}/{}.html", self.url, POSTS_DIRECTORY, slug)
    }

    /// The root-relative link to the post with the given slug.
    pub fn post_link(&self, slug: &str) -> String {
        format!("{}{}/{}.html", self.root(), POSTS_DIRECTORY, slug)
    }
}

/// The output sub-directory holding post pages.
pub const POSTS_DIRECTORY: &str = "posts";

/// The output sub-directory holding the copied static assets.
pub const STATIC_DIRECTORY: &str = "static";

/// Everything a build needs. Constructed once and passed by reference.
#[derive(Clone, Debug)]
pub struct Config {
    pub site: Site,

    /// The directory holding `site.yaml`, or the start directory without one.
    pub project_directory: PathBuf,

    pub posts_source_directory: PathBuf,
    pub pages_source_directory: PathBuf,
    pub templates_directory: PathBuf,
    pub static_source_directory: PathBuf,
    pub output_directory: PathBuf,
    pub extensions: Vec<Extension>,

    /// The number of posts shown on the index page.
    pub index_size: usize,

    /// The number of posts in the feed.
    pub feed_size: usize,
}

impl Config {
    /// Finds `site.yaml` in `dir` or its closest ancestor containing one and
    /// loads it. Without a project file, the defaults apply with `dir` as the
    /// project root. `output_directory` overrides the configured one.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(candidate) = current {
            let path = candidate.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path, output_directory)
                    .with_context(|| format!("Loading configuration '{}'", path.display()));
            }
            current = candidate.parent();
        }

        info!(
            root = %dir.display(),
            "no `{}` found; using default configuration",
            PROJECT_FILE
        );
        Ok(Config::from_project(Project::default(), dir, output_directory))
    }

    /// Loads the project file at `path`; relative directories in it are
    /// resolved against the file's directory.
    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = if contents.trim().is_empty() {
            Project::default()
        } else {
            serde_yaml::from_str(&contents)?
        };
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => {
                debug!(root = %project_root.display(), "loaded project file");
                Ok(Config::from_project(project, project_root, output_directory))
            }
        }
    }

    fn from_project(project: Project, root: &Path, output_directory: Option<&Path>) -> Config {
        let content = root.join(&project.content_directory);
        let mut url = project.url;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Config {
            site: Site {
                title: project.title,
                url,
                description: project.description,
                author: project.author,
                language: project.language,
            },
            project_directory: root.to_owned(),
            posts_source_directory: content.join("posts"),
            pages_source_directory: content.join("pages"),
            templates_directory: root.join(&project.templates_directory),
            static_source_directory: root.join(&project.static_directory),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => root.join(&project.output_directory),
            },
            extensions: project.extensions,
            index_size: project.index_size.0,
            feed_size: project.feed_size.0,
        }
    }

    /// The default configuration rooted at `root`.
    pub fn defaults(root: &Path) -> Config {
        Config::from_project(Project::default(), root, None)
    }
}
