//! Minimal `{{name}}` substitution templates. A [`Template`] knows nothing
//! beyond replacing placeholders with strings: no expressions, no control
//! flow, no inheritance. Nesting a page inside the base layout is two explicit
//! renders by the caller.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Matches `{{name}}` and `{{ name }}`. The spacing must be symmetric, which
/// is checked when the match is substituted.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{( ?)([^{}\s]+)( ?)\}\}").unwrap());

/// Values to substitute, keyed by placeholder name.
pub type Context<'a> = HashMap<&'a str, String>;

/// A named template source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    name: String,
    source: String,
}

impl Template {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Template {
        Template {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders the template against `context`. See [`render`].
    pub fn render(&self, context: &Context) -> String {
        render(&self.source, context)
    }
}

/// Replaces each `{{name}}` or `{{ name }}` in `template` whose name is a key
/// of `context` with the value for that key. Placeholders without a value are
/// left as they are. Substitution happens in a single scan, so placeholders
/// inside substituted values are never expanded.
pub fn render(template: &str, context: &Context) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            if caps[1] != caps[3] {
                return caps[0].to_owned();
            }
            match context.get(&caps[2]) {
                Some(value) => value.clone(),
                None => caps[0].to_owned(),
            }
        })
        .into_owned()
}

/// The templates used by a build: `base` is the layout every page is wrapped
/// in, `post` renders a single document and `index` renders the home page.
#[derive(Clone, Debug)]
pub struct Templates {
    pub base: Template,
    pub post: Template,
    pub index: Template,
}

const DEFAULT_BASE: &str = include_str!("templates/base.html");
const DEFAULT_POST: &str = include_str!("templates/post.html");
const DEFAULT_INDEX: &str = include_str!("templates/index.html");

impl Templates {
    /// The built-in templates.
    pub fn builtin() -> Templates {
        Templates {
            base: Template::new("base", DEFAULT_BASE),
            post: Template::new("post", DEFAULT_POST),
            index: Template::new("index", DEFAULT_INDEX),
        }
    }

    /// Loads `base.html`, `post.html` and `index.html` from `directory`. A
    /// missing file is replaced by the built-in template of the same name, as
    /// is the whole set when the directory doesn't exist.
    pub fn load(directory: &Path) -> Result<Templates> {
        if !directory.is_dir() {
            warn!(
                directory = %directory.display(),
                "templates directory not found; using built-in templates"
            );
            return Ok(Templates::builtin());
        }
        Ok(Templates {
            base: load_one(directory, "base", DEFAULT_BASE)?,
            post: load_one(directory, "post", DEFAULT_POST)?,
            index: load_one(directory, "index", DEFAULT_INDEX)?,
        })
    }
}

fn load_one(directory: &Path, name: &str, fallback: &str) -> Result<Template> {
    let path = directory.join(format!("{}.html", name));
    match std::fs::read_to_string(&path) {
        Ok(source) => {
            debug!(path = %path.display(), "loaded template");
            Ok(Template::new(name, source))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(template = name, "template file not found; using built-in");
            Ok(Template::new(name, fallback))
        }
        Err(err) => Err(Error::Read { path, err }),
    }
}

/// The result of loading templates.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading a template file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a template file exists but can't be read.
    #[error("reading template file '{}': {err}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
