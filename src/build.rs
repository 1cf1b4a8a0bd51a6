//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site:
//!
//! 1. Discover: list the post and page sources ([`crate::parser`])
//! 2. RenderEach: build every source into a [`Document`] and template it
//!    ([`crate::document`], [`crate::write`])
//! 3. Sort: order posts newest first ([`sort_posts`])
//! 4. Aggregate: derive the index, archive and feed
//! 5. Write: put everything on disk
//!
//! Nothing touches the output directory until every page has been rendered
//! in memory. Pages are then written to a staging directory next to the
//! output directory, which replaces the old output only once complete; a
//! failed build leaves the previous output as it was.

use crate::config::{Config, STATIC_DIRECTORY};
use crate::document::{Document, Kind};
use crate::feed::{self, write_feed};
use crate::markdown::{Converter, Markdown};
use crate::parser::{self, sort_posts, Parser};
use crate::template::{self, Templates};
use crate::write::{Page, Writer, RESERVED_STEMS};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// The name of the feed file at the output root.
pub const FEED_FILE: &str = "feed.xml";

/// What a successful build produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub posts: usize,
    pub pages: usize,
    pub output_directory: PathBuf,
}

/// Builds the site from a [`Config`] with the [`Markdown`] converter.
pub fn build_site(config: &Config) -> Result<Summary> {
    build_site_with(config, &Markdown)
}

/// Builds the site from a [`Config`] with the given converter.
pub fn build_site_with(config: &Config, converter: &dyn Converter) -> Result<Summary> {
    info!(output = %config.output_directory.display(), "building site");

    let output = resolve(&config.output_directory)?;
    check_output(config, &output)?;
    let templates = Templates::load(&config.templates_directory)?;

    // Discover and RenderEach.
    let parser = Parser::new(converter, &config.extensions);
    let mut posts = parser.parse_documents(Kind::Post, &config.posts_source_directory)?;
    let pages = parser.parse_documents(Kind::Page, &config.pages_source_directory)?;
    parser::reject_reserved(&pages, &RESERVED_STEMS)?;

    let writer = Writer {
        templates: &templates,
        site: &config.site,
        index_size: config.index_size,
    };
    let mut rendered: Vec<Page> = posts
        .iter()
        .chain(pages.iter())
        .map(|document| writer.document_page(document))
        .collect();

    // Sort and Aggregate.
    sort_posts(&mut posts);
    rendered.push(writer.index_page(&posts));
    rendered.push(writer.archive_page(&posts));
    info!(posts = posts.len(), pages = pages.len(), "generated index, archive and feed");

    // Write.
    let staging = staging_directory(&output)?;
    remove_dir(&staging)?;
    if let Err(err) = write_output(config, &staging, &rendered, &posts) {
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }
    remove_dir(&output)?;
    fs::rename(&staging, &output).map_err(|err| Error::Io {
        path: output.clone(),
        err,
    })?;

    Ok(Summary {
        posts: posts.len(),
        pages: pages.len(),
        output_directory: output,
    })
}

fn write_output(config: &Config, root: &Path, pages: &[Page], posts: &[Document]) -> Result<()> {
    fs::create_dir_all(root).map_err(|err| Error::Io {
        path: root.to_owned(),
        err,
    })?;

    for page in pages {
        let path = root.join(&page.path);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|err| Error::Io {
                path: dir.to_owned(),
                err,
            })?;
        }
        fs::write(&path, &page.html).map_err(|err| Error::Io { path, err })?;
        debug!(page = %page.path.display(), "wrote page");
    }

    let feed_path = root.join(FEED_FILE);
    let file = File::create(&feed_path).map_err(|err| Error::Io {
        path: feed_path.clone(),
        err,
    })?;
    write_feed(&config.site, posts, config.feed_size, BufWriter::new(file))?;

    copy_dir(
        &config.static_source_directory,
        &root.join(STATIC_DIRECTORY),
    )
}

/// Makes `path` absolute and resolves symlinks, `.` and `..` in the part of
/// it which exists. The rest is appended as is.
fn resolve(path: &Path) -> Result<PathBuf> {
    let io_error = |err| Error::Io {
        path: path.to_owned(),
        err,
    };
    let absolute = std::path::absolute(path).map_err(io_error)?;
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name);
                        existing = parent;
                    }
                    _ => return Err(io_error(err)),
                }
            }
            Err(err) => return Err(io_error(err)),
        }
    }
}

/// Fails when replacing `output` would delete the project or any of its
/// inputs, or when the static copy would read from inside `output`.
fn check_output(config: &Config, output: &Path) -> Result<()> {
    let inputs = [
        &config.project_directory,
        &config.posts_source_directory,
        &config.pages_source_directory,
        &config.templates_directory,
        &config.static_source_directory,
    ];
    for input in inputs {
        let resolved = resolve(input)?;
        if resolved.starts_with(output) {
            return Err(Error::UnsafeOutput {
                output: output.to_owned(),
                input: resolved,
            });
        }
    }
    let statics = resolve(&config.static_source_directory)?;
    if output.starts_with(&statics) {
        return Err(Error::UnsafeOutput {
            output: output.to_owned(),
            input: statics,
        });
    }
    Ok(())
}

/// The sibling directory the build is staged in, e.g. `.output.staging` for
/// `output`. `output` must already be resolved.
fn staging_directory(output: &Path) -> Result<PathBuf> {
    match output.file_name() {
        Some(name) => Ok(output.with_file_name(format!(".{}.staging", name.to_string_lossy()))),
        None => Err(Error::UnsafeOutput {
            output: output.to_owned(),
            input: output.to_owned(),
        }),
    }
}

/// Mirrors `src` into `dst`. A missing `src` copies nothing.
fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        debug!(directory = %src.display(), "no static directory; skipping copy");
        return Ok(());
    }

    let mut copied = 0;
    for result in WalkDir::new(src) {
        let entry = result?;
        // strip_prefix can't fail: every entry is under `src`.
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|err| Error::Io { path: target, err })?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| Error::Io { path: target, err })?;
            copied += 1;
        }
    }
    info!(files = copied, "copied static files");
    Ok(())
}

fn remove_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
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

/// The error type for building a site. Errors can be during parsing,
/// template loading, feed writing, cleaning output directories, and other
/// I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned for errors discovering or parsing documents.
    #[error(transparent)]
    Parse(#[from] parser::Error),

    /// Returned for errors loading template files.
    #[error(transparent)]
    Template(#[from] template::Error),

    /// Returned for errors writing the feed.
    #[error(transparent)]
    Feed(#[from] feed::Error),

    /// Returned when the output directory is, or contains, one of the
    /// build's inputs and so can't be safely replaced.
    #[error(
        "output directory '{}' would overwrite '{}'",
        output.display(),
        input.display()
    )]
    UnsafeOutput { output: PathBuf, input: PathBuf },

    /// Returned for I/O problems while cleaning output directories.
    #[error("cleaning directory '{}': {err}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for I/O problems while walking the static directory.
    #[error("copying static files: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Returned for other I/O errors.
    #[error("writing '{}': {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
