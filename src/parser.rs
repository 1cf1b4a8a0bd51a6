//! Defines the [`Parser`], which discovers source files and builds them into
//! [`Document`]s, and the [`sort_posts`] ordering.

use crate::document::{self, Document, Kind};
use crate::markdown::{Converter, Extension};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::read_dir;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MARKDOWN_EXTENSION: &str = "md";

/// Builds [`Document`]s from source files.
pub struct Parser<'a> {
    /// The markup converter.
    converter: &'a dyn Converter,

    /// The converter extensions to enable.
    extensions: &'a [Extension],
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(converter: &'a dyn Converter, extensions: &'a [Extension]) -> Parser<'a> {
        Parser {
            converter,
            extensions,
        }
    }

    /// Lists the markdown files directly inside `source_directory`, ordered
    /// by file name. A missing directory has no files.
    pub fn discover(source_directory: &Path) -> Result<Vec<PathBuf>> {
        if !source_directory.is_dir() {
            debug!(
                directory = %source_directory.display(),
                "source directory not found; nothing to discover"
            );
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for result in read_dir(source_directory).map_err(|err| Error::Discover {
            path: source_directory.to_owned(),
            err,
        })? {
            let entry = result.map_err(|err| Error::Discover {
                path: source_directory.to_owned(),
                err,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().map_or(false, |e| e == MARKDOWN_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        debug!(
            directory = %source_directory.display(),
            count = paths.len(),
            "discovered source files"
        );
        Ok(paths)
    }

    /// Builds a single [`Document`]; errors name the source file.
    pub fn parse_document(&self, kind: Kind, path: &Path) -> Result<Document> {
        let document = Document::load(kind, path, self.converter, self.extensions).map_err(
            |err| Error::Document {
                path: path.to_owned(),
                err,
            },
        )?;
        info!(source = %path.display(), slug = document.slug(), "processed");
        Ok(document)
    }

    /// Discovers and builds every document in `source_directory`, in
    /// discovery order. Two documents with the same slug are an error.
    pub fn parse_documents(&self, kind: Kind, source_directory: &Path) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = Vec::new();
        let mut slugs: HashMap<String, PathBuf> = HashMap::new();
        for path in Self::discover(source_directory)? {
            let document = self.parse_document(kind, &path)?;
            if let Some(first) = slugs.insert(document.slug().to_owned(), path.clone()) {
                return Err(Error::DuplicateSlug {
                    slug: document.slug().to_owned(),
                    first,
                    second: path,
                });
            }
            documents.push(document);
        }
        Ok(documents)
    }
}

/// Fails when one of `documents` has a slug from `reserved`, i.e. one whose
/// output file would be overwritten by a collection page.
pub fn reject_reserved(documents: &[Document], reserved: &[&str]) -> Result<()> {
    match documents.iter().find(|d| reserved.contains(&d.slug())) {
        Some(document) => Err(Error::ReservedSlug {
            slug: document.slug().to_owned(),
            path: document.source.clone(),
        }),
        None => Ok(()),
    }
}

/// Orders posts newest first. Undated posts follow every dated one and keep
/// their relative order, as do posts sharing a date.
pub fn sort_posts(posts: &mut [Document]) {
    posts.sort_by(|a, b| match (a.metadata.date, b.metadata.date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Represents the result of a [`Document`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error discovering or parsing documents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a source directory can't be listed.
    #[error("listing source directory '{}': {err}", path.display())]
    Discover {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when a source file can't be built into a [`Document`].
    #[error("parsing '{}': {err}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        err: document::Error,
    },

    /// Returned when two documents of one collection resolve to the same
    /// slug and would overwrite each other.
    #[error(
        "'{}' and '{}' both have slug `{slug}`",
        first.display(),
        second.display()
    )]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned when a document's slug is taken by a generated page.
    #[error("'{}' has slug `{slug}`, which is reserved for a generated page", path.display())]
    ReservedSlug { slug: String, path: PathBuf },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::markdown::Markdown;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn dates(posts: &[Document]) -> Vec<String> {
        posts
            .iter()
            .map(|p| match p.metadata.date {
                Some(date) => date.to_string(),
                None => format!("undated:{}", p.slug()),
            })
            .collect()
    }

    #[test]
    fn test_discover_is_sorted_and_flat() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "b.md", "b");
        write(dir.path(), "a.md", "a");
        write(dir.path(), "notes.txt", "ignored");
        fs::create_dir(dir.path().join("nested.md"))?;
        fs::write(dir.path().join("nested.md").join("c.md"), "c")?;

        let paths = Parser::discover(dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("a.md"), dir.path().join("b.md")]);
        Ok(())
    }

    #[test]
    fn test_discover_missing_directory() {
        assert!(Parser::discover(Path::new("./no/such/dir")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_and_sort() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "2023-12-01-older.md", "old");
        write(dir.path(), "undated-a.md", "a");
        write(dir.path(), "2024-01-01-newer.md", "new");
        write(dir.path(), "undated-b.md", "b");

        let extensions = Extension::defaults();
        let parser = Parser::new(&Markdown, &extensions);
        let mut posts = parser.parse_documents(Kind::Post, dir.path()).unwrap();
        sort_posts(&mut posts);
        assert_eq!(
            dates(&posts),
            vec![
                "2024-01-01",
                "2023-12-01",
                "undated:undated-a",
                "undated:undated-b"
            ]
        );
        Ok(())
    }

    #[test]
    fn test_invalid_date_names_the_file() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "broken.md", "---\ntitle: Broken\ndate: yesterday\n---\n");

        let parser = Parser::new(&Markdown, &[]);
        let err = parser.parse_documents(Kind::Post, dir.path()).unwrap_err();
        assert!(matches!(err, Error::Document { .. }));
        assert!(err.to_string().contains("broken.md"));
        Ok(())
    }

    #[test]
    fn test_duplicate_slug() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "one.md", "---\ntitle: Same\n---\n");
        write(dir.path(), "two.md", "---\ntitle: same\n---\n");

        let parser = Parser::new(&Markdown, &[]);
        match parser.parse_documents(Kind::Page, dir.path()) {
            Err(Error::DuplicateSlug { slug, .. }) => assert_eq!(slug, "same"),
            other => panic!("expected DuplicateSlug, got {:?}", other.map(|d| d.len())),
        }
        Ok(())
    }

    #[test]
    fn test_reject_reserved() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "about.md", "about");
        write(dir.path(), "home.md", "---\ntitle: Index\n---\nmine");

        let parser = Parser::new(&Markdown, &[]);
        let pages = parser.parse_documents(Kind::Page, dir.path()).unwrap();
        match reject_reserved(&pages, &["index", "archive"]) {
            Err(err @ Error::ReservedSlug { .. }) => {
                assert!(err.to_string().contains("home.md"));
                assert!(err.to_string().contains("`index`"));
            }
            other => panic!("expected ReservedSlug, got {:?}", other),
        }
        assert!(reject_reserved(&pages[..1], &["index", "archive"]).is_ok());
        Ok(())
    }
}
