//! Defines [`Document`], a source file after metadata extraction, math and
//! diagram protection, and markup conversion.
//!
//! Construction happens in two stages. [`Draft::parse`] produces the metadata
//! and the converted HTML; [`Draft::finalize`] then resolves the description,
//! which falls back to an excerpt of the HTML and so can't exist earlier.

use crate::markdown::{Converter, Extension};
use crate::math;
use crate::metadata::{self, Metadata};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// The number of characters of rendered text used for a derived description.
pub const EXCERPT_LENGTH: usize = 200;

/// Whether a document is a dated post or a standalone page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Post,
    Page,
}

/// A document with converted HTML but no resolved description yet.
#[derive(Debug)]
pub struct Draft {
    pub kind: Kind,
    pub source: PathBuf,
    pub metadata: Metadata,
    pub html: String,
    pub toc: String,
    pub has_math: bool,
    pub has_mermaid: bool,
}

impl Draft {
    /// Parses and converts `input`, the contents of the file at `source`.
    /// Only an invalid date is fatal.
    pub fn parse(
        kind: Kind,
        source: &Path,
        input: &str,
        converter: &dyn Converter,
        extensions: &[Extension],
    ) -> Result<Draft> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extracted = metadata::extract(input, &stem)?;
        let body = extracted.body.trim();

        // Detection looks at the untouched body.
        let has_math = math::has_math(body);
        let has_mermaid = math::has_mermaid(body);

        let transformed = math::transform(body);
        let rendered = converter.convert(transformed.text(), extensions);

        Ok(Draft {
            kind,
            source: source.to_owned(),
            metadata: extracted.metadata,
            html: transformed.restore(&rendered.html),
            toc: transformed.restore(&rendered.toc_html()),
            has_math,
            has_mermaid,
        })
    }

    /// Resolves the description and freezes the document.
    pub fn finalize(self) -> Document {
        let description = match &self.metadata.description {
            Some(description) => description.clone(),
            None => excerpt(&self.html),
        };
        Document {
            kind: self.kind,
            source: self.source,
            metadata: self.metadata,
            description,
            html: self.html,
            toc: self.toc,
            has_math: self.has_math,
            has_mermaid: self.has_mermaid,
        }
    }
}

/// A fully built document.
#[derive(Clone, Debug)]
pub struct Document {
    pub kind: Kind,

    /// The source file, used in error messages.
    pub source: PathBuf,

    pub metadata: Metadata,

    /// The explicit description, or an excerpt of the rendered text.
    pub description: String,

    /// The converted body.
    pub html: String,

    /// The table of contents, or empty.
    pub toc: String,

    /// Whether the source contained math delimiters.
    pub has_math: bool,

    /// Whether the source contained a diagram fence.
    pub has_mermaid: bool,
}

impl Document {
    /// Reads, parses and finalizes the file at `source`.
    pub fn load(
        kind: Kind,
        source: &Path,
        converter: &dyn Converter,
        extensions: &[Extension],
    ) -> Result<Document> {
        let contents = std::fs::read_to_string(source)?;
        let normalized = contents.replace("\r\n", "\n");
        Ok(Draft::parse(kind, source, &normalized, converter, extensions)?.finalize())
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn slug(&self) -> &str {
        &self.metadata.slug
    }

    /// The output path relative to the output root.
    pub fn output_path(&self) -> PathBuf {
        let file_name = format!("{}.html", self.slug());
        match self.kind {
            Kind::Post => Path::new(crate::config::POSTS_DIRECTORY).join(file_name),
            Kind::Page => PathBuf::from(file_name),
        }
    }
}

/// Strips tags from `html` and returns its first [`EXCERPT_LENGTH`]
/// characters, with an ellipsis when the text was cut.
pub fn excerpt(html: &str) -> String {
    static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
    let text = TAG.replace_all(html, "");
    let head: String = text.chars().take(EXCERPT_LENGTH).collect();
    if head.chars().count() >= EXCERPT_LENGTH {
        format!("{}...", head.trim())
    } else {
        head.trim().to_owned()
    }
}

/// The result of building a [`Document`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem building a [`Document`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the metadata is invalid.
    #[error(transparent)]
    Metadata(#[from] metadata::Error),

    /// Returned when the source can't be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::markdown::{Markdown, Rendered};

    fn parse(input: &str, file_name: &str) -> Result<Document> {
        Ok(Draft::parse(
            Kind::Post,
            Path::new(file_name),
            input,
            &Markdown,
            &Extension::defaults(),
        )?
        .finalize())
    }

    #[test]
    fn test_parse_with_header() -> Result<()> {
        let doc = parse(
            "---\ntitle: Euler\ndate: 2024-01-01\ntags: [math]\n---\n\nWe have $e^{i\\pi} + 1 = 0$.\n",
            "ignored.md",
        )?;
        assert_eq!(doc.slug(), "euler");
        assert!(doc.has_math);
        assert!(!doc.has_mermaid);
        assert_eq!(
            doc.html,
            "<p>We have <span class=\"math math-inline\">&#92;(e^{i\\pi} + 1 = 0&#92;)</span>.</p>\n"
        );
        assert_eq!(doc.output_path(), Path::new("posts/euler.html"));
        Ok(())
    }

    #[test]
    fn test_math_survives_emphasis() -> Result<()> {
        let doc = parse("$a_1 * b_2 * c_3$", "2024-01-01-emph.md")?;
        assert!(doc.html.contains("a_1 * b_2 * c_3"));
        assert!(!doc.html.contains("<em>"));
        Ok(())
    }

    #[test]
    fn test_display_math_is_not_wrapped_in_paragraph() -> Result<()> {
        let doc = parse("Intro\n\n$$\nx^2\n$$\n\nOutro", "2024-01-01-display.md")?;
        assert!(doc.html.contains("<p>Intro</p>\n<div class=\"math math-display\">"));
        assert!(!doc.html.contains("<p><div"));
        Ok(())
    }

    #[test]
    fn test_mermaid() -> Result<()> {
        let doc = parse("```mermaid\ngraph TD\nA-->B\n```\n", "2024-01-01-diagram.md")?;
        assert!(doc.has_mermaid);
        assert!(!doc.has_math);
        assert_eq!(doc.html, "<div class=\"mermaid\">\ngraph TD\nA-->B\n</div>\n");
        Ok(())
    }

    #[test]
    fn test_plain_document() -> Result<()> {
        let doc = parse("Hello **world**.", "2024-03-01-my-post.md")?;
        assert!(!doc.has_math);
        assert!(!doc.has_mermaid);
        assert_eq!(doc.html, "<p>Hello <strong>world</strong>.</p>\n");
        assert_eq!(doc.title(), "My Post");
        assert_eq!(doc.description, "Hello world.");
        Ok(())
    }

    #[test]
    fn test_explicit_description() -> Result<()> {
        let doc = parse("---\ntitle: T\ndescription: Given\n---\nBody", "t.md")?;
        assert_eq!(doc.description, "Given");
        Ok(())
    }

    #[test]
    fn test_page_output_path() -> Result<()> {
        let draft = Draft::parse(
            Kind::Page,
            Path::new("content/pages/about.md"),
            "---\ntitle: About Me\n---\nHi",
            &Markdown,
            &[],
        )?;
        assert_eq!(draft.finalize().output_path(), Path::new("about-me.html"));
        Ok(())
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("<p>Short <em>one</em></p>\n"), "Short one");
        let long = format!("<p>{}</p>", "x".repeat(250));
        let cut = excerpt(&long);
        assert_eq!(cut, format!("{}...", "x".repeat(EXCERPT_LENGTH)));
    }

    #[test]
    fn test_uses_converter_seam() -> Result<()> {
        struct Shouting;
        impl Converter for Shouting {
            fn convert(&self, text: &str, _: &[Extension]) -> Rendered {
                Rendered {
                    html: text.to_uppercase(),
                    toc: Vec::new(),
                }
            }
        }
        let draft = Draft::parse(Kind::Post, Path::new("a.md"), "quiet $x$", &Shouting, &[])?;
        // The span is restored after conversion, so it isn't upper-cased.
        assert_eq!(
            draft.html,
            "QUIET <span class=\"math math-inline\">&#92;(x&#92;)</span>"
        );
        Ok(())
    }
}
