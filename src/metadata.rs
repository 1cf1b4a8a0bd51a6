//! Extracts [`Metadata`] from a source document, either from its leading
//! header block or, when there is none, from the `YYYY-MM-DD-<slug>` file
//! name convention. See [`extract`].

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// The sentinel line which opens and closes a header block.
const FENCE: &str = "---";

/// The date format used in headers and file names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Metadata for a single document as extracted from its source. The
/// `description` is provisional: when the source doesn't supply one it is
/// derived later from the rendered HTML (see
/// [`crate::document::Document`]).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    /// The document title. May be empty.
    pub title: String,

    /// The output file name stem. Always a valid slug (see [`slugify`]).
    pub slug: String,

    /// The publication date. Undated documents sort after dated ones.
    pub date: Option<NaiveDate>,

    /// Tags in source order. Duplicates are kept.
    pub tags: Vec<String>,

    /// An explicit description, if the header had one.
    pub description: Option<String>,
}

/// The result of a metadata extraction: the metadata and the body text with
/// the header removed.
#[derive(Debug)]
pub struct Extracted<'a> {
    pub metadata: Metadata,
    pub body: &'a str,
}

/// Extracts a document's metadata. `stem` is the source file name less its
/// extension and is consulted when the text has no header block.
///
/// Header lines without a colon and unknown keys are skipped. An
/// unparseable `date` is an error.
pub fn extract<'a>(input: &'a str, stem: &str) -> Result<Extracted<'a>> {
    let mut metadata = Metadata::default();
    let mut slug = None;

    let body = match split_header(input) {
        Some((header, body)) => {
            for (number, line) in header.lines().enumerate() {
                parse_line(&mut metadata, &mut slug, number + 2, line)?;
            }
            body
        }
        None => {
            if input.starts_with(FENCE) && input[FENCE.len()..].starts_with('\n') {
                warn!(stem, "header block is never closed; treating it as body");
            }
            if let Some((date, from_name)) = parse_file_name(stem)? {
                metadata.date = Some(date);
                metadata.title = title_case(&from_name.replace('-', " "));
                slug = Some(from_name.to_owned());
            }
            input
        }
    };

    if metadata.title.is_empty() && slug.is_none() {
        metadata.title = title_case(&stem.replace(['-', '_'], " "));
    }
    metadata.slug = match slug {
        Some(slug) => slugify(&slug),
        None => slugify(&metadata.title),
    };
    if metadata.slug.is_empty() {
        metadata.slug = slugify(stem);
    }

    Ok(Extracted { metadata, body })
}

/// Splits `input` into its header contents and body. Returns `None` unless
/// the first line is the fence and a later line closes it.
fn split_header(input: &str) -> Option<(&str, &str)> {
    let rest = input.strip_prefix(FENCE)?.strip_prefix('\n')?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches('\n') == FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn parse_line(
    metadata: &mut Metadata,
    slug: &mut Option<String>,
    number: usize,
    line: &str,
) -> Result<()> {
    if line.trim().is_empty() {
        return Ok(());
    }
    let (key, value) = match line.split_once(':') {
        Some(pair) => pair,
        None => {
            warn!(line = number, "skipping header line without a `:`");
            return Ok(());
        }
    };
    let value = value.trim();
    match key.trim() {
        "title" => metadata.title = unquote(value).to_owned(),
        "date" => metadata.date = Some(parse_date(unquote(value))?),
        "slug" => *slug = Some(unquote(value).to_owned()),
        "tags" => metadata.tags = parse_tags(value),
        "description" => metadata.description = Some(unquote(value).to_owned()),
        _ => {}
    }
    Ok(())
}

/// Parses a `[a, b, c]` list. Empty entries are dropped.
fn parse_tags(value: &str) -> Vec<String> {
    value
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

fn unquote(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|err| Error::InvalidDate {
        value: value.to_owned(),
        err,
    })
}

/// Matches `YYYY-MM-DD-<slug>` file stems.
static FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})-(.+)$").unwrap());

fn parse_file_name(stem: &str) -> Result<Option<(NaiveDate, &str)>> {
    match FILE_NAME.captures(stem) {
        None => Ok(None),
        Some(captures) => {
            let date = parse_date(&captures[1])?;
            // `get` can't fail: group 2 is not optional.
            let slug = captures.get(2).map_or("", |m| m.as_str());
            Ok(Some((date, slug)))
        }
    }
}

static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Converts `text` into a slug: lowercases it, drops everything but word
/// characters, whitespace and hyphens, then collapses runs of whitespace and
/// hyphens into a single hyphen. Slugifying a slug returns it unchanged.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_SLUG.replace_all(&lowered, "");
    SEPARATORS.replace_all(&stripped, "-").into_owned()
}

/// Capitalizes the first letter of each space-separated word and lowercases
/// the rest.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// The result of a metadata extraction.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a fatal problem with a document's metadata.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a date in a header or file name isn't `YYYY-MM-DD`.
    #[error("invalid date `{value}` (expected YYYY-MM-DD): {err}")]
    InvalidDate {
        value: String,
        #[source]
        err: chrono::ParseError,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_header() -> Result<()> {
        let input = "---\n\
                     title: \"Hello, World!\"\n\
                     date: 2024-01-15\n\
                     tags: [rust, math, rust]\n\
                     description: 'A greeting'\n\
                     ---\n\
                     # Body\n";
        let extracted = extract(input, "ignored")?;
        assert_eq!(
            extracted.metadata,
            Metadata {
                title: "Hello, World!".to_owned(),
                slug: "hello-world".to_owned(),
                date: Some(date("2024-01-15")),
                tags: vec!["rust".to_owned(), "math".to_owned(), "rust".to_owned()],
                description: Some("A greeting".to_owned()),
            }
        );
        assert_eq!(extracted.body, "# Body\n");
        Ok(())
    }

    #[test]
    fn test_header_slug_and_unknown_keys() -> Result<()> {
        let input = "---\ntitle: Something\nslug: custom-slug\nauthor: me\nnot a pair\n---\nbody";
        let extracted = extract(input, "2020-01-01-from-name")?;
        assert_eq!(extracted.metadata.slug, "custom-slug");
        assert_eq!(extracted.metadata.title, "Something");
        // The header wins; the file name isn't consulted.
        assert_eq!(extracted.metadata.date, None);
        assert_eq!(extracted.body, "body");
        Ok(())
    }

    #[test]
    fn test_header_invalid_date() {
        let input = "---\ntitle: Bad\ndate: 2024-13-45\n---\n";
        match extract(input, "bad") {
            Err(Error::InvalidDate { value, .. }) => assert_eq!(value, "2024-13-45"),
            other => panic!("expected InvalidDate, got {:?}", other),
        }
    }

    #[test]
    fn test_file_name() -> Result<()> {
        let extracted = extract("Just text.", "2024-03-01-my-post")?;
        assert_eq!(extracted.metadata.date, Some(date("2024-03-01")));
        assert_eq!(extracted.metadata.slug, "my-post");
        assert_eq!(extracted.metadata.title, "My Post");
        assert_eq!(extracted.body, "Just text.");
        Ok(())
    }

    #[test]
    fn test_file_name_invalid_date() {
        assert!(extract("text", "2024-02-30-leap").is_err());
    }

    #[test]
    fn test_no_metadata_at_all() -> Result<()> {
        let extracted = extract("text", "about_me")?;
        assert_eq!(extracted.metadata.title, "About Me");
        assert_eq!(extracted.metadata.slug, "about-me");
        assert_eq!(extracted.metadata.date, None);
        Ok(())
    }

    #[test]
    fn test_unclosed_header_is_body() -> Result<()> {
        let input = "---\ntitle: Never closed\n";
        let extracted = extract(input, "2023-05-06-open")?;
        assert_eq!(extracted.body, input);
        assert_eq!(extracted.metadata.slug, "open");
        Ok(())
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("Rust  --  and   Math"), "rust-and-math");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_slugify_idempotent() {
        for slug in ["my-post", "a_b-c", "2024-recap", ""] {
            assert_eq!(slugify(slug), slug);
            assert_eq!(slugify(&slugify(slug)), slugify(slug));
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("my post"), "My Post");
        assert_eq!(title_case("hELLO wORLD"), "Hello World");
    }
}
