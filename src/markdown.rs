//! The markup converter. [`Converter`] is the seam between the pipeline and
//! the markdown engine; [`Markdown`] implements it with [`pulldown_cmark`].

use crate::metadata::slugify;
use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt::Write;

/// A named converter extension, as listed in the project file.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Extension {
    Tables,
    Footnotes,
    Strikethrough,
    Tasklists,
    SmartPunctuation,
    HeadingAttributes,
    DefinitionLists,

    /// Assigns an `id` to each heading and collects a table of contents.
    Toc,
}

impl Extension {
    /// The extensions enabled when the project file doesn't list any.
    pub fn defaults() -> Vec<Extension> {
        vec![
            Extension::Tables,
            Extension::Footnotes,
            Extension::Strikethrough,
            Extension::Tasklists,
            Extension::Toc,
        ]
    }

    fn option(self) -> Option<Options> {
        match self {
            Extension::Tables => Some(Options::ENABLE_TABLES),
            Extension::Footnotes => Some(Options::ENABLE_FOOTNOTES),
            Extension::Strikethrough => Some(Options::ENABLE_STRIKETHROUGH),
            Extension::Tasklists => Some(Options::ENABLE_TASKLISTS),
            Extension::SmartPunctuation => Some(Options::ENABLE_SMART_PUNCTUATION),
            Extension::HeadingAttributes => Some(Options::ENABLE_HEADING_ATTRIBUTES),
            Extension::DefinitionLists => Some(Options::ENABLE_DEFINITION_LIST),
            Extension::Toc => None,
        }
    }
}

/// A heading collected for the table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// The output of a conversion: the HTML body and the data derived while
/// converting it.
#[derive(Clone, Debug, Default)]
pub struct Rendered {
    pub html: String,
    pub toc: Vec<Heading>,
}

impl Rendered {
    /// Renders the table of contents as a `<nav>` list, or an empty string
    /// when there are no headings.
    pub fn toc_html(&self) -> String {
        if self.toc.is_empty() {
            return String::new();
        }
        let mut out = String::from("<nav class=\"toc\">\n<ul>\n");
        for heading in &self.toc {
            // Writing to a `String` can't fail.
            let _ = writeln!(
                out,
                r##"<li class="toc-h{}"><a href="#{}">{}</a></li>"##,
                heading.level,
                escape_html(&heading.id),
                escape_html(&heading.text)
            );
        }
        out.push_str("</ul>\n</nav>");
        out
    }
}

/// Converts markup text into HTML.
pub trait Converter {
    fn convert(&self, text: &str, extensions: &[Extension]) -> Rendered;
}

/// The [`pulldown_cmark`] converter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Markdown;

impl Converter for Markdown {
    fn convert(&self, text: &str, extensions: &[Extension]) -> Rendered {
        let mut options = Options::empty();
        for option in extensions.iter().filter_map(|e| e.option()) {
            options.insert(option);
        }

        let mut events: Vec<Event> = Parser::new_ext(text, options).collect();
        let toc = if extensions.contains(&Extension::Toc) {
            assign_heading_ids(&mut events)
        } else {
            Vec::new()
        };

        let mut html = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut html, events.into_iter());
        Rendered { html, toc }
    }
}

/// Gives every heading an `id` (keeping explicit ones) and returns the
/// headings in document order.
fn assign_heading_ids(events: &mut [Event]) -> Vec<Heading> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut toc = Vec::new();

    let mut i = 0;
    while i < events.len() {
        let level = match &events[i] {
            Event::Start(Tag::Heading { level, .. }) => *level,
            _ => {
                i += 1;
                continue;
            }
        };

        let mut text = String::new();
        let mut end = i + 1;
        while end < events.len() {
            match &events[end] {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                _ => {}
            }
            end += 1;
        }

        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            let resolved = match id.as_ref() {
                Some(explicit) => explicit.to_string(),
                None => unique_id(&seen, &text),
            };
            seen.insert(resolved.clone());
            *id = Some(CowStr::from(resolved.clone()));
            toc.push(Heading {
                level: heading_level(level),
                id: resolved,
                text: text.trim().to_owned(),
            });
        }
        i = end + 1;
    }
    toc
}

fn unique_id(seen: &HashSet<String>, text: &str) -> String {
    let base = match slugify(text.trim()) {
        slug if slug.is_empty() => String::from("section"),
        slug => slug,
    };
    if !seen.contains(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !seen.contains(candidate))
        .unwrap_or(base)
}

/// Escapes the characters which would otherwise be read as markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_convert_with_tables() {
        let rendered = Markdown.convert(
            "| a | b |\n|---|---|\n| 1 | 2 |\n",
            &[Extension::Tables],
        );
        assert!(rendered.html.contains("<table>"));
        assert!(rendered.toc.is_empty());
    }

    #[test]
    fn test_tables_disabled() {
        let rendered = Markdown.convert("| a | b |\n|---|---|\n| 1 | 2 |\n", &[]);
        assert!(!rendered.html.contains("<table>"));
    }

    #[test]
    fn test_toc_ids() {
        let rendered = Markdown.convert(
            "# Intro\n\ntext\n\n## Set `up`\n\n## Intro\n",
            &[Extension::Toc],
        );
        assert!(rendered.html.contains(r#"<h1 id="intro">Intro</h1>"#));
        assert!(rendered.html.contains(r#"<h2 id="set-up">"#));
        assert!(rendered.html.contains(r#"<h2 id="intro-1">Intro</h2>"#));
        assert_eq!(
            rendered.toc,
            vec![
                Heading { level: 1, id: "intro".to_owned(), text: "Intro".to_owned() },
                Heading { level: 2, id: "set-up".to_owned(), text: "Set up".to_owned() },
                Heading { level: 2, id: "intro-1".to_owned(), text: "Intro".to_owned() },
            ]
        );
        let toc = rendered.toc_html();
        assert!(toc.starts_with("<nav class=\"toc\">"));
        assert!(toc.contains(r##"<a href="#set-up">Set up</a>"##));
    }

    #[test]
    fn test_empty_toc() {
        let rendered = Markdown.convert("plain", &Extension::defaults());
        assert_eq!(rendered.toc_html(), "");
        assert_eq!(rendered.html, "<p>plain</p>\n");
    }
}
