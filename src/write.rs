//! Templates [`Document`]s and the collection pages derived from them (index
//! and archive) into [`Page`]s. Every page is wrapped in the base layout.

use crate::config::Site;
use crate::document::{Document, Kind};
use crate::template::{Context, Templates};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;

/// The output stem of the index page. No page may use it as its slug.
pub const INDEX_STEM: &str = "index";

/// The output stem of the archive page. No page may use it as its slug.
pub const ARCHIVE_STEM: &str = "archive";

/// The slugs taken by the collection pages at the output root.
pub const RESERVED_STEMS: [&str; 2] = [INDEX_STEM, ARCHIVE_STEM];

/// An output HTML file, not yet written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    /// The target location relative to the output root.
    pub path: PathBuf,

    /// The complete HTML, already wrapped in the base layout.
    pub html: String,
}

/// Responsible for templating documents and the derived collection pages
/// (index and archive) into [`Page`]s.
pub struct Writer<'a> {
    pub templates: &'a Templates,
    pub site: &'a Site,

    /// The number of posts on the index page.
    pub index_size: usize,
}

fn flag(value: bool) -> String {
    String::from(if value { "true" } else { "false" })
}

/// Escapes `"` so `text` can sit in a double-quoted attribute. `text` may be
/// rendered HTML, whose entities are kept as they are.
fn escape_attribute(text: &str) -> String {
    text.replace('"', "&quot;")
}

fn long_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%B %d, %Y").to_string())
        .unwrap_or_default()
}

impl Writer<'_> {
    /// Wraps `content` in the base layout. `description` feeds the page's
    /// meta description, so it is escaped for a quoted attribute.
    fn layout(
        &self,
        title: String,
        content: String,
        description: &str,
        has_math: bool,
        has_mermaid: bool,
    ) -> String {
        let mut context = self.site_context();
        context.insert("title", title);
        context.insert("content", content);
        context.insert("description", escape_attribute(description));
        context.insert("has_math", flag(has_math));
        context.insert("has_mermaid", flag(has_mermaid));
        self.templates.base.render(&context)
    }

    fn site_context(&self) -> Context<'static> {
        let mut context = Context::new();
        context.insert("site_title", self.site.title.clone());
        context.insert("site_description", self.site.description.clone());
        context.insert("site_url", self.site.url.to_string());
        context.insert("root", self.site.root().to_owned());
        context.insert("author", self.site.author.clone());
        context
    }

    /// Renders a post or page through the post template and then the base
    /// layout. Pages show neither a date nor tags.
    pub fn document_page(&self, document: &Document) -> Page {
        let (date, tags) = match document.kind {
            Kind::Post => (
                long_date(document.metadata.date),
                document
                    .metadata
                    .tags
                    .iter()
                    .map(|tag| format!(r#"<span class="tag">{}</span>"#, tag))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Kind::Page => (String::new(), String::new()),
        };

        let mut context = self.site_context();
        context.insert("title", document.title().to_owned());
        context.insert("date", date);
        context.insert("content", document.html.clone());
        context.insert("tags", tags);
        context.insert("toc", document.toc.clone());
        context.insert("description", document.description.clone());
        context.insert("has_math", flag(document.has_math));
        context.insert("has_mermaid", flag(document.has_mermaid));
        let body = self.templates.post.render(&context);

        Page {
            path: document.output_path(),
            html: self.layout(
                format!("{} - {}", document.title(), self.site.title),
                body,
                &document.description,
                document.has_math,
                document.has_mermaid,
            ),
        }
    }

    /// Renders the first `index_size` of the sorted `posts` as previews into
    /// the index template.
    pub fn index_page(&self, posts: &[Document]) -> Page {
        let mut previews = String::new();
        for post in posts.iter().take(self.index_size) {
            let link = self.site.post_link(post.slug());
            let iso = post
                .metadata
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            // Writing to a `String` can't fail.
            let _ = write!(
                previews,
                r#"
<article class="post-preview">
    <h2><a href="{link}">{title}</a></h2>
    <time datetime="{iso}">{date}</time>
    <p>{description}</p>
    <a href="{link}" class="read-more">Read more &rarr;</a>
</article>
"#,
                link = link,
                title = post.title(),
                iso = iso,
                date = long_date(post.metadata.date),
                description = post.description,
            );
        }

        let mut context = self.site_context();
        context.insert("posts", previews);
        let body = self.templates.index.render(&context);

        Page {
            path: PathBuf::from(format!("{}.html", INDEX_STEM)),
            html: self.layout(
                self.site.title.clone(),
                body,
                &self.site.description,
                false,
                false,
            ),
        }
    }

    /// Renders every dated post grouped by year, newest year first. Within a
    /// year, posts keep the order of `posts`.
    pub fn archive_page(&self, posts: &[Document]) -> Page {
        let mut html = String::from("<h1>Archive</h1>\n");
        for (year, posts) in group_by_year(posts).iter().rev() {
            let _ = writeln!(html, "<h2>{}</h2>", year);
            html.push_str("<ul class=\"archive-list\">\n");
            for (date, post) in posts {
                let _ = writeln!(
                    html,
                    r#"<li><span class="date">{}</span> <a href="{}">{}</a></li>"#,
                    date.format("%b %d"),
                    self.site.post_link(post.slug()),
                    post.title(),
                );
            }
            html.push_str("</ul>\n");
        }

        Page {
            path: PathBuf::from(format!("{}.html", ARCHIVE_STEM)),
            html: self.layout(
                format!("Archive - {}", self.site.title),
                html,
                &self.site.description,
                false,
                false,
            ),
        }
    }
}

/// Groups dated posts by calendar year. Undated posts are left out.
pub fn group_by_year(posts: &[Document]) -> BTreeMap<i32, Vec<(NaiveDate, &Document)>> {
    let mut years: BTreeMap<i32, Vec<(NaiveDate, &Document)>> = BTreeMap::new();
    for post in posts {
        if let Some(date) = post.metadata.date {
            years.entry(date.year()).or_default().push((date, post));
        }
    }
    years
}
