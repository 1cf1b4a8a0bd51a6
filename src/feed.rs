//! Support for creating an RSS 2.0 feed from a list of posts.

use crate::config::Site;
use crate::document::Document;
use chrono::NaiveDate;
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use std::io::Write;

/// The `pubDate` format (RFC 822). Posts only carry a date, so the time is
/// always midnight UTC.
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y 00:00:00 +0000";

/// Formats `date` for an item's `pubDate`.
pub fn pub_date(date: NaiveDate) -> String {
    date.format(PUB_DATE_FORMAT).to_string()
}

/// Builds a channel holding the first `size` of the sorted `posts`.
pub fn feed(site: &Site, posts: &[Document], size: usize) -> Channel {
    let items: Vec<Item> = posts.iter().take(size).map(|p| item(site, p)).collect();
    ChannelBuilder::default()
        .title(site.title.clone())
        .link(site.url.to_string())
        .description(site.description.clone())
        .language(Some(site.language.clone()))
        .generator(Some(format!("blogsmith {}", env!("CARGO_PKG_VERSION"))))
        .items(items)
        .build()
}

fn item(site: &Site, post: &Document) -> Item {
    let link = site.post_url(post.slug());
    // `rss` writes descriptions as CDATA, so the text goes in unescaped.
    ItemBuilder::default()
        .title(Some(post.title().to_owned()))
        .link(Some(link.clone()))
        .description(Some(post.description.clone()))
        .pub_date(post.metadata.date.map(pub_date))
        .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
        .build()
}

/// Creates the feed and writes it to a [`std::io::Write`].
pub fn write_feed<W: Write>(site: &Site, posts: &[Document], size: usize, w: W) -> Result<()> {
    feed(site, posts, size).pretty_write_to(w, b' ', 2)?;
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing the feed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when serializing the channel fails.
    #[error("writing feed: {0}")]
    Rss(#[from] rss::Error),
}
