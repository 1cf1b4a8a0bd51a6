//! The library code for the `blogsmith` static site generator. A build runs
//! in two broad steps:
//!
//! 1. Building documents from source files on disk ([`crate::parser`],
//!    [`crate::document`])
//! 2. Templating the documents and the collection pages derived from them
//!    into output files ([`crate::write`], [`crate::feed`])
//!
//! The first step is the more involved. For each source file the metadata is
//! extracted from its header or file name ([`crate::metadata`]), math and
//! diagram notation is swapped out for atomic spans so the markdown converter
//! can't mangle it ([`crate::math`]), and the remainder is converted to HTML
//! ([`crate::markdown`]). The description is resolved last because it may be
//! an excerpt of that HTML.
//!
//! The second step sorts the posts newest first and derives the index page
//! (the latest posts), the archive (every dated post by year) and the RSS
//! feed. Every page goes through the `{{name}}` substitution templates in
//! [`crate::template`]. [`crate::build::build_site`] drives the whole thing.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod document;
pub mod feed;
pub mod markdown;
pub mod math;
pub mod metadata;
pub mod parser;
pub mod template;
pub mod write;
