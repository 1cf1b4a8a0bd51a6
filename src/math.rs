//! Protects math and diagram notation from the markup converter.
//!
//! The converter would otherwise treat `_`, `*` and `\` inside an equation as
//! markup. Each match is replaced by an *atomic span*: the final HTML fragment
//! is stored aside and a placeholder token takes its place in the text. The
//! converter leaves tokens alone and [`Transformed::restore`] swaps the
//! fragments back in afterwards.
//!
//! The rewrite passes run in a fixed order over the text produced by the
//! previous pass:
//!
//! 1. `` ```mermaid `` fences become `<div class="mermaid">` containers
//! 2. `$$...$$` becomes display math
//! 3. `$...$` becomes inline math
//! 4. `\(...\)` becomes inline math
//! 5. `\[...\]` becomes display math
//!
//! No pattern may match across a token, so a later pass never rewrites a span
//! produced by an earlier one. Unbalanced delimiters simply don't match. Token
//! characters present in the source are replaced by character references
//! before the first pass.

use crate::markdown::escape_html;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Opens a placeholder token. Private-use code point, ignored by the
/// converter.
const TOKEN_OPEN: char = '\u{E000}';

/// Closes a placeholder token.
const TOKEN_CLOSE: char = '\u{E001}';

/// Returns whether `text` contains any math delimiter.
pub fn has_math(text: &str) -> bool {
    text.contains('$') || text.contains("\\[") || text.contains("\\(")
}

/// Returns whether `text` contains a diagram fence.
pub fn has_mermaid(text: &str) -> bool {
    text.contains("```mermaid")
}

/// Whether a fragment is block-level or inline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    Block,
    Inline,
}

/// A fragment of final HTML that must reach the output verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicSpan {
    pub html: String,
    pub layout: Layout,
}

/// Text with its math and diagram spans swapped out for tokens.
#[derive(Clone, Debug, Default)]
pub struct Transformed {
    text: String,
    spans: Vec<AtomicSpan>,
}

impl Transformed {
    /// The tokenized text to hand to the converter.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[AtomicSpan] {
        &self.spans
    }

    /// Replaces every token in `html` with its fragment. A block fragment
    /// which the converter wrapped in a paragraph of its own is unwrapped.
    pub fn restore(&self, html: &str) -> String {
        static WRAPPED: LazyLock<Regex> =
            LazyLock::new(|| Regex::new("<p>\u{E000}([0-9]+)\u{E001}</p>").unwrap());
        static BARE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").unwrap());

        if self.spans.is_empty() {
            return html.to_owned();
        }
        let unwrapped = WRAPPED.replace_all(html, |caps: &Captures| match self.span(caps) {
            Some(span) if span.layout == Layout::Block => span.html.clone(),
            _ => caps[0].to_owned(),
        });
        BARE.replace_all(&unwrapped, |caps: &Captures| match self.span(caps) {
            Some(span) => span.html.clone(),
            None => caps[0].to_owned(),
        })
        .into_owned()
    }

    /// The text with every span expanded in place, i.e. the result of the
    /// passes as plain string rewrites.
    pub fn expand(&self) -> String {
        self.restore(&self.text)
    }

    fn span(&self, caps: &Captures) -> Option<&AtomicSpan> {
        caps[1].parse::<usize>().ok().and_then(|i| self.spans.get(i))
    }

    fn push(&mut self, html: String, layout: Layout) -> String {
        let token = format!("{}{}{}", TOKEN_OPEN, self.spans.len(), TOKEN_CLOSE);
        self.spans.push(AtomicSpan { html, layout });
        token
    }
}

/// A single rewrite pass: a pattern and the fragment each match becomes.
struct Pass {
    pattern: Regex,
    layout: Layout,
    render: fn(&str) -> String,
}

impl Pass {
    fn new(pattern: &str, layout: Layout, render: fn(&str) -> String) -> Pass {
        Pass {
            pattern: Regex::new(pattern).unwrap(),
            layout,
            render,
        }
    }

    fn apply(&self, transformed: &mut Transformed) {
        let input = std::mem::take(&mut transformed.text);
        let output = self
            .pattern
            .replace_all(&input, |caps: &Captures| {
                let html = (self.render)(&caps[1]);
                transformed.push(html, self.layout)
            })
            .into_owned();
        transformed.text = output;
    }
}

fn display_math(expr: &str) -> String {
    format!(
        r#"<div class="math math-display">&#92;[{}&#92;]</div>"#,
        escape_html(expr)
    )
}

fn inline_math(expr: &str) -> String {
    format!(
        r#"<span class="math math-inline">&#92;({}&#92;)</span>"#,
        escape_html(expr)
    )
}

fn mermaid(code: &str) -> String {
    format!("<div class=\"mermaid\">\n{}\n</div>", code.trim())
}

static PASSES: LazyLock<[Pass; 5]> = LazyLock::new(|| {
    [
        Pass::new(r"(?s)```mermaid\n([^\x{E000}]*?)```", Layout::Block, mermaid),
        Pass::new(r"(?s)\$\$([^\x{E000}]*?)\$\$", Layout::Block, display_math),
        // Either a lone non-space character, or content which neither starts
        // nor ends with whitespace. `$5 and $10` is left alone.
        Pass::new(
            r"\$([^\s$\x{E000}][^$\x{E000}]*?[^\s$\x{E000}]|[^\s$\x{E000}])\$",
            Layout::Inline,
            inline_math,
        ),
        Pass::new(r"(?s)\\\(([^\x{E000}]*?)\\\)", Layout::Inline, inline_math),
        Pass::new(r"(?s)\\\[([^\x{E000}]*?)\\\]", Layout::Block, display_math),
    ]
});

/// Runs every pass over `input` in order.
pub fn transform(input: &str) -> Transformed {
    if !has_math(input) && !has_mermaid(input) {
        return Transformed {
            text: input.to_owned(),
            spans: Vec::new(),
        };
    }
    // Token characters already in the source would be mistaken for tokens on
    // restore, so they become character references.
    let mut transformed = Transformed {
        text: input
            .replace(TOKEN_OPEN, "&#xE000;")
            .replace(TOKEN_CLOSE, "&#xE001;"),
        spans: Vec::new(),
    };
    for pass in PASSES.iter() {
        pass.apply(&mut transformed);
    }
    transformed
}
