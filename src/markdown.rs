// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Ordered-rule Markdown to HTML transformer.
//!
//! The renderer is a fixed pipeline of regex substitutions over an
//! HTML-escaped copy of the input. Rules run in a documented order: code
//! fences, inline code, headings, emphasis, block quotes, horizontal rules,
//! list grouping, links, images and finally paragraph wrapping. The same
//! input always produces the same output; nothing here touches disk, clock
//! or globals.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CODE_FENCE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?s)```\w*\n?(.*?)```"));
static INLINE_CODE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"`([^`]+)`"));
static HEADING_6: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"(?m)^###### (.+)$"));
static HEADING_5: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"(?m)^##### (.+)$"));
static HEADING_4: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"(?m)^#### (.+)$"));
static HEADING_3: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"(?m)^### (.+)$"));
static HEADING_2: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"(?m)^## (.+)$"));
static HEADING_1: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"(?m)^# (.+)$"));
static BOLD_ITALIC: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?s)\*\*\*(.+?)\*\*\*"));
static BOLD_STARS: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?s)\*\*(.+?)\*\*"));
// Single-marker emphasis never spans lines: a lone `*` at a line start must
// stay available as a list marker for the grouping rules below.
static ITALIC_STAR: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\*(.+?)\*"));
static BOLD_UNDERSCORES: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?s)__(.+?)__"));
static ITALIC_UNDERSCORE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"_(.+?)_"));
static BLOCK_QUOTE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?m)^&gt; (.+)$"));
static HORIZONTAL_RULE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?m)^[-*]{3,}[ \t]*$"));
static UNORDERED_LIST: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?m)^[*-] .+(?:\n[*-] .+)*"));
static ORDERED_LIST: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?m)^\d+\. .+(?:\n\d+\. .+)*"));
static LINK: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?m)(^|[^!])\[([^\]]+)\]\(([^)]+)\)"));
static IMAGE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)"));
static PARAGRAPH_BREAK: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\n{2,}"));
static BLOCK_ELEMENT: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^<(h[1-6]|ul|ol|li|blockquote|pre|hr)"));
static HTML_TAG: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"<[^>]+>"));
static WHITESPACE_RUN: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\s+"));

#[derive(Debug)]
pub enum MarkdownError {
    Regex(String),
}

impl std::fmt::Display for MarkdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkdownError::Regex(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for MarkdownError {}

fn compiled(lazy: &'static Lazy<Result<Regex, regex::Error>>) -> Result<&'static Regex, MarkdownError> {
    match Lazy::force(lazy) {
        Ok(re) => Ok(re),
        Err(err) => Err(MarkdownError::Regex(format!(
            "Markdown regex failed to compile: {}",
            err
        ))),
    }
}

/// Escapes the five HTML-significant characters. Runs before every other
/// rule, so raw HTML in page bodies renders as text.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders a Markdown body to HTML.
pub fn render_markdown(input: &str) -> Result<String, MarkdownError> {
    let normalized = input.replace("\r\n", "\n");
    let mut html = escape_html(&normalized);

    html = compiled(&CODE_FENCE)?
        .replace_all(&html, "<pre><code>$1</code></pre>")
        .into_owned();
    html = compiled(&INLINE_CODE)?
        .replace_all(&html, "<code>$1</code>")
        .into_owned();

    html = compiled(&HEADING_6)?
        .replace_all(&html, "<h6>$1</h6>")
        .into_owned();
    html = compiled(&HEADING_5)?
        .replace_all(&html, "<h5>$1</h5>")
        .into_owned();
    html = compiled(&HEADING_4)?
        .replace_all(&html, "<h4>$1</h4>")
        .into_owned();
    html = compiled(&HEADING_3)?
        .replace_all(&html, "<h3>$1</h3>")
        .into_owned();
    html = compiled(&HEADING_2)?
        .replace_all(&html, "<h2>$1</h2>")
        .into_owned();
    html = compiled(&HEADING_1)?
        .replace_all(&html, "<h1>$1</h1>")
        .into_owned();

    html = compiled(&BOLD_ITALIC)?
        .replace_all(&html, "<strong><em>$1</em></strong>")
        .into_owned();
    html = compiled(&BOLD_STARS)?
        .replace_all(&html, "<strong>$1</strong>")
        .into_owned();
    html = compiled(&ITALIC_STAR)?
        .replace_all(&html, "<em>$1</em>")
        .into_owned();
    html = compiled(&BOLD_UNDERSCORES)?
        .replace_all(&html, "<strong>$1</strong>")
        .into_owned();
    html = compiled(&ITALIC_UNDERSCORE)?
        .replace_all(&html, "<em>$1</em>")
        .into_owned();

    html = compiled(&BLOCK_QUOTE)?
        .replace_all(&html, "<blockquote>$1</blockquote>")
        .into_owned();
    html = compiled(&HORIZONTAL_RULE)?
        .replace_all(&html, "<hr>")
        .into_owned();

    html = compiled(&UNORDERED_LIST)?
        .replace_all(&html, |caps: &Captures| {
            wrap_list_items(&caps[0], "ul", |line| &line[2..])
        })
        .into_owned();
    html = compiled(&ORDERED_LIST)?
        .replace_all(&html, |caps: &Captures| {
            wrap_list_items(&caps[0], "ol", |line| {
                line.split_once(". ").map(|(_, rest)| rest).unwrap_or(line)
            })
        })
        .into_owned();

    // Links run before images, so an image marker must not match as a link.
    // The leading capture stands in for a lookbehind on `!`.
    html = compiled(&LINK)?
        .replace_all(&html, |caps: &Captures| {
            format!(r#"{}<a href="{}">{}</a>"#, &caps[1], &caps[3], &caps[2])
        })
        .into_owned();
    html = compiled(&IMAGE)?
        .replace_all(&html, r#"<img src="$2" alt="$1">"#)
        .into_owned();

    wrap_paragraphs(&html)
}

fn wrap_list_items<'a>(
    block: &'a str,
    tag: &str,
    strip_marker: impl Fn(&'a str) -> &'a str,
) -> String {
    let mut out = format!("<{}>", tag);
    for line in block.lines() {
        out.push_str("<li>");
        out.push_str(strip_marker(line).trim());
        out.push_str("</li>");
    }
    out.push_str(&format!("</{}>", tag));
    out
}

fn wrap_paragraphs(html: &str) -> Result<String, MarkdownError> {
    let block_element = compiled(&BLOCK_ELEMENT)?;
    let mut blocks = Vec::new();
    for block in compiled(&PARAGRAPH_BREAK)?.split(html) {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        if block_element.is_match(block) {
            blocks.push(block.to_string());
        } else {
            blocks.push(format!("<p>{}</p>", block.replace('\n', "<br>")));
        }
    }
    Ok(blocks.join("\n"))
}

/// Produces a plain-text excerpt of a Markdown body: rendered, stripped of
/// tags and collapsed to single spaces. The result keeps its HTML entity
/// escaping, so templates may insert it unescaped.
pub fn plain_excerpt(input: &str, max_chars: usize) -> Result<String, MarkdownError> {
    let html = render_markdown(input)?;
    let stripped = compiled(&HTML_TAG)?.replace_all(&html, " ");
    let collapsed = compiled(&WHITESPACE_RUN)?
        .replace_all(stripped.trim(), " ")
        .into_owned();

    if collapsed.chars().count() <= max_chars {
        return Ok(collapsed);
    }
    let cut: String = collapsed.chars().take(max_chars).collect();
    Ok(format!("{}...", cut.trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(input: &str) -> String {
        render_markdown(input).expect("render")
    }

    #[test]
    fn escapes_raw_html() {
        assert_eq!(
            render("<script>alert(\"hi\")</script>"),
            "<p>&lt;script&gt;alert(&quot;hi&quot;)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn escapes_ampersand_and_quote_entities() {
        assert_eq!(render("Tom & Jerry's"), "<p>Tom &amp; Jerry&#039;s</p>");
    }

    #[test]
    fn renders_headings_by_level() {
        assert_eq!(render("# Title"), "<h1>Title</h1>");
        assert_eq!(render("### Sub"), "<h3>Sub</h3>");
        assert_eq!(render("###### Tiny"), "<h6>Tiny</h6>");
    }

    #[test]
    fn heading_requires_line_start() {
        assert_eq!(render("not # a heading"), "<p>not # a heading</p>");
    }

    #[test]
    fn renders_emphasis_variants() {
        assert_eq!(render("***both***"), "<p><strong><em>both</em></strong></p>");
        assert_eq!(render("**bold**"), "<p><strong>bold</strong></p>");
        assert_eq!(render("*ital*"), "<p><em>ital</em></p>");
        assert_eq!(render("__bold__"), "<p><strong>bold</strong></p>");
        assert_eq!(render("_ital_"), "<p><em>ital</em></p>");
    }

    #[test]
    fn single_marker_emphasis_stays_on_one_line() {
        assert_eq!(render("*a\nb*"), "<p>*a<br>b*</p>");
        assert_eq!(render("**a\nb**"), "<p><strong>a<br>b</strong></p>");
        assert_eq!(
            render("*x* and\n\n* item\n* item"),
            "<p><em>x</em> and</p>\n<ul><li>item</li><li>item</li></ul>"
        );
    }

    #[test]
    fn renders_inline_code() {
        assert_eq!(render("`let x = a * b;`"), "<p><code>let x = a * b;</code></p>");
    }

    #[test]
    fn renders_code_fence_with_language_tag() {
        let input = "```rust\nlet x = 1;\n```";
        assert_eq!(render(input), "<pre><code>let x = 1;\n</code></pre>");
    }

    #[test]
    fn code_fence_keeps_markdown_inert() {
        let input = "```\n# not a heading\n```";
        assert_eq!(render(input), "<pre><code># not a heading\n</code></pre>");
    }

    #[test]
    fn renders_block_quote_after_escaping() {
        assert_eq!(render("> quoted"), "<blockquote>quoted</blockquote>");
    }

    #[test]
    fn renders_horizontal_rule() {
        assert_eq!(render("---"), "<hr>");
        assert_eq!(render("------"), "<hr>");
    }

    #[test]
    fn groups_adjacent_list_lines_into_one_list() {
        let input = "- one\n- two\n* three";
        assert_eq!(
            render(input),
            "<ul><li>one</li><li>two</li><li>three</li></ul>"
        );
    }

    #[test]
    fn separate_list_blocks_stay_separate() {
        let input = "- a\n\n- b";
        assert_eq!(render(input), "<ul><li>a</li></ul>\n<ul><li>b</li></ul>");
    }

    #[test]
    fn renders_ordered_list() {
        let input = "1. first\n2. second";
        assert_eq!(render(input), "<ol><li>first</li><li>second</li></ol>");
    }

    #[test]
    fn renders_links() {
        assert_eq!(
            render("see [docs](https://example.com/a)"),
            "<p>see <a href=\"https://example.com/a\">docs</a></p>"
        );
    }

    #[test]
    fn renders_images_not_as_links() {
        assert_eq!(
            render("![alt text](/img.png)"),
            "<p><img src=\"/img.png\" alt=\"alt text\"></p>"
        );
    }

    #[test]
    fn link_and_image_can_share_a_paragraph() {
        assert_eq!(
            render("[a](/x) and ![b](/y.png)"),
            "<p><a href=\"/x\">a</a> and <img src=\"/y.png\" alt=\"b\"></p>"
        );
    }

    #[test]
    fn wraps_plain_text_in_paragraphs_with_br() {
        let input = "line one\nline two\n\nsecond para";
        assert_eq!(
            render(input),
            "<p>line one<br>line two</p>\n<p>second para</p>"
        );
    }

    #[test]
    fn block_elements_are_not_wrapped() {
        let input = "# Title\n\nbody text";
        assert_eq!(render(input), "<h1>Title</h1>\n<p>body text</p>");
    }

    #[test]
    fn normalizes_crlf_input() {
        assert_eq!(render("a\r\n\r\nb"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(render(""), "");
        assert_eq!(render("\n\n\n"), "");
    }

    #[test]
    fn rendering_is_deterministic() {
        let input = "# T\n\n**b** and [l](/p)\n\n- i1\n- i2";
        assert_eq!(render(input), render(input));
    }

    #[test]
    fn excerpt_strips_tags_and_collapses_whitespace() {
        let excerpt = plain_excerpt("# Title\n\nSome **bold** text", 180).expect("excerpt");
        assert_eq!(excerpt, "Title Some bold text");
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let body = "word ".repeat(100);
        let excerpt = plain_excerpt(&body, 20).expect("excerpt");
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.chars().count() <= 23);
    }

    #[test]
    fn excerpt_keeps_entity_escaping() {
        let excerpt = plain_excerpt("fish & chips", 180).expect("excerpt");
        assert_eq!(excerpt, "fish &amp; chips");
    }
}
