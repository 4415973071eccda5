//! HTML to markdown conversion
//!
//! The converter walks the parsed DOM once. Noise elements (scripts, styles,
//! navigation and other page chrome) are skipped together with everything
//! inside them, so their text can never reach the output. Parsing is done by
//! html5ever through `scraper`, which recovers from any malformed input, so
//! conversion itself cannot fail.
//!
//! html5ever keeps arbitrarily deep trees. Below `MAX_DEPTH` levels the
//! converter stops recursing and flattens each remaining subtree to its
//! visible text with an explicit stack.

use crate::config::ConverterConfig;
use crate::convert::title::extract_title;
use scraper::{ElementRef, Html, Node};
use std::collections::HashSet;

/// Elements removed before conversion unless configured otherwise
pub const DEFAULT_REMOVE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript",
];

/// Nesting depth past which subtrees are flattened to plain text
const MAX_DEPTH: usize = 256;

/// A converted page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPage {
    pub title: String,
    pub content: String,
}

/// Converts HTML documents into markdown text
#[derive(Debug, Clone)]
pub struct HtmlConverter {
    remove_tags: HashSet<String>,
}

impl Default for HtmlConverter {
    fn default() -> Self {
        Self::with_remove_tags(DEFAULT_REMOVE_TAGS.iter().copied())
    }
}

impl HtmlConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a converter that strips exactly the given elements
    pub fn with_remove_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            remove_tags: tags
                .into_iter()
                .map(|t| t.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        match &config.remove_tags {
            Some(tags) => Self::with_remove_tags(tags),
            None => Self::default(),
        }
    }

    /// Converts an HTML document or fragment to markdown
    ///
    /// Empty or blank input yields an empty string.
    pub fn convert(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        self.convert_document(&Html::parse_document(html))
    }

    /// Converts a page and extracts its title from the same parse
    pub fn convert_page(&self, html: &str, url: &str) -> ConvertedPage {
        let document = Html::parse_document(html);
        let content = if html.trim().is_empty() {
            String::new()
        } else {
            self.convert_document(&document)
        };
        ConvertedPage {
            title: extract_title(&document, url),
            content,
        }
    }

    fn convert_document(&self, document: &Html) -> String {
        let root = document.root_element();
        let body = root
            .children()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "body")
            .unwrap_or(root);

        clean_whitespace(&self.convert_children(body, 0))
    }

    fn is_removed(&self, element: &ElementRef<'_>) -> bool {
        self.remove_tags.contains(element.value().name())
    }

    fn convert_children(&self, element: ElementRef<'_>, depth: usize) -> String {
        if depth >= MAX_DEPTH {
            return self.flatten_text(element);
        }

        let mut out = String::new();
        for child in element.children() {
            match child.value() {
                Node::Text(text) => out.push_str(&normalize_text(text)),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        out.push_str(&self.convert_element(child, depth + 1));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn convert_element(&self, element: ElementRef<'_>, depth: usize) -> String {
        if self.is_removed(&element) {
            return String::new();
        }

        let name = element.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                wrap_block(&format!("{} ", "#".repeat(level)), &self.inline_text(element, depth))
            }
            "p" => wrap_block("", &self.inline_text(element, depth)),
            "strong" | "b" => wrap_inline("**", &self.inline_text(element, depth)),
            "em" | "i" => wrap_inline("*", &self.inline_text(element, depth)),
            "a" => self.convert_link(element, depth),
            "img" => convert_image(element),
            "ul" | "ol" => {
                let list = self.convert_list(element, 0, depth);
                if list.is_empty() {
                    list
                } else {
                    format!("\n{}\n", list)
                }
            }
            "li" => {
                let text = self.inline_text(element, depth);
                if text.is_empty() {
                    text
                } else {
                    format!("- {}", text)
                }
            }
            "blockquote" => self.convert_blockquote(element, depth),
            "pre" => convert_code_block(element),
            "code" => {
                let code: String = element.text().collect();
                if code.is_empty() {
                    code
                } else {
                    format!("`{}`", code)
                }
            }
            "table" => self.convert_table(element, depth),
            "br" => "\n".to_string(),
            "hr" => "\n---\n".to_string(),
            "div" | "section" | "article" | "main" => {
                let content = self.convert_children(element, depth);
                if content.trim().is_empty() {
                    String::new()
                } else {
                    format!("\n{}\n", content)
                }
            }
            "head" | "template" => String::new(),
            _ => self.convert_children(element, depth),
        }
    }

    /// Converted children, trimmed
    fn inline_text(&self, element: ElementRef<'_>, depth: usize) -> String {
        self.convert_children(element, depth).trim().to_string()
    }

    /// Visible text of a subtree, without recursion
    ///
    /// Removed elements are skipped together with their contents.
    fn flatten_text(&self, element: ElementRef<'_>) -> String {
        let mut out = String::new();
        let mut stack: Vec<_> = element.children().collect();
        stack.reverse();

        while let Some(node) = stack.pop() {
            match node.value() {
                Node::Text(text) => out.push_str(&normalize_text(text)),
                Node::Element(el) => {
                    if self.remove_tags.contains(el.name()) || matches!(el.name(), "head" | "template") {
                        continue;
                    }
                    let start = stack.len();
                    stack.extend(node.children());
                    stack[start..].reverse();
                }
                _ => {}
            }
        }
        out
    }

    fn convert_link(&self, element: ElementRef<'_>, depth: usize) -> String {
        let href = element.value().attr("href").unwrap_or("").trim();
        let text = self.inline_text(element, depth);

        match (href.is_empty(), text.is_empty()) {
            (true, _) => text,
            (false, true) => format!("[{}]({})", href, href),
            (false, false) => format!("[{}]({})", text, href),
        }
    }

    fn convert_list(&self, list: ElementRef<'_>, level: usize, depth: usize) -> String {
        if depth >= MAX_DEPTH {
            return single_line(&self.flatten_text(list));
        }

        let ordered = list.value().name() == "ol";
        let indent = "  ".repeat(level);
        let mut lines = Vec::new();
        let mut number = 1;

        for item in list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "li" && !self.is_removed(e))
        {
            let mut text = String::new();
            let mut nested = Vec::new();

            for child in item.children() {
                match child.value() {
                    Node::Text(t) => text.push_str(&normalize_text(t)),
                    Node::Element(_) => {
                        if let Some(child) = ElementRef::wrap(child) {
                            if matches!(child.value().name(), "ul" | "ol") && !self.is_removed(&child) {
                                nested.push(child);
                            } else {
                                text.push_str(&self.convert_element(child, depth + 2));
                            }
                        }
                    }
                    _ => {}
                }
            }

            let text = single_line(&text);
            let marker = if ordered {
                let marker = format!("{}.", number);
                number += 1;
                marker
            } else {
                "-".to_string()
            };

            if !text.is_empty() {
                lines.push(format!("{}{} {}", indent, marker, text));
            }

            for sublist in nested {
                let sub = self.convert_list(sublist, level + 1, depth + 2);
                if !sub.is_empty() {
                    lines.push(sub);
                }
            }
        }

        lines.join("\n")
    }

    fn convert_blockquote(&self, element: ElementRef<'_>, depth: usize) -> String {
        let content = clean_whitespace(&self.convert_children(element, depth));
        if content.is_empty() {
            return content;
        }

        let quoted: Vec<String> = content
            .lines()
            .map(|line| {
                if line.trim().is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect();
        format!("\n{}\n", quoted.join("\n"))
    }

    fn convert_table(&self, table: ElementRef<'_>, depth: usize) -> String {
        let mut header: Option<Vec<String>> = None;
        let mut rows: Vec<Vec<String>> = Vec::new();

        for tr in table
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "tr")
        {
            let cells: Vec<ElementRef<'_>> = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .collect();
            if cells.is_empty() {
                continue;
            }

            let in_thead = tr
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|p| p.value().name() == "thead");
            let texts: Vec<String> = cells.iter().map(|c| self.table_cell(*c, depth + 2)).collect();

            if header.is_none() && (in_thead || cells[0].value().name() == "th") {
                header = Some(texts);
            } else {
                rows.push(texts);
            }
        }

        let header = match header {
            Some(header) => header,
            None if rows.is_empty() => return String::new(),
            None => rows.remove(0),
        };

        let width = header.len();
        let mut out = vec![
            format!("| {} |", header.join(" | ")),
            format!("| {} |", vec!["---"; width].join(" | ")),
        ];
        for mut row in rows {
            row.resize(width, String::new());
            out.push(format!("| {} |", row.join(" | ")));
        }

        format!("\n{}\n", out.join("\n"))
    }

    fn table_cell(&self, cell: ElementRef<'_>, depth: usize) -> String {
        single_line(&self.convert_children(cell, depth)).replace('|', "\\|")
    }
}

fn convert_image(element: ElementRef<'_>) -> String {
    let src = element.value().attr("src").unwrap_or("").trim();
    if src.is_empty() {
        return String::new();
    }
    let alt = element.value().attr("alt").unwrap_or("").trim();
    format!("![{}]({})", alt, src)
}

/// Fenced block for `<pre>`, tagged with the language of its `<code>` if any
fn convert_code_block(pre: ElementRef<'_>) -> String {
    let code = pre
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "code");

    let language = code
        .into_iter()
        .chain(std::iter::once(pre))
        .flat_map(|e| e.value().classes())
        .find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
        })
        .unwrap_or("");

    let text: String = code.unwrap_or(pre).text().collect();
    let text = text.trim_matches('\n').trim_end();

    format!("\n```{}\n{}\n```\n", language, text)
}

fn wrap_block(prefix: &str, text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("\n{}{}\n", prefix, text)
    }
}

fn wrap_inline(marker: &str, text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("{}{}{}", marker, text, marker)
    }
}

/// Collapses whitespace runs in a text node to single spaces
///
/// Leading and trailing whitespace shrink to one space instead of vanishing,
/// so `Hello <b>World</b>` keeps its gap.
fn normalize_text(text: &str) -> String {
    if text.trim().is_empty() {
        return if text.is_empty() { String::new() } else { " ".to_string() };
    }

    let mut out = String::with_capacity(text.len());
    if text.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&text.split_whitespace().collect::<Vec<_>>().join(" "));
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out
}

/// Joins the non-blank lines of `text` with spaces
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strips trailing spaces from every line, keeps at most one blank line in a
/// row and trims the result
fn clean_whitespace(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && lines.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(html: &str) -> String {
        HtmlConverter::new().convert(html)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(convert(""), "");
        assert_eq!(convert("   \n "), "");
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let md = convert("<h1>Title</h1><p>Hello <strong>World</strong></p><h3>Sub</h3>");
        assert_eq!(md, "# Title\n\nHello **World**\n\n### Sub");
    }

    #[test]
    fn test_inline_markup() {
        let md = convert(r#"<p><em>soft</em> and <b>loud</b> and <a href="https://example.com/x">a link</a></p>"#);
        assert_eq!(md, "*soft* and **loud** and [a link](https://example.com/x)");
    }

    #[test]
    fn test_link_without_text_or_href() {
        assert_eq!(convert(r#"<p><a href="/x"></a></p>"#), "[/x](/x)");
        assert_eq!(convert("<p><a>plain</a></p>"), "plain");
    }

    #[test]
    fn test_image() {
        assert_eq!(
            convert(r#"<p><img src="/a.png" alt="diagram"></p>"#),
            "![diagram](/a.png)"
        );
    }

    #[test]
    fn test_noise_removed() {
        let html = r#"<html><head><style>body{}</style></head><body>
            <nav>Menu item</nav>
            <header>Site banner</header>
            <p>Body text</p>
            <script>var secret = 1;</script>
            <footer>Copyright</footer>
            <!-- a comment -->
        </body></html>"#;
        let md = convert(html);
        assert_eq!(md, "Body text");
    }

    #[test]
    fn test_custom_remove_tags() {
        let converter = HtmlConverter::with_remove_tags(["aside"]);
        let md = converter.convert("<nav>Menu</nav><aside>Ad</aside><p>Text</p>");
        assert!(md.contains("Menu"));
        assert!(!md.contains("Ad"));
    }

    #[test]
    fn test_lists() {
        let html = "<ul><li>One</li><li>Two<ul><li>Nested</li></ul></li></ul><ol><li>First</li><li>Second</li></ol>";
        let md = convert(html);
        assert_eq!(md, "- One\n- Two\n  - Nested\n\n1. First\n2. Second");
    }

    #[test]
    fn test_code_block_language() {
        let html = r#"<pre><code class="language-rust">fn main() {}
</code></pre>"#;
        assert_eq!(convert(html), "```rust\nfn main() {}\n```");

        let lang = r#"<pre><code class="lang-python">print(1)</code></pre>"#;
        assert!(convert(lang).starts_with("```python\n"));

        let plain = "<pre>raw text</pre>";
        assert_eq!(convert(plain), "```\nraw text\n```");
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(convert("<p>Run <code>cargo test</code> now</p>"), "Run `cargo test` now");
    }

    #[test]
    fn test_table_with_thead() {
        let html = "<table><thead><tr><th>Name</th><th>Value</th></tr></thead>\
                    <tbody><tr><td>a</td><td>1</td></tr><tr><td>b</td></tr></tbody></table>";
        assert_eq!(
            convert(html),
            "| Name | Value |\n| --- | --- |\n| a | 1 |\n| b |  |"
        );
    }

    #[test]
    fn test_table_without_header_uses_first_row() {
        let html = "<table><tr><td>x</td><td>y</td></tr><tr><td>1</td><td>2</td></tr></table>";
        assert_eq!(convert(html), "| x | y |\n| --- | --- |\n| 1 | 2 |");
    }

    #[test]
    fn test_blockquote_br_hr() {
        let md = convert("<blockquote><p>Quoted</p></blockquote><p>a<br>b</p><hr>");
        assert_eq!(md, "> Quoted\n\na\nb\n\n---");
    }

    #[test]
    fn test_malformed_html_keeps_text() {
        let md = convert("<div><p>Unclosed <b>bold <i>text</div><p>Next");
        assert!(md.contains("Unclosed"));
        assert!(md.contains("bold"));
        assert!(md.contains("Next"));
    }

    /// Runs `f` on a thread with the stack size of a tokio worker
    fn on_small_stack<F: FnOnce() -> String + Send + 'static>(f: F) -> String {
        std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn test_deeply_nested_divs_keep_text() {
        let md = on_small_stack(|| {
            let html = format!("<p>top</p>{}deep text<script>hidden()</script>", "<div>".repeat(20_000));
            HtmlConverter::new().convert(&html)
        });
        assert!(md.contains("top"));
        assert!(md.contains("deep text"));
        assert!(!md.contains("hidden"));
    }

    #[test]
    fn test_deeply_nested_lists_keep_text() {
        let md = on_small_stack(|| {
            let html = format!("{}innermost item", "<ul><li>level ".repeat(5_000));
            HtmlConverter::new().convert(&html)
        });
        assert!(md.starts_with("- level"));
        assert!(md.contains("innermost item"));
    }

    #[test]
    fn test_flatten_text_skips_removed_elements() {
        let document = Html::parse_document("<div>a <nav>menu</nav><span>b</span></div>");
        let div = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "div")
            .unwrap();
        assert_eq!(HtmlConverter::new().flatten_text(div), "a b");
    }

    #[test]
    fn test_whitespace_collapsed() {
        let md = convert("<div>\n\n\n<p>a   b</p>\n\n\n\n<p>c</p>   \n</div>");
        assert_eq!(md, "a b\n\nc");
    }

    #[test]
    fn test_convert_page_title() {
        let page = HtmlConverter::new().convert_page(
            "<html><head><title>Intro</title></head><body><h1>Intro</h1></body></html>",
            "https://example.com/docs/intro",
        );
        assert_eq!(page.title, "Intro");
        assert_eq!(page.content, "# Intro");
    }
}
