// File: src/markdown.rs
//! Converts rendered document markup into Markdown.
//!
//! A few wrapper constructs are stripped with regular expressions first
//! (comments, `<div>` tags, figure captions, figure wrappers). The rest is
//! parsed into a small element tree and rendered block by block. Text outside
//! any element passes through verbatim, so converting already-converted text
//! returns it unchanged.
use regex::{Captures, Regex};
use std::sync::LazyLock;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static DIV_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<div[^>]*>|</div\s*>").unwrap());
static FIGCAPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<figcaption[^>]*>.*?</figcaption\s*>").unwrap());
static FIGURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<figure[^>]*>(.*?)</figure\s*>").unwrap());
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).unwrap()
});
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\n]+").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "div", "dl", "figure", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "html", "li", "main", "nav", "ol",
    "p", "pre", "section", "table", "ul",
];

/// Converts `html` to Markdown. Deterministic and free of side effects.
pub fn to_portable_markup(html: &str) -> String {
    let cleaned = strip_wrappers(html);
    let nodes = parse(&cleaned);
    let body = render_blocks(&nodes, false).join("\n\n");
    let body = BLANK_RUNS.replace_all(&body, "\n\n");
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!("{}\n", body)
    }
}

/// Removes comments, `<div>` tags and figure captions, and unwraps figures
/// into paragraphs.
pub fn strip_wrappers(html: &str) -> String {
    let text = COMMENT.replace_all(html, "");
    let text = DIV_TAG.replace_all(&text, "");
    let text = FIGCAPTION.replace_all(&text, "");
    FIGURE.replace_all(&text, "<p>$1</p>").into_owned()
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn new(name: &str, attrs: Vec<(String, String)>) -> Self {
        Self {
            name: name.to_string(),
            attrs,
            children: Vec::new(),
        }
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

enum Tag {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
    Skip,
}

fn is_block(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

fn parse(html: &str) -> Vec<Node> {
    let mut stack = vec![Element::new("", Vec::new())];
    let mut pos = 0;

    while pos < html.len() {
        let rest = &html[pos..];
        match rest.find('<') {
            None => {
                push_text(&mut stack, rest);
                break;
            }
            Some(0) => {}
            Some(i) => {
                push_text(&mut stack, &rest[..i]);
                pos += i;
                continue;
            }
        }

        let Some((tag, len)) = parse_tag(rest) else {
            push_text(&mut stack, "<");
            pos += 1;
            continue;
        };
        pos += len;

        match tag {
            Tag::Skip => {}
            Tag::Close(name) => {
                if let Some(idx) = stack.iter().rposition(|e| e.name == name)
                    && idx > 0
                {
                    while stack.len() > idx {
                        close_top(&mut stack);
                    }
                }
            }
            Tag::Open {
                name,
                attrs,
                self_closing,
            } => {
                if name == "script" || name == "style" {
                    // Raw text elements: skip to the end of the closing tag.
                    if !self_closing {
                        let lower = html[pos..].to_ascii_lowercase();
                        pos = match lower.find(&format!("</{}", name)) {
                            Some(i) => match html[pos + i..].find('>') {
                                Some(j) => pos + i + j + 1,
                                None => html.len(),
                            },
                            None => html.len(),
                        };
                    }
                    continue;
                }

                let top = stack.last().map(|e| e.name.as_str()).unwrap_or("");
                if (top == name && matches!(name.as_str(), "p" | "li" | "tr" | "td" | "th"))
                    || (top == "p" && is_block(&name))
                {
                    close_top(&mut stack);
                }

                let element = Element::new(&name, attrs);
                if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Element(element));
                    }
                } else {
                    stack.push(element);
                }
            }
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn push_text(stack: &mut [Element], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        if let Some(Node::Text(prev)) = parent.children.last_mut() {
            prev.push_str(text);
        } else {
            parent.children.push(Node::Text(text.to_string()));
        }
    }
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(element) = stack.pop()
        && let Some(parent) = stack.last_mut()
    {
        parent.children.push(Node::Element(element));
    }
}

/// Parses the tag at the start of `rest`. Returns `None` when the `<` does not
/// open a tag and should be kept as text.
fn parse_tag(rest: &str) -> Option<(Tag, usize)> {
    if rest.starts_with("<!--") {
        let len = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
        return Some((Tag::Skip, len));
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
        let len = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
        return Some((Tag::Skip, len));
    }

    if let Some(after) = rest.strip_prefix("</") {
        let name_len = tag_name_len(after);
        if name_len == 0 {
            return None;
        }
        let gt = after.find('>')?;
        let name = after[..name_len].to_ascii_lowercase();
        return Some((Tag::Close(name), 2 + gt + 1));
    }

    let after = &rest[1..];
    let name_len = tag_name_len(after);
    if name_len == 0 {
        return None;
    }

    let mut quote = None;
    let mut gt = None;
    for (i, c) in after[name_len..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => {
                gt = Some(name_len + i);
                break;
            }
            _ => {}
        }
    }
    let gt = gt?;

    let raw_attrs = after[name_len..gt].trim();
    let self_closing = raw_attrs.ends_with('/');
    let attrs = ATTRIBUTE
        .captures_iter(raw_attrs.trim_end_matches('/'))
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (c[1].to_ascii_lowercase(), value)
        })
        .collect();

    Some((
        Tag::Open {
            name: after[..name_len].to_ascii_lowercase(),
            attrs,
            self_closing,
        },
        1 + gt + 1,
    ))
}

fn tag_name_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-'))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Decodes character references. `<` and `>` stay encoded so the output
/// never gains markup it did not have.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(num) = body.strip_prefix('#') {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some('<') => "&lt;".to_string(),
                Some('>') => "&gt;".to_string(),
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "hellip" => '\u{2026}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        _ => return None,
    })
}

fn render_blocks(nodes: &[Node], collapse: bool) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut inline = String::new();
    for node in nodes {
        match node {
            Node::Element(el) if is_block(&el.name) => {
                flush(&mut inline, &mut blocks);
                blocks.extend(render_block(el));
            }
            other => inline.push_str(&render_inline_node(other, collapse)),
        }
    }
    flush(&mut inline, &mut blocks);
    blocks
}

fn flush(inline: &mut String, blocks: &mut Vec<String>) {
    let text = inline.trim();
    if !text.is_empty() {
        blocks.push(text.to_string());
    }
    inline.clear();
}

fn render_block(el: &Element) -> Vec<String> {
    match el.name.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = el.name[1..].parse::<usize>().unwrap_or(1);
            let text = render_inline(&el.children, true);
            let text = text.trim();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![format!("{} {}", "#".repeat(level), text)]
            }
        }
        "hr" => vec!["---".to_string()],
        "pre" => render_pre(el),
        "blockquote" => {
            let inner = render_blocks(&el.children, true).join("\n\n");
            if inner.is_empty() {
                return Vec::new();
            }
            let quoted: Vec<String> = inner
                .lines()
                .map(|l| {
                    if l.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", l)
                    }
                })
                .collect();
            vec![quoted.join("\n")]
        }
        "ul" | "ol" => render_list(el),
        "table" => render_table(el),
        _ => render_blocks(&el.children, true),
    }
}

fn render_inline(nodes: &[Node], collapse: bool) -> String {
    nodes
        .iter()
        .map(|n| render_inline_node(n, collapse))
        .collect()
}

fn render_inline_node(node: &Node, collapse: bool) -> String {
    let el = match node {
        Node::Text(text) => {
            let text = decode_entities(text);
            return if collapse {
                WHITESPACE.replace_all(&text, " ").into_owned()
            } else {
                text
            };
        }
        Node::Element(el) => el,
    };

    match el.name.as_str() {
        "strong" | "b" => wrap(&render_inline(&el.children, true), "**"),
        "em" | "i" => wrap(&render_inline(&el.children, true), "*"),
        "del" | "s" | "strike" => wrap(&render_inline(&el.children, true), "~~"),
        "code" => code_span(&text_content(&el.children)),
        "br" => "  \n".to_string(),
        "img" => {
            let alt = el.attr("alt").unwrap_or("");
            let src = el.attr("src").unwrap_or("");
            match el.attr("title") {
                Some(title) => format!("![{}]({} \"{}\")", alt, src, title),
                None => format!("![{}]({})", alt, src),
            }
        }
        "a" => {
            let text = render_inline(&el.children, true);
            match el.attr("href") {
                Some(href) if !href.is_empty() => match el.attr("title") {
                    Some(title) => format!("[{}]({} \"{}\")", text.trim(), href, title),
                    None => format!("[{}]({})", text.trim(), href),
                },
                _ => text,
            }
        }
        "script" | "style" => String::new(),
        _ => render_inline(&el.children, true),
    }
}

/// Wraps the non-blank part of `inner` in `marker`, keeping outer spacing.
fn wrap(inner: &str, marker: &str) -> String {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return inner.to_string();
    }
    let lead = &inner[..inner.len() - inner.trim_start().len()];
    let trail = &inner[inner.trim_end().len()..];
    format!("{}{}{}{}{}", lead, marker, trimmed, marker, trail)
}

fn code_span(code: &str) -> String {
    if code.contains('`') {
        format!("`` {} ``", code)
    } else {
        format!("`{}`", code)
    }
}

fn text_content(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(&decode_entities(t)),
            Node::Element(el) if el.name == "br" => out.push('\n'),
            Node::Element(el) => out.push_str(&text_content(&el.children)),
        }
    }
    out
}

fn render_pre(el: &Element) -> Vec<String> {
    let language = el
        .children
        .iter()
        .find_map(|n| match n {
            Node::Element(code) if code.name == "code" => code.attr("class"),
            _ => None,
        })
        .and_then(|class| {
            class
                .split_whitespace()
                .find_map(|c| c.strip_prefix("language-"))
        })
        .unwrap_or("");
    let body = text_content(&el.children);
    vec![format!("```{}\n{}\n```", language, body.trim_matches('\n'))]
}

fn render_list(el: &Element) -> Vec<String> {
    let ordered = el.name == "ol";
    let mut number: u64 = el
        .attr("start")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1);

    let mut lines = Vec::new();
    for child in &el.children {
        let Node::Element(item) = child else {
            continue;
        };
        if item.name != "li" {
            continue;
        }
        let marker = if ordered {
            let m = format!("{}. ", number);
            number += 1;
            m
        } else {
            "- ".to_string()
        };
        let indent = " ".repeat(marker.len());
        let body = render_blocks(&item.children, true).join("\n");

        let mut item_lines = body.lines();
        match item_lines.next() {
            Some(first) => lines.push(format!("{}{}", marker, first)),
            None => lines.push(marker.trim_end().to_string()),
        }
        for line in item_lines {
            if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{}{}", indent, line));
            }
        }
    }

    if lines.is_empty() {
        Vec::new()
    } else {
        vec![lines.join("\n")]
    }
}

fn render_table(el: &Element) -> Vec<String> {
    let mut rows = Vec::new();
    collect_rows(&el.children, &mut rows);
    let Some(header) = rows.first() else {
        return Vec::new();
    };
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);

    let format_row = |cells: &[String]| {
        let mut cells = cells.to_vec();
        cells.resize(columns, String::new());
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = vec![
        format_row(header),
        format!("| {} |", vec!["---"; columns].join(" | ")),
    ];
    lines.extend(rows[1..].iter().map(|r| format_row(r)));
    vec![lines.join("\n")]
}

fn collect_rows(nodes: &[Node], rows: &mut Vec<Vec<String>>) {
    for node in nodes {
        let Node::Element(el) = node else {
            continue;
        };
        match el.name.as_str() {
            "tr" => rows.push(
                el.children
                    .iter()
                    .filter_map(|c| match c {
                        Node::Element(cell) if cell.name == "td" || cell.name == "th" => Some(
                            render_inline(&cell.children, true)
                                .trim()
                                .replace('|', "\\|"),
                        ),
                        _ => None,
                    })
                    .collect(),
            ),
            "thead" | "tbody" | "tfoot" => collect_rows(&el.children, rows),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers_are_stripped_before_parsing() {
        let out = strip_wrappers(
            "<!-- wp:image --><div class=\"x\"><figure class=\"wp-block-image\"><img src=\"a.png\"/><figcaption>A\ncaption</figcaption></figure></div>",
        );
        assert_eq!(out, "<p><img src=\"a.png\"/></p>");
    }

    #[test]
    fn entities_decode_except_angle_brackets() {
        assert_eq!(decode_entities("a &amp; b &#8211; &lt;c&gt;"), "a & b \u{2013} &lt;c&gt;");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn unclosed_paragraphs_are_closed_by_the_next_block() {
        let nodes = parse("<p>one<p>two<ul><li>x</ul>");
        let names: Vec<&str> = nodes
            .iter()
            .filter_map(|n| match n {
                Node::Element(e) => Some(e.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["p", "p", "ul"]);
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        assert_eq!(to_portable_markup("a < b"), "a < b\n");
    }
}
