//! Flattening page markup into wrapped display lines.
//!
//! Pages arrive as pre-rendered HTML or as plain text. This module does not
//! sanitize or validate markup; it only recognises enough structure to lay
//! text out on a sheet and to find embedded images.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Structural kind of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Quote,
    Code,
    Image { src: String, alt: String },
    Rule,
}

/// A block of text with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

/// Kind of a display line, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Quote,
    Code,
    Image,
    Rule,
    Blank,
}

/// One wrapped line of a sheet's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub text: String,
    pub kind: LineKind,
    /// Image URL when the line stands for an embedded image.
    pub image: Option<String>,
}

impl DisplayLine {
    fn new(text: String, kind: LineKind) -> Self {
        Self {
            text,
            kind,
            image: None,
        }
    }

    fn blank() -> Self {
        Self::new(String::new(), LineKind::Blank)
    }
}

/// Whether `source` contains at least one tag.
pub fn looks_like_html(source: &str) -> bool {
    let bytes = source.as_bytes();
    bytes.windows(2).any(|pair| {
        pair[0] == b'<' && (pair[1].is_ascii_alphabetic() || pair[1] == b'/')
    }) && source.contains('>')
}

/// Split a page source into blocks.
pub fn parse_blocks(source: &str) -> Vec<Block> {
    if looks_like_html(source) {
        HtmlFlattener::default().run(source)
    } else {
        plain_blocks(source)
    }
}

/// Image URLs in source order.
pub fn image_sources(source: &str) -> Vec<String> {
    parse_blocks(source)
        .into_iter()
        .filter_map(|block| match block.kind {
            BlockKind::Image { src, .. } => Some(src),
            _ => None,
        })
        .collect()
}

/// Parse and wrap a page source to `width` columns.
pub fn layout_source(source: &str, width: usize) -> Vec<DisplayLine> {
    layout_lines(&parse_blocks(source), width)
}

/// Wrap blocks to `width` columns with a blank line between blocks.
pub fn layout_lines(blocks: &[Block], width: usize) -> Vec<DisplayLine> {
    let width = width.max(4);
    let mut lines = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            lines.push(DisplayLine::blank());
        }
        match &block.kind {
            BlockKind::Image { src, alt } => {
                let label = if alt.trim().is_empty() { src } else { alt };
                let text = truncate_to_width(&format!("[image: {label}]"), width);
                lines.push(DisplayLine {
                    text,
                    kind: LineKind::Image,
                    image: Some(src.clone()),
                });
            }
            BlockKind::Rule => {
                lines.push(DisplayLine::new("─".repeat(width), LineKind::Rule));
            }
            BlockKind::Code => {
                for segment in block.text.split('\n') {
                    for chunk in hard_wrap(segment, width) {
                        lines.push(DisplayLine::new(chunk, LineKind::Code));
                    }
                }
            }
            kind => {
                let (line_kind, first_prefix, rest_prefix) = match kind {
                    BlockKind::Heading(level) => (LineKind::Heading(*level), "", ""),
                    BlockKind::ListItem => (LineKind::ListItem, "• ", "  "),
                    BlockKind::Quote => (LineKind::Quote, "│ ", "│ "),
                    _ => (LineKind::Paragraph, "", ""),
                };
                let inner = width.saturating_sub(first_prefix.width()).max(1);
                let mut first = true;
                for segment in block.text.split('\n') {
                    for chunk in word_wrap(segment, inner) {
                        let prefix = if first { first_prefix } else { rest_prefix };
                        first = false;
                        lines.push(DisplayLine::new(format!("{prefix}{chunk}"), line_kind));
                    }
                }
            }
        }
    }
    lines
}

fn plain_blocks(source: &str) -> Vec<Block> {
    let normalized = source.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(|para| para.trim_matches('\n'))
        .filter(|para| !para.trim().is_empty())
        .map(|para| Block {
            kind: BlockKind::Paragraph,
            text: para.to_string(),
        })
        .collect()
}

#[derive(Default)]
struct HtmlFlattener {
    blocks: Vec<Block>,
    kind: Option<BlockKind>,
    text: String,
    preformatted: bool,
}

impl HtmlFlattener {
    fn run(mut self, source: &str) -> Vec<Block> {
        let source = escape_bare_ampersands(source);
        let mut reader = Reader::from_reader(source.as_bytes());
        let config = reader.config_mut();
        config.trim_text(false);
        // Pages are HTML fragments: void tags never close.
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut buf = Vec::new();
        let mut skip_depth = 0usize;
        loop {
            let event = match reader.read_event_into(&mut buf) {
                Ok(Event::Eof) => break,
                Ok(event) => event,
                Err(err) => {
                    debug!(position = reader.buffer_position(), %err, "markup tokenizer stopped");
                    break;
                }
            };
            match event {
                Event::Start(start) => {
                    let name = local_name(&reader, start.name().as_ref());
                    if is_skipped(&name) {
                        skip_depth += 1;
                    } else if skip_depth == 0 {
                        self.open(&reader, &name, &start);
                    }
                }
                Event::Empty(start) => {
                    let name = local_name(&reader, start.name().as_ref());
                    if skip_depth == 0 && !is_skipped(&name) {
                        self.open(&reader, &name, &start);
                        self.close(&name);
                    }
                }
                Event::End(end) => {
                    let name = local_name(&reader, end.name().as_ref());
                    if is_skipped(&name) {
                        skip_depth = skip_depth.saturating_sub(1);
                    } else if skip_depth == 0 {
                        self.close(&name);
                    }
                }
                Event::Text(text) if skip_depth == 0 => {
                    if let Ok(text) = text.decode() {
                        self.push_text(&text);
                    }
                }
                Event::CData(data) if skip_depth == 0 => {
                    if let Ok(text) = reader.decoder().decode(&data) {
                        self.push_text(&text);
                    }
                }
                Event::GeneralRef(entity) if skip_depth == 0 => {
                    if let Ok(name) = entity.decode() {
                        let raw = format!("&{name};");
                        self.push_text(&unescape_lossy(&raw));
                    }
                }
                _ => {}
            }
            buf.clear();
        }
        self.flush();
        self.blocks
    }

    fn open(&mut self, reader: &Reader<&[u8]>, name: &str, start: &BytesStart<'_>) {
        match name {
            "br" => self.text.push('\n'),
            "hr" => {
                self.flush();
                self.blocks.push(Block {
                    kind: BlockKind::Rule,
                    text: String::new(),
                });
            }
            "img" => {
                self.flush();
                if let Some(image) = image_block(reader, start) {
                    self.blocks.push(image);
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = name[1..].parse().unwrap_or(1);
                self.kind = Some(BlockKind::Heading(level));
            }
            "li" => {
                self.flush();
                self.kind = Some(BlockKind::ListItem);
            }
            "blockquote" => {
                self.flush();
                self.kind = Some(BlockKind::Quote);
            }
            "pre" => {
                self.flush();
                self.preformatted = true;
                self.kind = Some(BlockKind::Code);
            }
            _ => self.boundary(name),
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "blockquote" => self.flush(),
            "pre" => {
                self.flush();
                self.preformatted = false;
            }
            "td" | "th" => self.text.push(' '),
            _ => self.boundary(name),
        }
    }

    /// Block containers end the current block; a quote carries over.
    fn boundary(&mut self, name: &str) {
        if !matches!(
            name,
            "p" | "div"
                | "section"
                | "article"
                | "header"
                | "footer"
                | "figure"
                | "figcaption"
                | "ul"
                | "ol"
                | "table"
                | "tr"
                | "dl"
                | "dt"
                | "dd"
        ) {
            return;
        }
        let in_quote = self.kind == Some(BlockKind::Quote);
        self.flush();
        if in_quote {
            self.kind = Some(BlockKind::Quote);
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.preformatted {
            self.text.push_str(text);
            return;
        }
        for ch in text.chars() {
            if ch.is_whitespace() && ch != '\u{a0}' {
                if !self.text.is_empty() && !self.text.ends_with([' ', '\n']) {
                    self.text.push(' ');
                }
            } else {
                self.text.push(if ch == '\u{a0}' { ' ' } else { ch });
            }
        }
    }

    fn flush(&mut self) {
        let kind = self.kind.take().unwrap_or(BlockKind::Paragraph);
        let text = std::mem::take(&mut self.text);
        let text = if kind == BlockKind::Code {
            text.trim_matches('\n').to_string()
        } else {
            text.split('\n')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        };
        if !text.is_empty() {
            self.blocks.push(Block { kind, text });
        }
    }
}

fn is_skipped(name: &str) -> bool {
    matches!(name, "script" | "style")
}

/// Lowercased tag name without its namespace prefix.
fn local_name(reader: &Reader<&[u8]>, raw: &[u8]) -> String {
    let decoded = reader.decoder().decode(raw).unwrap_or_default();
    decoded
        .rsplit(':')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn image_block(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Option<Block> {
    let mut src = None;
    let mut alt = String::new();
    for attr in start.html_attributes().flatten() {
        let Ok(key) = reader.decoder().decode(attr.key.as_ref()) else {
            continue;
        };
        let Ok(value) = reader.decoder().decode(&attr.value) else {
            continue;
        };
        let value = unescape_lossy(&value).into_owned();
        match key.to_ascii_lowercase().as_str() {
            "src" => src = Some(value),
            "alt" => alt = value,
            _ => {}
        }
    }
    let src = src.filter(|src| !src.is_empty())?;
    Some(Block {
        kind: BlockKind::Image { src, alt },
        text: String::new(),
    })
}

/// The XML entities plus the HTML ones that show up in book pages.
fn resolve_entity(name: &str) -> Option<&'static str> {
    let resolved = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "mdash" => "—",
        "ndash" => "–",
        "hellip" => "…",
        _ => return None,
    };
    Some(resolved)
}

/// Unknown references are kept as written.
fn unescape_lossy(raw: &str) -> Cow<'_, str> {
    unescape_with(raw, resolve_entity).unwrap_or(Cow::Borrowed(raw))
}

/// HTML tolerates a lone `&`; the tokenizer does not.
fn escape_bare_ampersands(source: &str) -> Cow<'_, str> {
    let is_reference = |at: usize| {
        let tail = &source[at + 1..];
        let name_len = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '#'))
            .unwrap_or(tail.len());
        name_len > 0 && tail[name_len..].starts_with(';')
    };
    if source.match_indices('&').all(|(at, _)| is_reference(at)) {
        return Cow::Borrowed(source);
    }
    let mut out = String::with_capacity(source.len() + 16);
    let mut last = 0;
    for (at, _) in source.match_indices('&') {
        out.push_str(&source[last..=at]);
        if !is_reference(at) {
            out.push_str("amp;");
        }
        last = at + 1;
    }
    out.push_str(&source[last..]);
    Cow::Owned(out)
}

fn word_wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    for word in text.split_whitespace() {
        let word_width = word.width();
        if word_width > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut pieces = hard_wrap(word, width);
            let last = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
            current_width = last.width();
            current = last;
            continue;
        }
        let needed = if current.is_empty() {
            word_width
        } else {
            current_width + 1 + word_width
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(word);
        current_width += word_width;
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn hard_wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if current_width + w > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }
        current.push(ch);
        current_width += w;
    }
    lines.push(current);
    lines
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_splits_paragraphs() {
        let blocks = parse_blocks("First para\nsame para\n\nSecond");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "First para\nsame para");
        assert_eq!(blocks[1].kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_html_headings_and_paragraphs() {
        let blocks = parse_blocks("<h2>Title</h2><p>Hello   <b>bold</b>\n world</p>");
        assert_eq!(
            blocks,
            vec![
                Block {
                    kind: BlockKind::Heading(2),
                    text: "Title".to_string()
                },
                Block {
                    kind: BlockKind::Paragraph,
                    text: "Hello bold world".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_html_list_items() {
        let blocks = parse_blocks("<ul><li>one</li><li>two</li></ul>");
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.kind == BlockKind::ListItem));
    }

    #[test]
    fn test_img_attributes_extracted() {
        let srcs = image_sources(r#"<p>x</p><img alt='A cell' src="img/cell.png"><img src=plain.jpg>"#);
        assert_eq!(srcs, vec!["img/cell.png".to_string(), "plain.jpg".to_string()]);
        let blocks = parse_blocks(r#"<img alt='A cell' src="img/cell.png">"#);
        assert_eq!(
            blocks[0].kind,
            BlockKind::Image {
                src: "img/cell.png".to_string(),
                alt: "A cell".to_string()
            }
        );
    }

    #[test]
    fn test_data_src_is_not_src() {
        assert!(image_sources(r#"<img data-src="a.png">"#).is_empty());
    }

    #[test]
    fn test_entities_decoded() {
        let blocks = parse_blocks("<p>a &amp; b &lt;c&gt; &#65;&#x42; &bogus</p>");
        assert_eq!(blocks[0].text, "a & b <c> AB &bogus");
    }

    #[test]
    fn test_quoted_angle_bracket_stays_inside_attribute() {
        assert_eq!(
            image_sources(r#"<img alt="a > b" src="cell.png">"#),
            vec!["cell.png".to_string()]
        );
        let blocks = parse_blocks(r#"<p>before</p><img alt="a > b" src="cell.png"><p>after</p>"#);
        assert_eq!(
            blocks[1].kind,
            BlockKind::Image {
                src: "cell.png".to_string(),
                alt: "a > b".to_string()
            }
        );
        assert_eq!(blocks[2].text, "after");
    }

    #[test]
    fn test_bare_ampersands_and_html_entities() {
        let blocks = parse_blocks("<p>salt & pepper&nbsp;&mdash; R&D</p>");
        assert_eq!(blocks[0].text, "salt & pepper — R&D");
        let srcs = image_sources(r#"<img src="plot.png?w=1&amp;h=2"><img src="a.png?x=1&y=2">"#);
        assert_eq!(srcs, vec!["plot.png?w=1&h=2", "a.png?x=1&y=2"]);
    }

    #[test]
    fn test_self_closing_and_uppercase_tags() {
        let blocks = parse_blocks("<P>one<BR/>two</P><hr/><H3>Three</H3>");
        assert_eq!(blocks[0].text, "one\ntwo");
        assert_eq!(blocks[1].kind, BlockKind::Rule);
        assert_eq!(blocks[2].kind, BlockKind::Heading(3));
    }

    #[test]
    fn test_script_content_skipped() {
        let blocks = parse_blocks("<p>keep</p><script>var x = '<p>';</script><p>also</p>");
        let texts: Vec<_> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["keep", "also"]);
    }

    #[test]
    fn test_pre_keeps_whitespace() {
        let blocks = parse_blocks("<pre>  a\n    b</pre>");
        assert_eq!(blocks[0].kind, BlockKind::Code);
        assert_eq!(blocks[0].text, "  a\n    b");
    }

    #[test]
    fn test_layout_wraps_and_separates_blocks() {
        let lines = layout_source("<p>one two three four</p><p>five</p>", 9);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one two", "three", "four", "", "five"]);
    }

    #[test]
    fn test_layout_image_line_carries_src() {
        let lines = layout_source(r#"<img src="a.png" alt="Diagram">"#, 40);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].kind, LineKind::Image);
        assert_eq!(lines[0].image.as_deref(), Some("a.png"));
        assert_eq!(lines[0].text, "[image: Diagram]");
    }

    #[test]
    fn test_long_word_is_hard_wrapped() {
        let lines = word_wrap("abcdefghij xy", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_list_prefix_applied_once() {
        let lines = layout_source("<li>alpha beta gamma</li>", 10);
        assert!(lines[0].text.starts_with("• "));
        assert!(lines[1].text.starts_with("  "));
    }

    #[test]
    fn test_wide_chars_respect_width() {
        let lines = word_wrap("漢字漢字漢字", 4);
        assert!(lines.iter().all(|l| l.width() <= 4));
    }

    #[test]
    fn test_empty_source_has_no_lines() {
        assert!(layout_source("", 20).is_empty());
        assert!(layout_source("<p> </p>", 20).is_empty());
    }
}
