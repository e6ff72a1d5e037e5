/// 可读正文提取
///
/// 在页面快照上重新解析出一棵独立的文档树（不会改动原始页面），
/// 用简化的 readability 打分找出正文容器，再经过白名单清洗得到纯文本。
/// 找不到正文时返回 None，而不是错误。

use log::{debug, warn};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;

use super::{now_ms, CapturedPage, PageSnapshot};

/// 直接跳过的标签
const UNLIKELY_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form",
    "iframe", "svg", "button", "template", "select", "dialog",
];

/// class/id 中出现时判定为非正文
const UNLIKELY_MARKERS: &[&str] = &[
    "ad-", "-ad", "advert", "banner", "breadcrumb", "comment", "cookie", "disqus",
    "footer", "menu", "navbar", "popup", "promo", "related", "share", "sidebar",
    "social", "sponsor",
];

/// class/id 中出现时即使命中上面的标记也保留
const CANDIDATE_MARKERS: &[&str] = &["article", "body", "content", "main", "post", "story"];

const UNLIKELY_ROLES: &[&str] = &["navigation", "complementary", "banner", "contentinfo", "menu"];

/// 作为段落统计的标签
const PARAGRAPH_TAGS: &[&str] = &["p", "pre", "blockquote", "li", "h2", "h3", "h4"];

/// 块级标签（不含块级子元素的 div 视为一个段落）
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "figure", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

const CANDIDATE_SELECTOR: &str = "article, main, [role=main], section, div, body";

/// 段落文本与其中链接文本的字符数
struct Paragraph {
    text: String,
    chars: usize,
    link_chars: usize,
}

impl Paragraph {
    /// 链接文字占一半以上的段落（导航列表等）不计入正文
    fn is_link_heavy(&self) -> bool {
        self.link_chars * 2 > self.chars
    }
}

/// 正文提取器
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    min_content_chars: usize,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(25)
    }
}

impl ContentExtractor {
    pub fn new(min_content_chars: usize) -> Self {
        Self { min_content_chars }
    }

    /// 从快照中提取页面内容
    pub fn extract(&self, snapshot: &PageSnapshot) -> Option<CapturedPage> {
        let document = Html::parse_document(&snapshot.html);

        let title = extract_title(&document).unwrap_or_default();
        let text = match self.article_text(&document) {
            Some(text) => text,
            None => {
                debug!("No readable article found at {}", snapshot.url);
                return None;
            }
        };

        let content = sanitize(&text);
        if content.trim().chars().count() < self.min_content_chars {
            debug!("Content at {} is empty after sanitizing", snapshot.url);
            return None;
        }

        Some(CapturedPage {
            title,
            content,
            url: snapshot.url.clone(),
            timestamp: now_ms(),
        })
    }

    /// 找出得分最高的正文容器并拼接其段落
    fn article_text(&self, document: &Html) -> Option<String> {
        let selector = match Selector::parse(CANDIDATE_SELECTOR) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Invalid candidate selector: {:?}", e);
                return None;
            }
        };

        let mut best: Option<(f64, Vec<Paragraph>)> = None;

        for candidate in document.select(&selector) {
            if is_unlikely(&candidate) || has_unlikely_ancestor(&candidate) {
                continue;
            }

            let mut paragraphs = Vec::new();
            collect_paragraphs(candidate, &mut paragraphs);
            paragraphs.retain(|p| !p.is_link_heavy());

            let score = score_candidate(&candidate, &paragraphs);
            if score <= 0.0 {
                continue;
            }

            // 同分时保留文档中更靠前的容器
            if best.as_ref().map_or(true, |(top, _)| score > *top) {
                best = Some((score, paragraphs));
            }
        }

        let text = match best {
            Some((_, paragraphs)) => paragraphs
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("\n\n"),
            None => body_text(document)?,
        };

        if text.chars().count() < self.min_content_chars {
            return None;
        }

        Some(text)
    }
}

/// 标题：og:title → <title> → 第一个 <h1>
fn extract_title(document: &Html) -> Option<String> {
    if let Ok(selector) = Selector::parse(r#"meta[property="og:title"]"#) {
        let og = document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(normalize_whitespace)
            .find(|t| !t.is_empty());
        if og.is_some() {
            return og;
        }
    }

    for query in ["title", "h1"] {
        if let Ok(selector) = Selector::parse(query) {
            let found = document
                .select(&selector)
                .map(|el| normalize_whitespace(&el.text().collect::<String>()))
                .find(|t| !t.is_empty());
            if found.is_some() {
                return found;
            }
        }
    }

    None
}

fn is_unlikely(element: &ElementRef) -> bool {
    let value = element.value();
    let name = value.name();

    if UNLIKELY_TAGS.contains(&name) {
        return true;
    }

    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }

    if let Some(role) = value.attr("role") {
        if UNLIKELY_ROLES.contains(&role) {
            return true;
        }
    }

    if matches!(name, "html" | "body" | "article" | "main") {
        return false;
    }

    let marker = format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.id().unwrap_or_default()
    )
    .to_lowercase();

    if marker.trim().is_empty() {
        return false;
    }

    UNLIKELY_MARKERS.iter().any(|m| marker.contains(m))
        && !CANDIDATE_MARKERS.iter().any(|m| marker.contains(m))
}

fn has_unlikely_ancestor(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_unlikely(&ancestor))
}

fn has_block_child(element: &ElementRef) -> bool {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .any(|child| BLOCK_TAGS.contains(&child.value().name()))
}

/// 递归收集段落，不进入被判定为非正文的子树
fn collect_paragraphs(element: ElementRef, out: &mut Vec<Paragraph>) {
    for child in element.children().filter_map(ElementRef::wrap) {
        if is_unlikely(&child) {
            continue;
        }

        let name = child.value().name();
        let is_paragraph = PARAGRAPH_TAGS.contains(&name)
            || (matches!(name, "div" | "section") && !has_block_child(&child));

        if is_paragraph {
            let mut text = String::new();
            let mut link_chars = 0;
            append_text(child, name == "a", &mut text, &mut link_chars);

            let chars = text.chars().count();
            if chars > 0 {
                out.push(Paragraph {
                    text,
                    chars,
                    link_chars,
                });
            }
        } else {
            collect_paragraphs(child, out);
        }
    }
}

/// 拼接元素内的文本（空白折叠），同时统计链接文字
fn append_text(element: ElementRef, in_link: bool, buf: &mut String, link_chars: &mut usize) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                for word in text.split_whitespace() {
                    if !buf.is_empty() {
                        buf.push(' ');
                    }
                    buf.push_str(word);
                    if in_link {
                        *link_chars += word.chars().count();
                    }
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if is_unlikely(&child_el) {
                        continue;
                    }
                    let is_link = in_link || child_el.value().name() == "a";
                    append_text(child_el, is_link, buf, link_chars);
                }
            }
            _ => {}
        }
    }
}

fn score_candidate(element: &ElementRef, paragraphs: &[Paragraph]) -> f64 {
    let chars: usize = paragraphs.iter().map(|p| p.chars - p.link_chars.min(p.chars)).sum();
    if chars == 0 {
        return 0.0;
    }

    let value = element.value();
    let bonus = if matches!(value.name(), "article" | "main") || value.attr("role") == Some("main") {
        1.5
    } else {
        1.0
    };

    chars as f64 * bonus
}

/// 没有任何段落时退回到 body 的全部文本
fn body_text(document: &Html) -> Option<String> {
    let selector = Selector::parse("body").ok()?;
    let body = document.select(&selector).next()?;

    let mut text = String::new();
    let mut link_chars = 0;
    append_text(body, false, &mut text, &mut link_chars);

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 白名单清洗：不允许任何标签，script/style 连同内容一起删除，
/// 再把转义后的结果还原成纯文本
pub fn sanitize(text: &str) -> String {
    let cleaned = ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(text)
        .to_string();

    Html::parse_fragment(&cleaned)
        .root_element()
        .text()
        .collect::<String>()
}
