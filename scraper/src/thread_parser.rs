use log::debug;
use scraper::{ElementRef, Html, Node, Selector};

use crate::timestamp::{AnchorTimestamp, PostTimestamp, TimestampError, YearResolver};

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// 1-based position among the post rows of the page
    pub post_number: u32,
    pub thread_id: u32,
    pub username: String,
    pub member_tag: String,
    pub timestamp: PostTimestamp,
    pub content: String,
}

/// A post row that was found but could not be dated.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPost {
    pub post_number: u32,
    pub raw_timestamp: String,
    pub error: TimestampError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadDocument {
    pub thread_id: u32,
    pub title: String,
    pub posts: Vec<Post>,
    pub skipped: Vec<SkippedPost>,
}

/// Parse a thread page.
///
/// Fails only when the page has no anchor timestamp. Posts whose timestamp
/// cannot be resolved end up in `skipped` and the rest are still parsed.
pub fn parse_thread_html(
    html: &str,
    thread_id: u32,
    resolver: &YearResolver,
) -> Result<ThreadDocument, TimestampError> {
    let document = Html::parse_document(html);

    let full_text: String = document.root_element().text().collect();
    let anchor = AnchorTimestamp::find(&full_text)?;
    debug!("thread {} anchored at {}", thread_id, anchor.datetime());

    let title = extract_title(&document).unwrap_or_else(|| format!("Thread {}", thread_id));
    let (posts, skipped) = extract_posts(&document, thread_id, &anchor, resolver);

    Ok(ThreadDocument {
        thread_id,
        title,
        posts,
        skipped,
    })
}

pub fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").unwrap();
    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Walk every two-cell row that looks like a post: author in the first cell,
/// a `<font>` timestamp followed by the body in the second.
pub fn extract_posts(
    document: &Html,
    thread_id: u32,
    anchor: &AnchorTimestamp,
    resolver: &YearResolver,
) -> (Vec<Post>, Vec<SkippedPost>) {
    let row_selector = Selector::parse("tr").unwrap();
    let td_selector = Selector::parse("td").unwrap();
    let font_selector = Selector::parse("font").unwrap();

    let mut posts = Vec::new();
    let mut skipped = Vec::new();
    let mut post_number = 0;

    for row in document.select(&row_selector) {
        let cells: Vec<ElementRef> = row.select(&td_selector).collect();
        if cells.len() != 2 {
            continue;
        }

        let author_lines = stripped_strings(cells[0]);
        if author_lines.is_empty() {
            continue;
        }

        let Some(font) = cells[1].select(&font_selector).next() else {
            continue;
        };

        post_number += 1;
        let raw_timestamp = stripped_strings(font).join(" ");

        let timestamp = match PostTimestamp::assemble(&raw_timestamp, anchor, resolver) {
            Ok(timestamp) => timestamp,
            Err(error) => {
                debug!("thread {} post {}: {}", thread_id, post_number, error);
                skipped.push(SkippedPost {
                    post_number,
                    raw_timestamp,
                    error,
                });
                continue;
            }
        };

        let username = author_lines[0].to_lowercase();
        let member_tag = author_lines
            .get(1)
            .copied()
            .unwrap_or("Unknown")
            .to_string();

        let mut pieces = Vec::new();
        collect_content(cells[1], font, &mut pieces);

        posts.push(Post {
            post_number,
            thread_id,
            username,
            member_tag,
            timestamp,
            content: pieces.join("\n"),
        });
    }

    (posts, skipped)
}

/// Trimmed, non-empty text nodes under `element`, in document order.
fn stripped_strings(element: ElementRef<'_>) -> Vec<&str> {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Body text of a post cell, one piece per text node, with the timestamp
/// `<font>` left out and links written as `[label](href)`.
fn collect_content(
    element: ElementRef<'_>,
    timestamp: ElementRef<'_>,
    pieces: &mut Vec<String>,
) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    pieces.push(text.to_string());
                }
            }
            Node::Element(el) => {
                if child.id() == timestamp.id() {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                match el.name() {
                    "script" | "style" => {}
                    "a" if el.attr("href").is_some() => {
                        let label: String = stripped_strings(child_ref).concat();
                        let href = el.attr("href").unwrap_or_default();
                        pieces.push(format!("[{}]({})", label, href));
                    }
                    _ => collect_content(child_ref, timestamp, pieces),
                }
            }
            _ => {}
        }
    }
}
