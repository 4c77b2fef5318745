//! The reformatted thread file that sits between HTML parsing and the database.
//!
//! ```text
//! === THREAD TITLE ===
//! Some title
//! === END TITLE ===
//!
//! PostID 1
//! ThreadID: 42
//! Poster: someone
//! Tag: Member
//! RawTime: Wed Mar 19 14:16:08
//! ISOTime: 2025-03-19T14:16:08
//! Content:
//! ...
//! === END POST ===
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use log::warn;
use regex::Regex;

use crate::thread_parser::ThreadDocument;

const TITLE_START: &str = "=== THREAD TITLE ===";
const TITLE_END: &str = "=== END TITLE ===";
const POST_END: &str = "=== END POST ===";

static POST_ID_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PostIDs? (\d+)$").unwrap());

/// A post as read back from a text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPost {
    pub post_id: u32,
    pub thread_id: u32,
    pub poster: String,
    pub tag: String,
    pub raw_timestamp: String,
    pub iso_timestamp: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedThread {
    pub thread_id: u32,
    pub title: String,
    pub posts: Vec<ParsedPost>,
}

pub fn render(thread: &ThreadDocument) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "{}\n{}\n{}\n", TITLE_START, thread.title, TITLE_END);

    for post in &thread.posts {
        let _ = writeln!(out, "PostID {}", post.post_number);
        let _ = writeln!(out, "ThreadID: {}", post.thread_id);
        let _ = writeln!(out, "Poster: {}", post.username);
        let _ = writeln!(out, "Tag: {}", post.member_tag);
        let _ = writeln!(out, "RawTime: {}", post.timestamp.raw);
        let _ = writeln!(out, "ISOTime: {}", post.timestamp.iso());
        let _ = writeln!(out, "Content:\n{}", post.content);
        let _ = writeln!(out, "{}\n", POST_END);
    }

    out
}

pub fn write_thread(dir: &Path, thread: &ThreadDocument) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let path = dir.join(format!("thread_{}.txt", thread.thread_id));
    fs::write(&path, render(thread))
        .with_context(|| format!("Failed to write thread file: {}", path.display()))?;
    Ok(path)
}

pub fn read_thread(path: &Path, thread_id: u32) -> Result<ParsedThread> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read thread file: {}", path.display()))?;
    Ok(parse(&text, thread_id))
}

#[derive(Default)]
struct PendingPost {
    post_id: Option<u32>,
    thread_id: Option<u32>,
    poster: Option<String>,
    tag: Option<String>,
    raw_timestamp: Option<String>,
    iso_timestamp: Option<String>,
    content: Vec<String>,
}

impl PendingPost {
    fn finish(self, thread_id: u32) -> Option<ParsedPost> {
        let content = self.content.join("\n").trim().to_string();
        let post = (|| {
            Some(ParsedPost {
                post_id: self.post_id?,
                thread_id: self.thread_id?,
                poster: self.poster?,
                tag: self.tag?,
                raw_timestamp: self.raw_timestamp?,
                iso_timestamp: self.iso_timestamp?,
                content,
            })
        })();

        if post.is_none() {
            warn!("Skipping incomplete post in thread {}", thread_id);
        }
        post
    }
}

/// Read a thread file back.
///
/// A `PostID` line always starts a new post, even without a preceding end
/// marker. Header lines count only before `Content:`. Incomplete posts are
/// dropped.
pub fn parse(text: &str, thread_id: u32) -> ParsedThread {
    let mut title: Option<String> = None;
    let mut posts = Vec::new();
    let mut current: Option<PendingPost> = None;
    let mut in_content = false;

    let flush = |current: &mut Option<PendingPost>, posts: &mut Vec<ParsedPost>| {
        if let Some(post) = current.take().and_then(|p| p.finish(thread_id)) {
            posts.push(post);
        }
    };

    for line in text.lines() {
        let stripped = line.trim();

        if let Some(caps) = POST_ID_LINE.captures(stripped) {
            flush(&mut current, &mut posts);
            in_content = false;
            current = Some(PendingPost {
                post_id: caps[1].parse().ok(),
                ..PendingPost::default()
            });
            continue;
        }

        if stripped == POST_END {
            flush(&mut current, &mut posts);
            in_content = false;
            continue;
        }

        if in_content {
            if let Some(post) = current.as_mut() {
                post.content.push(line.trim_end().to_string());
            }
            continue;
        }

        if stripped == TITLE_START || stripped == TITLE_END {
            continue;
        }

        let Some(post) = current.as_mut() else {
            if title.is_none() && !stripped.is_empty() {
                title = Some(stripped.to_string());
            }
            continue;
        };

        if stripped == "Content:" {
            in_content = true;
        } else if let Some(value) = stripped.strip_prefix("ThreadID:") {
            match value.trim().parse() {
                Ok(id) => post.thread_id = Some(id),
                Err(_) => warn!("Bad ThreadID line {:?} in thread {}", stripped, thread_id),
            }
        } else if let Some(value) = stripped.strip_prefix("Poster:") {
            post.poster = Some(value.trim().to_string());
        } else if let Some(value) = stripped.strip_prefix("Tag:") {
            post.tag = Some(value.trim().to_string());
        } else if let Some(value) = stripped.strip_prefix("RawTime:") {
            post.raw_timestamp = Some(value.trim().to_string());
        } else if let Some(value) = stripped.strip_prefix("ISOTime:") {
            post.iso_timestamp = Some(value.trim().to_string());
        }
    }

    // last post may be missing its end marker
    flush(&mut current, &mut posts);

    ParsedThread {
        thread_id,
        title: title.unwrap_or_default(),
        posts,
    }
}
