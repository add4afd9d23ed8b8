//! Hashtag extraction and trend ranking
//!
//! Pure functions over the in-memory post collection; recomputed per
//! request, never cached.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::data::Post;

/// A ranked hashtag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trend {
    pub hashtag: String,
    pub count: usize,
}

/// Extract `#token` hashtags from post content
///
/// Tokens are one or more ASCII letters, digits or underscores after the
/// sigil. Results are lower-cased with the sigil stripped, in order of
/// appearance; duplicates in the source yield duplicate entries.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'#' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            if end > start {
                tags.push(text[start..end].to_lowercase());
                i = end;
                continue;
            }
        }
        i += 1;
    }

    tags
}

/// Rank hashtags by occurrence across the given posts
///
/// A post contributes at most once per distinct tag it carries. Ties keep
/// first-encountered order (stable sort, no secondary key). Truncated to
/// `top_n`.
pub fn trending(posts: &[Post], top_n: usize) -> Vec<Trend> {
    let mut counts: Vec<Trend> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for post in posts {
        let mut seen: HashSet<&str> = HashSet::new();
        for tag in &post.hashtags {
            if !seen.insert(tag.as_str()) {
                continue;
            }
            match index.get(tag) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(tag.clone(), counts.len());
                    counts.push(Trend {
                        hashtag: tag.clone(),
                        count: 1,
                    });
                }
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(top_n);
    counts
}
