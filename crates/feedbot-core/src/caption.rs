//! Channel caption building.

use crate::domain::PostId;

/// Telegram's hard limit for photo captions (in characters).
pub const TELEGRAM_CAPTION_LIMIT: usize = 1024;

const ELLIPSIS: char = '…';

/// `ID: {id}` followed by the post tags as hashtags.
pub fn build_caption(id: PostId, tags: &str) -> String {
    let hashtags = tags
        .split_whitespace()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ");

    if hashtags.is_empty() {
        format!("ID: {id}\nTags:")
    } else {
        format!("ID: {id}\nTags: {hashtags}")
    }
}

/// Cut a caption down to `limit` chars, dropping whole trailing tags and
/// appending an ellipsis. Captions that already fit are returned unchanged.
pub fn fit_caption(caption: &str, limit: usize) -> String {
    if caption.chars().count() <= limit {
        return caption.to_string();
    }
    if limit == 0 {
        return String::new();
    }

    // Reserve one char for the ellipsis.
    let budget = limit - 1;
    let head: String = caption.chars().take(budget).collect();

    // If the cut landed mid-token, back off to the previous whitespace.
    let next = caption.chars().nth(budget);
    let cut_mid_token = next.is_some_and(|c| !c.is_whitespace());
    let kept = if cut_mid_token {
        match head.rfind(char::is_whitespace) {
            Some(idx) => &head[..idx],
            None => head.as_str(),
        }
    } else {
        head.as_str()
    };

    format!("{}{ELLIPSIS}", kept.trim_end())
}
