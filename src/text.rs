use chrono::{DateTime, Utc};
use textwrap::{Options as WrapOptions, WordSeparator, WordSplitter, WrapAlgorithm};

pub const ELLIPSIS: &str = "...";

/// Greedy word wrap. Words are whitespace-delimited; a word wider than
/// `width` is kept whole on its own line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Vec::new();
    }

    let options = WrapOptions::new(width)
        .break_words(false)
        .word_separator(WordSeparator::AsciiSpace)
        .word_splitter(WordSplitter::NoHyphenation)
        .wrap_algorithm(WrapAlgorithm::FirstFit);

    textwrap::wrap(&normalized, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

/// Wraps each paragraph separately, keeping a single blank line between
/// non-empty paragraphs.
pub fn wrap_paragraphs(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split("\n\n") {
        let wrapped = wrap(paragraph, width);
        if wrapped.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(wrapped);
    }
    lines
}

pub fn truncate(text: &str, max_len: usize) -> String {
    let len = text.chars().count();
    if len <= max_len {
        return text.to_string();
    }
    if max_len < ELLIPSIS.len() {
        return text.chars().take(max_len).collect();
    }
    let mut out: String = text.chars().take(max_len - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

pub fn format_count(n: i64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created).num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3_600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3_600)
    } else {
        format!("{}d", secs / 86_400)
    }
}
