//! Relevance filtering for long guideline documents.
//!
//! Documents over [`MAX_CONTEXT_CHARS`] are cut into overlapping chunks,
//! each scored by technical keywords and patterns for dimensions,
//! file sizes and hex colors. The opening chunk is always kept; the best
//! scoring chunks fill the remaining budget.

use std::sync::LazyLock;

use regex::Regex;

/// Character budget for text sent to the model.
pub const MAX_CONTEXT_CHARS: usize = 15_000;
/// Chunk length in characters.
pub const CHUNK_SIZE: usize = 1500;
/// Characters shared by neighbouring chunks.
pub const CHUNK_OVERLAP: usize = 300;
/// Chunks scoring below this are dropped.
const MIN_SCORE: usize = 2;
/// Weight of each pattern match.
const PATTERN_WEIGHT: usize = 3;

const KEYWORDS: &[&str] = &[
    "px",
    "pixels",
    "dimension",
    "width",
    "height",
    "aspect ratio",
    "margin",
    "padding",
    "safe zone",
    "clear space",
    "gutter",
    "bleed",
    "file size",
    "kb",
    "mb",
    "max size",
    "resolution",
    "dpi",
    "format",
    "jpeg",
    "png",
    "jpg",
    "html5",
    "static",
    "animated",
    "color",
    "hex",
    "rgb",
    "contrast",
    "background",
    "logo",
    "font",
    "technical spec",
    "requirements",
    "guidelines",
    "deliverables",
];

static DIMENSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2,4}\s?[xX]\s?\d{2,4}").expect("valid regex"));
static FILE_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s?(kb|mb|KB|MB)").expect("valid regex"));
static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[0-9a-fA-F]{6}").expect("valid regex"));

/// Score a chunk: +1 per keyword present, +3 per pattern match.
#[must_use]
pub fn score_chunk(chunk: &str) -> usize {
    let lower = chunk.to_lowercase();
    let keywords = KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
    let patterns: usize = [&*DIMENSIONS, &*FILE_SIZE, &*HEX_COLOR]
        .iter()
        .map(|re| re.find_iter(chunk).count())
        .sum();
    keywords + patterns * PATTERN_WEIGHT
}

fn split_chunks(chars: &[char]) -> Vec<String> {
    let step = CHUNK_SIZE - CHUNK_OVERLAP;
    (0..chars.len())
        .step_by(step)
        .map(|start| {
            let end = (start + CHUNK_SIZE).min(chars.len());
            chars[start..end].iter().collect()
        })
        .collect()
}

/// Reduce `text` to its most relevant parts within the context budget.
///
/// Text within budget is returned unchanged.
#[must_use]
pub fn filter_relevant_content(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= MAX_CONTEXT_CHARS {
        return text.to_string();
    }

    let chunks = split_chunks(&chars);
    let Some(first) = chunks.first() else {
        return String::new();
    };

    let mut scored: Vec<(&String, usize)> = chunks.iter().map(|c| (c, score_chunk(c))).collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let mut output = format!("{first}\n\n");
    let mut length = first.chars().count();
    let mut kept = 1usize;
    for (chunk, score) in scored {
        if chunk == first {
            continue;
        }
        let chunk_len = chunk.chars().count();
        if length + chunk_len > MAX_CONTEXT_CHARS {
            break;
        }
        if score < MIN_SCORE {
            continue;
        }
        output.push_str(chunk);
        output.push_str("\n\n");
        length += chunk_len;
        kept += 1;
    }

    tracing::debug!(
        chunks = chunks.len(),
        kept,
        chars = length,
        "filtered guideline text"
    );
    output
}
