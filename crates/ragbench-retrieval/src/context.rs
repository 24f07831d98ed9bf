//! Context assembly and retrieval trace rendering.

use std::sync::Arc;

use ragbench_core::{Chunk, RetrievalResult};

const TRACE_SNIPPET_CHARS: usize = 360;

/// Render ranked results into one prompt-ready text blob of at most `max_chars`
/// characters.
///
/// Blocks are `[chunk:<id> score:<4dp>]` followed by the chunk text, separated by
/// blank lines. Blocks are added in order until the next one would overflow the
/// budget; partial blocks are never emitted.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ragbench_core::{Chunk, ChunkMeta, RetrievalMethod, RetrievalResult};
/// use ragbench_retrieval::context::build_context;
///
/// let chunk = Arc::new(Chunk { id: 4, text: "tokio is async".into(), meta: ChunkMeta::default() });
/// let results = vec![RetrievalResult::new(chunk, 0.5, RetrievalMethod::Keyword)];
/// assert_eq!(build_context(&results, 1000), "[chunk:4 score:0.5000]\ntokio is async");
/// assert_eq!(build_context(&results, 0), "");
/// ```
pub fn build_context(results: &[RetrievalResult], max_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0;

    for item in results {
        let block = format!(
            "\n\n[chunk:{} score:{}]\n{}",
            item.chunk.id,
            format_score(item.score),
            item.chunk.text
        );
        let cost = block.chars().count();
        if used + cost > max_chars {
            break;
        }
        used += cost;
        context.push_str(&block);
    }

    context.trim().to_string()
}

/// Human-readable listing of ranked results with whitespace-collapsed snippets.
///
/// # Examples
///
/// ```
/// use ragbench_retrieval::context::render_trace;
///
/// assert_eq!(render_trace(&[]), "(no results)");
/// ```
pub fn render_trace(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return "(no results)".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "#{}  [chunk:{}]  score={}  via={}\n{}\n",
                i + 1,
                item.chunk.id,
                format_score(item.score),
                item.method,
                snippet(&item.chunk.text, TRACE_SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Score with four decimals, rounding exact halfway values away from zero.
///
/// `{:.4}` alone rounds such ties to even (`0.03125` would print `0.0312`).
///
/// # Examples
///
/// ```
/// use ragbench_retrieval::context::format_score;
///
/// assert_eq!(format_score(0.03125), "0.0313");
/// assert_eq!(format_score(0.5), "0.5000");
/// ```
pub fn format_score(score: f64) -> String {
    // a 4dp tie is k/32 for odd k, which also makes `score * 10_000` exact
    let magnitude = score.abs();
    let scaled = magnitude * 10_000.0;
    if scaled.is_finite() && (magnitude * 32.0).fract() == 0.0 && scaled.fract() == 0.5 {
        let sign = if score < 0.0 { "-" } else { "" };
        return format!("{sign}{:.4}", (scaled.trunc() + 1.0) / 10_000.0);
    }
    format!("{score:.4}")
}

/// Preview of the first chunks, each labeled `[chunk:<id>]` and cut to
/// `max_chars` characters.
pub fn preview_chunks(chunks: &[Arc<Chunk>], max_chars: usize) -> String {
    chunks
        .iter()
        .map(|c| {
            let head: String = c.text.chars().take(max_chars).collect();
            let ellipsis = if c.text.chars().count() > max_chars {
                "..."
            } else {
                ""
            };
            format!("[chunk:{}]\n{head}{ellipsis}", c.id)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn snippet(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    let collapsed = head.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > max_chars {
        format!("{collapsed}...")
    } else {
        collapsed
    }
}
